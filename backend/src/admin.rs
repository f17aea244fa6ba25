//! Maintenance queries behind the `crm-admin` binary: catalog listing, row
//! counts, sample dumps and seeding an empty people table.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, Statement,
    TransactionError, TransactionTrait,
};

use crate::config::LegacySettings;
use crate::legacy::people::{insert_statement, PersonInput};
use crate::legacy::schema::PeopleTable;
use crate::legacy::schema::person_columns as col;
use crate::utils::text::quote_ident;

#[derive(Debug, FromQueryResult)]
struct TableName {
    table_name: String,
}

/// Base tables of `schema`, by name.
pub async fn list_tables<C: ConnectionTrait>(db: &C, schema: &str) -> Result<Vec<String>, DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = $1 AND table_type = 'BASE TABLE'
        ORDER BY table_name"#,
        [schema.into()],
    );
    let rows = TableName::find_by_statement(stmt).all(db).await?;
    Ok(rows.into_iter().map(|r| r.table_name).collect())
}

/// Which of the legacy tables are present among `tables`.
pub fn legacy_presence<'a>(legacy: &'a LegacySettings, tables: &[String]) -> Vec<(&'a str, bool)> {
    [legacy.people_table.as_str(), legacy.orders.table.as_str()]
        .into_iter()
        .map(|name| (name, tables.iter().any(|t| t == name)))
        .collect()
}

#[derive(Debug, FromQueryResult)]
struct RowCount {
    count: i64,
}

pub async fn count_people<C: ConnectionTrait>(db: &C, table: &PeopleTable) -> Result<i64, DbErr> {
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!("SELECT COUNT(*)::bigint AS count FROM {}", table.qualified()),
    );
    let row = RowCount::find_by_statement(stmt)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("row count of {}", table.name)))?;
    Ok(row.count)
}

/// The few columns shown by `crm-admin dump`.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct PersonSample {
    pub id: i32,
    pub fio: Option<String>,
    pub phone: String,
    pub email: Option<String>,
}

pub async fn sample_people<C: ConnectionTrait>(
    db: &C,
    table: &PeopleTable,
    limit: u64,
) -> Result<Vec<PersonSample>, DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "SELECT {id} AS id, {fio}::text AS fio, COALESCE({phone}::text, '') AS phone, {email}::text AS email \
             FROM {table} ORDER BY {id} LIMIT $1",
            id = quote_ident(col::ID),
            fio = quote_ident(col::FIO),
            phone = quote_ident(col::PHONE),
            email = quote_ident(col::EMAIL),
            table = table.qualified()
        ),
        [(limit as i64).into()],
    );
    PersonSample::find_by_statement(stmt).all(db).await
}

/// Demo clients written by `crm-admin seed`.
pub fn sample_inputs() -> Vec<PersonInput> {
    let sample = |fio: &str, gender: &str, address: &str, age: i32, phone: &str, email: &str, notes: &str| {
        PersonInput {
            fio: fio.to_string(),
            gender: Some(gender.to_string()),
            address: Some(address.to_string()),
            age: Some(age),
            birth_date: None,
            phone: Some(phone.to_string()),
            email: Some(email.to_string()),
            notes: Some(notes.to_string()),
        }
    };
    vec![
        sample(
            "Иванов Иван Иванович",
            "Мужской",
            "г. Москва, ул. Ленина, 1",
            34,
            "+7 (900) 111-22-33",
            "ivanov@example.com",
            "Тестовый клиент",
        ),
        sample(
            "Петрова Мария Сергеевна",
            "Женский",
            "г. Санкт-Петербург, Невский пр., 10",
            28,
            "+7 (911) 222-33-44",
            "m.petrova@example.com",
            "Тестовый клиент 2",
        ),
        sample(
            "Сидоров Алексей Павлович",
            "Мужской",
            "г. Казань, ул. Кремлёвская, 5",
            41,
            "+7 (922) 333-44-55",
            "a.sidorov@example.com",
            "Тестовый клиент 3",
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded(usize),
    /// The table already had this many rows; nothing was written
    AlreadyPopulated(i64),
}

/// Insert [`sample_inputs`] when the people table is empty. The count and
/// the inserts share one transaction.
pub async fn seed_samples(
    db: &DatabaseConnection,
    table: &PeopleTable,
) -> Result<SeedOutcome, TransactionError<DbErr>> {
    let table = table.clone();
    db.transaction::<_, SeedOutcome, DbErr>(move |txn| {
        Box::pin(async move {
            let existing = count_people(txn, &table).await?;
            if existing > 0 {
                return Ok(SeedOutcome::AlreadyPopulated(existing));
            }
            let samples = sample_inputs();
            for input in &samples {
                txn.execute(insert_statement(&table, input)).await?;
            }
            Ok(SeedOutcome::Seeded(samples.len()))
        })
    })
    .await
}
