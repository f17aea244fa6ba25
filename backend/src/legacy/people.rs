//! Queries over the legacy people table.

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, DbBackend, DbErr, FromQueryResult, Statement, Value};
use serde::{Deserialize, Serialize};

use super::schema::{person_columns as col, PeopleTable};
use crate::utils::text::{digits_only, non_blank, quote_ident};

/// Filtered searches return at most this many rows.
pub const SEARCH_LIMIT: usize = 1000;

/// Accepted date spellings, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// A people row with every column rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct PersonRow {
    pub id: i32,
    pub fio: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub age: Option<String>,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl PersonRow {
    pub fn display_name(&self) -> &str {
        self.fio.as_deref().unwrap_or("")
    }

    pub fn phone(&self) -> &str {
        self.phone.as_deref().unwrap_or("")
    }
}

fn select_list() -> String {
    format!(
        "{id}::int4 AS id, {fio}::text AS fio, {gender}::text AS gender, \
         {address}::text AS address, {age}::text AS age, {birth}::text AS birth_date, \
         COALESCE({phone}::text, '') AS phone, {email}::text AS email, {notes}::text AS notes",
        id = quote_ident(col::ID),
        fio = quote_ident(col::FIO),
        gender = quote_ident(col::GENDER),
        address = quote_ident(col::ADDRESS),
        age = quote_ident(col::AGE),
        birth = quote_ident(col::BIRTH_DATE),
        phone = quote_ident(col::PHONE),
        email = quote_ident(col::EMAIL),
        notes = quote_ident(col::NOTES),
    )
}

/// Listing filters, all optional and AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub fio: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl SearchParams {
    pub fn is_empty(&self) -> bool {
        [&self.fio, &self.phone, &self.email, &self.age, &self.gender]
            .iter()
            .all(|v| non_blank(v.as_deref()).is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenderPattern {
    /// LIKE pattern against the lower-cased column
    pub pattern: String,
    /// Expected first character
    pub initial: String,
}

/// `м…`/`m…` means male, `ж…`/`f…` female, anything else is matched as typed.
pub fn normalize_gender(raw: &str) -> Option<GenderPattern> {
    let value = raw.trim().to_lowercase();
    let first = value.chars().next()?;
    let (pattern, initial) = match first {
        'м' | 'm' => ("%муж%".to_string(), "м".to_string()),
        'ж' | 'f' => ("%жен%".to_string(), "ж".to_string()),
        other => (format!("%{}%", value), other.to_string()),
    };
    Some(GenderPattern { pattern, initial })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub sql: String,
    pub values: Vec<Value>,
    pub filtered: bool,
}

impl SearchQuery {
    pub fn statement(&self) -> Statement {
        Statement::from_sql_and_values(DbBackend::Postgres, &self.sql, self.values.clone())
    }
}

/// Push a bind value and return its placeholder.
fn bind(values: &mut Vec<Value>, value: Value) -> String {
    values.push(value);
    format!("${}", values.len())
}

pub fn build_search(table: &PeopleTable, params: &SearchParams) -> SearchQuery {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(fio) = non_blank(params.fio.as_deref()) {
        let p = bind(&mut values, format!("%{}%", fio).into());
        clauses.push(format!("{} ILIKE {}", quote_ident(col::FIO), p));
    }

    if let Some(phone) = non_blank(params.phone.as_deref()) {
        let p = bind(&mut values, format!("%{}%", digits_only(&phone)).into());
        clauses.push(format!(
            r"regexp_replace(COALESCE({}::text, ''), '\D', '', 'g') LIKE {}",
            quote_ident(col::PHONE),
            p
        ));
    }

    if let Some(email) = non_blank(params.email.as_deref()) {
        let p = bind(&mut values, format!("%{}%", email).into());
        clauses.push(format!("{} ILIKE {}", quote_ident(col::EMAIL), p));
    }

    if let Some(age) = non_blank(params.age.as_deref()) {
        match age.parse::<i32>() {
            Ok(n) => {
                let p = bind(&mut values, n.into());
                clauses.push(format!("{} = {}", quote_ident(col::AGE), p));
            }
            Err(_) => {
                let p = bind(&mut values, format!("%{}%", age).into());
                clauses.push(format!("CAST({} AS TEXT) ILIKE {}", quote_ident(col::AGE), p));
            }
        }
    }

    if let Some(gender) = params.gender.as_deref().and_then(normalize_gender) {
        let column = format!("lower(COALESCE({}::text, ''))", quote_ident(col::GENDER));
        let pattern = bind(&mut values, gender.pattern.into());
        let initial = bind(&mut values, gender.initial.into());
        clauses.push(format!(
            "({column} LIKE {pattern} OR left({column}, 1) = {initial})"
        ));
    }

    let mut sql = format!("SELECT {} FROM {}", select_list(), table.qualified());
    let filtered = !clauses.is_empty();
    if filtered {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(&format!(" ORDER BY {}", quote_ident(col::FIO)));
    if filtered {
        sql.push_str(&format!(" LIMIT {}", SEARCH_LIMIT));
    }

    SearchQuery {
        sql,
        values,
        filtered,
    }
}

/// Result of a listing query. A failed query is reported, not raised, so a
/// broken legacy table still renders the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Rows(Vec<PersonRow>),
    Failed(String),
}

impl SearchOutcome {
    pub fn rows(&self) -> &[PersonRow] {
        match self {
            SearchOutcome::Rows(rows) => rows,
            SearchOutcome::Failed(_) => &[],
        }
    }
}

pub async fn search<C: ConnectionTrait>(
    db: &C,
    table: &PeopleTable,
    params: &SearchParams,
) -> SearchOutcome {
    let query = build_search(table, params);
    log::debug!("search_people: SQL -> {}", query.sql);
    log::debug!("search_people: params -> {:?}", query.values);

    match PersonRow::find_by_statement(query.statement()).all(db).await {
        Ok(rows) => {
            log::info!(
                "search_people: {} select returned {} rows",
                if query.filtered { "filtered" } else { "full" },
                rows.len()
            );
            SearchOutcome::Rows(rows)
        }
        Err(e) => {
            log::error!("search_people: database error: {}", e);
            SearchOutcome::Failed(e.to_string())
        }
    }
}

/// How a person is addressed in URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonKey {
    Id(i32),
    /// Legacy links carry the full name
    Name(String),
}

impl PersonKey {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i32>() {
            Ok(id) => PersonKey::Id(id),
            Err(_) => PersonKey::Name(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(PersonRow),
    NotFound,
    /// Several rows share the name
    Ambiguous,
}

pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    table: &PeopleTable,
    id: i32,
) -> Result<Option<PersonRow>, DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            select_list(),
            table.qualified(),
            quote_ident(col::ID)
        ),
        [id.into()],
    );
    PersonRow::find_by_statement(stmt).one(db).await
}

pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    table: &PeopleTable,
    key: &PersonKey,
) -> Result<Lookup, DbErr> {
    match key {
        PersonKey::Id(id) => Ok(find_by_id(db, table, *id)
            .await?
            .map(Lookup::Found)
            .unwrap_or(Lookup::NotFound)),
        PersonKey::Name(name) => {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                format!(
                    "SELECT {} FROM {} WHERE {} = $1 ORDER BY {} LIMIT 2",
                    select_list(),
                    table.qualified(),
                    quote_ident(col::FIO),
                    quote_ident(col::ID)
                ),
                [name.as_str().into()],
            );
            let mut rows = PersonRow::find_by_statement(stmt).all(db).await?;
            Ok(match rows.len() {
                0 => Lookup::NotFound,
                1 => Lookup::Found(rows.remove(0)),
                _ => Lookup::Ambiguous,
            })
        }
    }
}

/// Submitted person fields, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonForm {
    #[serde(default)]
    pub fio: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<&PersonRow> for PersonForm {
    fn from(row: &PersonRow) -> Self {
        Self {
            fio: row.fio.clone(),
            gender: row.gender.clone(),
            address: row.address.clone(),
            age: row.age.clone(),
            birth_date: row.birth_date.clone(),
            phone: row.phone.clone(),
            email: row.email.clone(),
            notes: row.notes.clone(),
        }
    }
}

/// Validated values ready for a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonInput {
    pub fio: String,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub age: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
}

impl PersonForm {
    /// Blank optional fields become NULL; `fio` is required.
    pub fn validate(&self) -> Result<PersonInput, String> {
        let fio = non_blank(self.fio.as_deref()).ok_or_else(|| "Поле ФИО обязательно".to_string())?;

        let age = match non_blank(self.age.as_deref()) {
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| format!("Возраст должен быть целым числом: {}", raw))?,
            ),
            None => None,
        };

        let birth_date = match non_blank(self.birth_date.as_deref()) {
            Some(raw) => Some(
                parse_date(&raw).ok_or_else(|| format!("Неверный формат даты рождения: {}", raw))?,
            ),
            None => None,
        };

        Ok(PersonInput {
            fio,
            gender: non_blank(self.gender.as_deref()),
            address: non_blank(self.address.as_deref()),
            age,
            birth_date,
            phone: non_blank(self.phone.as_deref()),
            email: non_blank(self.email.as_deref()),
            notes: non_blank(self.notes.as_deref()),
        })
    }
}

impl PersonInput {
    fn values(&self) -> Vec<Value> {
        vec![
            self.fio.as_str().into(),
            self.gender.clone().into(),
            self.address.clone().into(),
            self.age.into(),
            self.birth_date.into(),
            self.phone.clone().into(),
            self.email.clone().into(),
            self.notes.clone().into(),
        ]
    }
}

const WRITE_COLUMNS: [&str; 8] = [
    col::FIO,
    col::GENDER,
    col::ADDRESS,
    col::AGE,
    col::BIRTH_DATE,
    col::PHONE,
    col::EMAIL,
    col::NOTES,
];

pub fn insert_statement(table: &PeopleTable, input: &PersonInput) -> Statement {
    let columns: Vec<String> = WRITE_COLUMNS.iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=WRITE_COLUMNS.len()).map(|i| format!("${}", i)).collect();
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.qualified(),
            columns.join(", "),
            placeholders.join(", ")
        ),
        input.values(),
    )
}

pub fn update_statement(table: &PeopleTable, id: i32, input: &PersonInput) -> Statement {
    let assignments: Vec<String> = WRITE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", quote_ident(c), i + 1))
        .collect();
    let mut values = input.values();
    values.push(id.into());
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            table.qualified(),
            assignments.join(", "),
            quote_ident(col::ID),
            values.len()
        ),
        values,
    )
}

pub fn delete_statement(table: &PeopleTable, id: i32) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "DELETE FROM {} WHERE {} = $1",
            table.qualified(),
            quote_ident(col::ID)
        ),
        [id.into()],
    )
}
