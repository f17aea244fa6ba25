//! Queries over the legacy orders table, driven by a resolved [`OrdersSchema`].
//!
//! Orders are tied to a person only by the client reference column holding
//! the person's phone (exactly or by digits) or full name.

use std::collections::HashMap;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, QueryResult,
    Statement, TransactionError, TransactionTrait, Value,
};

use super::people::PersonRow;
use super::schema::{KeyStrategy, OrdersSchema};
use crate::utils::text::{digits_only, non_blank, quote_ident};

/// Submitted order form, keyed by column name.
pub type OrderForm = HashMap<String, String>;

/// One order row, every column rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    /// Display-only position within the matched set, starting at 1
    pub ordinal: usize,
    /// Primary-key value as text
    pub key: String,
    pub values: Vec<(String, Option<String>)>,
}

impl OrderRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, v)| v.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrdersOutcome {
    Rows(Vec<OrderRow>),
    Failed(String),
}

impl OrdersOutcome {
    pub fn rows(&self) -> &[OrderRow] {
        match self {
            OrdersOutcome::Rows(rows) => rows,
            OrdersOutcome::Failed(_) => &[],
        }
    }
}

fn select_list(schema: &OrdersSchema) -> String {
    schema
        .column_names()
        .map(|c| format!("{q}::text AS {q}", q = quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `$n`, cast to the column's declared type when the catalog names one.
fn typed_placeholder(schema: &OrdersSchema, column: &str, n: usize) -> String {
    match schema.column(column).and_then(|c| c.cast_type()) {
        Some(ty) => format!("CAST(${} AS {})", n, ty),
        None => format!("${}", n),
    }
}

/// The value written into the client reference column for a new order.
pub fn client_reference(person: &PersonRow) -> String {
    match non_blank(person.phone.as_deref()) {
        Some(phone) => phone,
        None => person.display_name().to_string(),
    }
}

/// Predicate tying order rows to `person`: the client reference equals the
/// phone, contains its digits, or equals the full name. Placeholders continue
/// after whatever `values` already holds. `None` when there is nothing to
/// match on.
fn client_scope(schema: &OrdersSchema, person: &PersonRow, values: &mut Vec<Value>) -> Option<String> {
    let client = format!("{}::text", quote_ident(&schema.client_column));
    let mut clauses = Vec::new();

    if let Some(phone) = non_blank(person.phone.as_deref()) {
        values.push(phone.clone().into());
        clauses.push(format!("{} = ${}", client, values.len()));
        let digits = digits_only(&phone);
        if !digits.is_empty() {
            values.push(format!("%{}%", digits).into());
            clauses.push(format!(
                r"regexp_replace(COALESCE({}, ''), '\D', '', 'g') LIKE ${}",
                client,
                values.len()
            ));
        }
    }
    if let Some(fio) = non_blank(person.fio.as_deref()) {
        values.push(fio.into());
        clauses.push(format!("{} = ${}", client, values.len()));
    }
    if clauses.is_empty() {
        None
    } else {
        Some(format!("({})", clauses.join(" OR ")))
    }
}

/// `None` when the person has neither a phone nor a name to match on.
pub fn list_statement(schema: &OrdersSchema, person: &PersonRow) -> Option<Statement> {
    let mut values: Vec<Value> = Vec::new();
    let scope = client_scope(schema, person, &mut values)?;
    Some(Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {}",
            select_list(schema),
            schema.qualified_table(),
            scope,
            quote_ident(&schema.primary_key)
        ),
        values,
    ))
}

/// `pk::text = $n AND <client scope>`, with the key bound after `values`.
fn keyed_scope(
    schema: &OrdersSchema,
    person: &PersonRow,
    key: &str,
    values: &mut Vec<Value>,
) -> Option<String> {
    values.push(key.into());
    let key_clause = format!("{}::text = ${}", quote_ident(&schema.primary_key), values.len());
    let scope = client_scope(schema, person, values)?;
    Some(format!("{} AND {}", key_clause, scope))
}

fn to_rows(schema: &OrdersSchema, results: Vec<QueryResult>) -> Result<Vec<OrderRow>, DbErr> {
    results
        .into_iter()
        .enumerate()
        .map(|(i, result)| {
            let mut values = Vec::with_capacity(schema.columns.len());
            for name in schema.column_names() {
                let value: Option<String> = result.try_get("", name)?;
                values.push((name.to_string(), value));
            }
            let key = values
                .iter()
                .find(|(name, _)| *name == schema.primary_key)
                .and_then(|(_, v)| v.clone())
                .unwrap_or_default();
            Ok(OrderRow {
                ordinal: i + 1,
                key,
                values,
            })
        })
        .collect()
}

pub async fn list_for_person<C: ConnectionTrait>(
    db: &C,
    schema: &OrdersSchema,
    person: &PersonRow,
) -> OrdersOutcome {
    let Some(stmt) = list_statement(schema, person) else {
        return OrdersOutcome::Rows(Vec::new());
    };
    let fetched = match db.query_all(stmt).await {
        Ok(results) => to_rows(schema, results),
        Err(e) => Err(e),
    };
    match fetched {
        Ok(rows) => {
            log::debug!("Orders for person {}: {} rows", person.id, rows.len());
            OrdersOutcome::Rows(rows)
        }
        Err(e) => {
            log::error!("Loading orders for person {} failed: {}", person.id, e);
            OrdersOutcome::Failed(e.to_string())
        }
    }
}

/// The order `key` of `person`; `None` if it does not exist or belongs to
/// someone else.
pub async fn find_by_key<C: ConnectionTrait>(
    db: &C,
    schema: &OrdersSchema,
    person: &PersonRow,
    key: &str,
) -> Result<Option<OrderRow>, DbErr> {
    let mut values: Vec<Value> = Vec::new();
    let Some(scope) = keyed_scope(schema, person, key, &mut values) else {
        return Ok(None);
    };
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "SELECT {} FROM {} WHERE {}",
            select_list(schema),
            schema.qualified_table(),
            scope
        ),
        values,
    );
    let results = db.query_all(stmt).await?;
    Ok(to_rows(schema, results)?.into_iter().next())
}

#[derive(Debug, FromQueryResult)]
struct NextNumber {
    next_number: i64,
}

/// Largest digits-only value of the insert key plus one; 1 on an empty table.
pub async fn next_number<C: ConnectionTrait>(db: &C, schema: &OrdersSchema) -> Result<i64, DbErr> {
    let column = schema.insert_key.as_deref().unwrap_or(&schema.primary_key);
    let stmt = Statement::from_string(
        DbBackend::Postgres,
        format!(
            r"SELECT (COALESCE(MAX(NULLIF(regexp_replace({}::text, '\D', '', 'g'), '')::numeric), 0) + 1)::bigint AS next_number FROM {}",
            quote_ident(column),
            schema.qualified_table()
        ),
    );
    let row = NextNumber::find_by_statement(stmt)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("next order number".to_string()))?;
    Ok(row.next_number)
}

pub fn insert_statement(
    schema: &OrdersSchema,
    form: &OrderForm,
    client_ref: &str,
    key_value: Option<String>,
) -> Statement {
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let mut push = |column: &str, value: String| {
        values.push(value.into());
        columns.push(quote_ident(column));
        placeholders.push(typed_placeholder(schema, column, values.len()));
    };

    if let (Some(column), Some(key)) = (schema.insert_key.as_deref(), key_value) {
        push(column, key);
    }
    push(&schema.client_column, client_ref.to_string());
    for column in &schema.business_columns {
        if let Some(value) = non_blank(form.get(column).map(String::as_str)) {
            push(column, value);
        }
    }

    Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.qualified_table(),
            columns.join(", "),
            placeholders.join(", ")
        ),
        values,
    )
}

/// Blank business fields are written as NULL. `None` when the person has
/// nothing to match orders on.
pub fn update_statement(
    schema: &OrdersSchema,
    person: &PersonRow,
    key: &str,
    form: &OrderForm,
) -> Option<Statement> {
    let mut assignments = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    for column in &schema.business_columns {
        values.push(non_blank(form.get(column).map(String::as_str)).into());
        assignments.push(format!(
            "{} = {}",
            quote_ident(column),
            typed_placeholder(schema, column, values.len())
        ));
    }
    let scope = keyed_scope(schema, person, key, &mut values)?;
    Some(Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "UPDATE {} SET {} WHERE {}",
            schema.qualified_table(),
            assignments.join(", "),
            scope
        ),
        values,
    ))
}

pub fn delete_statement(schema: &OrdersSchema, person: &PersonRow, key: &str) -> Option<Statement> {
    let mut values: Vec<Value> = Vec::new();
    let scope = keyed_scope(schema, person, key, &mut values)?;
    Some(Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!("DELETE FROM {} WHERE {}", schema.qualified_table(), scope),
        values,
    ))
}

/// Insert a new order for `person` in its own transaction.
pub async fn create(
    db: &DatabaseConnection,
    schema: &OrdersSchema,
    person: &PersonRow,
    form: &OrderForm,
) -> Result<(), TransactionError<DbErr>> {
    let schema = schema.clone();
    let form = form.clone();
    let client_ref = client_reference(person);

    db.transaction::<_, (), DbErr>(move |txn| {
        Box::pin(async move {
            let key_value = match schema.key_strategy {
                KeyStrategy::Database => None,
                KeyStrategy::NextNumber => Some(next_number(txn, &schema).await?.to_string()),
                KeyStrategy::EmptyText => Some(String::new()),
            };
            let stmt = insert_statement(&schema, &form, &client_ref, key_value);
            txn.execute(stmt).await?;
            Ok(())
        })
    })
    .await
}
