//! Catalog checks for the legacy tables.
//!
//! Both legacy tables are validated once during startup. The orders table is
//! described by an [`OrdersDescriptor`]; whatever the descriptor leaves open
//! (client reference column, primary key) is derived from
//! `information_schema` here and then stays fixed for the process lifetime.
//! Any mismatch is a [`SchemaError`] and startup aborts.

use sea_orm::{ConnectionTrait, DbBackend, DbErr, FromQueryResult, Statement};
use thiserror::Error;

use crate::config::{LegacySettings, OrdersDescriptor};
use crate::utils::text::quote_ident;

/// Legacy column names of the people table.
pub mod person_columns {
    pub const ID: &str = "id";
    pub const FIO: &str = "ФИО";
    pub const GENDER: &str = "Пол";
    pub const ADDRESS: &str = "Адрес";
    pub const AGE: &str = "Возраст";
    pub const BIRTH_DATE: &str = "Дата_рождения";
    pub const PHONE: &str = "Номер_телефона";
    pub const EMAIL: &str = "Почта";
    pub const NOTES: &str = "Примечания";

    pub const ALL: [&str; 9] = [
        ID, FIO, GENDER, ADDRESS, AGE, BIRTH_DATE, PHONE, EMAIL, NOTES,
    ];
}

/// Substrings marking the orders column that refers to a client.
pub const CLIENT_MARKERS: &[&str] = &["client", "customer", "клиент", "заказчик", "покупател"];

/// Substrings marking an identifier-like column name.
const IDENTIFIER_MARKERS: &[&str] = &["id", "номер", "num", "code", "код"];

const SUPPORTED_ORDERS_VERSIONS: &[u32] = &[1];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table {0} not found or has no columns")]
    TableMissing(String),

    #[error("table {table}: column {column} not found")]
    ColumnMissing { table: String, column: String },

    #[error("table {0}: no client reference column (no column name contains any of {markers:?})", markers = CLIENT_MARKERS)]
    NoClientColumn(String),

    #[error("table {0}: cannot determine the primary key column")]
    NoPrimaryKey(String),

    #[error("unsupported orders schema_version {0}")]
    UnsupportedVersion(u32),

    #[error("catalog query failed: {0}")]
    Catalog(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct CatalogColumn {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
    pub ordinal_position: i32,
}

impl CatalogColumn {
    /// NOT NULL without a default: an insert has to supply a value.
    pub fn requires_value(&self) -> bool {
        !self.is_nullable && self.column_default.is_none()
    }

    /// Type name usable in `CAST(.. AS <type>)`; `None` for types the
    /// catalog reports only generically.
    pub fn cast_type(&self) -> Option<&str> {
        match self.data_type.as_str() {
            "USER-DEFINED" | "ARRAY" => None,
            other => Some(other),
        }
    }
}

/// How a new order row gets the value of its insert key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// No column needs a synthesized value; the database fills the key
    Database,
    /// Largest existing numeric value plus one
    NextNumber,
    /// Not identifier-like; an empty string is written
    EmptyText,
}

/// The people table, validated against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeopleTable {
    pub schema: String,
    pub name: String,
}

impl PeopleTable {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }

    /// Check the live columns carry every legacy column this service uses.
    pub fn validate(&self, columns: &[CatalogColumn]) -> Result<(), SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::TableMissing(self.name.clone()));
        }
        for expected in person_columns::ALL {
            if !columns.iter().any(|c| c.column_name == expected) {
                return Err(SchemaError::ColumnMissing {
                    table: self.name.clone(),
                    column: expected.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Resolved shape of the orders table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdersSchema {
    pub schema_version: u32,
    pub schema: String,
    pub table: String,
    pub columns: Vec<CatalogColumn>,
    pub client_column: String,
    /// Column addressing a row for edit and delete
    pub primary_key: String,
    /// Required column a new row gets a synthesized value for
    pub insert_key: Option<String>,
    pub key_strategy: KeyStrategy,
    /// Editable columns, in descriptor order
    pub business_columns: Vec<String>,
}

impl OrdersSchema {
    /// Resolve `descriptor` against the live `columns` of the table.
    /// `constraint_pk` is the PRIMARY KEY constraint column, if the table has one.
    pub fn resolve(
        descriptor: &OrdersDescriptor,
        schema: &str,
        columns: Vec<CatalogColumn>,
        constraint_pk: Option<String>,
    ) -> Result<Self, SchemaError> {
        if !SUPPORTED_ORDERS_VERSIONS.contains(&descriptor.schema_version) {
            return Err(SchemaError::UnsupportedVersion(descriptor.schema_version));
        }
        let table = descriptor.table.clone();
        if columns.is_empty() {
            return Err(SchemaError::TableMissing(table));
        }

        let has = |name: &str| columns.iter().any(|c| c.column_name == name);
        let missing = |name: &str| SchemaError::ColumnMissing {
            table: table.clone(),
            column: name.to_string(),
        };

        let client_column = match &descriptor.client_column {
            Some(name) if has(name) => name.clone(),
            Some(name) => return Err(missing(name)),
            None => find_client_column(&columns)
                .ok_or_else(|| SchemaError::NoClientColumn(table.clone()))?,
        };

        let primary_key = match &descriptor.primary_key {
            Some(name) if has(name) => name.clone(),
            Some(name) => return Err(missing(name)),
            None => constraint_pk
                .filter(|name| has(name))
                .or_else(|| {
                    columns
                        .iter()
                        .find(|c| c.requires_value())
                        .map(|c| c.column_name.clone())
                })
                .ok_or_else(|| SchemaError::NoPrimaryKey(table.clone()))?,
        };

        let insert_key = find_insert_key(
            &columns,
            &primary_key,
            &client_column,
            &descriptor.business_columns,
        );
        let key_strategy = match &insert_key {
            None => KeyStrategy::Database,
            Some(name) if looks_like_identifier(name) => KeyStrategy::NextNumber,
            Some(_) => KeyStrategy::EmptyText,
        };

        let mut business_columns = Vec::new();
        for name in &descriptor.business_columns {
            if *name == client_column
                || *name == primary_key
                || insert_key.as_deref() == Some(name.as_str())
            {
                continue;
            }
            if has(name) {
                business_columns.push(name.clone());
            } else {
                log::warn!(
                    "Orders table {}: configured business column {} does not exist, skipping",
                    table,
                    name
                );
            }
        }
        if business_columns.is_empty() {
            log::warn!("Orders table {}: no editable business columns", table);
        }

        Ok(Self {
            schema_version: descriptor.schema_version,
            schema: schema.to_string(),
            table,
            columns,
            client_column,
            primary_key,
            insert_key,
            key_strategy,
            business_columns,
        })
    }

    pub fn qualified_table(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    pub fn column(&self, name: &str) -> Option<&CatalogColumn> {
        self.columns.iter().find(|c| c.column_name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.column_name.as_str())
    }
}

fn find_client_column(columns: &[CatalogColumn]) -> Option<String> {
    let mut ordered: Vec<&CatalogColumn> = columns.iter().collect();
    ordered.sort_by_key(|c| c.ordinal_position);
    ordered
        .into_iter()
        .find(|c| {
            let lower = c.column_name.to_lowercase();
            CLIENT_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(|c| c.column_name.clone())
}

/// The addressing key when an insert must supply it. Otherwise the first
/// NOT NULL column without a default that the form does not fill, preferring
/// identifier-like names.
fn find_insert_key(
    columns: &[CatalogColumn],
    primary_key: &str,
    client_column: &str,
    business_columns: &[String],
) -> Option<String> {
    if columns
        .iter()
        .any(|c| c.column_name == primary_key && c.requires_value())
    {
        return Some(primary_key.to_string());
    }
    let mut required: Vec<&CatalogColumn> = columns
        .iter()
        .filter(|c| c.requires_value())
        .filter(|c| c.column_name != client_column)
        .filter(|c| !business_columns.contains(&c.column_name))
        .collect();
    required.sort_by_key(|c| c.ordinal_position);
    required
        .iter()
        .find(|c| looks_like_identifier(&c.column_name))
        .or_else(|| required.first())
        .map(|c| c.column_name.clone())
}

fn looks_like_identifier(name: &str) -> bool {
    let lower = name.to_lowercase();
    IDENTIFIER_MARKERS.iter().any(|m| lower.contains(m))
}

pub async fn fetch_columns<C: ConnectionTrait>(
    db: &C,
    schema: &str,
    table: &str,
) -> Result<Vec<CatalogColumn>, DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            (is_nullable = 'YES') AS is_nullable,
            column_default::text AS column_default,
            ordinal_position::int4 AS ordinal_position
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2
        ORDER BY ordinal_position"#,
        [schema.into(), table.into()],
    );
    CatalogColumn::find_by_statement(stmt).all(db).await
}

#[derive(Debug, FromQueryResult)]
struct KeyColumn {
    column_name: String,
}

pub async fn fetch_primary_key<C: ConnectionTrait>(
    db: &C,
    schema: &str,
    table: &str,
) -> Result<Option<String>, DbErr> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"SELECT kcu.column_name::text AS column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
          ON tc.constraint_name = kcu.constraint_name
         AND tc.table_schema = kcu.table_schema
         AND tc.table_name = kcu.table_name
        WHERE tc.constraint_type = 'PRIMARY KEY'
          AND tc.table_schema = $1
          AND tc.table_name = $2
        ORDER BY kcu.ordinal_position
        LIMIT 1"#,
        [schema.into(), table.into()],
    );
    Ok(KeyColumn::find_by_statement(stmt)
        .one(db)
        .await?
        .map(|k| k.column_name))
}

pub async fn load_people_table<C: ConnectionTrait>(
    db: &C,
    legacy: &LegacySettings,
) -> Result<PeopleTable, SchemaError> {
    let table = PeopleTable::new(legacy.schema.clone(), legacy.people_table.clone());
    let columns = fetch_columns(db, &table.schema, &table.name).await?;
    table.validate(&columns)?;
    log::info!("People table {} validated ({} columns)", table.name, columns.len());
    Ok(table)
}

pub async fn load_orders_schema<C: ConnectionTrait>(
    db: &C,
    legacy: &LegacySettings,
) -> Result<OrdersSchema, SchemaError> {
    let descriptor = &legacy.orders;
    let columns = fetch_columns(db, &legacy.schema, &descriptor.table).await?;
    let constraint_pk = if descriptor.primary_key.is_none() {
        fetch_primary_key(db, &legacy.schema, &descriptor.table).await?
    } else {
        None
    };
    let schema = OrdersSchema::resolve(descriptor, &legacy.schema, columns, constraint_pk)?;
    log::info!(
        "Orders table {} (v{}): client column {}, key {}, insert key {:?} ({:?}), {} business columns",
        schema.table,
        schema.schema_version,
        schema.client_column,
        schema.primary_key,
        schema.insert_key,
        schema.key_strategy,
        schema.business_columns.len()
    );
    Ok(schema)
}
