//! Access to the legacy `practic2` (people) and `order2` (orders) tables.
//!
//! Neither table is owned by this service, so both are reached through
//! parameterized SQL rather than ORM entities.

pub mod import;
pub mod orders;
pub mod people;
pub mod schema;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement, TransactionError, TransactionTrait};

/// Run one statement in its own transaction; rolled back on error.
/// Returns the number of affected rows.
pub async fn execute_in_transaction(
    db: &DatabaseConnection,
    stmt: Statement,
) -> Result<u64, TransactionError<DbErr>> {
    db.transaction::<_, u64, DbErr>(move |txn| {
        Box::pin(async move {
            let result = txn.execute(stmt).await?;
            Ok(result.rows_affected())
        })
    })
    .await
}

/// The underlying database error text, without the transaction wrapper.
pub fn error_text(err: &TransactionError<DbErr>) -> String {
    match err {
        TransactionError::Connection(e) | TransactionError::Transaction(e) => e.to_string(),
    }
}
