//! Connection setup shared by the server and `crm-admin`.

use std::time::Duration;

use anyhow::Context;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityName, EntityTrait, Schema};
use tokio::time::sleep;

use crate::config::DatabaseSettings;

/// Connect, retrying while the database is still starting.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .sqlx_logging(false);

    let attempts = settings.connect_attempts.max(1);
    let mut attempt = 1;
    loop {
        match Database::connect(options.clone()).await {
            Ok(conn) => {
                log::info!("Connected to database (attempt {})", attempt);
                return Ok(conn);
            }
            Err(e) if attempt < attempts => {
                log::warn!("Database not ready ({}/{}): {}", attempt, attempts, e);
                attempt += 1;
                sleep(Duration::from_secs(settings.connect_retry_secs)).await;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("database unreachable after {} attempts", attempts))
            }
        }
    }
}

/// `CREATE TABLE IF NOT EXISTS` for an entity this service owns.
pub async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> anyhow::Result<()> {
    let name = entity.table_name().to_string();
    let builder = db.get_database_backend();
    let mut stmt = Schema::new(builder).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(builder.build(&stmt))
        .await
        .with_context(|| format!("creating table {}", name))?;
    Ok(())
}
