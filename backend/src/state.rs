//! Shared application state handed to every handler.

use sea_orm::DatabaseConnection;

use crate::config::{AppConfig, AuthSettings, ImportSettings};
use crate::legacy::schema::{OrdersSchema, PeopleTable};

pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    pub auth: AuthSettings,
    pub import: ImportSettings,
    pub people: PeopleTable,
    pub orders: OrdersSchema,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        config: &AppConfig,
        people: PeopleTable,
        orders: OrdersSchema,
    ) -> Self {
        Self {
            db,
            auth: config.auth.clone(),
            import: config.import.clone(),
            people,
            orders,
        }
    }
}
