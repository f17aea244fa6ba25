//! Service configuration.
//!
//! Values come from an optional `config.toml`, then environment variables
//! (`.env` is honoured) override the file.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub import: ImportSettings,
    #[serde(default)]
    pub legacy: LegacySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 0 lets actix pick one worker per core
    #[serde(default)]
    pub workers: usize,
    /// Origins allowed to make cross-origin requests; empty allows none
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_connect_retry_secs")]
    pub connect_retry_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_attempts: default_connect_attempts(),
            connect_retry_secs: default_connect_retry_secs(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret for session tokens
    #[serde(default = "default_secret")]
    pub secret_key: String,
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,
    /// Set the Secure flag on cookies (enable behind TLS)
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Password for the `admin` account created on first start
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: default_secret(),
            session_hours: default_session_hours(),
            cookie_secure: false,
            bcrypt_cost: default_bcrypt_cost(),
            admin_password: default_admin_password(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Uploads with more data rows than this are rejected whole
    #[serde(default = "default_import_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_import_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_rows: default_import_max_rows(),
            max_upload_bytes: default_import_max_upload_bytes(),
        }
    }
}

/// Legacy tables that predate this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySettings {
    #[serde(default = "default_legacy_schema")]
    pub schema: String,
    #[serde(default = "default_people_table")]
    pub people_table: String,
    #[serde(default)]
    pub orders: OrdersDescriptor,
}

impl Default for LegacySettings {
    fn default() -> Self {
        Self {
            schema: default_legacy_schema(),
            people_table: default_people_table(),
            orders: OrdersDescriptor::default(),
        }
    }
}

/// Declared shape of the orders table, checked against the catalog at startup.
///
/// `client_column` and `primary_key` may be left out, in which case they are
/// derived from the catalog once during startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersDescriptor {
    #[serde(default = "default_orders_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_orders_table")]
    pub table: String,
    #[serde(default)]
    pub client_column: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Editable columns exposed in the order form
    #[serde(default = "default_business_columns")]
    pub business_columns: Vec<String>,
}

impl Default for OrdersDescriptor {
    fn default() -> Self {
        Self {
            schema_version: default_orders_schema_version(),
            table: default_orders_table(),
            client_column: None,
            primary_key: None,
            business_columns: default_business_columns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` when it exists, then apply environment
    /// overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(secret) = env::var("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Ok(password) = env::var("CRM_ADMIN_PASSWORD") {
            self.auth.admin_password = password;
        }
        if let Ok(host) = env::var("CRM_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("CRM_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "CRM_PORT",
                value: port.clone(),
            })?;
        }
        if let Ok(level) = env::var("CRM_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Missing("database.url / DATABASE_URL"));
        }
        if self.auth.secret_key.is_empty() {
            return Err(ConfigError::Missing("auth.secret_key / SECRET_KEY"));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_connect_retry_secs() -> u64 {
    3
}

fn default_max_connections() -> u32 {
    10
}

fn default_secret() -> String {
    "super-secret-2025".to_string()
}

fn default_session_hours() -> i64 {
    12
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_admin_password() -> String {
    "12345".to_string()
}

fn default_import_max_rows() -> usize {
    2000
}

fn default_import_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_legacy_schema() -> String {
    "public".to_string()
}

fn default_people_table() -> String {
    "practic2".to_string()
}

fn default_orders_schema_version() -> u32 {
    1
}

fn default_orders_table() -> String {
    "order2".to_string()
}

fn default_business_columns() -> Vec<String> {
    ["Дата_заказа", "Товар", "Количество", "Сумма", "Статус", "Примечания"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}
