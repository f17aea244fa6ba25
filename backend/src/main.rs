use std::env;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::Context;

use crm_backend::auth::bootstrap::ensure_admin;
use crm_backend::config::AppConfig;
use crm_backend::db::{connect, create_table};
use crm_backend::legacy::schema::{load_orders_schema, load_people_table};
use crm_backend::logging::init_logging;
use crm_backend::models::{document, user};
use crm_backend::routes::{configure_routes, cors};
use crm_backend::state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = env::var("CRM_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = AppConfig::load(&config_path).with_context(|| format!("loading {}", config_path))?;
    init_logging(&config.logging.level, &config.logging.format)?;

    let db = connect(&config.database).await?;
    create_table(&db, user::Entity).await?;
    create_table(&db, document::Entity).await?;
    if ensure_admin(&db, &config.auth).await? {
        log::warn!("Bootstrap admin created; change its password after first login");
    }

    let people = load_people_table(&db, &config.legacy)
        .await
        .context("validating the people table")?;
    let orders = load_orders_schema(&db, &config.legacy)
        .await
        .context("resolving the orders schema")?;

    let state = web::Data::new(AppState::new(db, &config, people, orders));

    log::info!("Listening on {}:{}", config.server.host, config.server.port);
    let origins = config.server.cors_allowed_origins.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(&origins))
            .app_data(state.clone())
            .app_data(web::FormConfig::default().limit(256 * 1024))
            .configure(configure_routes)
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }
    server
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await?;
    Ok(())
}
