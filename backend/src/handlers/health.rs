use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

/// Liveness check. Reports 503 when the pool cannot reach the database.
pub async fn healthz(state: web::Data<AppState>) -> HttpResponse {
    match state.db.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "ok", "database": "up" })),
        Err(e) => {
            log::warn!("Health check: database unreachable: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded", "database": "down" }))
        }
    }
}
