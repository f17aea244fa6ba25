use actix_cors::Cors;
use actix_web::{http, web};

use crate::handlers::{self, auth, clients, documents, health, import, orders};

/// Same-origin only unless `allowed_origins` names other sites. Cookies are
/// sent along, so wildcards are not accepted.
pub fn cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec![http::Method::GET, http::Method::POST])
        .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::ACCEPT])
        .supports_credentials()
        .max_age(3600);
    for origin in allowed_origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}

/// `/clients/create` and `/clients/import` must precede `/clients/{key}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/healthz", web::get().to(health::healthz))
        .service(
            web::resource("/login")
                .route(web::get().to(auth::login_form))
                .route(web::post().to(auth::login)),
        )
        .route("/logout", web::get().to(auth::logout))
        .service(
            web::resource("/change-password")
                .route(web::get().to(auth::change_password_form))
                .route(web::post().to(auth::change_password)),
        )
        .route("/documents", web::get().to(documents::list))
        .route("/documents/", web::get().to(documents::list))
        .service(
            web::resource("/documents/create")
                .route(web::get().to(documents::create_form))
                .route(web::post().to(documents::create)),
        )
        .service(
            web::resource("/documents/{id}/edit")
                .route(web::get().to(documents::edit_form))
                .route(web::post().to(documents::edit)),
        )
        .route("/documents/{id}/delete", web::post().to(documents::delete))
        .route("/clients/", web::get().to(clients::list))
        .service(
            web::resource("/clients/create")
                .route(web::get().to(clients::create_form))
                .route(web::post().to(clients::create)),
        )
        .route("/clients/import", web::post().to(import::import))
        .route("/clients/{key}", web::get().to(clients::view))
        .service(
            web::resource("/clients/{key}/edit")
                .route(web::get().to(clients::edit_form))
                .route(web::post().to(clients::edit)),
        )
        .route("/clients/{key}/delete", web::post().to(clients::delete))
        .route("/clients/{key}/orders", web::get().to(orders::list))
        .service(
            web::resource("/clients/{key}/orders/create")
                .route(web::get().to(orders::create_form))
                .route(web::post().to(orders::create)),
        )
        .service(
            web::resource("/clients/{key}/orders/{pk}/edit")
                .route(web::get().to(orders::edit_form))
                .route(web::post().to(orders::edit)),
        )
        .route("/clients/{key}/orders/{pk}/delete", web::post().to(orders::delete));
}
