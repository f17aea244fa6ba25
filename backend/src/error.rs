//! Request-level error type.

use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use thiserror::Error;

use crate::flash::{self, Flash};
use crate::views;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("session error: {0}")]
    Session(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("{0}")]
    Internal(String),
}

pub type CrmResult<T> = Result<T, CrmError>;

impl ResponseError for CrmError {
    fn status_code(&self) -> StatusCode {
        match self {
            CrmError::Unauthenticated => StatusCode::SEE_OTHER,
            CrmError::NotFound(_) => StatusCode::NOT_FOUND,
            CrmError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CrmError::Database(_)
            | CrmError::Session(_)
            | CrmError::Hashing(_)
            | CrmError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            CrmError::Unauthenticated => {
                flash::redirect_with("/login", &[Flash::warning("Войдите в систему")])
            }
            CrmError::NotFound(what) => HttpResponse::NotFound()
                .content_type(ContentType::html())
                .body(views::error_page(404, &format!("{} не найден", what))),
            CrmError::BadRequest(reason) => HttpResponse::BadRequest()
                .content_type(ContentType::html())
                .body(views::error_page(400, reason)),
            other => {
                log::error!("Request failed: {}", other);
                HttpResponse::InternalServerError()
                    .content_type(ContentType::html())
                    .body(views::error_page(500, "Внутренняя ошибка сервера"))
            }
        }
    }
}
