//! Request handlers, one module per page group.

pub mod auth;
pub mod clients;
pub mod documents;
pub mod health;
pub mod import;
pub mod orders;

use actix_web::cookie::Cookie;
use actix_web::{HttpRequest, HttpResponse};

use crate::error::{CrmError, CrmResult};
use crate::flash;

pub async fn index(req: HttpRequest) -> HttpResponse {
    flash::redirect(&req, "/clients/", Vec::new())
}

pub(crate) fn with_cookie(mut resp: HttpResponse, cookie: Cookie<'_>) -> CrmResult<HttpResponse> {
    resp.add_cookie(&cookie)
        .map_err(|e| CrmError::Internal(format!("cannot set cookie: {}", e)))?;
    Ok(resp)
}
