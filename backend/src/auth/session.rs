// Session cookie handling
//
// The session is a signed HS256 JWT kept in an HttpOnly cookie. Handlers
// that need a logged-in staff member take a `CurrentUser` argument.

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::config::AuthSettings;
use crate::error::{CrmError, CrmResult};
use crate::models::{user, Role};
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "crm_session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// user id
    pub sub: i32,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated staff member of the current request.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

pub fn issue_token(user: &user::Model, settings: &AuthSettings) -> CrmResult<String> {
    let now = Utc::now();
    let claims = SessionClaims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(settings.session_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret_key.as_bytes()),
    )
    .map_err(|e| CrmError::Session(e.to_string()))
}

pub fn decode_token(token: &str, settings: &AuthSettings) -> CrmResult<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(settings.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| CrmError::Session(e.to_string()))
}

pub fn session_cookie<'a>(token: String, settings: &AuthSettings) -> Cookie<'a> {
    Cookie::build(SESSION_COOKIE_NAME, token)
        .path("/")
        .http_only(true)
        .secure(settings.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(settings.session_hours))
        .finish()
}

pub fn logout_cookie<'a>(settings: &AuthSettings) -> Cookie<'a> {
    let mut cookie = Cookie::build(SESSION_COOKIE_NAME, "")
        .path("/")
        .http_only(true)
        .secure(settings.cookie_secure)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}

/// Resolve the session of `req`, if any.
pub fn current_user(req: &HttpRequest) -> Option<CurrentUser> {
    let state = req.app_data::<web::Data<AppState>>()?;
    let cookie = req.cookie(SESSION_COOKIE_NAME)?;
    match decode_token(cookie.value(), &state.auth) {
        Ok(claims) => Some(claims.into()),
        Err(e) => {
            log::debug!("Ignoring invalid session cookie: {}", e);
            None
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = CrmError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(current_user(req).ok_or(CrmError::Unauthenticated))
    }
}
