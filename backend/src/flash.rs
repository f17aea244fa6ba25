//! One-shot messages shown on the next rendered page.
//!
//! Messages travel in a cookie holding base64 (URL-safe) encoded JSON, so
//! non-ASCII text survives cookie value restrictions.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE_NAME: &str = "crm_flash";

/// Cookies are limited to ~4KB; long database errors get cut.
const MAX_MESSAGE_CHARS: usize = 400;
const MAX_MESSAGES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        let mut message: String = message.into();
        if message.chars().count() > MAX_MESSAGE_CHARS {
            message = message.chars().take(MAX_MESSAGE_CHARS).collect::<String>() + "…";
        }
        Self { level, message }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Danger, message)
    }
}

pub fn encode(messages: &[Flash]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cookie value. Garbage yields no messages.
pub fn decode(raw: &str) -> Vec<Flash> {
    URL_SAFE_NO_PAD
        .decode(raw.as_bytes())
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Messages queued by the previous response.
pub fn pending(req: &HttpRequest) -> Vec<Flash> {
    req.cookie(FLASH_COOKIE_NAME)
        .map(|c| decode(c.value()))
        .unwrap_or_default()
}

pub fn flash_cookie<'a>(messages: &[Flash]) -> Cookie<'a> {
    let keep = messages.len().saturating_sub(MAX_MESSAGES);
    Cookie::build(FLASH_COOKIE_NAME, encode(&messages[keep..]))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn clear_cookie<'a>() -> Cookie<'a> {
    let mut cookie = Cookie::build(FLASH_COOKIE_NAME, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}

/// 303 redirect carrying `messages` plus anything still pending.
pub fn redirect(req: &HttpRequest, location: &str, messages: Vec<Flash>) -> HttpResponse {
    let mut all = pending(req);
    all.extend(messages);
    redirect_with(location, &all)
}

/// 303 redirect carrying exactly `messages`.
pub fn redirect_with(location: &str, messages: &[Flash]) -> HttpResponse {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location.to_string()));
    if !messages.is_empty() {
        builder.cookie(flash_cookie(messages));
    }
    builder.finish()
}
