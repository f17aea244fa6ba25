//! Server-side HTML pages.

pub mod auth;
pub mod clients;
pub mod documents;
pub mod orders;

use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};

use crate::auth::CurrentUser;
use crate::flash::{self, Flash, FLASH_COOKIE_NAME};

/// Escape text for HTML element content and attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Percent-encode a value for use inside a URL path segment.
pub fn path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

fn flash_block(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|f| {
            format!(
                "<div class=\"alert alert-{}\">{}</div>",
                f.level.as_str(),
                escape(&f.message)
            )
        })
        .collect()
}

fn nav(user: Option<&CurrentUser>) -> String {
    match user {
        Some(user) => format!(
            "<nav><a href=\"/clients/\">Клиенты</a> | <a href=\"/documents\">Документы</a> | \
             <a href=\"/change-password\">Сменить пароль</a> | \
             <span>{} ({})</span> <a href=\"/logout\">Выйти</a></nav>",
            escape(&user.username),
            user.role.as_str()
        ),
        None => "<nav><a href=\"/login\">Вход</a></nav>".to_string(),
    }
}

pub fn layout(title: &str, user: Option<&CurrentUser>, flashes: &[Flash], body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ru\">\n<head><meta charset=\"utf-8\"><title>{title} | CRM</title></head>\n\
         <body>\n{nav}\n<main>\n<h1>{title}</h1>\n{flashes}\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
        nav = nav(user),
        flashes = flash_block(flashes),
        body = body
    )
}

/// Labelled text input.
pub fn input(label: &str, name: &str, value: Option<&str>, kind: &str) -> String {
    format!(
        "<label>{label} <input type=\"{kind}\" name=\"{name}\" value=\"{value}\"></label><br>",
        label = escape(label),
        kind = kind,
        name = escape(name),
        value = escape(value.unwrap_or(""))
    )
}

pub fn textarea(label: &str, name: &str, value: Option<&str>) -> String {
    format!(
        "<label>{} <textarea name=\"{}\">{}</textarea></label><br>",
        escape(label),
        escape(name),
        escape(value.unwrap_or(""))
    )
}

/// Button posting to `action`, used for deletes.
pub fn post_button(action: &str, label: &str) -> String {
    format!(
        "<form method=\"post\" action=\"{}\" style=\"display:inline\"><button type=\"submit\">{}</button></form>",
        escape(action),
        escape(label)
    )
}

/// Render a page with pending flash messages plus `extra`, clearing the
/// flash cookie once shown.
pub fn render(
    req: &HttpRequest,
    status: StatusCode,
    extra: Vec<Flash>,
    page: impl FnOnce(&[Flash]) -> String,
) -> HttpResponse {
    let had_pending = req.cookie(FLASH_COOKIE_NAME).is_some();
    let mut flashes = flash::pending(req);
    flashes.extend(extra);

    let mut builder = HttpResponse::build(status);
    builder.content_type(ContentType::html());
    if had_pending {
        builder.cookie(flash::clear_cookie());
    }
    builder.body(page(&flashes))
}

pub fn ok(req: &HttpRequest, extra: Vec<Flash>, page: impl FnOnce(&[Flash]) -> String) -> HttpResponse {
    render(req, StatusCode::OK, extra, page)
}

pub fn error_page(status: u16, message: &str) -> String {
    layout(&format!("Ошибка {}", status), None, &[], &format!("<p>{}</p>", escape(message)))
}
