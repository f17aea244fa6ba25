#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::web;
use sea_orm::{DatabaseConnection, Value};

use crm_backend::auth::session::{issue_token, SESSION_COOKIE_NAME};
use crm_backend::config::{AppConfig, AuthSettings, OrdersDescriptor};
use crm_backend::flash::{self, FLASH_COOKIE_NAME};
use crm_backend::legacy::schema::{CatalogColumn, OrdersSchema, PeopleTable};
use crm_backend::models::{user, Role};
use crm_backend::state::AppState;

pub type MockRow = BTreeMap<&'static str, Value>;

pub fn column(name: &str, data_type: &str, nullable: bool, pos: i32) -> CatalogColumn {
    CatalogColumn {
        column_name: name.to_string(),
        data_type: data_type.to_string(),
        is_nullable: nullable,
        column_default: None,
        ordinal_position: pos,
    }
}

pub fn orders_schema() -> OrdersSchema {
    let columns = vec![
        column("Номер_заказа", "integer", false, 1),
        column("Клиент", "character varying", true, 2),
        column("Товар", "character varying", true, 3),
        column("Сумма", "numeric", true, 4),
    ];
    OrdersSchema::resolve(&OrdersDescriptor::default(), "public", columns, None)
        .expect("test orders schema resolves")
}

pub fn config() -> AppConfig {
    AppConfig {
        auth: AuthSettings {
            secret_key: "integration-secret".into(),
            bcrypt_cost: 4,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn state(db: DatabaseConnection) -> web::Data<AppState> {
    state_with_orders(db, orders_schema())
}

pub fn state_with_orders(db: DatabaseConnection, orders: OrdersSchema) -> web::Data<AppState> {
    web::Data::new(AppState::new(
        db,
        &config(),
        PeopleTable::new("public", "practic2"),
        orders,
    ))
}

pub fn account(id: i32, username: &str, role: Role) -> user::Model {
    user::Model {
        id,
        username: username.to_string(),
        password: String::new(),
        role,
    }
}

/// A valid session cookie for `account`.
pub fn session_for(account: &user::Model) -> Cookie<'static> {
    let token = issue_token(account, &config().auth).expect("token");
    Cookie::new(SESSION_COOKIE_NAME, token)
}

pub fn person_row(id: i32, fio: &str, phone: &str) -> MockRow {
    let none = || Value::from(Option::<String>::None);
    BTreeMap::from([
        ("id", Value::from(id)),
        ("fio", Value::from(fio)),
        ("gender", none()),
        ("address", none()),
        ("age", none()),
        ("birth_date", none()),
        ("phone", Value::from(phone)),
        ("email", none()),
        ("notes", none()),
    ])
}

pub fn location<B>(resp: &ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn response_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.into_owned())
}

/// Flash messages queued by a redirect.
pub fn flash_messages<B>(resp: &ServiceResponse<B>) -> Vec<String> {
    response_cookie(resp, FLASH_COOKIE_NAME)
        .map(|c| flash::decode(c.value()))
        .unwrap_or_default()
        .into_iter()
        .map(|f| f.message)
        .collect()
}

/// Every statement (or transaction) the mock connection saw since the last
/// call, in order. A mock `DatabaseConnection` is not `Clone`, so a second
/// handle onto the same mocker is built from the shared `Arc` and drained.
pub fn executed_sql(state: &web::Data<AppState>) -> Vec<String> {
    let handle = match &state.db {
        DatabaseConnection::MockDatabaseConnection(mock) => {
            DatabaseConnection::MockDatabaseConnection(Arc::clone(mock))
        }
        _ => panic!("executed_sql needs a MockDatabase connection"),
    };
    handle
        .into_transaction_log()
        .iter()
        .map(|t| format!("{:?}", t))
        .collect()
}

pub const BOUNDARY: &str = "----crm-test-boundary";

pub fn multipart_file(filename: &str, content: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        c = content
    )
    .into_bytes()
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
