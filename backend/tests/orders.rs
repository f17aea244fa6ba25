mod common;

use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, Value};

use common::*;
use crm_backend::config::OrdersDescriptor;
use crm_backend::legacy::schema::{KeyStrategy, OrdersSchema};
use crm_backend::models::Role;
use crm_backend::routes::configure_routes;

fn order_row(number: &str, product: &str) -> MockRow {
    BTreeMap::from([
        ("Номер_заказа", Value::from(number)),
        ("Клиент", Value::from("+79001234567")),
        ("Товар", Value::from(product)),
        ("Сумма", Value::from(Option::<String>::None)),
    ])
}

fn affected(rows: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: rows,
    }
}

fn ivan() -> MockRow {
    person_row(1, "Иван Петров", "+79001234567")
}

#[actix_web::test]
async fn orders_are_listed_with_ordinals() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![person_row(1, "Иван Петров", "+79001234567")]])
        .append_query_results([vec![order_row("10", "Ноутбук"), order_row("12", "Мышь")]])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::get()
        .uri("/clients/1/orders")
        .cookie(session_for(&account(1, "admin", Role::Admin)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Ноутбук"));
    assert!(body.contains("<tr><td>2</td>"));
    assert!(body.contains("/clients/1/orders/12/edit"));

    let sql = executed_sql(&state);
    assert!(sql[1].contains(" OR "));
}

#[actix_web::test]
async fn deleting_missing_order_reports_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![person_row(1, "Иван Петров", "+79001234567")]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/clients/1/orders/404/delete")
        .cookie(session_for(&account(1, "admin", Role::Admin)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp).as_deref(), Some("/clients/1/orders"));
    assert_eq!(flash_messages(&resp), vec!["Заказ не найден".to_string()]);

    // an order number of another client matches nothing
    let sql = executed_sql(&state);
    assert!(sql[1].contains(r#"DELETE FROM \"public\".\"order2\" WHERE \"Номер_заказа\"::text = $1 AND (\"Клиент\"::text = $2"#));
}

#[actix_web::test]
async fn failed_order_query_is_a_warning() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![person_row(1, "Иван Петров", "+79001234567")]])
        .append_query_errors([sea_orm::DbErr::Custom("column does not exist".into())])
        .into_connection();
    let app = test::init_service(App::new().app_data(state(db)).configure(configure_routes)).await;

    let req = test::TestRequest::get()
        .uri("/clients/1/orders")
        .cookie(session_for(&account(1, "admin", Role::Admin)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Не удалось загрузить заказы"));
}

#[actix_web::test]
async fn new_order_gets_next_number() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![ivan()]])
        .append_query_results([vec![BTreeMap::from([("next_number", Value::from(13i64))])]])
        .append_exec_results([affected(1)])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/clients/1/orders/create")
        .cookie(session_for(&account(1, "admin", Role::Admin)))
        .set_form([("Товар", "Ноутбук"), ("Сумма", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp).as_deref(), Some("/clients/1/orders"));
    assert_eq!(flash_messages(&resp), vec!["Заказ добавлен".to_string()]);

    let sql = executed_sql(&state);
    assert_eq!(sql.len(), 2);
    let txn = &sql[1];
    assert!(txn.contains("AS next_number"));
    assert!(txn.contains(r#"INSERT INTO \"public\".\"order2\" (\"Номер_заказа\", \"Клиент\", \"Товар\")"#));
    assert!(txn.contains(r#"String(Some("13"))"#));
    assert!(txn.contains(r#"String(Some("+79001234567"))"#));
    assert!(txn.contains("COMMIT"));
}

#[actix_web::test]
async fn non_identifier_required_column_gets_empty_text() {
    let columns = vec![
        column("Описание", "text", false, 1),
        column("Клиент", "text", true, 2),
        column("Товар", "text", true, 3),
    ];
    let orders = OrdersSchema::resolve(&OrdersDescriptor::default(), "public", columns, None).unwrap();
    assert_eq!(orders.key_strategy, KeyStrategy::EmptyText);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![ivan()]])
        .append_exec_results([affected(1)])
        .into_connection();
    let state = state_with_orders(db, orders);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/clients/1/orders/create")
        .cookie(session_for(&account(1, "admin", Role::Admin)))
        .set_form([("Товар", "Стол")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(flash_messages(&resp), vec!["Заказ добавлен".to_string()]);

    let sql = executed_sql(&state);
    assert!(!sql[1].contains("next_number"));
    assert!(sql[1].contains(r#"(\"Описание\", \"Клиент\", \"Товар\")"#));
    assert!(sql[1].contains(r#"String(Some(""))"#));
}

#[actix_web::test]
async fn failed_order_insert_is_rolled_back() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![ivan()]])
        .append_query_results([vec![BTreeMap::from([("next_number", Value::from(1i64))])]])
        .append_exec_errors([DbErr::Custom("invalid input syntax for type numeric".into())])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/clients/1/orders/create")
        .cookie(session_for(&account(1, "admin", Role::Admin)))
        .set_form([("Товар", "Ноутбук"), ("Сумма", "много")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp).as_deref(), Some("/clients/1/orders"));
    let messages = flash_messages(&resp);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Ошибка: "));
    assert!(messages[0].contains("invalid input syntax for type numeric"));

    let sql = executed_sql(&state);
    assert!(sql[1].contains("ROLLBACK") && !sql[1].contains("COMMIT"));
}

#[actix_web::test]
async fn edit_form_shows_own_order_only() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![ivan()]])
        .append_query_results([vec![order_row("10", "Ноутбук")]])
        .append_query_results([vec![ivan()]])
        .append_query_results([Vec::<MockRow>::new()])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let session = session_for(&account(1, "admin", Role::Admin));

    let req = test::TestRequest::get()
        .uri("/clients/1/orders/10/edit")
        .cookie(session.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("value=\"Ноутбук\""));
    assert!(body.contains("/clients/1/orders/10/edit"));

    // order 11 belongs to someone else
    let req = test::TestRequest::get()
        .uri("/clients/1/orders/11/edit")
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp).as_deref(), Some("/clients/1/orders"));
    assert_eq!(flash_messages(&resp), vec!["Заказ не найден".to_string()]);

    let sql = executed_sql(&state);
    assert!(sql[3].contains(r#"WHERE \"Номер_заказа\"::text = $1 AND ("#));
}

#[actix_web::test]
async fn edit_updates_business_columns_in_scope() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![ivan()], vec![ivan()]])
        .append_exec_results([affected(1), affected(0)])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let session = session_for(&account(1, "admin", Role::Admin));

    let req = test::TestRequest::post()
        .uri("/clients/1/orders/10/edit")
        .cookie(session.clone())
        .set_form([("Товар", "Ноутбук Pro"), ("Сумма", "99000")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp).as_deref(), Some("/clients/1/orders"));
    assert_eq!(flash_messages(&resp), vec!["Заказ обновлён".to_string()]);

    let req = test::TestRequest::post()
        .uri("/clients/1/orders/11/edit")
        .cookie(session)
        .set_form([("Товар", "Чужой")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(flash_messages(&resp), vec!["Заказ не найден".to_string()]);

    let sql = executed_sql(&state);
    let update = &sql[1];
    assert!(update.contains(r#"UPDATE \"public\".\"order2\" SET \"Товар\" = CAST($1 AS character varying), \"Сумма\" = CAST($2 AS numeric)"#));
    assert!(update.contains(r#"WHERE \"Номер_заказа\"::text = $3 AND (\"Клиент\"::text = $4"#));
    assert!(update.contains(r#"String(Some("Ноутбук Pro"))"#));
    assert!(update.contains("COMMIT"));
}
