mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use chrono::NaiveDate;
use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

use common::*;
use crm_backend::models::{document, user, Role};
use crm_backend::routes::configure_routes;

fn owned_by(owner_id: i32) -> document::Model {
    document::Model {
        id: 5,
        full_name: "Иван Петров".into(),
        birth_date: NaiveDate::from_ymd_opt(1990, 3, 1).unwrap(),
        phone: "+79001234567".into(),
        email: None,
        address: None,
        notes: None,
        created_at: None,
        owner_id,
    }
}

fn edit_form() -> [(&'static str, &'static str); 3] {
    [
        ("full_name", "Пётр Иванов"),
        ("birth_date", "1991-04-02"),
        ("phone", "+79000000000"),
    ]
}

#[actix_web::test]
async fn non_owner_cannot_edit_or_delete() {
    let operator = account(2, "operator", Role::User);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![owned_by(1)]])
        .append_query_results([vec![operator.clone()]])
        .append_query_results([vec![owned_by(1)]])
        .append_query_results([vec![operator.clone()]])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let stranger = session_for(&operator);

    let req = test::TestRequest::post()
        .uri("/documents/5/edit")
        .cookie(stranger.clone())
        .set_form(edit_form())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/documents"));
    assert_eq!(flash_messages(&resp), vec!["Нет доступа!".to_string()]);

    let req = test::TestRequest::post()
        .uri("/documents/5/delete")
        .cookie(stranger)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(flash_messages(&resp), vec!["Нет доступа!".to_string()]);

    let sql = executed_sql(&state);
    assert_eq!(sql.len(), 4);
    assert!(sql.iter().all(|s| !s.contains("UPDATE") && !s.contains("DELETE")));
}

#[actix_web::test]
async fn admin_may_delete_any_document() {
    let admin = account(9, "admin", Role::Admin);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![owned_by(1)]])
        .append_query_results([vec![admin.clone()]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/documents/5/delete")
        .cookie(session_for(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(flash_messages(&resp), vec!["Клиент удалён".to_string()]);
    let sql = executed_sql(&state);
    let delete = sql.iter().find(|s| s.contains("DELETE")).expect("DELETE");
    assert!(delete.contains("BEGIN") && delete.contains("COMMIT"));
}

#[actix_web::test]
async fn demoted_admin_session_loses_admin_rights() {
    // the session was issued while the account was still an admin
    let session = session_for(&account(9, "former-admin", Role::Admin));
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![owned_by(1)]])
        .append_query_results([vec![account(9, "former-admin", Role::User)]])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/documents/5/delete")
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(flash_messages(&resp), vec!["Нет доступа!".to_string()]);
    assert!(executed_sql(&state).iter().all(|s| !s.contains("DELETE")));
}

#[actix_web::test]
async fn removed_account_must_log_in_again() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![owned_by(1)]])
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = test::init_service(App::new().app_data(state(db)).configure(configure_routes)).await;

    let req = test::TestRequest::get()
        .uri("/documents/5/edit")
        .cookie(session_for(&account(9, "gone", Role::Admin)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/login"));
}

#[actix_web::test]
async fn owner_edit_commits_without_role_lookup() {
    let mut updated = owned_by(2);
    updated.full_name = "Пётр Иванов".into();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![owned_by(2)], vec![updated]])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/documents/5/edit")
        .cookie(session_for(&account(2, "operator", Role::User)))
        .set_form(edit_form())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(flash_messages(&resp), vec!["Клиент обновлён!".to_string()]);

    let sql = executed_sql(&state);
    assert_eq!(sql.len(), 2);
    assert!(sql[1].contains("UPDATE") && sql[1].contains("COMMIT"));
    assert!(sql[1].contains("Пётр Иванов"));
}

#[actix_web::test]
async fn failed_insert_is_rolled_back_with_flash() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([DbErr::Custom("document_phone_check".into())])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/documents/create")
        .cookie(session_for(&account(2, "operator", Role::User)))
        .set_form(edit_form())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/documents"));
    let flashes = flash_messages(&resp);
    assert_eq!(flashes.len(), 1);
    assert!(flashes[0].starts_with("Ошибка: "));
    assert!(flashes[0].contains("document_phone_check"));

    let sql = executed_sql(&state);
    assert!(sql[0].contains("INSERT INTO") && sql[0].contains("ROLLBACK"));
}

#[actix_web::test]
async fn failed_delete_is_reported_not_500() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![owned_by(2)]])
        .append_exec_errors([DbErr::Custom("still referenced".into())])
        .into_connection();
    let app = test::init_service(App::new().app_data(state(db)).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/documents/5/delete")
        .cookie(session_for(&account(2, "operator", Role::User)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let flashes = flash_messages(&resp);
    assert!(flashes[0].starts_with("Ошибка: ") && flashes[0].contains("still referenced"));
}

#[actix_web::test]
async fn bad_date_reshows_form() {
    let state = state(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/documents/create")
        .cookie(session_for(&account(2, "operator", Role::User)))
        .set_form([
            ("full_name", "Иван Петров"),
            ("birth_date", "01.03.1990"),
            ("phone", "+79001234567"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Неверный формат даты"));
    assert!(body.contains("value=\"Иван Петров\""));
    assert!(executed_sql(&state).is_empty());
}

#[actix_web::test]
async fn unknown_document_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<document::Model>::new()])
        .into_connection();
    let app = test::init_service(App::new().app_data(state(db)).configure(configure_routes)).await;

    let req = test::TestRequest::get()
        .uri("/documents/99/edit")
        .cookie(session_for(&account(2, "operator", Role::User)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn listing_shows_age_and_hides_foreign_actions() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![owned_by(1)]])
        .into_connection();
    let app = test::init_service(App::new().app_data(state(db)).configure(configure_routes)).await;

    let req = test::TestRequest::get()
        .uri("/documents/")
        .cookie(session_for(&account(2, "operator", Role::User)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Иван Петров"));
    assert!(body.contains("1990-03-01"));
    assert!(!body.contains("/documents/5/edit"));
}
