mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use sea_orm::{DatabaseBackend, MockDatabase};

use common::*;
use crm_backend::auth::SESSION_COOKIE_NAME;
use crm_backend::models::{user, Role};
use crm_backend::routes::configure_routes;

#[actix_web::test]
async fn valid_login_grants_access_to_clients() {
    let mut admin = account(1, "admin", Role::Admin);
    admin.password = bcrypt::hash("12345", 4).unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![admin]])
        .append_query_results([vec![person_row(1, "Иван Петров", "+79001234567")]])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "admin"), ("password", "12345")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/clients/"));
    let session = response_cookie(&resp, SESSION_COOKIE_NAME).expect("session cookie");
    assert_eq!(session.http_only(), Some(true));

    let req = test::TestRequest::get().uri("/clients/").cookie(session).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Иван Петров"));
    assert!(body.contains("admin (admin)"));
}

#[actix_web::test]
async fn invalid_login_reshows_form_without_session() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = test::init_service(App::new().app_data(state(db)).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "ghost"), ("password", "nope")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(response_cookie(&resp, SESSION_COOKIE_NAME).is_none());
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Неверные данные"));
    assert!(body.contains("name=\"password\""));
}

#[actix_web::test]
async fn wrong_password_is_rejected() {
    let mut admin = account(1, "admin", Role::Admin);
    admin.password = bcrypt::hash("12345", 4).unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![admin]])
        .into_connection();
    let app = test::init_service(App::new().app_data(state(db)).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "admin"), ("password", "54321")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(response_cookie(&resp, SESSION_COOKIE_NAME).is_none());
}

#[actix_web::test]
async fn protected_pages_redirect_to_login() {
    let state = state(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    for uri in ["/clients/", "/documents", "/clients/1/orders", "/change-password"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&resp).as_deref(), Some("/login"));
        assert_eq!(flash_messages(&resp), vec!["Войдите в систему".to_string()]);
    }
    assert!(executed_sql(&state).is_empty());
}

#[actix_web::test]
async fn logout_clears_session() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = test::init_service(App::new().app_data(state(db)).configure(configure_routes)).await;

    let session = session_for(&account(1, "admin", Role::Admin));
    let req = test::TestRequest::get().uri("/logout").cookie(session).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp).as_deref(), Some("/login"));
    let cleared = response_cookie(&resp, SESSION_COOKIE_NAME).expect("removal cookie");
    assert_eq!(cleared.value(), "");
}

#[actix_web::test]
async fn change_password_validation() {
    let mut admin = account(1, "admin", Role::Admin);
    admin.password = bcrypt::hash("12345", 4).unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![admin.clone()], vec![admin.clone()]])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let cases: [(&[(&str, &str)], &str); 3] = [
        (&[("current_password", "12345"), ("new_password", "abc")], "Заполните все поля"),
        (
            &[("old_password", "wrong"), ("new_password", "abc"), ("confirm_password", "abc")],
            "Неверный текущий пароль",
        ),
        (
            &[("current_password", "12345"), ("new_password", "abc"), ("new_password2", "abd")],
            "Пароли не совпадают",
        ),
    ];
    for (form, expected) in cases {
        let req = test::TestRequest::post()
            .uri("/change-password")
            .cookie(session_for(&admin))
            .set_form(form)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains(expected), "expected {}", expected);
    }
    assert!(executed_sql(&state).iter().all(|sql| !sql.contains("UPDATE")));
}

/// The bcrypt hash bound into the logged UPDATE.
fn stored_hash(sql: &str) -> &str {
    let start = sql.find("$2b$").expect("hash in UPDATE");
    &sql[start..start + 60]
}

#[actix_web::test]
async fn change_password_stores_new_hash_as_typed() {
    let mut admin = account(1, "admin", Role::Admin);
    admin.password = bcrypt::hash("12345", 4).unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![admin.clone()], vec![admin.clone()]])
        .into_connection();
    let state = state(db);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/change-password")
        .cookie(session_for(&admin))
        .set_form([
            ("current_password", "12345"),
            ("new_password", " new pass "),
            ("new_password2", " new pass "),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/clients/"));
    assert_eq!(flash_messages(&resp), vec!["Пароль изменён".to_string()]);

    let sql = executed_sql(&state);
    let update = sql.iter().find(|s| s.contains("UPDATE \\\"user\\\"")).expect("UPDATE of user");
    let hash = stored_hash(update);
    // surrounding spaces are part of the password
    assert!(bcrypt::verify(" new pass ", hash).unwrap());
    assert!(!bcrypt::verify("new pass", hash).unwrap());
}
