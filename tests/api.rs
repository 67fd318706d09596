//! Route-level checks that are decided before any query runs. The pool never
//! connects, so these run without PostgreSQL.

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use serde_json::{json, Value};

use rfid_attendance::auth::AuthService;
use rfid_attendance::middleware::{RequestLogger, REQUEST_ID_HEADER};
use rfid_attendance::models::AdminUser;
use rfid_attendance::{routes, AppConfig, DbPool};

const SECRET: &str = "integration-test-secret";

fn lazy_pool() -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new("postgres://127.0.0.1:1/unreachable");
    Pool::builder()
        .max_size(1)
        .min_idle(Some(0))
        .connection_timeout(Duration::from_millis(250))
        .build_unchecked(manager)
}

fn token_for(role: &str) -> String {
    let now = Utc::now().naive_utc();
    let account = AdminUser {
        id: 42,
        username: format!("{}-user", role),
        password_hash: String::new(),
        role: role.to_string(),
        employee_id: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    };
    let (token, _) = AuthService::generate_token(&account, &AppConfig::for_tests(SECRET)).unwrap();
    format!("Bearer {}", token)
}

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .wrap(RequestLogger)
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(AppConfig::for_tests(SECRET)))
                .configure(routes::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn health_reports_ok_and_tags_request_id() {
    let app = app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn scan_without_rfid_is_rejected() {
    let app = app!();
    for payload in [json!({}), json!({ "rfid_tag": "   " })] {
        let req = test::TestRequest::post()
            .uri("/api/attendance/add")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "RFID tag is required");
    }
}

#[actix_web::test]
async fn admin_routes_require_a_session() {
    let app = app!();
    let req = test::TestRequest::get().uri("/api/admin/employees").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/admin/employees")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn me_returns_session_claims() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(("Authorization", token_for("hr")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["role"], "hr");
    assert_eq!(body["account_id"], 42);
}

#[actix_web::test]
async fn only_superadmin_mutates_role_permissions() {
    let app = app!();
    let create = test::TestRequest::post()
        .uri("/api/admin/role-permissions")
        .insert_header(("Authorization", token_for("admin")))
        .set_json(json!({ "role": "hr", "module": "employees_management", "permission": { "access": true } }))
        .to_request();
    assert_eq!(test::call_service(&app, create).await.status(), StatusCode::FORBIDDEN);

    let update = test::TestRequest::put()
        .uri("/api/admin/role-permissions")
        .insert_header(("Authorization", token_for("hr")))
        .set_json(json!({ "role": "hr", "module": "dashboard", "permission": { "access": true } }))
        .to_request();
    assert_eq!(test::call_service(&app, update).await.status(), StatusCode::FORBIDDEN);

    let delete = test::TestRequest::delete()
        .uri("/api/admin/role-permissions?role=hr&module=dashboard")
        .insert_header(("Authorization", token_for("admin")))
        .to_request();
    assert_eq!(test::call_service(&app, delete).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn unknown_module_is_a_validation_error() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/admin/role-permissions")
        .insert_header(("Authorization", token_for("superadmin")))
        .set_json(json!({ "role": "hr", "module": "payroll", "permission": { "access": true } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/admin/role-permissions/check?module=payroll")
        .insert_header(("Authorization", token_for("superadmin")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_permission_payload_is_rejected() {
    let app = app!();
    for permission in [json!({}), json!({ "acess": true }), json!({ "access": "yes" })] {
        let req = test::TestRequest::post()
            .uri("/api/admin/role-permissions")
            .insert_header(("Authorization", token_for("superadmin")))
            .set_json(json!({ "role": "hr", "module": "dashboard", "permission": permission }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}

#[actix_web::test]
async fn superadmin_check_skips_the_table() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/api/admin/role-permissions/check?module=accounts_management")
        .insert_header(("Authorization", token_for("superadmin")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["access"], true);
    assert_eq!(body["module"], "accounts_management");
}

#[actix_web::test]
async fn active_employee_needs_rfid() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/admin/employees")
        .insert_header(("Authorization", token_for("superadmin")))
        .set_json(json!({ "ashima_id": "E200", "name": "Ben Santos", "status": "active" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("rfid_tag"));
}

#[actix_web::test]
async fn account_password_must_be_long_enough() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/admin/accounts")
        .insert_header(("Authorization", token_for("superadmin")))
        .set_json(json!({ "username": "kiosk", "password": "short", "role": "hr" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_requires_credentials() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": " ", "password": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
