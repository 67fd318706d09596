use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::debug;
use serde_json::json;

use crate::access::{AccessGate, Module, RolePermissionService};
use crate::accounts::AccountService;
use crate::attendance::AttendanceService;
use crate::auth::{AdminSession, AuthService};
use crate::catalog::{DepartmentService, PositionService};
use crate::config::AppConfig;
use crate::dashboard::DashboardService;
use crate::db::DbPool;
use crate::employees::EmployeeService;
use crate::errors::ApiError;
use crate::models::{
    AttendanceLogFilter, CreateAccountRequest, DepartmentForm, EmployeeFilter, EmployeeRequest,
    LoginRequest, ModuleQuery, PositionForm, RolePermissionKey, RolePermissionRequest, RoleQuery,
    ScanRequest, UpdateAccountRequest,
};

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// Kiosk endpoint: the badge reader is not a logged-in admin
#[post("/attendance/add")]
async fn record_attendance(
    pool: web::Data<DbPool>,
    scan: web::Json<ScanRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = AttendanceService::record_scan(scan.into_inner().rfid_tag, &pool).await?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/auth/login")]
async fn login(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    login_data: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Login attempt for: {}", login_data.username);
    let response = AuthService::login(&login_data, &config, &pool).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/auth/me")]
async fn current_session(session: AdminSession) -> impl Responder {
    HttpResponse::Ok().json(session.claims)
}

#[get("/admin/dashboard")]
async fn dashboard(
    session: AdminSession,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Dashboard, &pool).await?;
    let summary = DashboardService::summary(config.utc_offset_minutes, &pool).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/admin/attendance-logs")]
async fn list_attendance_logs(
    session: AdminSession,
    pool: web::Data<DbPool>,
    filter: web::Query<AttendanceLogFilter>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::AttendanceLogs, &pool).await?;
    let page = AttendanceService::list_logs(filter.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/admin/employees")]
async fn list_employees(
    session: AdminSession,
    pool: web::Data<DbPool>,
    filter: web::Query<EmployeeFilter>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::EmployeesManagement, &pool).await?;
    let page = EmployeeService::list(filter.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/admin/employees/leaders")]
async fn list_leaders(session: AdminSession, pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::EmployeesManagement, &pool).await?;
    Ok(HttpResponse::Ok().json(EmployeeService::leaders(&pool).await?))
}

#[get("/admin/employees/{ashima_id}")]
async fn get_employee(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::EmployeesManagement, &pool).await?;
    let profile = EmployeeService::get(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[post("/admin/employees")]
async fn create_employee(
    session: AdminSession,
    pool: web::Data<DbPool>,
    body: web::Json<EmployeeRequest>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::EmployeesManagement, &pool).await?;
    let employee = EmployeeService::create(body.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(employee))
}

#[put("/admin/employees/{ashima_id}")]
async fn update_employee(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    body: web::Json<EmployeeRequest>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::EmployeesManagement, &pool).await?;
    let employee = EmployeeService::update(path.into_inner(), body.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[delete("/admin/employees/{ashima_id}")]
async fn delete_employee(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::EmployeesManagement, &pool).await?;
    let employee = EmployeeService::delete(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[get("/admin/departments")]
async fn list_departments(session: AdminSession, pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Departments, &pool).await?;
    Ok(HttpResponse::Ok().json(DepartmentService::list(&pool).await?))
}

#[post("/admin/departments")]
async fn create_department(
    session: AdminSession,
    pool: web::Data<DbPool>,
    body: web::Json<DepartmentForm>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Departments, &pool).await?;
    let created = DepartmentService::create(body.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(created))
}

#[put("/admin/departments/{id}")]
async fn update_department(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    body: web::Json<DepartmentForm>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Departments, &pool).await?;
    let updated = DepartmentService::update(path.into_inner(), body.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/admin/departments/{id}")]
async fn delete_department(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Departments, &pool).await?;
    DepartmentService::delete(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[get("/admin/positions")]
async fn list_positions(session: AdminSession, pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Positions, &pool).await?;
    Ok(HttpResponse::Ok().json(PositionService::list(&pool).await?))
}

#[post("/admin/positions")]
async fn create_position(
    session: AdminSession,
    pool: web::Data<DbPool>,
    body: web::Json<PositionForm>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Positions, &pool).await?;
    let created = PositionService::create(body.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(created))
}

#[put("/admin/positions/{id}")]
async fn update_position(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    body: web::Json<PositionForm>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Positions, &pool).await?;
    let updated = PositionService::update(path.into_inner(), body.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/admin/positions/{id}")]
async fn delete_position(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::Positions, &pool).await?;
    PositionService::delete(path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[get("/admin/accounts")]
async fn list_accounts(session: AdminSession, pool: web::Data<DbPool>) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::AccountsManagement, &pool).await?;
    Ok(HttpResponse::Ok().json(AccountService::list(&pool).await?))
}

#[get("/admin/accounts/{id}")]
async fn get_account(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::AccountsManagement, &pool).await?;
    Ok(HttpResponse::Ok().json(AccountService::get(path.into_inner(), &pool).await?))
}

#[post("/admin/accounts")]
async fn create_account(
    session: AdminSession,
    pool: web::Data<DbPool>,
    body: web::Json<CreateAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::AccountsManagement, &pool).await?;
    let created = AccountService::create(&session, body.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(created))
}

#[put("/admin/accounts/{id}")]
async fn update_account(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    body: web::Json<UpdateAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::AccountsManagement, &pool).await?;
    let updated = AccountService::update(&session, path.into_inner(), body.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/admin/accounts/{id}")]
async fn delete_account(
    session: AdminSession,
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    AccessGate::require(&session, Module::AccountsManagement, &pool).await?;
    AccountService::delete(&session, path.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

// Any signed-in role may read the table to build its navigation
#[get("/admin/role-permissions")]
async fn list_role_permissions(
    _session: AdminSession,
    pool: web::Data<DbPool>,
    query: web::Query<RoleQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = RolePermissionService::list(query.into_inner().role, &pool).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[get("/admin/role-permissions/check")]
async fn check_permission(
    session: AdminSession,
    pool: web::Data<DbPool>,
    query: web::Query<ModuleQuery>,
) -> Result<HttpResponse, ApiError> {
    let module = query.module.parse::<Module>()?;
    let access = AccessGate::check(&session.claims.role, module, &pool).await?;
    Ok(HttpResponse::Ok().json(json!({
        "role": session.claims.role,
        "module": module,
        "access": access
    })))
}

#[post("/admin/role-permissions")]
async fn create_role_permission(
    session: AdminSession,
    pool: web::Data<DbPool>,
    body: web::Json<RolePermissionRequest>,
) -> Result<HttpResponse, ApiError> {
    let created = RolePermissionService::create(&session, body.into_inner(), &pool).await?;
    Ok(HttpResponse::Created().json(created))
}

#[put("/admin/role-permissions")]
async fn update_role_permission(
    session: AdminSession,
    pool: web::Data<DbPool>,
    body: web::Json<RolePermissionRequest>,
) -> Result<HttpResponse, ApiError> {
    let updated = RolePermissionService::update(&session, body.into_inner(), &pool).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/admin/role-permissions")]
async fn delete_role_permission(
    session: AdminSession,
    pool: web::Data<DbPool>,
    key: web::Query<RolePermissionKey>,
) -> Result<HttpResponse, ApiError> {
    let key = key.into_inner();
    RolePermissionService::delete(&session, key.role, key.module, &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Registers every route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health_check)
            .service(record_attendance)
            .service(login)
            .service(current_session)
            .service(dashboard)
            .service(list_attendance_logs)
            .service(list_employees)
            // Must precede the {ashima_id} route
            .service(list_leaders)
            .service(get_employee)
            .service(create_employee)
            .service(update_employee)
            .service(delete_employee)
            .service(list_departments)
            .service(create_department)
            .service(update_department)
            .service(delete_department)
            .service(list_positions)
            .service(create_position)
            .service(update_position)
            .service(delete_position)
            .service(list_accounts)
            .service(get_account)
            .service(create_account)
            .service(update_account)
            .service(delete_account)
            .service(list_role_permissions)
            .service(check_permission)
            .service(create_role_permission)
            .service(update_role_permission)
            .service(delete_role_permission),
    );
}
