//! Scenarios against a real PostgreSQL database. Set TEST_DATABASE_URL to a
//! scratch database to run them; without it each test returns immediately.

use diesel::prelude::*;

use rfid_attendance::attendance::AttendanceService;
use rfid_attendance::catalog::PositionService;
use rfid_attendance::db::{create_pool, init_schema, run};
use rfid_attendance::employees::EmployeeService;
use rfid_attendance::models::{EmployeeRequest, EmployeeStatus, LogType, PositionForm};
use rfid_attendance::{ApiError, DbPool};

fn test_pool_sized(size: u32) -> Option<DbPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    init_schema(&url).expect("schema setup");
    Some(create_pool(&url, size).expect("pool"))
}

fn test_pool() -> Option<DbPool> {
    test_pool_sized(2)
}

async fn reset_employee(pool: &DbPool, key: &'static str) {
    run(pool, move |conn| {
        use rfid_attendance::schema::{attendance_logs, employees};
        diesel::delete(attendance_logs::table.filter(attendance_logs::ashima_id.eq(key))).execute(conn)?;
        diesel::delete(employees::table.filter(employees::ashima_id.eq(key))).execute(conn)?;
        Ok(())
    })
    .await
    .expect("cleanup");
}

fn employee(key: &str, rfid: &str, status: EmployeeStatus) -> EmployeeRequest {
    EmployeeRequest {
        ashima_id: Some(key.to_string()),
        name: Some(format!("Test {}", key)),
        rfid_tag: Some(rfid.to_string()),
        status: Some(status),
        ..Default::default()
    }
}

#[actix_web::test]
async fn scans_alternate_starting_with_in() {
    let Some(pool) = test_pool() else { return };
    reset_employee(&pool, "E100").await;
    EmployeeService::create(employee("E100", "AB12CD34", EmployeeStatus::Active), &pool)
        .await
        .unwrap();

    let first = AttendanceService::record_scan(Some("AB12CD34".into()), &pool).await.unwrap();
    assert_eq!(first.log_type, LogType::In);
    assert_eq!(first.employee.employee.ashima_id, "E100");
    assert!(first.employee.last_in.is_some());
    assert!(first.employee.employee.last_active.is_some());

    let second = AttendanceService::record_scan(Some("AB12CD34".into()), &pool).await.unwrap();
    assert_eq!(second.log_type, LogType::Out);
    assert!(second.employee.last_out.is_some());

    let third = AttendanceService::record_scan(Some("AB12CD34".into()), &pool).await.unwrap();
    assert_eq!(third.log_type, LogType::In);
}

#[actix_web::test]
async fn concurrent_scans_of_one_badge_still_alternate() {
    let Some(pool) = test_pool_sized(4) else { return };
    reset_employee(&pool, "E104").await;
    EmployeeService::create(employee("E104", "QR78ST90", EmployeeStatus::Active), &pool)
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            actix_web::rt::spawn(async move {
                AttendanceService::record_scan(Some("QR78ST90".into()), &pool).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let logged = run(&pool, |conn| {
        use rfid_attendance::schema::attendance_logs::dsl::*;
        attendance_logs
            .filter(ashima_id.eq("E104"))
            .order(id.asc())
            .select(log_type)
            .load::<LogType>(conn)
            .map_err(ApiError::from)
    })
    .await
    .unwrap();

    assert_eq!(logged.len(), 8);
    assert_eq!(logged[0], LogType::In);
    assert!(logged.windows(2).all(|w| w[0] != w[1]), "logs did not alternate: {:?}", logged);
}

#[actix_web::test]
async fn scanning_reactivates_inactive_employee() {
    let Some(pool) = test_pool() else { return };
    reset_employee(&pool, "E101").await;
    EmployeeService::create(employee("E101", "EF56GH78", EmployeeStatus::Inactive), &pool)
        .await
        .unwrap();

    let scan = AttendanceService::record_scan(Some("EF56GH78".into()), &pool).await.unwrap();
    assert_eq!(scan.employee.employee.status, EmployeeStatus::Active);
}

#[actix_web::test]
async fn unknown_rfid_is_not_found() {
    let Some(pool) = test_pool() else { return };
    let err = AttendanceService::record_scan(Some("NO-SUCH-TAG".into()), &pool).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFoundError(_)));
}

#[actix_web::test]
async fn resigning_releases_badge() {
    let Some(pool) = test_pool() else { return };
    reset_employee(&pool, "E102").await;
    let mut req = employee("E102", "IJ90KL12", EmployeeStatus::Active);
    req.photo = Some("/9j/".into());
    EmployeeService::create(req, &pool).await.unwrap();

    let resign = EmployeeRequest {
        status: Some(EmployeeStatus::Resigned),
        rfid_tag: Some("IJ90KL12".into()),
        photo: Some("/9j/".into()),
        ..Default::default()
    };
    let updated = EmployeeService::update("E102".into(), resign, &pool).await.unwrap();
    assert_eq!(updated.rfid_tag, None);
    assert_eq!(updated.photo, None);
}

#[actix_web::test]
async fn position_in_use_cannot_be_deleted() {
    let Some(pool) = test_pool() else { return };
    reset_employee(&pool, "E103").await;
    let name = format!("Line Lead {}", std::process::id());
    let position = PositionService::create(PositionForm { name, is_leader: true }, &pool)
        .await
        .unwrap();

    let mut req = employee("E103", "MN34OP56", EmployeeStatus::Active);
    req.position_id = Some(position.id);
    EmployeeService::create(req, &pool).await.unwrap();

    let err = PositionService::delete(position.id, &pool).await.unwrap_err();
    match err {
        ApiError::ValidationError(msg) => assert!(msg.contains("in use")),
        other => panic!("expected in-use error, got {:?}", other),
    }
    assert!(PositionService::list(&pool).await.unwrap().iter().any(|p| p.id == position.id));

    reset_employee(&pool, "E103").await;
    PositionService::delete(position.id, &pool).await.unwrap();
}
