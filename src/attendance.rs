use chrono::{NaiveDateTime, NaiveTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::{debug, info};

use crate::db::{self, DbPool};
use crate::errors::ApiError;
use crate::models::{
    AttendanceLog, AttendanceLogFilter, Employee, EmployeeProfile, EmployeeStatus, LogType,
    NewAttendanceLog, Page, ScanResult,
};
use crate::pagination::PageRequest;

/// First scan clocks in; afterwards each scan flips the previous log type.
pub fn next_log_type(last: Option<LogType>) -> LogType {
    match last {
        Some(LogType::In) => LogType::Out,
        Some(LogType::Out) | None => LogType::In,
    }
}

/// Scanning a badge reactivates an inactive employee.
pub fn status_after_scan(status: EmployeeStatus) -> EmployeeStatus {
    match status {
        EmployeeStatus::Inactive => EmployeeStatus::Active,
        other => other,
    }
}

pub struct AttendanceService;

impl AttendanceService {
    pub async fn record_scan(rfid: Option<String>, pool: &DbPool) -> Result<ScanResult, ApiError> {
        let tag = rfid
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::ValidationError("RFID tag is required".to_string()))?;

        let result = db::run(pool, move |conn| {
            conn.transaction::<_, ApiError, _>(|conn| Self::record_scan_tx(&tag, conn))
        })
        .await?;

        info!(
            "Recorded {} for employee {}",
            result.log_type, result.employee.employee.ashima_id
        );
        Ok(result)
    }

    // Holds the employee row lock until commit, so scans of one badge serialize
    fn record_scan_tx(tag: &str, conn: &mut PgConnection) -> Result<ScanResult, ApiError> {
        use crate::schema::{attendance_logs, employees};

        let employee = employees::table
            .filter(employees::rfid_tag.eq(tag))
            .for_update()
            .first::<Employee>(conn)
            .optional()?
            .ok_or_else(|| {
                debug!("No employee holds RFID tag {}", tag);
                ApiError::NotFoundError("Employee with this RFID tag not found".to_string())
            })?;

        let last = attendance_logs::table
            .filter(attendance_logs::ashima_id.eq(&employee.ashima_id))
            .order((attendance_logs::logged_at.desc(), attendance_logs::id.desc()))
            .select(attendance_logs::log_type)
            .first::<LogType>(conn)
            .optional()?;

        let log_type = next_log_type(last);
        let now = Utc::now().naive_utc();

        diesel::insert_into(attendance_logs::table)
            .values(&NewAttendanceLog {
                ashima_id: employee.ashima_id.clone(),
                log_type,
                logged_at: now,
            })
            .execute(conn)?;

        let employee = diesel::update(employees::table.find(employee.id))
            .set((
                employees::last_active.eq(Some(now)),
                employees::status.eq(status_after_scan(employee.status)),
            ))
            .get_result::<Employee>(conn)?;

        let profile = Self::profile(employee, conn)?;
        Ok(ScanResult { employee: profile, log_type })
    }

    /// Employee with department/position names and latest IN and OUT times.
    pub fn profile(employee: Employee, conn: &mut PgConnection) -> Result<EmployeeProfile, ApiError> {
        use crate::schema::{departments, positions};

        let department = match employee.department_id {
            Some(dept_id) => departments::table
                .find(dept_id)
                .select(departments::name)
                .first::<String>(conn)
                .optional()?,
            None => None,
        };

        let position = match employee.position_id {
            Some(pos_id) => positions::table
                .find(pos_id)
                .select(positions::name)
                .first::<String>(conn)
                .optional()?,
            None => None,
        };

        let last_in = Self::latest(conn, &employee.ashima_id, LogType::In)?;
        let last_out = Self::latest(conn, &employee.ashima_id, LogType::Out)?;

        Ok(EmployeeProfile { employee, department, position, last_in, last_out })
    }

    fn latest(conn: &mut PgConnection, key: &str, kind: LogType) -> QueryResult<Option<NaiveDateTime>> {
        use crate::schema::attendance_logs::dsl::*;
        attendance_logs
            .filter(ashima_id.eq(key))
            .filter(log_type.eq(kind))
            .select(logged_at)
            .order(logged_at.desc())
            .first::<NaiveDateTime>(conn)
            .optional()
    }

    pub async fn list_logs(filter: AttendanceLogFilter, pool: &DbPool) -> Result<Page<AttendanceLog>, ApiError> {
        let paging = PageRequest::new(filter.page, filter.page_size);

        let build = move || {
            use crate::schema::attendance_logs::dsl::*;
            let mut query = attendance_logs.into_boxed();
            if let Some(employee) = filter.ashima_id.clone() {
                query = query.filter(ashima_id.eq(employee));
            }
            if let Some(kind) = filter.log_type {
                query = query.filter(log_type.eq(kind));
            }
            if let Some(from) = filter.from {
                query = query.filter(logged_at.ge(from.and_time(NaiveTime::MIN)));
            }
            if let Some(to) = filter.to.and_then(|d| d.succ_opt()) {
                query = query.filter(logged_at.lt(to.and_time(NaiveTime::MIN)));
            }
            query
        };

        db::run(pool, move |conn| {
            use crate::schema::attendance_logs::dsl::*;
            let total = build().count().get_result::<i64>(conn)?;
            let data = build()
                .order((logged_at.desc(), id.desc()))
                .offset(paging.offset())
                .limit(paging.page_size)
                .load::<AttendanceLog>(conn)?;
            Ok(paging.into_page(data, total))
        })
        .await
    }
}
