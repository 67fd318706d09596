use chrono::{Duration, NaiveDateTime, NaiveTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;

use crate::db::{self, DbPool};
use crate::errors::ApiError;
use crate::models::{DashboardSummary, EmployeeStatus, LogType};

/// UTC instant at which the site's current day began.
pub fn day_start(now_utc: NaiveDateTime, utc_offset_minutes: i32) -> NaiveDateTime {
    let offset = Duration::minutes(i64::from(utc_offset_minutes));
    (now_utc + offset).date().and_time(NaiveTime::MIN) - offset
}

pub struct DashboardService;

impl DashboardService {
    pub async fn summary(utc_offset_minutes: i32, pool: &DbPool) -> Result<DashboardSummary, ApiError> {
        db::run(pool, move |conn| {
            use crate::schema::{attendance_logs, employees};

            let by_status = employees::table
                .group_by(employees::status)
                .select((employees::status, count_star()))
                .load::<(EmployeeStatus, i64)>(conn)?;

            let midnight = day_start(Utc::now().naive_utc(), utc_offset_minutes);
            let by_log_type = attendance_logs::table
                .filter(attendance_logs::logged_at.ge(midnight))
                .group_by(attendance_logs::log_type)
                .select((attendance_logs::log_type, count_star()))
                .load::<(LogType, i64)>(conn)?;

            Ok(tally(&by_status, &by_log_type))
        })
        .await
    }
}

fn tally(by_status: &[(EmployeeStatus, i64)], by_log_type: &[(LogType, i64)]) -> DashboardSummary {
    let mut summary = DashboardSummary::default();
    for (status, count) in by_status {
        summary.total_employees += count;
        match status {
            EmployeeStatus::Active => summary.active = *count,
            EmployeeStatus::Inactive => summary.inactive = *count,
            EmployeeStatus::Resigned => summary.resigned = *count,
        }
    }
    for (kind, count) in by_log_type {
        match kind {
            LogType::In => summary.clocked_in_today = *count,
            LogType::Out => summary.clocked_out_today = *count,
        }
    }
    summary
}
