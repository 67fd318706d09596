use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::{debug, info};

use crate::attendance::AttendanceService;
use crate::db::{self, DbPool};
use crate::errors::ApiError;
use crate::models::{
    Employee, EmployeeFilter, EmployeeProfile, EmployeeRecord, EmployeeRequest, EmployeeStatus,
    EmploymentType, Page,
};
use crate::pagination::PageRequest;

/// Blank strings from admin forms count as "not set".
fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Escapes LIKE wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Decodes a base64 photo, accepting `data:image/...;base64,` URLs.
pub fn decode_photo(encoded: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    BASE64
        .decode(payload.trim())
        .map_err(|e| ApiError::ValidationError(format!("Photo is not valid base64: {}", e)))
}

/// Merges a create/update request over the current row and enforces the
/// status rules. Missing fields keep their current value; blank strings clear.
pub fn build_record(req: &EmployeeRequest, current: Option<&Employee>) -> Result<EmployeeRecord, ApiError> {
    let ashima_id = non_blank(req.ashima_id.as_deref())
        .or_else(|| current.map(|e| e.ashima_id.clone()))
        .ok_or_else(|| ApiError::ValidationError("ashima_id is required".to_string()))?;

    let name = non_blank(req.name.as_deref())
        .or_else(|| current.map(|e| e.name.clone()))
        .ok_or_else(|| ApiError::ValidationError("name is required".to_string()))?;

    let pick = |submitted: &Option<String>, existing: Option<&String>| match submitted {
        Some(v) => non_blank(Some(v.as_str())),
        None => existing.cloned(),
    };

    let supervisor_id = pick(&req.supervisor_id, current.and_then(|e| e.supervisor_id.as_ref()));
    if supervisor_id.as_deref() == Some(ashima_id.as_str()) {
        return Err(ApiError::ValidationError("An employee cannot be their own leader".to_string()));
    }

    let mut rfid_tag = pick(&req.rfid_tag, current.and_then(|e| e.rfid_tag.as_ref()));

    let mut photo = match req.photo.as_deref() {
        Some(encoded) if encoded.trim().is_empty() => None,
        Some(encoded) => Some(decode_photo(encoded)?),
        None => current.and_then(|e| e.photo.clone()),
    };

    let status = req
        .status
        .or_else(|| current.map(|e| e.status))
        .unwrap_or(EmployeeStatus::Active);

    let employment_type = req
        .employment_type
        .or_else(|| current.map(|e| e.employment_type))
        .unwrap_or(EmploymentType::Regular);

    match status {
        EmployeeStatus::Resigned => {
            // Badge and photo are released on resignation
            rfid_tag = None;
            photo = None;
        }
        EmployeeStatus::Active if rfid_tag.is_none() => {
            return Err(ApiError::ValidationError("rfid_tag is required for active employees".to_string()));
        }
        _ => {}
    }

    Ok(EmployeeRecord {
        ashima_id,
        name,
        department_id: req.department_id.or_else(|| current.and_then(|e| e.department_id)),
        position_id: req.position_id.or_else(|| current.and_then(|e| e.position_id)),
        supervisor_id,
        rfid_tag,
        photo,
        employment_type,
        status,
    })
}

pub struct EmployeeService;

impl EmployeeService {
    pub async fn list(filter: EmployeeFilter, pool: &DbPool) -> Result<Page<Employee>, ApiError> {
        let paging = PageRequest::new(filter.page, filter.page_size);

        let build = move || {
            use crate::schema::employees::dsl::*;
            let mut query = employees.into_boxed();
            if let Some(dept) = filter.department_id {
                query = query.filter(department_id.eq(dept));
            }
            if let Some(pos) = filter.position_id {
                query = query.filter(position_id.eq(pos));
            }
            if let Some(leader) = non_blank(filter.leader.as_deref()) {
                query = query.filter(supervisor_id.eq(leader));
            }
            if let Some(wanted) = filter.status {
                query = query.filter(status.eq(wanted));
            }
            if let Some(term) = non_blank(filter.search.as_deref()) {
                let pattern = format!("%{}%", escape_like(&term));
                query = query.filter(name.ilike(pattern.clone()).or(ashima_id.ilike(pattern)));
            }
            query
        };

        db::run(pool, move |conn| {
            use crate::schema::employees::dsl::*;
            let total = build().count().get_result::<i64>(conn)?;
            let data = build()
                .order((name.asc(), id.asc()))
                .offset(paging.offset())
                .limit(paging.page_size)
                .load::<Employee>(conn)?;
            debug!("Listed {} of {} employees", data.len(), total);
            Ok(paging.into_page(data, total))
        })
        .await
    }

    fn find(conn: &mut PgConnection, key: &str) -> Result<Employee, ApiError> {
        use crate::schema::employees::dsl::*;
        employees
            .filter(ashima_id.eq(key))
            .first::<Employee>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFoundError(format!("Employee {} not found", key)))
    }

    pub async fn get(key: String, pool: &DbPool) -> Result<EmployeeProfile, ApiError> {
        db::run(pool, move |conn| {
            let employee = Self::find(conn, &key)?;
            AttendanceService::profile(employee, conn)
        })
        .await
    }

    pub async fn create(req: EmployeeRequest, pool: &DbPool) -> Result<Employee, ApiError> {
        let record = build_record(&req, None)?;

        let employee = db::run(pool, move |conn| {
            use crate::schema::employees::dsl::*;
            diesel::insert_into(employees)
                .values(&record)
                .get_result::<Employee>(conn)
                .map_err(ApiError::from)
        })
        .await?;

        info!("Created employee {}", employee.ashima_id);
        Ok(employee)
    }

    pub async fn update(key: String, req: EmployeeRequest, pool: &DbPool) -> Result<Employee, ApiError> {
        let employee = db::run(pool, move |conn| {
            conn.transaction::<_, ApiError, _>(|conn| {
                use crate::schema::employees::dsl::*;
                let current = Self::find(conn, &key)?;
                let record = build_record(&req, Some(&current))?;
                diesel::update(employees.find(current.id))
                    .set((&record, updated_at.eq(Utc::now().naive_utc())))
                    .get_result::<Employee>(conn)
                    .map_err(ApiError::from)
            })
        })
        .await?;

        info!("Updated employee {} (status {})", employee.ashima_id, employee.status);
        Ok(employee)
    }

    /// Soft delete: the employee is marked resigned and their badge released.
    pub async fn delete(key: String, pool: &DbPool) -> Result<Employee, ApiError> {
        let resign = EmployeeRequest {
            status: Some(EmployeeStatus::Resigned),
            ..Default::default()
        };
        Self::update(key, resign, pool).await
    }

    /// Employees holding a leader position, for supervisor pickers.
    pub async fn leaders(pool: &DbPool) -> Result<Vec<Employee>, ApiError> {
        db::run(pool, move |conn| {
            use crate::schema::{employees, positions};
            employees::table
                .inner_join(positions::table)
                .filter(positions::is_leader.eq(true))
                .filter(employees::status.ne(EmployeeStatus::Resigned))
                .select(employees::all_columns)
                .order(employees::name.asc())
                .load::<Employee>(conn)
                .map_err(ApiError::from)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: Option<EmployeeStatus>) -> EmployeeRequest {
        EmployeeRequest {
            ashima_id: Some("E100".into()),
            name: Some("Ana Reyes".into()),
            rfid_tag: Some("AB12CD34".into()),
            photo: Some("/9j/".into()),
            status,
            ..Default::default()
        }
    }

    fn existing() -> Employee {
        let now = Utc::now().naive_utc();
        Employee {
            id: 1,
            ashima_id: "E100".into(),
            name: "Ana Reyes".into(),
            department_id: Some(2),
            position_id: Some(3),
            supervisor_id: Some("E001".into()),
            rfid_tag: Some("AB12CD34".into()),
            photo: Some(vec![1, 2, 3]),
            employment_type: EmploymentType::Probationary,
            status: EmployeeStatus::Active,
            last_active: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_employee_without_rfid_is_rejected() {
        let mut req = request(Some(EmployeeStatus::Active));
        req.rfid_tag = None;
        match build_record(&req, None) {
            Err(ApiError::ValidationError(msg)) => assert!(msg.contains("rfid_tag")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn blank_rfid_counts_as_missing() {
        let mut req = request(None);
        req.rfid_tag = Some("   ".into());
        assert!(matches!(build_record(&req, None), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn inactive_employee_may_have_no_rfid() {
        let mut req = request(Some(EmployeeStatus::Inactive));
        req.rfid_tag = None;
        let record = build_record(&req, None).unwrap();
        assert_eq!(record.rfid_tag, None);
        assert_eq!(record.status, EmployeeStatus::Inactive);
    }

    #[test]
    fn resigned_clears_rfid_and_photo_even_when_submitted() {
        let record = build_record(&request(Some(EmployeeStatus::Resigned)), None).unwrap();
        assert_eq!(record.rfid_tag, None);
        assert_eq!(record.photo, None);
    }

    #[test]
    fn resigning_an_existing_employee_clears_badge() {
        let req = EmployeeRequest { status: Some(EmployeeStatus::Resigned), ..Default::default() };
        let record = build_record(&req, Some(&existing())).unwrap();
        assert_eq!(record.rfid_tag, None);
        assert_eq!(record.photo, None);
        assert_eq!(record.supervisor_id.as_deref(), Some("E001"));
        assert_eq!(record.employment_type, EmploymentType::Probationary);
    }

    #[test]
    fn update_keeps_unsubmitted_fields() {
        let req = EmployeeRequest { name: Some("Ana R. Cruz".into()), ..Default::default() };
        let record = build_record(&req, Some(&existing())).unwrap();
        assert_eq!(record.name, "Ana R. Cruz");
        assert_eq!(record.department_id, Some(2));
        assert_eq!(record.photo, Some(vec![1, 2, 3]));
        assert_eq!(record.rfid_tag.as_deref(), Some("AB12CD34"));
    }

    #[test]
    fn missing_identity_fields_are_rejected() {
        let mut req = request(None);
        req.ashima_id = None;
        assert!(matches!(build_record(&req, None), Err(ApiError::ValidationError(m)) if m.contains("ashima_id")));
        let mut req = request(None);
        req.name = Some(String::new());
        assert!(matches!(build_record(&req, None), Err(ApiError::ValidationError(m)) if m.contains("name")));
    }

    #[test]
    fn employee_cannot_lead_themselves() {
        let mut req = request(None);
        req.supervisor_id = Some("E100".into());
        assert!(build_record(&req, None).is_err());
    }

    #[test]
    fn photo_accepts_data_urls() {
        assert_eq!(decode_photo("data:image/jpeg;base64,/9j/").unwrap(), vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(decode_photo("/9j/").unwrap(), vec![0xFF, 0xD8, 0xFF]);
        assert!(decode_photo("not base64!").is_err());
    }

    #[test]
    fn defaults_to_active_regular() {
        let record = build_record(&request(None), None).unwrap();
        assert_eq!(record.status, EmployeeStatus::Active);
        assert_eq!(record.employment_type, EmploymentType::Regular);
    }

    #[test]
    fn search_wildcards_match_literally() {
        assert_eq!(escape_like("E_1"), r"E\_1");
        assert_eq!(escape_like("50%"), r"50\%");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("Ana Reyes"), "Ana Reyes");
    }
}
