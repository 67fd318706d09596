//! Role/module access control.
//!
//! A role may open a module when `role_permissions` holds a granting row for
//! the pair. Missing rows deny. The superadmin role is allowed everywhere
//! without consulting the table.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use diesel::prelude::*;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::auth::AdminSession;
use crate::db::{self, DbPool};
use crate::errors::ApiError;
use crate::models::{RolePermission, RolePermissionRequest};

pub const SUPERADMIN_ROLE: &str = "superadmin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Dashboard,
    EmployeesManagement,
    Departments,
    Positions,
    AccountsManagement,
    AttendanceLogs,
    RolePermissions,
}

impl Module {
    pub const ALL: [Module; 7] = [
        Module::Dashboard,
        Module::EmployeesManagement,
        Module::Departments,
        Module::Positions,
        Module::AccountsManagement,
        Module::AttendanceLogs,
        Module::RolePermissions,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::EmployeesManagement => "employees_management",
            Module::Departments => "departments",
            Module::Positions => "positions",
            Module::AccountsManagement => "accounts_management",
            Module::AttendanceLogs => "attendance_logs",
            Module::RolePermissions => "role_permissions",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Module {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .iter()
            .copied()
            .find(|m| m.key() == s)
            .ok_or_else(|| ApiError::ValidationError(format!("Unknown module: {}", s)))
    }
}

/// Stored permission JSON. Older rows carry the four-flag shape, where
/// `read` is mandatory and the other flags default to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum PermissionPayload {
    Access {
        access: bool,
    },
    Legacy {
        read: bool,
        #[serde(default)]
        write: bool,
        #[serde(default)]
        delete: bool,
        #[serde(default)]
        export: bool,
    },
}

impl PermissionPayload {
    pub fn grants_access(&self) -> bool {
        match *self {
            PermissionPayload::Access { access } => access,
            PermissionPayload::Legacy { read, .. } => read,
        }
    }

    pub fn parse(value: &serde_json::Value) -> Result<Self, ApiError> {
        if !value.is_object() {
            return Err(ApiError::ValidationError("Permission must be a JSON object".to_string()));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| ApiError::ValidationError(format!("Invalid permission payload: {}", e)))
    }
}

pub fn is_superadmin(role: &str) -> bool {
    role == SUPERADMIN_ROLE
}

/// Access decision for a role given the stored row for the requested module.
pub fn is_allowed(role: &str, stored: Option<&PermissionPayload>) -> bool {
    if is_superadmin(role) {
        return true;
    }
    stored.map(PermissionPayload::grants_access).unwrap_or(false)
}

pub struct AccessGate;

impl AccessGate {
    pub async fn check(role: &str, module: Module, pool: &DbPool) -> Result<bool, ApiError> {
        if is_superadmin(role) {
            return Ok(true);
        }

        let role_copy = role.to_string();
        let row = db::run(pool, move |conn| {
            use crate::schema::role_permissions::dsl;
            dsl::role_permissions
                .filter(dsl::role.eq(role_copy))
                .filter(dsl::module.eq(module.key()))
                .select(dsl::permission)
                .first::<serde_json::Value>(conn)
                .optional()
                .map_err(ApiError::from)
        })
        .await?;

        // Unreadable rows deny like missing ones
        let stored = row.and_then(|value| serde_json::from_value::<PermissionPayload>(value).ok());
        let allowed = is_allowed(role, stored.as_ref());
        debug!("Access check role={} module={} -> {}", role, module, allowed);
        Ok(allowed)
    }

    pub async fn require(session: &AdminSession, module: Module, pool: &DbPool) -> Result<(), ApiError> {
        if Self::check(&session.claims.role, module, pool).await? {
            Ok(())
        } else {
            Err(ApiError::ForbiddenError(format!(
                "Role '{}' has no access to {}",
                session.claims.role, module
            )))
        }
    }
}

pub struct RolePermissionService;

impl RolePermissionService {
    fn require_superadmin(session: &AdminSession) -> Result<(), ApiError> {
        if is_superadmin(&session.claims.role) {
            Ok(())
        } else {
            Err(ApiError::ForbiddenError("Only superadmin can modify role permissions".to_string()))
        }
    }

    fn validate(req: &RolePermissionRequest) -> Result<(String, Module), ApiError> {
        let role = req.role.trim();
        if role.is_empty() {
            return Err(ApiError::ValidationError("Role is required".to_string()));
        }
        let module = req.module.trim().parse::<Module>()?;
        PermissionPayload::parse(&req.permission)?;
        Ok((role.to_string(), module))
    }

    pub async fn list(role_filter: Option<String>, pool: &DbPool) -> Result<Vec<RolePermission>, ApiError> {
        db::run(pool, move |conn| {
            use crate::schema::role_permissions::dsl;
            let mut query = dsl::role_permissions.into_boxed();
            if let Some(r) = role_filter {
                query = query.filter(dsl::role.eq(r));
            }
            query
                .order((dsl::role.asc(), dsl::module.asc()))
                .load::<RolePermission>(conn)
                .map_err(ApiError::from)
        })
        .await
    }

    pub async fn create(
        session: &AdminSession,
        req: RolePermissionRequest,
        pool: &DbPool,
    ) -> Result<RolePermission, ApiError> {
        Self::require_superadmin(session)?;
        let (role_name, module) = Self::validate(&req)?;

        let created = db::run(pool, move |conn| {
            use crate::schema::role_permissions::dsl;
            diesel::insert_into(dsl::role_permissions)
                .values((
                    dsl::role.eq(role_name),
                    dsl::module.eq(module.key()),
                    dsl::permission.eq(req.permission),
                ))
                .get_result::<RolePermission>(conn)
                .map_err(ApiError::from)
        })
        .await?;

        info!("Permission created for role {} on {}", created.role, created.module);
        Ok(created)
    }

    pub async fn update(
        session: &AdminSession,
        req: RolePermissionRequest,
        pool: &DbPool,
    ) -> Result<RolePermission, ApiError> {
        Self::require_superadmin(session)?;
        let (role_name, module) = Self::validate(&req)?;

        let updated = db::run(pool, move |conn| {
            use crate::schema::role_permissions::dsl;
            diesel::update(dsl::role_permissions.find((role_name, module.key())))
                .set((
                    dsl::permission.eq(req.permission),
                    dsl::updated_at.eq(Utc::now().naive_utc()),
                ))
                .get_result::<RolePermission>(conn)
                .optional()
                .map_err(ApiError::from)
        })
        .await?
        .ok_or_else(|| ApiError::NotFoundError("Permission not found".to_string()))?;

        info!("Permission updated for role {} on {}", updated.role, updated.module);
        Ok(updated)
    }

    pub async fn delete(
        session: &AdminSession,
        role_name: String,
        module: String,
        pool: &DbPool,
    ) -> Result<(), ApiError> {
        Self::require_superadmin(session)?;
        let module = module.parse::<Module>()?;

        let deleted = db::run(pool, move |conn| {
            use crate::schema::role_permissions::dsl;
            diesel::delete(dsl::role_permissions.find((role_name, module.key())))
                .execute(conn)
                .map_err(ApiError::from)
        })
        .await?;

        if deleted == 0 {
            return Err(ApiError::NotFoundError("Permission not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_row_denies() {
        assert!(!is_allowed("hr", None));
    }

    #[test]
    fn stored_access_flag_decides() {
        assert!(is_allowed("hr", Some(&PermissionPayload::Access { access: true })));
        assert!(!is_allowed("hr", Some(&PermissionPayload::Access { access: false })));
    }

    #[test]
    fn superadmin_bypasses_the_table() {
        assert!(is_allowed(SUPERADMIN_ROLE, None));
        assert!(is_allowed(SUPERADMIN_ROLE, Some(&PermissionPayload::Access { access: false })));
    }

    #[test]
    fn legacy_payload_grants_on_read() {
        let legacy = PermissionPayload::parse(&json!({"read": true, "write": false, "delete": false, "export": false})).unwrap();
        assert!(legacy.grants_access());
        let no_read = PermissionPayload::parse(&json!({"read": false, "write": true})).unwrap();
        assert!(!no_read.grants_access());
    }

    #[test]
    fn current_payload_parses_before_legacy() {
        let payload = PermissionPayload::parse(&json!({"access": true})).unwrap();
        assert_eq!(payload, PermissionPayload::Access { access: true });
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for bad in [
            json!({}),
            json!({"acess": true}),
            json!({"access": "yes"}),
            json!({"write": true}),
            json!({"read": true, "admin": true}),
        ] {
            assert!(
                matches!(PermissionPayload::parse(&bad), Err(ApiError::ValidationError(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(matches!(PermissionPayload::parse(&json!(true)), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn module_keys_round_trip() {
        for module in Module::ALL {
            assert_eq!(module.key().parse::<Module>().unwrap(), module);
        }
        assert!("payroll".parse::<Module>().is_err());
    }
}
