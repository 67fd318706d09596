use chrono::Utc;
use diesel::prelude::*;
use log::{debug, info, warn};

use crate::access::{is_superadmin, SUPERADMIN_ROLE};
use crate::auth::{AdminSession, AuthService};
use crate::config::AppConfig;
use crate::db::{self, DbPool};
use crate::errors::ApiError;
use crate::models::{AdminUser, CreateAccountRequest, NewAdminUser, UpdateAccountRequest};

pub const MIN_PASSWORD_LEN: usize = 8;

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::ValidationError(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Only a superadmin may create, edit, or remove superadmin accounts.
pub fn ensure_may_manage(session: &AdminSession, target_role: &str) -> Result<(), ApiError> {
    if is_superadmin(target_role) && !is_superadmin(&session.claims.role) {
        return Err(ApiError::ForbiddenError("Only superadmin can manage superadmin accounts".to_string()));
    }
    Ok(())
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::admin_users)]
struct AccountChanges {
    username: Option<String>,
    password_hash: Option<String>,
    role: Option<String>,
    employee_id: Option<Option<String>>,
}

pub struct AccountService;

impl AccountService {
    pub async fn list(pool: &DbPool) -> Result<Vec<AdminUser>, ApiError> {
        db::run(pool, |conn| {
            use crate::schema::admin_users::dsl::*;
            admin_users.order(username.asc()).load::<AdminUser>(conn).map_err(ApiError::from)
        })
        .await
    }

    pub async fn get(account_id: i32, pool: &DbPool) -> Result<AdminUser, ApiError> {
        db::run(pool, move |conn| {
            use crate::schema::admin_users::dsl::*;
            admin_users
                .find(account_id)
                .first::<AdminUser>(conn)
                .optional()?
                .ok_or_else(|| ApiError::NotFoundError("Account not found".to_string()))
        })
        .await
    }

    async fn insert(account: NewAdminUser, pool: &DbPool) -> Result<AdminUser, ApiError> {
        db::run(pool, move |conn| {
            use crate::schema::admin_users::dsl::*;
            diesel::insert_into(admin_users)
                .values(&account)
                .get_result::<AdminUser>(conn)
                .map_err(ApiError::from)
        })
        .await
    }

    pub async fn create(
        session: &AdminSession,
        req: CreateAccountRequest,
        pool: &DbPool,
    ) -> Result<AdminUser, ApiError> {
        let username = required(&req.username, "Username")?;
        let role = required(&req.role, "Role")?;
        validate_password(&req.password)?;
        ensure_may_manage(session, &role)?;

        let account = NewAdminUser {
            username,
            password_hash: AuthService::hash_password(&req.password)?,
            role,
            employee_id: req.employee_id.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string),
        };

        let created = Self::insert(account, pool).await?;
        info!("Account {} created by {}", created.username, session.claims.username);
        Ok(created)
    }

    pub async fn update(
        session: &AdminSession,
        account_id: i32,
        req: UpdateAccountRequest,
        pool: &DbPool,
    ) -> Result<AdminUser, ApiError> {
        let current = Self::get(account_id, pool).await?;
        ensure_may_manage(session, &current.role)?;

        let mut changes = AccountChanges::default();
        if let Some(name) = req.username.as_deref() {
            changes.username = Some(required(name, "Username")?);
        }
        if let Some(new_role) = req.role.as_deref() {
            let new_role = required(new_role, "Role")?;
            ensure_may_manage(session, &new_role)?;
            changes.role = Some(new_role);
        }
        if let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) {
            validate_password(password)?;
            changes.password_hash = Some(AuthService::hash_password(password)?);
        }
        if let Some(linked) = req.employee_id.as_deref() {
            let linked = linked.trim();
            changes.employee_id = Some(if linked.is_empty() { None } else { Some(linked.to_string()) });
        }

        let updated = db::run(pool, move |conn| {
            use crate::schema::admin_users::dsl::*;
            diesel::update(admin_users.find(account_id))
                .set((&changes, updated_at.eq(Utc::now().naive_utc())))
                .get_result::<AdminUser>(conn)
                .map_err(ApiError::from)
        })
        .await?;

        info!("Account {} updated by {}", updated.username, session.claims.username);
        Ok(updated)
    }

    pub async fn delete(session: &AdminSession, account_id: i32, pool: &DbPool) -> Result<(), ApiError> {
        let current = Self::get(account_id, pool).await?;
        ensure_may_manage(session, &current.role)?;
        if current.id == session.claims.account_id {
            return Err(ApiError::ValidationError("You cannot delete your own account".to_string()));
        }

        db::run(pool, move |conn| {
            use crate::schema::admin_users::dsl::*;
            diesel::delete(admin_users.find(account_id)).execute(conn).map_err(ApiError::from)
        })
        .await?;

        info!("Account {} deleted by {}", current.username, session.claims.username);
        Ok(())
    }

    /// Creates the configured superadmin when no account exists yet.
    pub async fn bootstrap_superadmin(config: &AppConfig, pool: &DbPool) -> Result<(), ApiError> {
        let (username, password) = match (&config.superadmin_username, &config.superadmin_password) {
            (Some(u), Some(p)) => (u.clone(), p.clone()),
            _ => {
                debug!("No superadmin bootstrap credentials configured");
                return Ok(());
            }
        };

        let existing = db::run(pool, |conn| {
            use crate::schema::admin_users::dsl::*;
            admin_users.count().get_result::<i64>(conn).map_err(ApiError::from)
        })
        .await?;
        if existing > 0 {
            return Ok(());
        }

        if validate_password(&password).is_err() {
            warn!("SUPERADMIN_PASSWORD is shorter than {} characters", MIN_PASSWORD_LEN);
        }

        let account = NewAdminUser {
            username,
            password_hash: AuthService::hash_password(&password)?,
            role: SUPERADMIN_ROLE.to_string(),
            employee_id: None,
        };
        let created = Self::insert(account, pool).await?;
        info!("Bootstrapped superadmin account {}", created.username);
        Ok(())
    }
}
