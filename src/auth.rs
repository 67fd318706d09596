use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, error, info};

use crate::config::AppConfig;
use crate::db::{self, DbPool};
use crate::errors::ApiError;
use crate::models::{AdminUser, Claims, LoginRequest, LoginResponse};

pub struct AuthService;

impl AuthService {
    pub fn hash_password(password: &str) -> Result<String, ApiError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| {
                error!("Failed to hash password: {}", e);
                ApiError::InternalError("Failed to hash password".to_string())
            })
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
        verify(password, hash)
            .map_err(|e| {
                error!("Failed to verify password: {}", e);
                ApiError::InternalError("Failed to verify password".to_string())
            })
    }

    /// Signs a session token for `account`; returns the token and its expiry (unix seconds).
    pub fn generate_token(account: &AdminUser, config: &AppConfig) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let iat = now.timestamp() as usize;
        let exp = (now + Duration::hours(config.session_hours)).timestamp();

        let claims = Claims {
            sub: account.id.to_string(),
            exp: exp as usize,
            iat,
            account_id: account.id,
            username: account.username.clone(),
            role: account.role.clone(),
            employee_id: account.employee_id.clone(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes())
        )
        .map_err(|e| {
            error!("Failed to generate token: {}", e);
            ApiError::InternalError("Failed to generate token".to_string())
        })?;

        Ok((token, exp))
    }

    pub fn decode_token(token: &str, config: &AppConfig) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected session token: {}", e);
            ApiError::AuthError("Invalid or expired session".to_string())
        })
    }

    /// Finds an account by username or by its linked employee id.
    pub async fn find_login_account(login: &str, pool: &DbPool) -> Result<Option<AdminUser>, ApiError> {
        let login_copy = login.to_string();
        db::run(pool, move |conn| {
            use crate::schema::admin_users::dsl::*;
            admin_users
                .filter(username.eq(&login_copy).or(employee_id.eq(&login_copy)))
                .order(id.asc())
                .first::<AdminUser>(conn)
                .optional()
                .map_err(ApiError::from)
        })
        .await
    }

    pub async fn update_last_login(account_id: i32, pool: &DbPool) -> Result<(), ApiError> {
        db::run(pool, move |conn| {
            use crate::schema::admin_users::dsl::*;
            diesel::update(admin_users.find(account_id))
                .set(last_login.eq(Some(Utc::now().naive_utc())))
                .execute(conn)
                .map_err(ApiError::from)
        })
        .await?;
        Ok(())
    }

    pub async fn login(req: &LoginRequest, config: &AppConfig, pool: &DbPool) -> Result<LoginResponse, ApiError> {
        let login = req.username.trim();
        if login.is_empty() || req.password.is_empty() {
            return Err(ApiError::ValidationError("Username and password are required".to_string()));
        }

        let account = match Self::find_login_account(login, pool).await? {
            Some(account) => account,
            None => {
                debug!("Login failed: no account for {}", login);
                return Err(ApiError::AuthError("Invalid credentials".to_string()));
            }
        };

        if !Self::verify_password(&req.password, &account.password_hash)? {
            debug!("Login failed: invalid password for {}", login);
            return Err(ApiError::AuthError("Invalid credentials".to_string()));
        }

        let (token, expires_at) = Self::generate_token(&account, config)?;
        Self::update_last_login(account.id, pool).await?;

        info!("Account {} logged in", account.username);
        Ok(LoginResponse { token, expires_at, account })
    }
}

/// Authenticated admin session taken from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub claims: Claims,
}

impl AdminSession {
    fn from_http_request(req: &HttpRequest) -> Result<Self, ApiError> {
        let config = req
            .app_data::<web::Data<AppConfig>>()
            .ok_or_else(|| ApiError::InternalError("Application config is not registered".to_string()))?;

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::AuthError("Missing session token".to_string()))?;

        let claims = AuthService::decode_token(token, config)?;
        Ok(Self { claims })
    }
}

impl FromRequest for AdminSession {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_http_request(req))
    }
}
