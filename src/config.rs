use std::env;
use log::warn;
use rand::{thread_rng, Rng};
use rand::distributions::Alphanumeric;

pub const MAX_SESSION_HOURS: i64 = 24 * 30;
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

// Config
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_pool_size: u32,
    pub jwt_secret: String,
    pub session_hours: i64,
    /// Site offset from UTC, used to decide where "today" starts.
    pub utc_offset_minutes: i32,
    pub superadmin_username: Option<String>,
    pub superadmin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);

        let database_url = env::var("DATABASE_URL").unwrap_or_default();

        let db_pool_size = env::var("DB_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(val) if !val.is_empty() => val,
            _ => {
                warn!("JWT_SECRET is not set; generating a random secret for this process");
                warn!("Sessions will not survive a restart - set JWT_SECRET in production!");
                Self::generate_secure_secret()
            }
        };

        // Admin sessions last a working day by default
        let session_hours = env::var("SESSION_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(8);

        let utc_offset_minutes = env::var("UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(0);

        let superadmin_username = env::var("SUPERADMIN_USERNAME").ok().filter(|v| !v.is_empty());
        let superadmin_password = env::var("SUPERADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        Self {
            host,
            port,
            database_url,
            db_pool_size,
            jwt_secret,
            session_hours,
            utc_offset_minutes,
            superadmin_username,
            superadmin_password,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.is_empty() {
            return Err("DATABASE_URL must be set".to_string());
        }

        if self.session_hours <= 0 {
            return Err("SESSION_HOURS must be positive".to_string());
        }

        if self.session_hours > MAX_SESSION_HOURS {
            return Err(format!("SESSION_HOURS must be at most {}", MAX_SESSION_HOURS));
        }

        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(format!("UTC_OFFSET_MINUTES must be within ±{}", MAX_UTC_OFFSET_MINUTES));
        }

        if self.db_pool_size == 0 {
            return Err("DB_POOL_SIZE must be positive".to_string());
        }

        if self.jwt_secret.len() < 16 {
            warn!("JWT_SECRET is shorter than 16 characters");
        }

        Ok(())
    }

    pub fn generate_secure_secret() -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    /// Configuration for tests and tools that never touch the environment.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "postgres://localhost/unused".to_string(),
            db_pool_size: 1,
            jwt_secret: jwt_secret.to_string(),
            session_hours: 8,
            utc_offset_minutes: 0,
            superadmin_username: None,
            superadmin_password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_is_32_alphanumeric_chars() {
        let secret = AppConfig::generate_secure_secret();
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn validate_rejects_non_positive_session_length() {
        let mut config = AppConfig::for_tests("0123456789abcdef");
        assert!(config.validate().is_ok());
        config.session_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_caps_session_length() {
        let mut config = AppConfig::for_tests("0123456789abcdef");
        config.session_hours = MAX_SESSION_HOURS;
        assert!(config.validate().is_ok());
        config.session_hours = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_impossible_utc_offset() {
        let mut config = AppConfig::for_tests("0123456789abcdef");
        config.utc_offset_minutes = 8 * 60;
        assert!(config.validate().is_ok());
        config.utc_offset_minutes = -(15 * 60);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_database_url() {
        let mut config = AppConfig::for_tests("0123456789abcdef");
        config.database_url.clear();
        assert_eq!(config.validate().unwrap_err(), "DATABASE_URL must be set");
    }
}
