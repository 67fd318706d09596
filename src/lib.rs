// Library half of the service; main.rs only wires configuration and the server

pub mod access;
pub mod accounts;
pub mod attendance;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod employees;
pub mod errors;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod schema;

// Re-export common types
pub use crate::config::AppConfig;
pub use crate::db::DbPool;
pub use crate::errors::ApiError;
