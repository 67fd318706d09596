use actix_web::web;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel::Connection;
use log::{error, info};

use crate::errors::ApiError;

// Type aliases
pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

// Database initialization SQL
pub const DB_INIT_SQL: &str = r#"
-- Create tables if they don't exist
CREATE TABLE IF NOT EXISTS departments (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) UNIQUE NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS positions (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) UNIQUE NOT NULL,
    is_leader BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS employees (
    id SERIAL PRIMARY KEY,
    ashima_id VARCHAR(50) UNIQUE NOT NULL,
    name VARCHAR(150) NOT NULL,
    department_id INTEGER,
    position_id INTEGER,
    supervisor_id VARCHAR(50),
    rfid_tag VARCHAR(64) UNIQUE,
    photo BYTEA,
    employment_type VARCHAR(20) NOT NULL DEFAULT 'regular',
    status VARCHAR(20) NOT NULL DEFAULT 'active',
    last_active TIMESTAMP,
    created_at TIMESTAMP NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMP NOT NULL DEFAULT NOW(),
    CONSTRAINT employees_employment_type_check
        CHECK (employment_type IN ('regular', 'contractual', 'probationary')),
    CONSTRAINT employees_status_check
        CHECK (status IN ('active', 'inactive', 'resigned'))
);

CREATE TABLE IF NOT EXISTS attendance_logs (
    id SERIAL PRIMARY KEY,
    ashima_id VARCHAR(50) NOT NULL,
    log_type VARCHAR(3) NOT NULL CHECK (log_type IN ('IN', 'OUT')),
    logged_at TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS attendance_logs_ashima_id_logged_at_idx
    ON attendance_logs (ashima_id, logged_at DESC);

CREATE TABLE IF NOT EXISTS admin_users (
    id SERIAL PRIMARY KEY,
    username VARCHAR(100) UNIQUE NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    role VARCHAR(50) NOT NULL,
    employee_id VARCHAR(50),
    last_login TIMESTAMP,
    created_at TIMESTAMP NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMP NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS role_permissions (
    role VARCHAR(50) NOT NULL,
    module VARCHAR(100) NOT NULL,
    permission JSONB NOT NULL DEFAULT '{"access": false}',
    created_at TIMESTAMP NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMP NOT NULL DEFAULT NOW(),
    PRIMARY KEY (role, module)
);

-- Add foreign keys if not exist
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_employees_department'
    ) THEN
        ALTER TABLE employees ADD CONSTRAINT fk_employees_department
        FOREIGN KEY (department_id) REFERENCES departments(id) ON DELETE RESTRICT;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_employees_position'
    ) THEN
        ALTER TABLE employees ADD CONSTRAINT fk_employees_position
        FOREIGN KEY (position_id) REFERENCES positions(id) ON DELETE RESTRICT;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_employees_supervisor'
    ) THEN
        ALTER TABLE employees ADD CONSTRAINT fk_employees_supervisor
        FOREIGN KEY (supervisor_id) REFERENCES employees(ashima_id)
        ON UPDATE CASCADE ON DELETE SET NULL;
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'fk_attendance_logs_employee'
    ) THEN
        ALTER TABLE attendance_logs ADD CONSTRAINT fk_attendance_logs_employee
        FOREIGN KEY (ashima_id) REFERENCES employees(ashima_id) ON UPDATE CASCADE;
    END IF;
END $$;

-- Seed superadmin access to every module
INSERT INTO role_permissions (role, module, permission)
VALUES
    ('superadmin', 'dashboard', '{"access": true}'),
    ('superadmin', 'employees_management', '{"access": true}'),
    ('superadmin', 'departments', '{"access": true}'),
    ('superadmin', 'positions', '{"access": true}'),
    ('superadmin', 'accounts_management', '{"access": true}'),
    ('superadmin', 'attendance_logs', '{"access": true}'),
    ('superadmin', 'role_permissions', '{"access": true}')
ON CONFLICT (role, module) DO NOTHING;
"#;

/// Runs the idempotent schema script on a dedicated connection.
pub fn init_schema(database_url: &str) -> Result<(), ApiError> {
    let mut conn = PgConnection::establish(database_url)
        .map_err(|e| ApiError::DatabaseError(format!("Failed to connect for schema setup: {}", e)))?;
    conn.batch_execute(DB_INIT_SQL)?;
    info!("Database initialization complete.");
    Ok(())
}

pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool, ApiError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(ApiError::from)
}

/// Checks out a pooled connection and runs `f` on the blocking thread pool.
pub async fn run<F, T>(pool: &DbPool, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut PgConnection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    web::block(move || {
        let mut conn = pool.get().map_err(|e| {
            error!("Failed to get database connection: {}", e);
            ApiError::from(e)
        })?;
        f(&mut conn)
    })
    .await
    .map_err(|e| {
        error!("Database operation error: {}", e);
        ApiError::DatabaseError(e.to_string())
    })?
}
