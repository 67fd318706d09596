use actix_web::{web, App, HttpServer};
use log::{error, info};

use rfid_attendance::accounts::AccountService;
use rfid_attendance::config::AppConfig;
use rfid_attendance::db::{create_pool, init_schema};
use rfid_attendance::logger::setup_logger;
use rfid_attendance::middleware::RequestLogger;
use rfid_attendance::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables and initialize logger
    dotenvy::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    setup_logger(&log_level);
    let config = AppConfig::from_env();

    if let Err(e) = config.validate() {
        error!("Configuration validation error: {}", e);
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
    }

    info!("Initializing database schema");
    init_schema(&config.database_url).map_err(|e| {
        error!("Failed to execute database initialization script: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let pool = create_pool(&config.database_url, config.db_pool_size).map_err(|e| {
        error!("Failed to create database connection pool: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    if let Err(e) = AccountService::bootstrap_superadmin(&config, &pool).await {
        error!("Failed to bootstrap superadmin account: {}", e);
    }

    let bind_addr = (config.host.clone(), config.port);
    info!("Starting HTTP server at http://{}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .configure(routes::configure)
    })
    .keep_alive(std::time::Duration::from_secs(75))
    .shutdown_timeout(30) // Graceful shutdown timeout in seconds
    .bind(bind_addr)?
    .run()
    .await
}
