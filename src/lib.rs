#![doc = "The `warehouse_ops` library crate."]
#![doc = ""]
#![doc = "This crate contains the business logic, domain models, authentication,"]
#![doc = "routing configuration and error handling of the warehouse operations backend."]
#![doc = "The main binary (`main.rs`) uses `configure_app` to build the application."]

pub mod auth;
pub mod barcode;
pub mod config;
pub mod db;
pub mod docx;
pub mod encoding;
pub mod error;
pub mod models;
pub mod roster;
pub mod routes;
pub mod service_note;
pub mod summary;
pub mod uploads;

use actix_web::web;
use sqlx::PgPool;

use crate::auth::{AuthMiddleware, JwtKeys};
use crate::config::Config;
use crate::error::AppError;
use crate::roster::RosterStore;

pub const MAX_JSON_BYTES: usize = 1024 * 1024;
/// Raw text bodies such as the product catalogue import.
pub const MAX_BODY_BYTES: usize = 11 * 1024 * 1024;

/// Registers shared state and every route on an `App`.
///
/// Malformed JSON bodies and query strings are answered with a 400 in the
/// same `{"error": ...}` shape as every other failure.
pub fn configure_app(cfg: &mut web::ServiceConfig, pool: &PgPool, config: &web::Data<Config>) {
    let keys = JwtKeys::new(&config.jwt_secret, config.jwt_ttl_hours);
    let roster = RosterStore::new(&config.employees_csv_path, &config.uploads_dir);

    let json_config = web::JsonConfig::default()
        .limit(MAX_JSON_BYTES)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());

    cfg.app_data(web::Data::new(pool.clone()))
        .app_data(config.clone())
        .app_data(web::Data::new(keys.clone()))
        .app_data(web::Data::new(roster))
        .app_data(json_config)
        .app_data(query_config)
        .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .service(routes::health::health)
        .service(routes::health::health_detailed)
        .service(routes::uploads::serve_upload)
        .service(
            web::scope("/api")
                .wrap(AuthMiddleware::new(keys))
                .configure(routes::config),
        );
}
