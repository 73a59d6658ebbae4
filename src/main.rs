use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use std::io;

use warehouse_ops::{config::Config, configure_app, db};

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers(vec![header::CONTENT_DISPOSITION])
        .supports_credentials()
        .max_age(3600);

    if origins.is_empty() {
        cors.allow_any_origin()
    } else {
        origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin))
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;
    let pool = db::connect(&config.database_url)
        .await
        .map_err(startup_error)?;
    db::migrate(&pool).await.map_err(startup_error)?;
    db::seed(&pool).await.map_err(startup_error)?;

    let bind_addr = (config.server_host.clone(), config.server_port);
    log::info!("Starting warehouse-ops server at {}", config.server_url());
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&config.frontend_origins))
            .wrap(Logger::default())
            .configure(|cfg| configure_app(cfg, &pool, &config))
    })
    .bind(bind_addr)?
    .shutdown_timeout(10)
    .run()
    .await
}
