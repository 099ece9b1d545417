use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use employee_tasks_api::config::AppConfig;
use employee_tasks_api::docs::ApiDoc;
use employee_tasks_api::handlers;
use employee_tasks_api::store::Store;
use employee_tasks_api::Database;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    log::info!("🚀 Starting Employee Tasks API on port {}", config.server_port);
    log::info!("🌍 Environment: {}", config.environment);
    log::info!("📋 Allowed frontend URLs: {:?}", config.cors_allowed_origins);

    let database = Database::new(&config.database_url).await?;
    if config.run_migrations {
        database.migrate().await?;
    }
    database.check_tables().await?;
    match database.get_stats().await {
        Ok(stats) => stats.log_stats(),
        Err(e) => log::warn!("⚠️  Could not read database statistics: {:#}", e),
    }

    let store: web::Data<dyn Store> = web::Data::from(Arc::new(database) as Arc<dyn Store>);
    if config.is_development() {
        log::info!("📖 API docs: http://localhost:{}/swagger-ui/", config.server_port);
    }

    let bind_address = config.bind_address();
    let allowed_origins = config.cors_allowed_origins.clone();
    let config_data = web::Data::new(config);
    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "Authorization",
                "Content-Type",
                "Accept",
                "Origin",
                "X-Requested-With",
            ])
            .supports_credentials();

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(store.clone())
            .app_data(config_data.clone())
            .configure(handlers::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}
