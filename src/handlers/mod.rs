pub mod employee;
pub mod health;
pub mod root;
pub mod task;
pub mod task_status;
pub mod user;

use actix_web::web;

use crate::utils::errors::ServiceError;

pub use employee::employee_config;
pub use task::task_config;
pub use task_status::task_status_config;
pub use user::user_config;

/// Registers every route along with extractor error handlers, so malformed
/// bodies, queries and identifiers answer with the common error body.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ServiceError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|_err, _req| ServiceError::NotFound("Not found.".to_string()).into()),
    );

    root::configure(cfg);
    health::configure(cfg);
    employee_config(cfg);
    task_config(cfg);
    task_status_config(cfg);
    user_config(cfg);
}

pub(crate) fn not_found(entity: &str) -> ServiceError {
    ServiceError::NotFound(format!("No {} matches the given query.", entity))
}
