use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::models::response::ApiResponse;
use crate::store::Store;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and store are reachable"),
        (status = 503, description = "Store is unreachable")
    )
)]
pub async fn health_check(store: web::Data<dyn Store>) -> Result<HttpResponse> {
    match store.health_check().await {
        Ok(()) => {
            let stats = store.stats().await.unwrap_or_default();

            Ok(HttpResponse::Ok().json(ApiResponse::success(
                "Employee Tasks API is running",
                json!({
                    "status": "ok",
                    "database": "connected",
                    "stats": {
                        "employees": stats.employees,
                        "tasks": stats.tasks,
                        "task_statuses": stats.task_statuses,
                        "users": stats.users
                    }
                }),
            )))
        }
        Err(e) => {
            log::error!("Store health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "message": "Database connection failed",
                "error": e.to_string()
            })))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
