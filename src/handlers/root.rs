use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde_json::json;

use crate::models::response::ApiResponse;

const COLLECTIONS: [&str; 4] = ["employees", "tasks", "task-statuses", "users"];

fn base_url(req: &HttpRequest) -> String {
    let info = req.connection_info();
    format!("{}://{}", info.scheme(), info.host())
}

fn collection_links(base: &str) -> serde_json::Map<String, serde_json::Value> {
    COLLECTIONS
        .iter()
        .map(|name| (name.to_string(), json!(format!("{}/api/{}/", base, name))))
        .collect()
}

#[utoipa::path(
    get,
    path = "/",
    tag = "root",
    responses((status = 200, description = "Welcome message with links"))
)]
pub async fn index(req: HttpRequest) -> Result<HttpResponse> {
    log::info!("GET /");
    let base = base_url(&req);
    let mut links = collection_links(&base);
    links.insert("api".to_string(), json!(format!("{}/api/", base)));
    links.insert("docs".to_string(), json!(format!("{}/swagger-ui/", base)));

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Welcome to the Employee Tasks API",
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "links": links
        }),
    )))
}

#[utoipa::path(
    get,
    path = "/api/",
    tag = "root",
    responses((status = 200, description = "Collection name to collection URL"))
)]
pub async fn api_root(req: HttpRequest) -> Result<HttpResponse> {
    log::info!("GET /api/");
    Ok(HttpResponse::Ok().json(collection_links(&base_url(&req))))
}

pub async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/api/").route(web::get().to(api_root)))
        .route("/favicon.ico", web::get().to(favicon));
}
