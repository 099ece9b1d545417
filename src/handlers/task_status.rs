use actix_web::{web, HttpRequest, HttpResponse};

use crate::handlers::not_found;
use crate::models::response::{ErrorResponse, Paginated};
use crate::models::task_status::{TaskStatus, TaskStatusListQuery, TaskStatusPayload};
use crate::models::WriteMode;
use crate::store::Store;
use crate::utils::errors::ServiceError;

async fn find_status(store: &dyn Store, status_id: i64) -> Result<TaskStatus, ServiceError> {
    store.get_task_status(status_id).await?.ok_or_else(|| {
        log::warn!("Task status not found: {}", status_id);
        not_found("TaskStatus")
    })
}

#[utoipa::path(
    get,
    path = "/api/task-statuses/",
    tag = "task-statuses",
    params(TaskStatusListQuery),
    responses(
        (status = 200, description = "One page of task statuses", body = Paginated<TaskStatus>),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    )
)]
pub async fn list_task_statuses(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    query: web::Query<TaskStatusListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/task-statuses");

    let listing = store.list_task_statuses(query.into_inner().into_list_query()?).await?;
    Ok(HttpResponse::Ok().json(listing.into_envelope(&req)))
}

#[utoipa::path(
    get,
    path = "/api/task-statuses/{id}/",
    tag = "task-statuses",
    params(("id" = i64, Path, description = "Task status ID")),
    responses(
        (status = 200, description = "Task status retrieved successfully", body = TaskStatus),
        (status = 404, description = "Task status not found", body = ErrorResponse)
    )
)]
pub async fn get_task_status(store: web::Data<dyn Store>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let status_id = path.into_inner();
    log::info!("GET /api/task-statuses/{}", status_id);

    Ok(HttpResponse::Ok().json(find_status(store.get_ref(), status_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/task-statuses/",
    tag = "task-statuses",
    request_body = TaskStatusPayload,
    responses(
        (status = 201, description = "Task status created successfully", body = TaskStatus),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn create_task_status(
    store: web::Data<dyn Store>,
    payload: web::Json<TaskStatusPayload>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/task-statuses");

    let write = payload.into_inner().resolve(None, WriteMode::Create)?;
    let status = store.create_task_status(write).await?;

    log::info!("Task status created successfully with ID: {}", status.id);
    Ok(HttpResponse::Created().json(status))
}

async fn write_task_status(
    store: &dyn Store,
    status_id: i64,
    payload: TaskStatusPayload,
    mode: WriteMode,
) -> Result<HttpResponse, ServiceError> {
    let existing = find_status(store, status_id).await?;
    let write = payload.resolve(Some(&existing), mode)?;
    let status = store
        .update_task_status(status_id, write)
        .await?
        .ok_or_else(|| not_found("TaskStatus"))?;

    log::info!("Task status updated successfully: {}", status_id);
    Ok(HttpResponse::Ok().json(status))
}

#[utoipa::path(
    put,
    path = "/api/task-statuses/{id}/",
    tag = "task-statuses",
    params(("id" = i64, Path, description = "Task status ID")),
    request_body = TaskStatusPayload,
    responses(
        (status = 200, description = "Task status replaced", body = TaskStatus),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Task status not found", body = ErrorResponse)
    )
)]
pub async fn update_task_status(
    store: web::Data<dyn Store>,
    path: web::Path<i64>,
    payload: web::Json<TaskStatusPayload>,
) -> Result<HttpResponse, ServiceError> {
    let status_id = path.into_inner();
    log::info!("PUT /api/task-statuses/{}", status_id);
    write_task_status(store.get_ref(), status_id, payload.into_inner(), WriteMode::Replace).await
}

#[utoipa::path(
    patch,
    path = "/api/task-statuses/{id}/",
    tag = "task-statuses",
    params(("id" = i64, Path, description = "Task status ID")),
    request_body = TaskStatusPayload,
    responses(
        (status = 200, description = "Task status updated", body = TaskStatus),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Task status not found", body = ErrorResponse)
    )
)]
pub async fn patch_task_status(
    store: web::Data<dyn Store>,
    path: web::Path<i64>,
    payload: web::Json<TaskStatusPayload>,
) -> Result<HttpResponse, ServiceError> {
    let status_id = path.into_inner();
    log::info!("PATCH /api/task-statuses/{}", status_id);
    write_task_status(store.get_ref(), status_id, payload.into_inner(), WriteMode::Patch).await
}

#[utoipa::path(
    delete,
    path = "/api/task-statuses/{id}/",
    tag = "task-statuses",
    params(("id" = i64, Path, description = "Task status ID")),
    responses(
        (status = 204, description = "Task status deleted; its tasks keep existing without a status"),
        (status = 404, description = "Task status not found", body = ErrorResponse)
    )
)]
pub async fn delete_task_status(
    store: web::Data<dyn Store>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let status_id = path.into_inner();
    log::info!("DELETE /api/task-statuses/{}", status_id);

    if !store.delete_task_status(status_id).await? {
        log::warn!("Task status not found: {}", status_id);
        return Err(not_found("TaskStatus"));
    }

    log::info!("Task status deleted successfully: {}", status_id);
    Ok(HttpResponse::NoContent().finish())
}

pub fn task_status_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/task-statuses")
            .service(
                web::resource("/")
                    .route(web::get().to(list_task_statuses))
                    .route(web::post().to(create_task_status)),
            )
            .service(
                web::resource("/{id}/")
                    .route(web::get().to(get_task_status))
                    .route(web::put().to(update_task_status))
                    .route(web::patch().to(patch_task_status))
                    .route(web::delete().to(delete_task_status)),
            ),
    );
}
