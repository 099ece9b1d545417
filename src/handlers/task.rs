use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;

use crate::auth::acting_user;
use crate::config::AppConfig;
use crate::handlers::not_found;
use crate::models::response::{ErrorResponse, Paginated};
use crate::models::task::{TaskDetail, TaskListQuery, TaskPayload, TaskResponse};
use crate::models::WriteMode;
use crate::store::Store;
use crate::utils::errors::ServiceError;

async fn find_task(store: &dyn Store, task_id: i64) -> Result<TaskDetail, ServiceError> {
    store.get_task(task_id).await?.ok_or_else(|| {
        log::warn!("Task not found: {}", task_id);
        not_found("Task")
    })
}

#[utoipa::path(
    get,
    path = "/api/tasks/",
    tag = "tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "One page of tasks", body = Paginated<TaskResponse>),
        (status = 400, description = "Invalid filter value", body = ErrorResponse),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    )
)]
pub async fn get_tasks(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks");

    let listing = store
        .list_tasks(query.into_inner().into_list_query()?)
        .await?
        .map(TaskResponse::from);

    log::info!("Retrieved {} of {} tasks", listing.items.len(), listing.total);
    Ok(HttpResponse::Ok().json(listing.into_envelope(&req)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}/",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task retrieved successfully", body = TaskResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn get_task(store: web::Data<dyn Store>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("GET /api/tasks/{}", task_id);

    let task = find_task(store.get_ref(), task_id).await?;
    Ok(HttpResponse::Ok().json(TaskResponse::from(task)))
}

#[utoipa::path(
    post,
    path = "/api/tasks/",
    tag = "tasks",
    security((), ("bearer_auth" = [])),
    request_body = TaskPayload,
    responses(
        (status = 201, description = "Task created successfully", body = TaskResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Invalid bearer token", body = ErrorResponse)
    )
)]
pub async fn create_task(
    store: web::Data<dyn Store>,
    config: web::Data<AppConfig>,
    auth: Option<BearerAuth>,
    payload: web::Json<TaskPayload>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/tasks");

    let user_id = acting_user(auth, &config)?;
    let write = payload.into_inner().resolve_new(user_id)?;
    let task = store.create_task(write).await?;

    log::info!("Task created successfully with ID: {}", task.id);
    Ok(HttpResponse::Created().json(TaskResponse::from(task)))
}

async fn write_task(
    store: &dyn Store,
    task_id: i64,
    payload: TaskPayload,
    mode: WriteMode,
) -> Result<HttpResponse, ServiceError> {
    let existing = find_task(store, task_id).await?;
    let write = payload.resolve(Some(&existing), mode)?;
    let task = store
        .update_task(task_id, write)
        .await?
        .ok_or_else(|| not_found("Task"))?;

    log::info!("Task updated successfully: {}", task_id);
    Ok(HttpResponse::Ok().json(TaskResponse::from(task)))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}/",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    request_body = TaskPayload,
    responses(
        (status = 200, description = "Task replaced", body = TaskResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn update_task(
    store: web::Data<dyn Store>,
    path: web::Path<i64>,
    payload: web::Json<TaskPayload>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("PUT /api/tasks/{}", task_id);
    write_task(store.get_ref(), task_id, payload.into_inner(), WriteMode::Replace).await
}

#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    request_body = TaskPayload,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn patch_task(
    store: web::Data<dyn Store>,
    path: web::Path<i64>,
    payload: web::Json<TaskPayload>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("PATCH /api/tasks/{}", task_id);
    write_task(store.get_ref(), task_id, payload.into_inner(), WriteMode::Patch).await
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}/",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn delete_task(store: web::Data<dyn Store>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("DELETE /api/tasks/{}", task_id);

    if !store.delete_task(task_id).await? {
        log::warn!("Task not found: {}", task_id);
        return Err(not_found("Task"));
    }

    log::info!("Task deleted successfully: {}", task_id);
    Ok(HttpResponse::NoContent().finish())
}

pub fn task_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .service(
                web::resource("/")
                    .route(web::get().to(get_tasks))
                    .route(web::post().to(create_task)),
            )
            .service(
                web::resource("/{id}/")
                    .route(web::get().to(get_task))
                    .route(web::put().to(update_task))
                    .route(web::patch().to(patch_task))
                    .route(web::delete().to(delete_task)),
            ),
    );
}
