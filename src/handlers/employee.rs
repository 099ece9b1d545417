use actix_web::{web, HttpRequest, HttpResponse};
use std::collections::HashMap;

use crate::handlers::not_found;
use crate::models::employee::{Employee, EmployeeListQuery, EmployeePayload, EmployeeResponse};
use crate::models::response::{ErrorResponse, Paginated};
use crate::models::task::TaskResponse;
use crate::models::WriteMode;
use crate::store::Store;
use crate::utils::errors::ServiceError;
use crate::utils::pagination::Listing;

/// Attaches each employee's assigned tasks with a single store round trip.
async fn with_tasks(store: &dyn Store, listing: Listing<Employee>) -> Result<Listing<EmployeeResponse>, ServiceError> {
    let ids = listing.items.iter().map(|e| e.id).collect::<Vec<_>>();
    let mut by_employee: HashMap<i64, Vec<TaskResponse>> = HashMap::new();
    if !ids.is_empty() {
        for task in store.tasks_for_employees(ids).await? {
            if let Some(employee_id) = task.assigned_to_id {
                by_employee.entry(employee_id).or_default().push(task.into());
            }
        }
    }
    Ok(listing.map(|employee| {
        let tasks = by_employee.remove(&employee.id).unwrap_or_default();
        EmployeeResponse::new(employee, tasks)
    }))
}

async fn employee_response(store: &dyn Store, employee: Employee) -> Result<EmployeeResponse, ServiceError> {
    let tasks = store
        .tasks_for_employees(vec![employee.id])
        .await?
        .into_iter()
        .map(TaskResponse::from)
        .collect();
    Ok(EmployeeResponse::new(employee, tasks))
}

async fn find_employee(store: &dyn Store, employee_id: i64) -> Result<Employee, ServiceError> {
    store.get_employee(employee_id).await?.ok_or_else(|| {
        log::warn!("Employee not found: {}", employee_id);
        not_found("Employee")
    })
}

#[utoipa::path(
    get,
    path = "/api/employees/",
    tag = "employees",
    params(EmployeeListQuery),
    responses(
        (status = 200, description = "One page of employees", body = Paginated<EmployeeResponse>),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    )
)]
pub async fn list_employees(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    query: web::Query<EmployeeListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/employees");

    let listing = store.list_employees(query.into_inner().into_list_query()?).await?;
    let listing = with_tasks(store.get_ref(), listing).await?;

    log::info!("Retrieved {} of {} employees", listing.items.len(), listing.total);
    Ok(HttpResponse::Ok().json(listing.into_envelope(&req)))
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}/",
    tag = "employees",
    params(("id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee retrieved successfully", body = EmployeeResponse),
        (status = 404, description = "Employee not found", body = ErrorResponse)
    )
)]
pub async fn get_employee(store: web::Data<dyn Store>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let employee_id = path.into_inner();
    log::info!("GET /api/employees/{}", employee_id);

    let employee = find_employee(store.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee_response(store.get_ref(), employee).await?))
}

#[utoipa::path(
    post,
    path = "/api/employees/",
    tag = "employees",
    request_body = EmployeePayload,
    responses(
        (status = 201, description = "Employee created successfully", body = EmployeeResponse),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn create_employee(
    store: web::Data<dyn Store>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/employees");

    let write = payload.into_inner().resolve(None, WriteMode::Create)?;
    let employee = store.create_employee(write).await?;

    log::info!("Employee created successfully with ID: {}", employee.id);
    Ok(HttpResponse::Created().json(EmployeeResponse::new(employee, Vec::new())))
}

async fn write_employee(
    store: &dyn Store,
    employee_id: i64,
    payload: EmployeePayload,
    mode: WriteMode,
) -> Result<HttpResponse, ServiceError> {
    let existing = find_employee(store, employee_id).await?;
    let write = payload.resolve(Some(&existing), mode)?;
    let employee = store
        .update_employee(employee_id, write)
        .await?
        .ok_or_else(|| not_found("Employee"))?;

    log::info!("Employee updated successfully: {}", employee_id);
    Ok(HttpResponse::Ok().json(employee_response(store, employee).await?))
}

#[utoipa::path(
    put,
    path = "/api/employees/{id}/",
    tag = "employees",
    params(("id" = i64, Path, description = "Employee ID")),
    request_body = EmployeePayload,
    responses(
        (status = 200, description = "Employee replaced", body = EmployeeResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Employee not found", body = ErrorResponse)
    )
)]
pub async fn update_employee(
    store: web::Data<dyn Store>,
    path: web::Path<i64>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, ServiceError> {
    let employee_id = path.into_inner();
    log::info!("PUT /api/employees/{}", employee_id);
    write_employee(store.get_ref(), employee_id, payload.into_inner(), WriteMode::Replace).await
}

#[utoipa::path(
    patch,
    path = "/api/employees/{id}/",
    tag = "employees",
    params(("id" = i64, Path, description = "Employee ID")),
    request_body = EmployeePayload,
    responses(
        (status = 200, description = "Employee updated", body = EmployeeResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Employee not found", body = ErrorResponse)
    )
)]
pub async fn patch_employee(
    store: web::Data<dyn Store>,
    path: web::Path<i64>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, ServiceError> {
    let employee_id = path.into_inner();
    log::info!("PATCH /api/employees/{}", employee_id);
    write_employee(store.get_ref(), employee_id, payload.into_inner(), WriteMode::Patch).await
}

#[utoipa::path(
    delete,
    path = "/api/employees/{id}/",
    tag = "employees",
    params(("id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 204, description = "Employee deleted; their tasks become unassigned"),
        (status = 404, description = "Employee not found", body = ErrorResponse)
    )
)]
pub async fn delete_employee(store: web::Data<dyn Store>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let employee_id = path.into_inner();
    log::info!("DELETE /api/employees/{}", employee_id);

    if !store.delete_employee(employee_id).await? {
        log::warn!("Employee not found: {}", employee_id);
        return Err(not_found("Employee"));
    }

    log::info!("Employee deleted successfully: {}", employee_id);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}/tasks/",
    tag = "employees",
    params(("id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Tasks assigned to the employee", body = Vec<TaskResponse>),
        (status = 404, description = "Employee not found", body = ErrorResponse)
    )
)]
pub async fn employee_tasks(store: web::Data<dyn Store>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let employee_id = path.into_inner();
    log::info!("GET /api/employees/{}/tasks", employee_id);

    find_employee(store.get_ref(), employee_id).await?;
    let tasks: Vec<TaskResponse> = store
        .tasks_for_employees(vec![employee_id])
        .await?
        .into_iter()
        .map(TaskResponse::from)
        .collect();

    log::info!("Retrieved {} tasks for employee {}", tasks.len(), employee_id);
    Ok(HttpResponse::Ok().json(tasks))
}

pub fn employee_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/employees")
            .service(
                web::resource("/")
                    .route(web::get().to(list_employees))
                    .route(web::post().to(create_employee)),
            )
            .service(
                web::resource("/{id}/")
                    .route(web::get().to(get_employee))
                    .route(web::put().to(update_employee))
                    .route(web::patch().to(patch_employee))
                    .route(web::delete().to(delete_employee)),
            )
            .service(web::resource("/{id}/tasks/").route(web::get().to(employee_tasks))),
    );
}
