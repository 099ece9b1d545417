use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{employee, health, root, task, task_status, user};
use crate::models::employee::{EmployeePayload, EmployeeResponse};
use crate::models::response::{ErrorResponse, Paginated};
use crate::models::task::{TaskPayload, TaskResponse};
use crate::models::task_status::{TaskStatus, TaskStatusPayload};
use crate::models::user::User;

#[derive(OpenApi)]
#[openapi(
    info(title = "Employee Tasks API", description = "Employees, tasks, task statuses and users"),
    paths(
        root::index,
        root::api_root,
        health::health_check,
        employee::list_employees,
        employee::get_employee,
        employee::create_employee,
        employee::update_employee,
        employee::patch_employee,
        employee::delete_employee,
        employee::employee_tasks,
        task::get_tasks,
        task::get_task,
        task::create_task,
        task::update_task,
        task::patch_task,
        task::delete_task,
        task_status::list_task_statuses,
        task_status::get_task_status,
        task_status::create_task_status,
        task_status::update_task_status,
        task_status::patch_task_status,
        task_status::delete_task_status,
        user::list_users,
        user::get_user,
    ),
    components(schemas(
        EmployeeResponse,
        EmployeePayload,
        TaskResponse,
        TaskPayload,
        TaskStatus,
        TaskStatusPayload,
        User,
        ErrorResponse,
        Paginated<EmployeeResponse>,
        Paginated<TaskResponse>,
        Paginated<TaskStatus>,
        Paginated<User>,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "employees", description = "Employee directory"),
        (name = "tasks", description = "Task tracking"),
        (name = "task-statuses", description = "Task status catalog"),
        (name = "users", description = "Read-only user directory"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_collection() {
        let doc = ApiDoc::openapi();
        for path in ["/api/employees/", "/api/employees/{id}/tasks/", "/api/tasks/{id}/", "/api/task-statuses/", "/api/users/{id}/"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = &doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
