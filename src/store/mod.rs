//! Persistence boundary for the four resource collections.
//!
//! [`Store`] is implemented by the Postgres-backed [`crate::Database`] and by
//! [`memory::MemoryStore`]. Both enforce the same write rules: unique
//! employee emails and status names, references that must point at existing
//! rows, and deletes that null out dependent task references instead of
//! removing the tasks.

pub mod memory;
pub mod postgres;

use futures_util::future::BoxFuture;

use crate::models::employee::{Employee, EmployeeFilter, EmployeeSort, EmployeeWrite};
use crate::models::task::{TaskDetail, TaskFilter, TaskSort, TaskWrite};
use crate::models::task_status::{TaskStatus, TaskStatusSort, TaskStatusWrite};
use crate::models::user::{User, UserSort};
use crate::utils::errors::ServiceError;
use crate::utils::pagination::Listing;
use crate::utils::query::ListQuery;

pub type StoreResult<'a, T> = BoxFuture<'a, Result<T, ServiceError>>;

pub trait Store: Send + Sync {
    fn health_check(&self) -> StoreResult<'_, ()>;
    fn stats(&self) -> StoreResult<'_, StoreStats>;

    fn list_employees(&self, query: ListQuery<EmployeeFilter, EmployeeSort>) -> StoreResult<'_, Listing<Employee>>;
    fn get_employee(&self, id: i64) -> StoreResult<'_, Option<Employee>>;
    fn create_employee(&self, employee: EmployeeWrite) -> StoreResult<'_, Employee>;
    fn update_employee(&self, id: i64, employee: EmployeeWrite) -> StoreResult<'_, Option<Employee>>;
    /// Returns `false` when there was nothing to delete.
    fn delete_employee(&self, id: i64) -> StoreResult<'_, bool>;
    /// Tasks assigned to any of `employee_ids`, in default task order.
    fn tasks_for_employees(&self, employee_ids: Vec<i64>) -> StoreResult<'_, Vec<TaskDetail>>;

    fn list_tasks(&self, query: ListQuery<TaskFilter, TaskSort>) -> StoreResult<'_, Listing<TaskDetail>>;
    fn get_task(&self, id: i64) -> StoreResult<'_, Option<TaskDetail>>;
    fn create_task(&self, task: TaskWrite) -> StoreResult<'_, TaskDetail>;
    fn update_task(&self, id: i64, task: TaskWrite) -> StoreResult<'_, Option<TaskDetail>>;
    fn delete_task(&self, id: i64) -> StoreResult<'_, bool>;

    fn list_task_statuses(&self, query: ListQuery<(), TaskStatusSort>) -> StoreResult<'_, Listing<TaskStatus>>;
    fn get_task_status(&self, id: i64) -> StoreResult<'_, Option<TaskStatus>>;
    fn create_task_status(&self, status: TaskStatusWrite) -> StoreResult<'_, TaskStatus>;
    fn update_task_status(&self, id: i64, status: TaskStatusWrite) -> StoreResult<'_, Option<TaskStatus>>;
    fn delete_task_status(&self, id: i64) -> StoreResult<'_, bool>;

    fn list_users(&self, query: ListQuery<(), UserSort>) -> StoreResult<'_, Listing<User>>;
    fn get_user(&self, id: i64) -> StoreResult<'_, Option<User>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    pub employees: i64,
    pub tasks: i64,
    pub task_statuses: i64,
    pub users: i64,
}

impl StoreStats {
    pub fn log_stats(&self) {
        log::info!("📈 Database Statistics:");
        log::info!("   👥 Employees: {}", self.employees);
        log::info!("   📋 Tasks: {}", self.tasks);
        log::info!("   🏷️  Task statuses: {}", self.task_statuses);
        log::info!("   🔑 Users: {}", self.users);
    }
}
