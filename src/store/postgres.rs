//! [`Store`] over PostgreSQL.
//!
//! Each write is a single statement. Task writes wrap the `INSERT`/`UPDATE`
//! in a CTE so the joined projection comes back in the same round trip.
//! Uniqueness and reference rules come from the schema's named constraints
//! and are translated back into field errors here.

use sqlx::{Postgres, QueryBuilder};

use crate::database::Database;
use crate::models::employee::{Employee, EmployeeFilter, EmployeeSort, EmployeeWrite};
use crate::models::task::{TaskDetail, TaskFilter, TaskSort, TaskWrite};
use crate::models::task_status::{TaskStatus, TaskStatusSort, TaskStatusWrite};
use crate::models::user::{User, UserSort};
use crate::store::{Store, StoreResult, StoreStats};
use crate::utils::errors::{already_exists, object_does_not_exist, FieldErrors, ServiceError};
use crate::utils::pagination::{offset_for, Listing, PAGE_SIZE};
use crate::utils::query::{like_pattern, ListQuery, OrderTerm, SortField};

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, email, phone_number, hire_date, position, department";

const TASK_COLUMNS: &str = "t.id, t.title, t.description, \
    t.status_id, ts.name AS status_name, \
    t.assigned_to_id, e.first_name AS assigned_to_first_name, e.last_name AS assigned_to_last_name, \
    t.assigned_by_id, u.username AS assigned_by_username, \
    t.due_date, t.created_at, t.updated_at";

const TASK_JOINS: &str = "LEFT JOIN task_statuses ts ON ts.id = t.status_id \
    LEFT JOIN employees e ON e.id = t.assigned_to_id \
    LEFT JOIN users u ON u.id = t.assigned_by_id";

const EMPLOYEE_SEARCH: [&str; 5] = ["first_name", "last_name", "email", "position", "department"];
const TASK_SEARCH: [&str; 2] = ["t.title", "t.description"];
const TASK_STATUS_SEARCH: [&str; 1] = ["name"];
const USER_SEARCH: [&str; 2] = ["first_name", "last_name"];

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> ServiceError {
    move |e| {
        log::error!("{}: {}", context, e);
        ServiceError::DatabaseError(context.to_string())
    }
}

/// Maps a named constraint violation to field errors, everything else to a
/// database error.
fn write_error(
    err: sqlx::Error,
    context: &'static str,
    fields_for: impl FnOnce(&str) -> Option<FieldErrors>,
) -> ServiceError {
    let fields = err
        .as_database_error()
        .and_then(|db_err| db_err.constraint())
        .and_then(fields_for);
    match fields {
        Some(fields) => ServiceError::ValidationError(fields),
        None => db_error(context)(err),
    }
}

/// Fallback for a reference removed between the check and the write.
fn task_reference_errors(task: &TaskWrite) -> impl FnOnce(&str) -> Option<FieldErrors> {
    let (status, assigned_to, assigned_by) = (task.status_id, task.assigned_to_id, task.assigned_by_id);
    move |constraint| {
        let (field, pk) = match constraint {
            "tasks_status_id_fkey" => ("status", status),
            "tasks_assigned_to_id_fkey" => ("assigned_to", assigned_to),
            "tasks_assigned_by_id_fkey" => ("assigned_by", assigned_by),
            _ => return None,
        };
        Some(FieldErrors::single(field, object_does_not_exist(pk.unwrap_or_default())))
    }
}

/// Reports every dangling reference of `task` in one round trip.
async fn check_task_references(pool: &sqlx::PgPool, task: &TaskWrite) -> Result<(), ServiceError> {
    let (status, assigned_to, assigned_by): (bool, bool, bool) = sqlx::query_as(
        "SELECT \
            $1::bigint IS NULL OR EXISTS (SELECT 1 FROM task_statuses WHERE id = $1), \
            $2::bigint IS NULL OR EXISTS (SELECT 1 FROM employees WHERE id = $2), \
            $3::bigint IS NULL OR EXISTS (SELECT 1 FROM users WHERE id = $3)",
    )
    .bind(task.status_id)
    .bind(task.assigned_to_id)
    .bind(task.assigned_by_id)
    .fetch_one(pool)
    .await
    .map_err(db_error("Failed to check task references"))?;

    task.reference_errors(status, assigned_to, assigned_by).into_result()
}

fn push_search(qb: &mut QueryBuilder<'_, Postgres>, columns: &[&str], terms: &[String]) {
    for term in terms {
        let pattern = like_pattern(term);
        qb.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
        }
        qb.push(")");
    }
}

/// Ordering terms followed by the identifier as tiebreaker, then the page window.
fn push_ordering_and_page<S: SortField>(
    qb: &mut QueryBuilder<'_, Postgres>,
    ordering: &[OrderTerm<S>],
    id_column: &str,
    page: i64,
) {
    qb.push(" ORDER BY ");
    for term in ordering {
        qb.push(term.field.column())
            .push(if term.descending { " DESC, " } else { " ASC, " });
    }
    qb.push(id_column).push(" ASC");
    qb.push(" LIMIT ").push_bind(PAGE_SIZE);
    qb.push(" OFFSET ").push_bind(offset_for(page));
}

fn push_employee_conditions(qb: &mut QueryBuilder<'_, Postgres>, filter: &EmployeeFilter, search: &[String]) {
    qb.push(" WHERE TRUE");
    if let Some(department) = &filter.department {
        qb.push(" AND department = ").push_bind(department.clone());
    }
    if let Some(position) = &filter.position {
        qb.push(" AND position = ").push_bind(position.clone());
    }
    push_search(qb, &EMPLOYEE_SEARCH, search);
}

fn push_task_conditions(qb: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter, search: &[String]) {
    qb.push(" WHERE TRUE");
    if let Some(assigned_to) = filter.assigned_to {
        qb.push(" AND t.assigned_to_id = ").push_bind(assigned_to);
    }
    if let Some(status) = filter.status {
        qb.push(" AND t.status_id = ").push_bind(status);
    }
    if let Some(assigned_by) = filter.assigned_by {
        qb.push(" AND t.assigned_by_id = ").push_bind(assigned_by);
    }
    push_search(qb, &TASK_SEARCH, search);
}

impl Store for Database {
    fn health_check(&self) -> StoreResult<'_, ()> {
        Box::pin(async move {
            Database::health_check(self)
                .await
                .map_err(|e| ServiceError::DatabaseError(e.to_string()))
        })
    }

    fn stats(&self) -> StoreResult<'_, StoreStats> {
        Box::pin(async move {
            self.get_stats()
                .await
                .map_err(|e| ServiceError::DatabaseError(e.to_string()))
        })
    }

    fn list_employees(&self, query: ListQuery<EmployeeFilter, EmployeeSort>) -> StoreResult<'_, Listing<Employee>> {
        Box::pin(async move {
            let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM employees");
            push_employee_conditions(&mut count, &query.filter, &query.search);
            let total = count
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to count employees"))?;
            let page = query.page.resolve(total)?;

            let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM employees", EMPLOYEE_COLUMNS));
            push_employee_conditions(&mut select, &query.filter, &query.search);
            push_ordering_and_page(&mut select, &query.ordering, "id", page);
            let items = select
                .build_query_as::<Employee>()
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to fetch employees"))?;

            Ok(Listing { items, total, page })
        })
    }

    fn get_employee(&self, id: i64) -> StoreResult<'_, Option<Employee>> {
        Box::pin(async move {
            let sql = format!("SELECT {} FROM employees WHERE id = $1", EMPLOYEE_COLUMNS);
            sqlx::query_as::<_, Employee>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to fetch employee"))
        })
    }

    fn create_employee(&self, employee: EmployeeWrite) -> StoreResult<'_, Employee> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO employees (first_name, last_name, email, phone_number, hire_date, position, department) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
                EMPLOYEE_COLUMNS
            );
            sqlx::query_as::<_, Employee>(&sql)
                .bind(&employee.first_name)
                .bind(&employee.last_name)
                .bind(&employee.email)
                .bind(&employee.phone_number)
                .bind(employee.hire_date)
                .bind(&employee.position)
                .bind(&employee.department)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| write_error(e, "Failed to create employee", employee_constraint))
        })
    }

    fn update_employee(&self, id: i64, employee: EmployeeWrite) -> StoreResult<'_, Option<Employee>> {
        Box::pin(async move {
            let sql = format!(
                "UPDATE employees SET first_name = $1, last_name = $2, email = $3, phone_number = $4, \
                 hire_date = $5, position = $6, department = $7 WHERE id = $8 RETURNING {}",
                EMPLOYEE_COLUMNS
            );
            sqlx::query_as::<_, Employee>(&sql)
                .bind(&employee.first_name)
                .bind(&employee.last_name)
                .bind(&employee.email)
                .bind(&employee.phone_number)
                .bind(employee.hire_date)
                .bind(&employee.position)
                .bind(&employee.department)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| write_error(e, "Failed to update employee", employee_constraint))
        })
    }

    fn delete_employee(&self, id: i64) -> StoreResult<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM employees WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to delete employee"))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn tasks_for_employees(&self, employee_ids: Vec<i64>) -> StoreResult<'_, Vec<TaskDetail>> {
        Box::pin(async move {
            if employee_ids.is_empty() {
                return Ok(Vec::new());
            }
            let sql = format!(
                "SELECT {} FROM tasks t {} WHERE t.assigned_to_id = ANY($1) ORDER BY t.due_date ASC, t.id ASC",
                TASK_COLUMNS, TASK_JOINS
            );
            sqlx::query_as::<_, TaskDetail>(&sql)
                .bind(employee_ids)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to fetch employee tasks"))
        })
    }

    fn list_tasks(&self, query: ListQuery<TaskFilter, TaskSort>) -> StoreResult<'_, Listing<TaskDetail>> {
        Box::pin(async move {
            let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
            push_task_conditions(&mut count, &query.filter, &query.search);
            let total = count
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to count tasks"))?;
            let page = query.page.resolve(total)?;

            let mut select =
                QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tasks t {}", TASK_COLUMNS, TASK_JOINS));
            push_task_conditions(&mut select, &query.filter, &query.search);
            push_ordering_and_page(&mut select, &query.ordering, "t.id", page);
            let items = select
                .build_query_as::<TaskDetail>()
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to fetch tasks"))?;

            Ok(Listing { items, total, page })
        })
    }

    fn get_task(&self, id: i64) -> StoreResult<'_, Option<TaskDetail>> {
        Box::pin(async move {
            let sql = format!("SELECT {} FROM tasks t {} WHERE t.id = $1", TASK_COLUMNS, TASK_JOINS);
            sqlx::query_as::<_, TaskDetail>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to fetch task"))
        })
    }

    fn create_task(&self, task: TaskWrite) -> StoreResult<'_, TaskDetail> {
        Box::pin(async move {
            check_task_references(&self.pool, &task).await?;
            let sql = format!(
                "WITH t AS (\
                    INSERT INTO tasks (title, description, status_id, assigned_to_id, assigned_by_id, due_date) \
                    VALUES ($1, $2, $3, $4, $5, $6) RETURNING *\
                 ) SELECT {} FROM t {}",
                TASK_COLUMNS, TASK_JOINS
            );
            sqlx::query_as::<_, TaskDetail>(&sql)
                .bind(&task.title)
                .bind(&task.description)
                .bind(task.status_id)
                .bind(task.assigned_to_id)
                .bind(task.assigned_by_id)
                .bind(task.due_date)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| write_error(e, "Failed to create task", task_reference_errors(&task)))
        })
    }

    fn update_task(&self, id: i64, task: TaskWrite) -> StoreResult<'_, Option<TaskDetail>> {
        Box::pin(async move {
            check_task_references(&self.pool, &task).await?;
            let sql = format!(
                "WITH t AS (\
                    UPDATE tasks SET title = $1, description = $2, status_id = $3, assigned_to_id = $4, \
                    assigned_by_id = $5, due_date = $6, updated_at = NOW() WHERE id = $7 RETURNING *\
                 ) SELECT {} FROM t {}",
                TASK_COLUMNS, TASK_JOINS
            );
            sqlx::query_as::<_, TaskDetail>(&sql)
                .bind(&task.title)
                .bind(&task.description)
                .bind(task.status_id)
                .bind(task.assigned_to_id)
                .bind(task.assigned_by_id)
                .bind(task.due_date)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| write_error(e, "Failed to update task", task_reference_errors(&task)))
        })
    }

    fn delete_task(&self, id: i64) -> StoreResult<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to delete task"))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn list_task_statuses(&self, query: ListQuery<(), TaskStatusSort>) -> StoreResult<'_, Listing<TaskStatus>> {
        Box::pin(async move {
            let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM task_statuses WHERE TRUE");
            push_search(&mut count, &TASK_STATUS_SEARCH, &query.search);
            let total = count
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to count task statuses"))?;
            let page = query.page.resolve(total)?;

            let mut select = QueryBuilder::<Postgres>::new("SELECT id, name, description FROM task_statuses WHERE TRUE");
            push_search(&mut select, &TASK_STATUS_SEARCH, &query.search);
            push_ordering_and_page(&mut select, &query.ordering, "id", page);
            let items = select
                .build_query_as::<TaskStatus>()
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to fetch task statuses"))?;

            Ok(Listing { items, total, page })
        })
    }

    fn get_task_status(&self, id: i64) -> StoreResult<'_, Option<TaskStatus>> {
        Box::pin(async move {
            sqlx::query_as::<_, TaskStatus>("SELECT id, name, description FROM task_statuses WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to fetch task status"))
        })
    }

    fn create_task_status(&self, status: TaskStatusWrite) -> StoreResult<'_, TaskStatus> {
        Box::pin(async move {
            sqlx::query_as::<_, TaskStatus>(
                "INSERT INTO task_statuses (name, description) VALUES ($1, $2) RETURNING id, name, description",
            )
            .bind(&status.name)
            .bind(&status.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "Failed to create task status", task_status_constraint))
        })
    }

    fn update_task_status(&self, id: i64, status: TaskStatusWrite) -> StoreResult<'_, Option<TaskStatus>> {
        Box::pin(async move {
            sqlx::query_as::<_, TaskStatus>(
                "UPDATE task_statuses SET name = $1, description = $2 WHERE id = $3 RETURNING id, name, description",
            )
            .bind(&status.name)
            .bind(&status.description)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "Failed to update task status", task_status_constraint))
        })
    }

    fn delete_task_status(&self, id: i64) -> StoreResult<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM task_statuses WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to delete task status"))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn list_users(&self, query: ListQuery<(), UserSort>) -> StoreResult<'_, Listing<User>> {
        Box::pin(async move {
            let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
            push_search(&mut count, &USER_SEARCH, &query.search);
            let total = count
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to count users"))?;
            let page = query.page.resolve(total)?;

            let mut select =
                QueryBuilder::<Postgres>::new("SELECT id, username, first_name, last_name FROM users WHERE TRUE");
            push_search(&mut select, &USER_SEARCH, &query.search);
            push_ordering_and_page(&mut select, &query.ordering, "id", page);
            let items = select
                .build_query_as::<User>()
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to fetch users"))?;

            Ok(Listing { items, total, page })
        })
    }

    fn get_user(&self, id: i64) -> StoreResult<'_, Option<User>> {
        Box::pin(async move {
            sqlx::query_as::<_, User>("SELECT id, username, first_name, last_name FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to fetch user"))
        })
    }
}

fn employee_constraint(constraint: &str) -> Option<FieldErrors> {
    (constraint == "employees_email_key").then(|| FieldErrors::single("email", already_exists("employee", "email")))
}

fn task_status_constraint(constraint: &str) -> Option<FieldErrors> {
    (constraint == "task_statuses_name_key")
        .then(|| FieldErrors::single("name", already_exists("task status", "name")))
}
