//! In-process [`Store`] with the same semantics as the Postgres one.
//!
//! State lives behind an `Arc<RwLock<...>>`; every operation takes the lock
//! once, so each call is atomic with respect to the others. Backs the HTTP
//! test suite.

use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::employee::{Employee, EmployeeFilter, EmployeeSort, EmployeeWrite};
use crate::models::task::{TaskDetail, TaskFilter, TaskSort, TaskWrite};
use crate::models::task_status::{TaskStatus, TaskStatusSort, TaskStatusWrite};
use crate::models::user::{User, UserSort};
use crate::store::{Store, StoreResult, StoreStats};
use crate::utils::errors::{already_exists, FieldErrors, ServiceError};
use crate::utils::pagination::Listing;
use crate::utils::query::{matches_search, ListQuery, OrderTerm};

/// A stored task; references are resolved when it is read.
#[derive(Debug, Clone)]
struct TaskRecord {
    id: i64,
    write: TaskWrite,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    employees: BTreeMap<i64, Employee>,
    task_statuses: BTreeMap<i64, TaskStatus>,
    tasks: BTreeMap<i64, TaskRecord>,
    users: BTreeMap<i64, User>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn detail(&self, record: &TaskRecord) -> TaskDetail {
        let write = &record.write;
        let status = write.status_id.and_then(|id| self.task_statuses.get(&id));
        let assignee = write.assigned_to_id.and_then(|id| self.employees.get(&id));
        let assigner = write.assigned_by_id.and_then(|id| self.users.get(&id));
        TaskDetail {
            id: record.id,
            title: write.title.clone(),
            description: write.description.clone(),
            status_id: write.status_id,
            status_name: status.map(|s| s.name.clone()),
            assigned_to_id: write.assigned_to_id,
            assigned_to_first_name: assignee.map(|e| e.first_name.clone()),
            assigned_to_last_name: assignee.map(|e| e.last_name.clone()),
            assigned_by_id: write.assigned_by_id,
            assigned_by_username: assigner.map(|u| u.username.clone()),
            due_date: write.due_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn check_employee(&self, id: Option<i64>, employee: &EmployeeWrite) -> Result<(), FieldErrors> {
        let taken = self
            .employees
            .values()
            .any(|e| Some(e.id) != id && e.email == employee.email);
        if taken {
            return Err(FieldErrors::single("email", already_exists("employee", "email")));
        }
        Ok(())
    }

    fn check_task_status(&self, id: Option<i64>, status: &TaskStatusWrite) -> Result<(), FieldErrors> {
        let taken = self
            .task_statuses
            .values()
            .any(|s| Some(s.id) != id && s.name == status.name);
        if taken {
            return Err(FieldErrors::single("name", already_exists("task status", "name")));
        }
        Ok(())
    }

    fn check_task(&self, task: &TaskWrite) -> Result<(), ServiceError> {
        task.reference_errors(
            task.status_id.map_or(true, |id| self.task_statuses.contains_key(&id)),
            task.assigned_to_id.map_or(true, |id| self.employees.contains_key(&id)),
            task.assigned_by_id.map_or(true, |id| self.users.contains_key(&id)),
        )
        .into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the user directory, which this API never writes to itself.
    pub async fn add_user(&self, username: &str, first_name: &str, last_name: &str) -> User {
        let mut state = self.state.write().await;
        let user = User {
            id: state.next_id(),
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        state.users.insert(user.id, user.clone());
        user
    }
}

/// Sorts by the requested terms with nulls last when ascending, then by id.
fn sort_by_terms<T, S: Copy>(
    items: &mut [T],
    ordering: &[OrderTerm<S>],
    compare: impl Fn(S, &T, &T) -> Ordering,
    id: impl Fn(&T) -> i64,
) {
    items.sort_by(|a, b| {
        ordering
            .iter()
            .map(|term| {
                let ord = compare(term.field, a, b);
                if term.descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| id(a).cmp(&id(b)))
    });
}

fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_employees(field: EmployeeSort, a: &Employee, b: &Employee) -> Ordering {
    match field {
        EmployeeSort::FirstName => a.first_name.cmp(&b.first_name),
        EmployeeSort::LastName => a.last_name.cmp(&b.last_name),
        EmployeeSort::HireDate => a.hire_date.cmp(&b.hire_date),
        EmployeeSort::Position => a.position.cmp(&b.position),
    }
}

fn compare_tasks(field: TaskSort, a: &TaskDetail, b: &TaskDetail) -> Ordering {
    match field {
        TaskSort::DueDate => nulls_last(&a.due_date, &b.due_date),
        TaskSort::CreatedAt => a.created_at.cmp(&b.created_at),
        TaskSort::StatusName => nulls_last(&a.status_name, &b.status_name),
    }
}

fn compare_users(field: UserSort, a: &User, b: &User) -> Ordering {
    match field {
        UserSort::Username => a.username.cmp(&b.username),
        UserSort::FirstName => a.first_name.cmp(&b.first_name),
    }
}

fn default_task_order(tasks: &mut [TaskDetail]) {
    sort_by_terms(tasks, &[OrderTerm::asc(TaskSort::DueDate)], compare_tasks, |t| t.id);
}

impl Store for MemoryStore {
    fn health_check(&self) -> StoreResult<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn stats(&self) -> StoreResult<'_, StoreStats> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(StoreStats {
                employees: state.employees.len() as i64,
                tasks: state.tasks.len() as i64,
                task_statuses: state.task_statuses.len() as i64,
                users: state.users.len() as i64,
            })
        })
    }

    fn list_employees(&self, query: ListQuery<EmployeeFilter, EmployeeSort>) -> StoreResult<'_, Listing<Employee>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let filter = &query.filter;
            let mut items: Vec<Employee> = state
                .employees
                .values()
                .filter(|e| filter.department.as_ref().map_or(true, |d| &e.department == d))
                .filter(|e| filter.position.as_ref().map_or(true, |p| &e.position == p))
                .filter(|e| {
                    matches_search(
                        &query.search,
                        &[
                            e.first_name.as_str(),
                            e.last_name.as_str(),
                            e.email.as_str(),
                            e.position.as_str(),
                            e.department.as_str(),
                        ],
                    )
                })
                .cloned()
                .collect();
            sort_by_terms(&mut items, &query.ordering, compare_employees, |e| e.id);
            Listing::from_vec(items, query.page)
        })
    }

    fn get_employee(&self, id: i64) -> StoreResult<'_, Option<Employee>> {
        Box::pin(async move { Ok(self.state.read().await.employees.get(&id).cloned()) })
    }

    fn create_employee(&self, employee: EmployeeWrite) -> StoreResult<'_, Employee> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            state.check_employee(None, &employee).map_err(ServiceError::ValidationError)?;
            let created = Employee {
                id: state.next_id(),
                first_name: employee.first_name,
                last_name: employee.last_name,
                email: employee.email,
                phone_number: employee.phone_number,
                hire_date: employee.hire_date,
                position: employee.position,
                department: employee.department,
            };
            state.employees.insert(created.id, created.clone());
            Ok(created)
        })
    }

    fn update_employee(&self, id: i64, employee: EmployeeWrite) -> StoreResult<'_, Option<Employee>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            if !state.employees.contains_key(&id) {
                return Ok(None);
            }
            state
                .check_employee(Some(id), &employee)
                .map_err(ServiceError::ValidationError)?;
            let updated = Employee {
                id,
                first_name: employee.first_name,
                last_name: employee.last_name,
                email: employee.email,
                phone_number: employee.phone_number,
                hire_date: employee.hire_date,
                position: employee.position,
                department: employee.department,
            };
            state.employees.insert(id, updated.clone());
            Ok(Some(updated))
        })
    }

    fn delete_employee(&self, id: i64) -> StoreResult<'_, bool> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            if state.employees.remove(&id).is_none() {
                return Ok(false);
            }
            for task in state.tasks.values_mut() {
                if task.write.assigned_to_id == Some(id) {
                    task.write.assigned_to_id = None;
                }
            }
            Ok(true)
        })
    }

    fn tasks_for_employees(&self, employee_ids: Vec<i64>) -> StoreResult<'_, Vec<TaskDetail>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut tasks: Vec<TaskDetail> = state
                .tasks
                .values()
                .filter(|t| t.write.assigned_to_id.is_some_and(|id| employee_ids.contains(&id)))
                .map(|t| state.detail(t))
                .collect();
            default_task_order(&mut tasks);
            Ok(tasks)
        })
    }

    fn list_tasks(&self, query: ListQuery<TaskFilter, TaskSort>) -> StoreResult<'_, Listing<TaskDetail>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let filter = &query.filter;
            let mut items: Vec<TaskDetail> = state
                .tasks
                .values()
                .map(|t| state.detail(t))
                .filter(|t| filter.assigned_to.map_or(true, |id| t.assigned_to_id == Some(id)))
                .filter(|t| filter.status.map_or(true, |id| t.status_id == Some(id)))
                .filter(|t| filter.assigned_by.map_or(true, |id| t.assigned_by_id == Some(id)))
                .filter(|t| {
                    matches_search(
                        &query.search,
                        &[t.title.as_str(), t.description.as_deref().unwrap_or_default()],
                    )
                })
                .collect();
            sort_by_terms(&mut items, &query.ordering, compare_tasks, |t| t.id);
            Listing::from_vec(items, query.page)
        })
    }

    fn get_task(&self, id: i64) -> StoreResult<'_, Option<TaskDetail>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state.tasks.get(&id).map(|t| state.detail(t)))
        })
    }

    fn create_task(&self, task: TaskWrite) -> StoreResult<'_, TaskDetail> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            state.check_task(&task)?;
            let now = Utc::now();
            let record = TaskRecord {
                id: state.next_id(),
                write: task,
                created_at: now,
                updated_at: now,
            };
            let detail = state.detail(&record);
            state.tasks.insert(record.id, record);
            Ok(detail)
        })
    }

    fn update_task(&self, id: i64, task: TaskWrite) -> StoreResult<'_, Option<TaskDetail>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let created_at = match state.tasks.get(&id) {
                Some(existing) => existing.created_at,
                None => return Ok(None),
            };
            state.check_task(&task)?;
            let record = TaskRecord {
                id,
                write: task,
                created_at,
                updated_at: Utc::now(),
            };
            let detail = state.detail(&record);
            state.tasks.insert(id, record);
            Ok(Some(detail))
        })
    }

    fn delete_task(&self, id: i64) -> StoreResult<'_, bool> {
        Box::pin(async move { Ok(self.state.write().await.tasks.remove(&id).is_some()) })
    }

    fn list_task_statuses(&self, query: ListQuery<(), TaskStatusSort>) -> StoreResult<'_, Listing<TaskStatus>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut items: Vec<TaskStatus> = state
                .task_statuses
                .values()
                .filter(|s| matches_search(&query.search, &[s.name.as_str()]))
                .cloned()
                .collect();
            sort_by_terms(
                &mut items,
                &query.ordering,
                |TaskStatusSort::Name, a: &TaskStatus, b: &TaskStatus| a.name.cmp(&b.name),
                |s| s.id,
            );
            Listing::from_vec(items, query.page)
        })
    }

    fn get_task_status(&self, id: i64) -> StoreResult<'_, Option<TaskStatus>> {
        Box::pin(async move { Ok(self.state.read().await.task_statuses.get(&id).cloned()) })
    }

    fn create_task_status(&self, status: TaskStatusWrite) -> StoreResult<'_, TaskStatus> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            state
                .check_task_status(None, &status)
                .map_err(ServiceError::ValidationError)?;
            let created = TaskStatus {
                id: state.next_id(),
                name: status.name,
                description: status.description,
            };
            state.task_statuses.insert(created.id, created.clone());
            Ok(created)
        })
    }

    fn update_task_status(&self, id: i64, status: TaskStatusWrite) -> StoreResult<'_, Option<TaskStatus>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            if !state.task_statuses.contains_key(&id) {
                return Ok(None);
            }
            state
                .check_task_status(Some(id), &status)
                .map_err(ServiceError::ValidationError)?;
            let updated = TaskStatus {
                id,
                name: status.name,
                description: status.description,
            };
            state.task_statuses.insert(id, updated.clone());
            Ok(Some(updated))
        })
    }

    fn delete_task_status(&self, id: i64) -> StoreResult<'_, bool> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            if state.task_statuses.remove(&id).is_none() {
                return Ok(false);
            }
            for task in state.tasks.values_mut() {
                if task.write.status_id == Some(id) {
                    task.write.status_id = None;
                }
            }
            Ok(true)
        })
    }

    fn list_users(&self, query: ListQuery<(), UserSort>) -> StoreResult<'_, Listing<User>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut items: Vec<User> = state
                .users
                .values()
                .filter(|u| matches_search(&query.search, &[u.first_name.as_str(), u.last_name.as_str()]))
                .cloned()
                .collect();
            sort_by_terms(&mut items, &query.ordering, compare_users, |u| u.id);
            Listing::from_vec(items, query.page)
        })
    }

    fn get_user(&self, id: i64) -> StoreResult<'_, Option<User>> {
        Box::pin(async move { Ok(self.state.read().await.users.get(&id).cloned()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pagination::PageSelector;
    use crate::utils::errors::object_does_not_exist;
    use chrono::NaiveDate;

    fn employee(first: &str, last: &str, email: &str) -> EmployeeWrite {
        EmployeeWrite {
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            phone_number: None,
            hire_date: NaiveDate::from_ymd_opt(2022, 1, 10).unwrap(),
            position: "Engineer".into(),
            department: "R&D".into(),
        }
    }

    fn task(title: &str, assigned_to: Option<i64>, status: Option<i64>) -> TaskWrite {
        TaskWrite {
            title: title.into(),
            description: None,
            status_id: status,
            assigned_to_id: assigned_to,
            assigned_by_id: None,
            due_date: None,
        }
    }

    fn all_tasks() -> ListQuery<TaskFilter, TaskSort> {
        ListQuery {
            filter: TaskFilter::default(),
            search: vec![],
            ordering: vec![OrderTerm::asc(TaskSort::DueDate)],
            page: PageSelector::default(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_field_error() {
        let store = MemoryStore::new();
        store.create_employee(employee("Ann", "Lee", "ann@example.com")).await.unwrap();
        let err = store
            .create_employee(employee("Anne", "Leigh", "ann@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(e) if e.contains("email")));
        assert_eq!(store.stats().await.unwrap().employees, 1);
    }

    #[tokio::test]
    async fn updating_an_employee_may_keep_its_own_email() {
        let store = MemoryStore::new();
        let ann = store.create_employee(employee("Ann", "Lee", "ann@example.com")).await.unwrap();
        let mut write = employee("Ann", "Lee-Park", "ann@example.com");
        write.department = "Ops".into();
        let updated = store.update_employee(ann.id, write).await.unwrap().unwrap();
        assert_eq!(updated.last_name, "Lee-Park");
    }

    #[tokio::test]
    async fn deleting_a_status_nulls_task_references() {
        let store = MemoryStore::new();
        let status = store
            .create_task_status(TaskStatusWrite { name: "Open".into(), description: None })
            .await
            .unwrap();
        for title in ["a", "b", "c"] {
            store.create_task(task(title, None, Some(status.id))).await.unwrap();
        }

        assert!(store.delete_task_status(status.id).await.unwrap());
        let tasks = store.list_tasks(all_tasks()).await.unwrap();
        assert_eq!(tasks.total, 3);
        assert!(tasks.items.iter().all(|t| t.status_id.is_none() && t.status_name.is_none()));
        assert!(!store.delete_task_status(status.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_an_employee_unassigns_tasks() {
        let store = MemoryStore::new();
        let ann = store.create_employee(employee("Ann", "Lee", "ann@example.com")).await.unwrap();
        store.create_task(task("review", Some(ann.id), None)).await.unwrap();

        assert!(store.delete_employee(ann.id).await.unwrap());
        let tasks = store.list_tasks(all_tasks()).await.unwrap();
        assert_eq!(tasks.items.len(), 1);
        assert_eq!(tasks.items[0].assigned_to_id, None);
    }

    #[tokio::test]
    async fn dangling_references_are_rejected() {
        let store = MemoryStore::new();
        let err = store.create_task(task("orphan", Some(40), Some(41))).await.unwrap_err();
        match err {
            ServiceError::ValidationError(errors) => {
                assert_eq!(errors.get("assigned_to"), Some(&[object_does_not_exist(40)][..]));
                assert_eq!(errors.get("status"), Some(&[object_does_not_exist(41)][..]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn due_dates_sort_with_nulls_last() {
        let store = MemoryStore::new();
        let mut undated = task("undated", None, None);
        undated.due_date = None;
        let mut late = task("late", None, None);
        late.due_date = NaiveDate::from_ymd_opt(2024, 12, 1);
        let mut early = task("early", None, None);
        early.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        for t in [undated, late, early] {
            store.create_task(t).await.unwrap();
        }

        let titles = |listing: Listing<TaskDetail>| listing.items.into_iter().map(|t| t.title).collect::<Vec<_>>();
        assert_eq!(titles(store.list_tasks(all_tasks()).await.unwrap()), ["early", "late", "undated"]);

        let mut reversed = all_tasks();
        reversed.ordering = vec![OrderTerm::desc(TaskSort::DueDate)];
        assert_eq!(titles(store.list_tasks(reversed).await.unwrap()), ["undated", "late", "early"]);
    }
}
