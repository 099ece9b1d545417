use chrono::{DateTime, NaiveDate, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{nullable, not_blank, FieldResolver, WriteMode};
use crate::utils::errors::{object_does_not_exist, FieldErrors, ServiceError};
use crate::utils::query::{id_filter, ListQuery, OrderTerm, SortField};

/// A task row joined with the labels of everything it references.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TaskDetail {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    pub status_name: Option<String>,
    pub assigned_to_id: Option<i64>,
    pub assigned_to_first_name: Option<String>,
    pub assigned_to_last_name: Option<String>,
    pub assigned_by_id: Option<i64>,
    pub assigned_by_username: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskDetail {
    /// `"first last"` of the assignee, if there is one.
    pub fn assigned_to_name(&self) -> Option<String> {
        self.assigned_to_id?;
        let first = self.assigned_to_first_name.as_deref().unwrap_or_default();
        let last = self.assigned_to_last_name.as_deref().unwrap_or_default();
        Some(format!("{} {}", first, last).trim().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<i64>,
    pub assigned_to_name: Option<String>,
    pub assigned_by: Option<i64>,
    pub assigned_by_name: Option<String>,
    pub status: Option<i64>,
    pub status_name: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskDetail> for TaskResponse {
    fn from(task: TaskDetail) -> Self {
        let assigned_to_name = task.assigned_to_name();
        TaskResponse {
            id: task.id,
            title: task.title,
            description: task.description,
            assigned_to: task.assigned_to_id,
            assigned_to_name,
            assigned_by: task.assigned_by_id,
            assigned_by_name: task.assigned_by_id.and(task.assigned_by_username),
            status: task.status_id,
            status_name: task.status_id.and(task.status_name),
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Incoming task body. References are plain identifiers.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TaskPayload {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, nullable)]
    pub description: Option<Option<Value>>,
    /// Employee id
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable)]
    pub assigned_to: Option<Option<Value>>,
    /// User id; defaults to the acting user on create
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable)]
    pub assigned_by: Option<Option<Value>>,
    /// Task status id
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>, nullable)]
    pub status: Option<Option<Value>>,
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = Date, nullable)]
    pub due_date: Option<Option<Value>>,

    #[serde(default)]
    #[schema(ignore)]
    pub id: Option<IgnoredAny>,
    #[serde(default)]
    #[schema(ignore)]
    pub assigned_to_name: Option<IgnoredAny>,
    #[serde(default)]
    #[schema(ignore)]
    pub assigned_by_name: Option<IgnoredAny>,
    #[serde(default)]
    #[schema(ignore)]
    pub status_name: Option<IgnoredAny>,
    #[serde(default)]
    #[schema(ignore)]
    pub created_at: Option<IgnoredAny>,
    #[serde(default)]
    #[schema(ignore)]
    pub updated_at: Option<IgnoredAny>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct TaskWrite {
    #[validate(
        custom(function = "not_blank"),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub title: String,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub assigned_by_id: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

impl TaskWrite {
    /// Field errors for references that point at nothing. Each flag tells
    /// whether the referenced row exists; unset references never fail.
    pub fn reference_errors(&self, status_exists: bool, assignee_exists: bool, assigner_exists: bool) -> FieldErrors {
        let mut errors = FieldErrors::default();
        let references = [
            ("status", self.status_id, status_exists),
            ("assigned_to", self.assigned_to_id, assignee_exists),
            ("assigned_by", self.assigned_by_id, assigner_exists),
        ];
        for (field, id, exists) in references {
            if let Some(pk) = id.filter(|_| !exists) {
                errors.add(field, object_does_not_exist(pk));
            }
        }
        errors
    }
}

impl TaskPayload {
    pub fn resolve(self, existing: Option<&TaskDetail>, mode: WriteMode) -> Result<TaskWrite, ServiceError> {
        let mut fields = FieldResolver::new(mode);
        let write = TaskWrite {
            title: fields.required_text("title", self.title, existing.map(|t| t.title.as_str())),
            description: fields.optional_text(
                "description",
                self.description,
                existing.and_then(|t| t.description.as_deref()),
            ),
            status_id: fields.optional_id("status", self.status, existing.and_then(|t| t.status_id)),
            assigned_to_id: fields.optional_id(
                "assigned_to",
                self.assigned_to,
                existing.and_then(|t| t.assigned_to_id),
            ),
            assigned_by_id: fields.optional_id(
                "assigned_by",
                self.assigned_by,
                existing.and_then(|t| t.assigned_by_id),
            ),
            due_date: fields.optional_date("due_date", self.due_date, existing.and_then(|t| t.due_date)),
        };
        fields.finish(write.validate())?;
        Ok(write)
    }

    /// Resolves a new task, recording the acting user as `assigned_by`
    /// unless the payload names one itself.
    pub fn resolve_new(self, acting_user: Option<i64>) -> Result<TaskWrite, ServiceError> {
        let names_assigner = self.assigned_by.is_some();
        let mut write = self.resolve(None, WriteMode::Create)?;
        if !names_assigner {
            write.assigned_by_id = acting_user;
        }
        Ok(write)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub assigned_to: Option<i64>,
    pub status: Option<i64>,
    pub assigned_by: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSort {
    DueDate,
    CreatedAt,
    StatusName,
}

impl SortField for TaskSort {
    fn from_param(name: &str) -> Option<Self> {
        match name {
            "due_date" => Some(TaskSort::DueDate),
            "created_at" => Some(TaskSort::CreatedAt),
            "status__name" => Some(TaskSort::StatusName),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            TaskSort::DueDate => "t.due_date",
            TaskSort::CreatedAt => "t.created_at",
            TaskSort::StatusName => "ts.name",
        }
    }

    fn default_ordering() -> Vec<OrderTerm<Self>> {
        vec![OrderTerm::asc(TaskSort::DueDate)]
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// Employee id
    pub assigned_to: Option<String>,
    /// Task status id
    pub status: Option<String>,
    /// User id
    pub assigned_by: Option<String>,
    /// Matches title or description
    pub search: Option<String>,
    /// `due_date`, `created_at` or `status__name`; prefix `-` to reverse
    pub ordering: Option<String>,
    /// 1-based page number, or `last`
    pub page: Option<String>,
}

impl TaskListQuery {
    pub fn into_list_query(self) -> Result<ListQuery<TaskFilter, TaskSort>, ServiceError> {
        let mut errors = FieldErrors::default();
        let filter = TaskFilter {
            assigned_to: id_filter("assigned_to", self.assigned_to.as_deref(), &mut errors),
            status: id_filter("status", self.status.as_deref(), &mut errors),
            assigned_by: id_filter("assigned_by", self.assigned_by.as_deref(), &mut errors),
        };
        errors.into_result()?;
        ListQuery::new(
            filter,
            self.search.as_deref(),
            self.ordering.as_deref(),
            self.page.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detail() -> TaskDetail {
        let now = Utc::now();
        TaskDetail {
            id: 7,
            title: "Quarterly report".into(),
            description: None,
            status_id: Some(2),
            status_name: Some("In Progress".into()),
            assigned_to_id: Some(3),
            assigned_to_first_name: Some("Alice".into()),
            assigned_to_last_name: Some("Smith".into()),
            assigned_by_id: Some(1),
            assigned_by_username: Some("admin".into()),
            due_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn projection_derives_display_names() {
        let response = TaskResponse::from(detail());
        assert_eq!(response.status, Some(2));
        assert_eq!(response.status_name.as_deref(), Some("In Progress"));
        assert_eq!(response.assigned_to_name.as_deref(), Some("Alice Smith"));
        assert_eq!(response.assigned_by_name.as_deref(), Some("admin"));
    }

    #[test]
    fn missing_references_project_to_null() {
        let mut task = detail();
        task.status_id = None;
        task.assigned_to_id = None;
        task.assigned_by_id = None;
        let response = TaskResponse::from(task);
        assert_eq!(response.status_name, None);
        assert_eq!(response.assigned_to_name, None);
        assert_eq!(response.assigned_by_name, None);
    }

    #[test]
    fn acting_user_fills_in_assigned_by() {
        let implicit: TaskPayload = serde_json::from_value(json!({"title": "Onboard"})).unwrap();
        assert_eq!(implicit.resolve_new(Some(5)).unwrap().assigned_by_id, Some(5));

        let explicit_null: TaskPayload =
            serde_json::from_value(json!({"title": "Onboard", "assigned_by": null})).unwrap();
        assert_eq!(explicit_null.resolve_new(Some(5)).unwrap().assigned_by_id, None);
    }

    #[test]
    fn patch_can_clear_status() {
        let current = detail();
        let write = serde_json::from_value::<TaskPayload>(json!({"status": null}))
            .unwrap()
            .resolve(Some(&current), WriteMode::Patch)
            .unwrap();
        assert_eq!(write.status_id, None);
        assert_eq!(write.assigned_to_id, Some(3));
        assert_eq!(write.title, "Quarterly report");
    }

    #[test]
    fn echoed_read_only_fields_are_accepted() {
        let body = serde_json::to_value(TaskResponse::from(detail())).unwrap();
        let payload: TaskPayload = serde_json::from_value(body).unwrap();
        assert!(payload.resolve(None, WriteMode::Create).is_ok());
    }

    #[test]
    fn every_dangling_reference_is_reported() {
        let write = TaskWrite {
            title: "Audit".into(),
            description: None,
            status_id: Some(4),
            assigned_to_id: Some(8),
            assigned_by_id: None,
            due_date: None,
        };
        let errors = write.reference_errors(false, false, false);
        assert_eq!(errors.get("status"), Some(&[object_does_not_exist(4)][..]));
        assert_eq!(errors.get("assigned_to"), Some(&[object_does_not_exist(8)][..]));
        assert!(!errors.contains("assigned_by"));
        assert!(write.reference_errors(true, true, false).is_empty());
    }

    #[test]
    fn numeric_string_references_are_accepted() {
        let payload: TaskPayload =
            serde_json::from_value(json!({"title": "Audit", "status": "3", "assigned_to": 2})).unwrap();
        let write = payload.resolve(None, WriteMode::Create).unwrap();
        assert_eq!(write.status_id, Some(3));
        assert_eq!(write.assigned_to_id, Some(2));
    }

    #[test]
    fn filter_rejects_non_numeric_ids() {
        let query = TaskListQuery {
            status: Some("open".into()),
            ..Default::default()
        };
        assert!(matches!(query.into_list_query(), Err(ServiceError::ValidationError(_))));
    }
}
