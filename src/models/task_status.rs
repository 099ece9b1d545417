use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{nullable, not_blank, FieldResolver, WriteMode};
use crate::utils::errors::ServiceError;
use crate::utils::query::{ListQuery, OrderTerm, SortField};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct TaskStatus {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TaskStatusPayload {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, nullable)]
    pub description: Option<Option<Value>>,

    #[serde(default)]
    #[schema(ignore)]
    pub id: Option<IgnoredAny>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct TaskStatusWrite {
    #[validate(
        custom(function = "not_blank"),
        length(max = 50, message = "Ensure this field has no more than 50 characters.")
    )]
    pub name: String,
    pub description: Option<String>,
}

impl TaskStatusPayload {
    pub fn resolve(self, existing: Option<&TaskStatus>, mode: WriteMode) -> Result<TaskStatusWrite, ServiceError> {
        let mut fields = FieldResolver::new(mode);
        let write = TaskStatusWrite {
            name: fields.required_text("name", self.name, existing.map(|s| s.name.as_str())),
            description: fields.optional_text(
                "description",
                self.description,
                existing.and_then(|s| s.description.as_deref()),
            ),
        };
        fields.finish(write.validate())?;
        Ok(write)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatusSort {
    Name,
}

impl SortField for TaskStatusSort {
    fn from_param(name: &str) -> Option<Self> {
        (name == "name").then_some(TaskStatusSort::Name)
    }

    fn column(self) -> &'static str {
        "name"
    }

    fn default_ordering() -> Vec<OrderTerm<Self>> {
        vec![OrderTerm::asc(TaskStatusSort::Name)]
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskStatusListQuery {
    /// Matches the status name
    pub search: Option<String>,
    /// `name` or `-name`
    pub ordering: Option<String>,
    /// 1-based page number, or `last`
    pub page: Option<String>,
}

impl TaskStatusListQuery {
    pub fn into_list_query(self) -> Result<ListQuery<(), TaskStatusSort>, ServiceError> {
        ListQuery::new((), self.search.as_deref(), self.ordering.as_deref(), self.page.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn name_length_is_capped() {
        let payload: TaskStatusPayload = serde_json::from_value(json!({"name": "x".repeat(51)})).unwrap();
        match payload.resolve(None, WriteMode::Create) {
            Err(ServiceError::ValidationError(errors)) => assert!(errors.contains("name")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn replace_keeps_omitted_description() {
        let current = TaskStatus {
            id: 1,
            name: "Open".into(),
            description: Some("Not started".into()),
        };
        let payload: TaskStatusPayload = serde_json::from_value(json!({"name": "Todo"})).unwrap();
        let write = payload.resolve(Some(&current), WriteMode::Replace).unwrap();
        assert_eq!(write.name, "Todo");
        assert_eq!(write.description.as_deref(), Some("Not started"));
    }
}
