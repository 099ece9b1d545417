use chrono::NaiveDate;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::task::TaskResponse;
use crate::models::{nullable, not_blank, FieldResolver, WriteMode};
use crate::utils::errors::ServiceError;
use crate::utils::query::{text_filter, ListQuery, OrderTerm, SortField};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub hire_date: NaiveDate,
    pub position: String,
    pub department: String,
}

/// Employee as sent over the wire, with its tasks embedded.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmployeeResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub hire_date: NaiveDate,
    pub position: String,
    pub department: String,
    pub tasks: Vec<TaskResponse>,
    pub task_count: i64,
}

impl EmployeeResponse {
    pub fn new(employee: Employee, tasks: Vec<TaskResponse>) -> Self {
        EmployeeResponse {
            id: employee.id,
            first_name: employee.first_name,
            last_name: employee.last_name,
            email: employee.email,
            phone_number: employee.phone_number,
            hire_date: employee.hire_date,
            position: employee.position,
            department: employee.department,
            task_count: tasks.len() as i64,
            tasks,
        }
    }
}

/// Incoming employee body. Read-only fields are accepted and ignored.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EmployeePayload {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub first_name: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub last_name: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, nullable)]
    pub phone_number: Option<Option<Value>>,
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, format = Date)]
    pub hire_date: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub position: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub department: Option<Option<Value>>,

    #[serde(default)]
    #[schema(ignore)]
    pub id: Option<IgnoredAny>,
    #[serde(default)]
    #[schema(ignore)]
    pub tasks: Option<IgnoredAny>,
    #[serde(default)]
    #[schema(ignore)]
    pub task_count: Option<IgnoredAny>,
}

/// A fully resolved employee ready to be stored.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct EmployeeWrite {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Ensure this field has no more than 100 characters.")
    )]
    pub first_name: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Ensure this field has no more than 100 characters.")
    )]
    pub last_name: String,
    #[validate(
        custom(function = "not_blank"),
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: String,
    #[validate(length(max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub phone_number: Option<String>,
    pub hire_date: NaiveDate,
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Ensure this field has no more than 100 characters.")
    )]
    pub position: String,
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "Ensure this field has no more than 100 characters.")
    )]
    pub department: String,
}

impl EmployeePayload {
    pub fn resolve(self, existing: Option<&Employee>, mode: WriteMode) -> Result<EmployeeWrite, ServiceError> {
        let mut fields = FieldResolver::new(mode);
        let write = EmployeeWrite {
            first_name: fields.required_text(
                "first_name",
                self.first_name,
                existing.map(|e| e.first_name.as_str()),
            ),
            last_name: fields.required_text(
                "last_name",
                self.last_name,
                existing.map(|e| e.last_name.as_str()),
            ),
            email: fields.required_text("email", self.email, existing.map(|e| e.email.as_str())),
            phone_number: fields.optional_text(
                "phone_number",
                self.phone_number,
                existing.and_then(|e| e.phone_number.as_deref()),
            ),
            hire_date: fields.required_date("hire_date", self.hire_date, existing.map(|e| e.hire_date)),
            position: fields.required_text("position", self.position, existing.map(|e| e.position.as_str())),
            department: fields.required_text(
                "department",
                self.department,
                existing.map(|e| e.department.as_str()),
            ),
        };
        fields.finish(write.validate())?;
        Ok(write)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeSort {
    FirstName,
    LastName,
    HireDate,
    Position,
}

impl SortField for EmployeeSort {
    fn from_param(name: &str) -> Option<Self> {
        match name {
            "first_name" => Some(EmployeeSort::FirstName),
            "last_name" => Some(EmployeeSort::LastName),
            "hire_date" => Some(EmployeeSort::HireDate),
            "position" => Some(EmployeeSort::Position),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            EmployeeSort::FirstName => "first_name",
            EmployeeSort::LastName => "last_name",
            EmployeeSort::HireDate => "hire_date",
            EmployeeSort::Position => "position",
        }
    }

    fn default_ordering() -> Vec<OrderTerm<Self>> {
        vec![OrderTerm::asc(EmployeeSort::FirstName)]
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeListQuery {
    /// Exact department match
    pub department: Option<String>,
    /// Exact position match
    pub position: Option<String>,
    /// Matches first name, last name, email, position or department
    pub search: Option<String>,
    /// `first_name`, `last_name`, `hire_date` or `position`; prefix `-` to reverse
    pub ordering: Option<String>,
    /// 1-based page number, or `last`
    pub page: Option<String>,
}

impl EmployeeListQuery {
    pub fn into_list_query(self) -> Result<ListQuery<EmployeeFilter, EmployeeSort>, ServiceError> {
        let filter = EmployeeFilter {
            department: text_filter(self.department),
            position: text_filter(self.position),
        };
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

    fn payload(value: serde_json::Value) -> EmployeePayload {
        serde_json::from_value(value).expect("payload should deserialize")
    }

    fn alice() -> Employee {
        Employee {
            id: 1,
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            email: "alice@example.com".into(),
            phone_number: Some("555-0100".into()),
            hire_date: NaiveDate::from_ymd_opt(2021, 4, 12).unwrap(),
            position: "Engineer".into(),
            department: "R&D".into(),
        }
    }

    fn field_errors(err: ServiceError) -> crate::utils::errors::FieldErrors {
        match err {
            ServiceError::ValidationError(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_reports_every_missing_field() {
        let errors = field_errors(payload(json!({})).resolve(None, WriteMode::Create).unwrap_err());
        for field in ["first_name", "last_name", "email", "hire_date", "position", "department"] {
            assert!(errors.contains(field), "missing error for {field}");
        }
        assert!(!errors.contains("phone_number"));
    }

    #[test]
    fn blank_email_reports_only_the_blank_message() {
        let mut body = json!({
            "first_name": "Bob",
            "last_name": "Ray",
            "email": "   ",
            "hire_date": "2022-01-03",
            "position": "Analyst",
            "department": "Finance"
        });
        let errors = field_errors(payload(body.clone()).resolve(None, WriteMode::Create).unwrap_err());
        assert_eq!(errors.get("email"), Some(&[crate::utils::errors::NOT_BLANK.to_string()][..]));

        body["email"] = json!("not-an-email");
        let errors = field_errors(payload(body).resolve(None, WriteMode::Create).unwrap_err());
        let messages = errors.get("email").unwrap();
        assert_eq!(messages.len(), 1);
        assert_ne!(messages[0], crate::utils::errors::NOT_BLANK);
    }

    #[test]
    fn create_validates_formats() {
        let body = json!({
            "first_name": "Bob",
            "last_name": "Jones",
            "email": "not-an-email",
            "hire_date": "12/04/2021",
            "position": "x".repeat(101),
            "department": "Sales",
        });
        let errors = field_errors(payload(body).resolve(None, WriteMode::Create).unwrap_err());
        assert_eq!(errors.get("email"), Some(&["Enter a valid email address.".to_string()][..]));
        assert!(errors.contains("hire_date"));
        assert!(errors.contains("position"));
    }

    #[test]
    fn patch_merges_onto_existing_record() {
        let current = alice();
        let write = payload(json!({"department": " Platform ", "phone_number": null}))
            .resolve(Some(&current), WriteMode::Patch)
            .unwrap();
        assert_eq!(write.department, "Platform");
        assert_eq!(write.phone_number, None);
        assert_eq!(write.email, current.email);
        assert_eq!(write.hire_date, current.hire_date);
    }

    #[test]
    fn read_only_fields_are_ignored_but_unknown_fields_rejected() {
        let body = json!({
            "id": 99,
            "first_name": "Alice",
            "tasks": [],
            "task_count": 3,
        });
        assert!(serde_json::from_value::<EmployeePayload>(body).is_ok());
        assert!(serde_json::from_value::<EmployeePayload>(json!({"salary": 1})).is_err());
    }

    #[test]
    fn blank_name_is_rejected() {
        let current = alice();
        let errors = field_errors(
            payload(json!({"first_name": "   "}))
                .resolve(Some(&current), WriteMode::Patch)
                .unwrap_err(),
        );
        assert_eq!(
            errors.get("first_name"),
            Some(&[crate::utils::errors::NOT_BLANK.to_string()][..])
        );
    }
}
