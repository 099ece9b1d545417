use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::models::response::ErrorResponse;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const INVALID_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

pub fn already_exists(entity: &str, field: &str) -> String {
    format!("{} with this {} already exists.", entity, field)
}

/// `kind` names the JSON type that was sent, e.g. `str` or `bool`.
pub fn incorrect_type(kind: &str) -> String {
    format!("Incorrect type. Expected pk value, received {}.", kind)
}

pub fn object_does_not_exist(pk: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", pk)
}

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, messages.join(" "))?;
            first = false;
        }
        Ok(())
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::default();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Validation Error: {0}")]
    ValidationError(FieldErrors),
    #[error("Internal Error: {0}")]
    InternalError(String),
    #[error("Database Error: {0}")]
    DatabaseError(String),
}

impl ServiceError {
    pub fn invalid_page() -> Self {
        ServiceError::NotFound("Invalid page.".to_string())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) | ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::InternalError(_) | ServiceError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("{}", self);
        let body = match self {
            ServiceError::Unauthorized(msg) | ServiceError::NotFound(msg) | ServiceError::BadRequest(msg) => {
                ErrorResponse::new(msg)
            }
            ServiceError::ValidationError(errors) => ErrorResponse::with_errors("Validation failed", errors.clone()),
            // Don't expose internal details
            ServiceError::InternalError(_) => ErrorResponse::new("Something went wrong"),
            ServiceError::DatabaseError(_) => ErrorResponse::new("Database operation failed"),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

// Convert sqlx errors to ServiceError
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("Record not found".to_string()),
            _ => ServiceError::DatabaseError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(errors.into())
    }
}

// Convert JWT errors to ServiceError
impl From<jsonwebtoken::errors::Error> for ServiceError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ServiceError::Unauthorized(format!("Invalid token: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_messages_per_field() {
        let mut errors = FieldErrors::single("email", REQUIRED);
        errors.add("email", "second");
        errors.add("name", NOT_BLANK);

        assert_eq!(errors.get("email").map(|m| m.len()), Some(2));
        assert_eq!(errors.get("name"), Some(&[NOT_BLANK.to_string()][..]));
        assert!(errors.into_result().is_err());
        assert!(FieldErrors::default().into_result().is_ok());
    }

    #[test]
    fn status_codes_follow_variant() {
        assert_eq!(ServiceError::invalid_page().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::ValidationError(FieldErrors::default()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::DatabaseError("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_match_wire_format() {
        assert_eq!(already_exists("employee", "email"), "employee with this email already exists.");
        assert_eq!(object_does_not_exist(9), "Invalid pk \"9\" - object does not exist.");
        assert_eq!(incorrect_type("str"), "Incorrect type. Expected pk value, received str.");
    }
}
