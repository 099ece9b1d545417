use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::utils::errors::FieldErrors;

/// List envelope shared by every collection.
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Envelope for the informational endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        ApiResponse {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            message: message.to_string(),
            errors: None,
        }
    }

    pub fn with_errors(message: &str, errors: FieldErrors) -> Self {
        ErrorResponse {
            errors: Some(errors.into_map()),
            ..Self::new(message)
        }
    }
}
