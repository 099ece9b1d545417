use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::utils::errors::ServiceError;
use crate::utils::query::{ListQuery, OrderTerm, SortField};

/// An actor identity from the auth directory. Never written through this API.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSort {
    Username,
    FirstName,
}

impl SortField for UserSort {
    fn from_param(name: &str) -> Option<Self> {
        match name {
            "username" => Some(UserSort::Username),
            "first_name" => Some(UserSort::FirstName),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            UserSort::Username => "username",
            UserSort::FirstName => "first_name",
        }
    }

    fn default_ordering() -> Vec<OrderTerm<Self>> {
        vec![OrderTerm::asc(UserSort::Username)]
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Matches first or last name
    pub search: Option<String>,
    /// `username` or `first_name`; prefix `-` to reverse
    pub ordering: Option<String>,
    /// 1-based page number, or `last`
    pub page: Option<String>,
}

impl UserListQuery {
    pub fn into_list_query(self) -> Result<ListQuery<(), UserSort>, ServiceError> {
        ListQuery::new((), self.search.as_deref(), self.ordering.as_deref(), self.page.as_deref())
    }
}
