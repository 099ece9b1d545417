use actix_web::{web, HttpRequest, HttpResponse};

use crate::handlers::not_found;
use crate::models::response::{ErrorResponse, Paginated};
use crate::models::user::{User, UserListQuery};
use crate::store::Store;
use crate::utils::errors::ServiceError;

#[utoipa::path(
    get,
    path = "/api/users/",
    tag = "users",
    params(UserListQuery),
    responses(
        (status = 200, description = "One page of users", body = Paginated<User>),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    )
)]
pub async fn list_users(
    req: HttpRequest,
    store: web::Data<dyn Store>,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/users");

    let listing = store.list_users(query.into_inner().into_list_query()?).await?;
    Ok(HttpResponse::Ok().json(listing.into_envelope(&req)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved successfully", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_user(store: web::Data<dyn Store>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let user_id = path.into_inner();
    log::info!("GET /api/users/{}", user_id);

    let user = store.get_user(user_id).await?.ok_or_else(|| {
        log::warn!("User not found: {}", user_id);
        not_found("User")
    })?;
    Ok(HttpResponse::Ok().json(user))
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .service(web::resource("/").route(web::get().to(list_users)))
            .service(web::resource("/{id}/").route(web::get().to(get_user))),
    );
}
