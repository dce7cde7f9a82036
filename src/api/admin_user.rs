use axum::{
    extract::State,
    routing::{delete, get, put},
    Router,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::auth::Admin;
use super::{paged, parse_opt, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState};
use crate::domain::aggregates::{User, UserStats};
use crate::domain::value_objects::PageRequest;
use crate::service::users;
use crate::store::UserFilter;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/stats", get(user_stats))
        .route("/:id/status", put(set_status))
        .route("/:id/role", put(set_role))
        .route("/:id/verify", put(set_verified))
        .route("/:id", delete(delete_user))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub verify_email: bool,
}

#[instrument(skip_all)]
async fn list_users(State(state): State<AppState>, _admin: Admin, ApiQuery(query): ApiQuery<UserListQuery>) -> Result<ApiResponse<Vec<User>>> {
    let filter = UserFilter {
        role: parse_opt(query.role.as_deref())?,
        status: parse_opt(query.status.as_deref())?,
        search: query.search,
    };
    let page = users::list(state.store.as_ref(), filter, PageRequest::new(query.page, query.limit)).await?;
    Ok(paged("Users fetched", page, "totalUsers"))
}

#[instrument(skip_all)]
async fn user_stats(State(state): State<AppState>, _admin: Admin) -> Result<ApiResponse<UserStats>> {
    Ok(ApiResponse::ok("User stats fetched", users::stats(state.store.as_ref()).await?))
}

#[instrument(skip_all, fields(%id))]
async fn set_status(
    State(state): State<AppState>,
    Admin(admin): Admin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<ApiResponse<User>> {
    let user = users::set_status(state.store.as_ref(), &admin, id, req.status.parse()?).await?;
    Ok(ApiResponse::ok("User status updated", user))
}

#[instrument(skip_all, fields(%id))]
async fn set_role(
    State(state): State<AppState>,
    Admin(admin): Admin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RoleRequest>,
) -> Result<ApiResponse<User>> {
    let user = users::set_role(state.store.as_ref(), &admin, id, req.role.parse()?).await?;
    Ok(ApiResponse::ok("User role updated", user))
}

#[instrument(skip_all, fields(%id))]
async fn set_verified(
    State(state): State<AppState>,
    _admin: Admin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<ApiResponse<User>> {
    let user = users::set_verified(state.store.as_ref(), id, req.verify_email).await?;
    Ok(ApiResponse::ok("User verification updated", user))
}

#[instrument(skip_all, fields(%id))]
async fn delete_user(State(state): State<AppState>, Admin(admin): Admin, ApiPath(id): ApiPath<Uuid>) -> Result<ApiResponse<()>> {
    users::delete(state.store.as_ref(), &admin, id).await?;
    Ok(ApiResponse::done("User deleted"))
}
