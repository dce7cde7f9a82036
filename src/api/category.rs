use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::auth::Admin;
use super::{paged, ApiPath, ApiQuery, ApiResponse, AppState, ValidJson};
use crate::domain::aggregates::Category;
use crate::domain::value_objects::PageRequest;
use crate::service::catalog;
use crate::store::CategoryFilter;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/get-categories", get(get_categories))
        .route("/create", post(create_category))
        .route("/update/:id", put(update_category))
        .route("/delete/:id", delete(delete_category))
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 120, message = "must be 1 to 120 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub image: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 120, message = "must be 1 to 120 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub image: Option<String>,
}

#[instrument(skip_all)]
async fn get_categories(State(state): State<AppState>, ApiQuery(query): ApiQuery<CategoryListQuery>) -> Result<ApiResponse<Vec<Category>>> {
    let filter = CategoryFilter { search: query.search };
    let page = catalog::list_categories(state.store.as_ref(), filter, PageRequest::new(query.page, query.limit)).await?;
    Ok(paged("Categories fetched", page, "totalCategories"))
}

#[instrument(skip_all)]
async fn create_category(
    State(state): State<AppState>,
    _admin: Admin,
    ValidJson(req): ValidJson<CreateCategoryRequest>,
) -> Result<(StatusCode, ApiResponse<Category>)> {
    let category = catalog::create_category(state.store.as_ref(), &req.name, &req.image).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Category created", category)))
}

#[instrument(skip_all, fields(%id))]
async fn update_category(
    State(state): State<AppState>,
    _admin: Admin,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateCategoryRequest>,
) -> Result<ApiResponse<Category>> {
    let category = catalog::update_category(state.store.as_ref(), id, req.name.as_deref(), req.image.as_deref()).await?;
    Ok(ApiResponse::ok("Category updated", category))
}

#[instrument(skip_all, fields(%id))]
async fn delete_category(State(state): State<AppState>, _admin: Admin, ApiPath(id): ApiPath<Uuid>) -> Result<ApiResponse<()>> {
    catalog::delete_category(state.store.as_ref(), id).await?;
    Ok(ApiResponse::done("Category deleted"))
}
