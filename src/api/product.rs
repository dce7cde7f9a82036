use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::auth::Admin;
use super::{paged, ApiPath, ApiQuery, ApiResponse, AppState, ValidJson};
use crate::domain::aggregates::{Product, ProductDraft, ProductPatch};
use crate::domain::value_objects::{Discount, MoreDetails, Name, PageRequest, Price};
use crate::service::{catalog, Principal};
use crate::store::ProductFilter;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/get-products", get(get_products))
        .route("/get-product/:id", get(get_product))
        .route("/create", post(create_product))
        .route("/update/:id", put(update_product))
        .route("/delete/:id", delete(delete_product))
        .route("/toggle-publish/:id", patch(toggle_publish))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub publish: Option<bool>,
}

fn default_publish() -> bool { true }

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 120, message = "must be 1 to 120 characters"))]
    pub name: String,
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(default)]
    pub category: Vec<Uuid>,
    #[serde(default)]
    pub unit: String,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: i32,
    pub price: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub more_details: MoreDetails,
    #[serde(default = "default_publish")]
    pub publish: bool,
}

impl CreateProductRequest {
    fn into_draft(self) -> Result<ProductDraft> {
        Ok(ProductDraft {
            name: Name::new(self.name)?,
            image: self.image,
            category: self.category,
            unit: self.unit,
            stock: self.stock,
            price: Price::new(self.price)?,
            discount: Discount::new(self.discount)?,
            description: self.description,
            more_details: self.more_details,
            publish: self.publish,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 120, message = "must be 1 to 120 characters"))]
    pub name: Option<String>,
    pub image: Option<Vec<String>>,
    pub category: Option<Vec<Uuid>>,
    pub unit: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: Option<i32>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub description: Option<String>,
    pub more_details: Option<MoreDetails>,
    pub publish: Option<bool>,
}

impl UpdateProductRequest {
    fn into_patch(self) -> Result<ProductPatch> {
        Ok(ProductPatch {
            name: self.name.map(Name::new).transpose()?,
            image: self.image,
            category: self.category,
            unit: self.unit,
            stock: self.stock,
            price: self.price.map(Price::new).transpose()?,
            discount: self.discount.map(Discount::new).transpose()?,
            description: self.description,
            more_details: self.more_details,
            publish: self.publish,
        })
    }
}

#[instrument(skip_all)]
async fn get_products(
    State(state): State<AppState>,
    principal: Option<Principal>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> Result<ApiResponse<Vec<Product>>> {
    let filter = ProductFilter {
        category: query.category,
        search: query.search,
        min_price: query.min_price,
        max_price: query.max_price,
        publish: query.publish,
    };
    let page = catalog::list_products(state.store.as_ref(), principal.as_ref(), filter, PageRequest::new(query.page, query.limit)).await?;
    Ok(paged("Products fetched", page, "totalProducts"))
}

#[instrument(skip_all, fields(%id))]
async fn get_product(
    State(state): State<AppState>,
    principal: Option<Principal>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Product>> {
    let product = catalog::get_product(state.store.as_ref(), principal.as_ref(), id).await?;
    Ok(ApiResponse::ok("Product fetched", product))
}

#[instrument(skip_all)]
async fn create_product(
    State(state): State<AppState>,
    _admin: Admin,
    ValidJson(req): ValidJson<CreateProductRequest>,
) -> Result<(StatusCode, ApiResponse<Product>)> {
    let product = catalog::create_product(state.store.as_ref(), req.into_draft()?).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Product created", product)))
}

#[instrument(skip_all, fields(%id))]
async fn update_product(
    State(state): State<AppState>,
    _admin: Admin,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateProductRequest>,
) -> Result<ApiResponse<Product>> {
    let product = catalog::update_product(state.store.as_ref(), id, req.into_patch()?).await?;
    Ok(ApiResponse::ok("Product updated", product))
}

#[instrument(skip_all, fields(%id))]
async fn delete_product(State(state): State<AppState>, _admin: Admin, ApiPath(id): ApiPath<Uuid>) -> Result<ApiResponse<()>> {
    catalog::delete_product(state.store.as_ref(), id).await?;
    Ok(ApiResponse::done("Product deleted"))
}

#[instrument(skip_all, fields(%id))]
async fn toggle_publish(State(state): State<AppState>, _admin: Admin, ApiPath(id): ApiPath<Uuid>) -> Result<ApiResponse<Product>> {
    let product = catalog::toggle_publish(state.store.as_ref(), id).await?;
    let message = if product.publish { "Product published" } else { "Product unpublished" };
    Ok(ApiResponse::ok(message, product))
}
