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

use super::{ApiPath, ApiResponse, AppState, ValidJson};
use crate::domain::aggregates::{CartItem, CartLine};
use crate::service::{cart, Principal};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add-to-cart", post(add_to_cart))
        .route("/get-cart-items", get(get_cart_items))
        .route("/update-quantity", put(update_quantity))
        .route("/remove-from-cart/:cart_item_id", delete(remove_from_cart))
        .route("/clear-cart", delete(clear_cart))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    pub cart_item_id: Uuid,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn add_to_cart(
    State(state): State<AppState>,
    principal: Principal,
    ValidJson(req): ValidJson<AddToCartRequest>,
) -> Result<(StatusCode, ApiResponse<CartItem>)> {
    let item = cart::add_item(state.store.as_ref(), principal.user_id, req.product_id, req.quantity.unwrap_or(1)).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Item added to cart", item)))
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn get_cart_items(State(state): State<AppState>, principal: Principal) -> Result<ApiResponse<Vec<CartLine>>> {
    let lines = cart::list_items(state.store.as_ref(), principal.user_id).await?;
    Ok(ApiResponse::ok("Cart items fetched", lines))
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn update_quantity(
    State(state): State<AppState>,
    principal: Principal,
    ValidJson(req): ValidJson<UpdateQuantityRequest>,
) -> Result<ApiResponse<CartItem>> {
    let item = cart::update_quantity(state.store.as_ref(), principal.user_id, req.cart_item_id, req.quantity).await?;
    Ok(ApiResponse::ok("Cart updated", item))
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn remove_from_cart(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(cart_item_id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>> {
    cart::remove_item(state.store.as_ref(), principal.user_id, cart_item_id).await?;
    Ok(ApiResponse::done("Item removed from cart"))
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn clear_cart(State(state): State<AppState>, principal: Principal) -> Result<ApiResponse<u64>> {
    let removed = cart::clear(state.store.as_ref(), principal.user_id).await?;
    Ok(ApiResponse::ok("Cart cleared", removed))
}
