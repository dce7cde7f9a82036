use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::auth::Admin;
use super::{paged, parse_opt, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, ValidJson};
use crate::domain::aggregates::{Order, OrderStats, StatusUpdate};
use crate::domain::value_objects::PageRequest;
use crate::service::checkout::{self, CheckoutRequest};
use crate::service::{orders, Principal};
use crate::store::OrderFilter;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/order-list", get(order_list))
        .route("/get-order/:id", get(get_order))
        .route("/update-status/:id", put(update_status))
        .route("/delete-order/:id", delete(delete_order))
        .route("/order-stats", get(order_stats))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub delivery_status: Option<String>,
    pub payment_status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub delivery_status: Option<String>,
    pub payment_status: Option<String>,
    #[validate(length(min = 1, max = 200, message = "must be 1 to 200 characters"))]
    pub payment_id: Option<String>,
    #[validate(url(message = "must be a URL"))]
    pub invoice_receipt: Option<String>,
}

impl UpdateStatusRequest {
    fn into_update(self) -> Result<StatusUpdate> {
        Ok(StatusUpdate {
            delivery_status: parse_opt(self.delivery_status.as_deref())?,
            payment_status: parse_opt(self.payment_status.as_deref())?,
            payment_id: self.payment_id,
            invoice_receipt: self.invoice_receipt,
        })
    }
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn create_order(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, ApiResponse<Vec<Order>>)> {
    let orders = checkout::checkout(state.store.as_ref(), &state.events, principal.user_id, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Order placed successfully", orders)))
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn order_list(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<ApiResponse<Vec<Order>>> {
    let filter = OrderFilter {
        user_id: None,
        delivery_status: parse_opt(query.delivery_status.as_deref())?,
        payment_status: parse_opt(query.payment_status.as_deref())?,
        from: query.from,
        to: query.to,
        search: query.search,
    };
    let page = orders::list_orders(state.store.as_ref(), &principal, filter, PageRequest::new(query.page, query.limit)).await?;
    Ok(paged("Orders fetched", page, "totalOrders"))
}

#[instrument(skip_all, fields(user_id = %principal.user_id, %id))]
async fn get_order(State(state): State<AppState>, principal: Principal, ApiPath(id): ApiPath<Uuid>) -> Result<ApiResponse<Order>> {
    let order = orders::get_order(state.store.as_ref(), &principal, id).await?;
    Ok(ApiResponse::ok("Order fetched", order))
}

#[instrument(skip_all, fields(%id))]
async fn update_status(
    State(state): State<AppState>,
    _admin: Admin,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(req): ValidJson<UpdateStatusRequest>,
) -> Result<ApiResponse<Order>> {
    let order = orders::update_status(state.store.as_ref(), &state.events, id, req.into_update()?).await?;
    Ok(ApiResponse::ok("Order status updated", order))
}

#[instrument(skip_all, fields(%id))]
async fn delete_order(State(state): State<AppState>, _admin: Admin, ApiPath(id): ApiPath<Uuid>) -> Result<ApiResponse<()>> {
    orders::delete_order(state.store.as_ref(), &state.events, id).await?;
    Ok(ApiResponse::done("Order deleted"))
}

#[instrument(skip_all)]
async fn order_stats(State(state): State<AppState>, _admin: Admin) -> Result<ApiResponse<OrderStats>> {
    let stats = orders::stats(state.store.as_ref()).await?;
    Ok(ApiResponse::ok("Order stats fetched", stats))
}
