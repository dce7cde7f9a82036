use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{ApiJson, ApiPath, ApiResponse, AppState};
use crate::domain::aggregates::{Address, AddressFields};
use crate::service::{addresses, Principal};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_address))
        .route("/get", get(get_addresses))
        .route("/update/:id", put(update_address))
        .route("/delete/:id", delete(delete_address))
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn create_address(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(fields): ApiJson<AddressFields>,
) -> Result<(StatusCode, ApiResponse<Address>)> {
    let address = addresses::create(state.store.as_ref(), principal.user_id, fields).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Address created", address)))
}

#[instrument(skip_all, fields(user_id = %principal.user_id))]
async fn get_addresses(State(state): State<AppState>, principal: Principal) -> Result<ApiResponse<Vec<Address>>> {
    let list = addresses::list(state.store.as_ref(), principal.user_id).await?;
    Ok(ApiResponse::ok("Addresses fetched", list))
}

#[instrument(skip_all, fields(user_id = %principal.user_id, %id))]
async fn update_address(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(fields): ApiJson<AddressFields>,
) -> Result<ApiResponse<Address>> {
    let address = addresses::update(state.store.as_ref(), principal.user_id, id, fields).await?;
    Ok(ApiResponse::ok("Address updated", address))
}

#[instrument(skip_all, fields(user_id = %principal.user_id, %id))]
async fn delete_address(State(state): State<AppState>, principal: Principal, ApiPath(id): ApiPath<Uuid>) -> Result<ApiResponse<()>> {
    addresses::delete(state.store.as_ref(), principal.user_id, id).await?;
    Ok(ApiResponse::done("Address deleted"))
}
