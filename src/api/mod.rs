//! HTTP surface: router, response envelope and error mapping.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, ser::SerializeMap, Serialize, Serializer};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;
use validator::Validate;

use crate::domain::value_objects::Page;
use crate::publisher::EventPublisher;
use crate::store::Store;
use crate::EcommerceError;

pub mod address;
pub mod admin_user;
pub mod auth;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub events: EventPublisher,
    pub jwt: Arc<auth::JwtVerifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher, jwt_secret: &str) -> Self {
        Self { store, events, jwt: Arc::new(auth::JwtVerifier::new(jwt_secret)) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/cart", cart::routes())
        .nest("/api/order", order::routes())
        .nest("/api/product", product::routes())
        .nest("/api/category", category::routes())
        .nest("/api/address", address::routes())
        .nest("/api/admin/user", admin_user::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
}

// =============================================================================
// Response envelope
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub success: bool,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self { message: message.into(), success: true, error: false, data: Some(data), pagination: None }
    }
}

impl ApiResponse<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self { message: message.into(), success: true, error: false, data: None, pagination: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { message: message.into(), success: false, error: true, data: None, pagination: None }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Wraps one page of results; `total_key` names the total, e.g. `totalOrders`.
pub fn paged<T>(message: impl Into<String>, page: Page<T>, total_key: &'static str) -> ApiResponse<Vec<T>> {
    let pagination = Pagination {
        total_key,
        current_page: page.request.page(),
        total_pages: page.total_pages(),
        total: page.total,
        has_next_page: page.has_next_page(),
        has_prev_page: page.has_prev_page(),
        limit: page.request.limit(),
    };
    ApiResponse { pagination: Some(pagination), ..ApiResponse::ok(message, page.items) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    total_key: &'static str,
    current_page: u32,
    total_pages: u64,
    total: u64,
    has_next_page: bool,
    has_prev_page: bool,
    limit: u32,
}

impl Serialize for Pagination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("currentPage", &self.current_page)?;
        map.serialize_entry("totalPages", &self.total_pages)?;
        map.serialize_entry(self.total_key, &self.total)?;
        map.serialize_entry("hasNextPage", &self.has_next_page)?;
        map.serialize_entry("hasPrevPage", &self.has_prev_page)?;
        map.serialize_entry("limit", &self.limit)?;
        map.end()
    }
}

// =============================================================================
// Error mapping
// =============================================================================

impl EcommerceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InsufficientStock { .. } | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Something went wrong, please try again later".to_string()
        } else {
            self.to_string()
        };
        (status, ApiResponse::failure(message)).into_response()
    }
}

impl From<JsonRejection> for EcommerceError {
    fn from(rejection: JsonRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<PathRejection> for EcommerceError {
    fn from(rejection: PathRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<QueryRejection> for EcommerceError {
    fn from(rejection: QueryRejection) -> Self { Self::Validation(rejection.body_text()) }
}

// =============================================================================
// Extractors with enveloped rejections
// =============================================================================

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(EcommerceError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(EcommerceError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(EcommerceError))]
pub struct ApiQuery<T>(pub T);

/// JSON body that also passes its `validator` rules.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = EcommerceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Parses an optional query value; blank means absent.
pub(crate) fn parse_opt<T: std::str::FromStr<Err = EcommerceError>>(value: Option<&str>) -> crate::Result<Option<T>> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::PageRequest;

    #[test]
    fn test_pagination_uses_named_total() {
        let page = Page { items: vec![1, 2], total: 12, request: PageRequest::new(Some(2), Some(5)) };
        let body = serde_json::to_value(paged("Orders fetched", page, "totalOrders")).unwrap();
        assert_eq!(body["pagination"]["totalOrders"], 12);
        assert_eq!(body["pagination"]["totalPages"], 3);
        assert_eq!(body["pagination"]["currentPage"], 2);
        assert_eq!(body["pagination"]["hasNextPage"], true);
        assert_eq!(body["pagination"]["hasPrevPage"], true);
        assert_eq!(body["success"], true);
        assert_eq!(body["error"], false);
    }

    #[test]
    fn test_server_errors_are_masked() {
        let response = EcommerceError::Internal("pool exhausted".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(EcommerceError::EmptyCart.status(), StatusCode::BAD_REQUEST);
        assert_eq!(EcommerceError::Conflict("taken".into()).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_failure_envelope_has_no_data() {
        let body = serde_json::to_value(ApiResponse::failure("Product not found")).unwrap();
        assert_eq!(body, serde_json::json!({"message": "Product not found", "success": false, "error": true}));
    }
}
