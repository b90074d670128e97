use crate::auth::{auth_middleware, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::created_response;
use crate::services::orders::OrderResponse;
use crate::AppState;
use axum::{extract::State, response::Response, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Creates the router for the checkout endpoint
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(checkout))
        .route_layer(axum::middleware::from_fn(auth_middleware))
}

/// Acknowledgement carrying the order the checkout produced
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutCompleteResponse {
    pub message: String,
    pub order: OrderResponse,
}

/// Convert the caller's cart into an order
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    responses(
        (status = 201, description = "Order created from the cart", body = CheckoutCompleteResponse),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent cart update", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "checkout"
)]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let order = state.services.checkout.checkout(user.user_id).await?;
    Ok(created_response(CheckoutCompleteResponse {
        message: "Checkout complete".to_string(),
        order,
    }))
}
