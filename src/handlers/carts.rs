use crate::auth::{auth_middleware, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::services::carts::{AddCartItemRequest, CartResponse};
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for cart endpoints; every route needs a bearer token
pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/", post(add_item))
        .route("/items/:item_id", delete(remove_item))
        .route_layer(axum::middleware::from_fn(auth_middleware))
}

/// Cart snapshot plus an acknowledgement line
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartActionResponse {
    pub message: String,
    pub cart: CartResponse,
}

/// Fetch the caller's cart
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Current cart, empty if never written", body = CartResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let cart = state.services.cart.get_cart(user.user_id).await?;
    Ok(success_response(cart))
}

/// Add a catalog entry to the caller's cart
#[utoipa::path(
    post,
    path = "/api/v1/cart",
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Duplicate item or invalid price", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent cart update", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<Response, ApiError> {
    let cart = state.services.cart.add_item(user.user_id, payload).await?;
    Ok(success_response(cart))
}

/// Remove one line from the caller's cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line ID")),
    responses(
        (status = 200, description = "Updated cart", body = CartActionResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart or line not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent cart update", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "cart"
)]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let cart = state.services.cart.remove_item(user.user_id, item_id).await?;
    Ok(success_response(CartActionResponse {
        message: "Item removed successfully".to_string(),
        cart,
    }))
}
