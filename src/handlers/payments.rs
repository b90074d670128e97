use crate::auth::{auth_middleware, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::handlers::payment_webhooks::stripe_webhook;
use crate::payments::CreatedCheckoutSession;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

/// Creates the router for payment-provider endpoints
///
/// Session creation is caller-scoped and needs a bearer token; the session
/// lookup and the webhook are reached by redirect targets and the provider,
/// so they stay public.
pub fn payment_routes() -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/session", get(get_payment_session))
        .route("/webhook", post(stripe_webhook));

    let protected = Router::new()
        .route("/checkout-session", post(create_checkout_session))
        .route_layer(axum::middleware::from_fn(auth_middleware));

    public.merge(protected)
}

/// Session lookup parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionQuery {
    /// Provider session identifier from the redirect URL
    pub session_id: Option<String>,
}

/// Open a hosted checkout session for the caller's cart
#[utoipa::path(
    post,
    path = "/api/v1/payments/checkout-session",
    responses(
        (status = 200, description = "Hosted session the buyer is redirected to", body = CreatedCheckoutSession),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let session = state
        .services
        .checkout
        .create_payment_session(user.user_id)
        .await?;
    Ok(success_response(session))
}

/// Look up a checkout session after the buyer is redirected back
#[utoipa::path(
    get,
    path = "/api/v1/payments/session",
    params(SessionQuery),
    responses(
        (status = 200, description = "Raw provider session object"),
        (status = 400, description = "Missing session_id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown session", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider error", body = crate::errors::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn get_payment_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Response, ApiError> {
    let session_id = query
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("session_id is required".to_string()))?;

    let session = state
        .services
        .checkout
        .retrieve_payment_session(session_id)
        .await?;
    Ok(success_response(session))
}
