use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::payments::{verify_stripe_signature, StripeWebhookEvent, CHECKOUT_SESSION_COMPLETED};
use crate::services::checkout::FulfillmentOutcome;
use crate::AppState;
use axum::{body::Bytes, extract::State, http::HeaderMap, response::Response};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receive payment-provider webhook deliveries
///
/// The provider signs the raw body, so this handler consumes [`Bytes`] and
/// verifies the signature before any JSON parsing. Event kinds other than
/// `checkout.session.completed` are acknowledged and dropped; the provider
/// retries on anything but a 2xx.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Bad signature or malformed event", body = crate::errors::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = std::str::from_utf8(&body)
        .map_err(|_| ApiError::BadRequest("Webhook payload is not valid UTF-8".to_string()))?;

    // Unset secret means signature checks are off, which only makes sense for
    // local development against the provider CLI.
    if let Some(secret) = state.config.stripe.webhook_secret.as_deref() {
        let signature = headers
            .get("Stripe-Signature")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        let tolerance = state.config.stripe.webhook_tolerance_secs as i64;
        if !verify_stripe_signature(signature, payload, secret, tolerance) {
            warn!("Webhook signature verification failed");
            return Err(ApiError::BadRequest(
                "Invalid webhook signature".to_string(),
            ));
        }
    }

    let event: StripeWebhookEvent = serde_json::from_str(payload)
        .map_err(|e| ApiError::BadRequest(format!("Malformed webhook event: {}", e)))?;

    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        debug!(event_type = %event.event_type, "Ignoring webhook event");
        return Ok(success_response(json!({ "received": true })));
    }

    let session = event.session_object()?;
    match state
        .services
        .checkout
        .fulfill_completed_session(session)
        .await?
    {
        FulfillmentOutcome::Fulfilled(order) => {
            info!(order_id = %order.id, "Checkout session fulfilled");
        }
        FulfillmentOutcome::AlreadyProcessed => {
            info!(event_id = ?event.id, "Webhook event already processed");
        }
    }

    Ok(success_response(json!({ "received": true })))
}
