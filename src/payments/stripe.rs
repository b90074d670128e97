//! Thin client for the Stripe Checkout and webhook surfaces.
//!
//! The catalog prices content in major units ([`rust_decimal::Decimal`]);
//! Stripe wants minor units, so conversion lives here next to the
//! zero-decimal currency table. Webhook payloads are verified with the
//! `Stripe-Signature` scheme (HMAC-SHA256 over `"{timestamp}.{body}"`)
//! before anything downstream trusts them.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;

use crate::config::StripeConfig;
use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Event type that completes a checkout and triggers fulfillment.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Currencies Stripe treats as zero-decimal: amounts are already in the
/// smallest unit, so no scaling by 100 is applied.
static ZERO_DECIMAL_CURRENCIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd",
        "vuv", "xaf", "xof", "xpf",
    ]
    .into_iter()
    .collect()
});

/// One purchasable line on a checkout session, already priced in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Subset of the session object returned by session creation that callers need
/// to redirect the buyer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedCheckoutSession {
    #[schema(example = "cs_test_a1b2c3")]
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Envelope for a webhook delivery. `data.object` stays untyped because its
/// shape depends on `type`; [`StripeWebhookEvent::session_object`] projects the
/// fields fulfillment cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    // Defaulted so event kinds this service ignores parse even with an
    // empty `data` payload.
    #[serde(default)]
    pub object: serde_json::Value,
}

/// Fields of a `checkout.session.*` object used to correlate the payment back
/// to a user and to dedup redeliveries.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSessionObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl StripeWebhookEvent {
    /// Projects `data.object` into the session fields fulfillment reads.
    pub fn session_object(&self) -> Result<WebhookSessionObject, ServiceError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| {
            ServiceError::BadRequest(format!("Malformed checkout session object: {}", e))
        })
    }
}

/// HTTP client for Stripe's REST API.
///
/// Constructed once at startup and shared through application state. The API
/// base is configurable so tests can point it at a local mock server.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
    success_url: String,
    cancel_url: String,
    currency: String,
}

impl StripeClient {
    pub fn from_config(config: &StripeConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(config, client))
    }

    /// Build with a caller-supplied HTTP client, used by tests to inject
    /// custom timeouts or a mock transport.
    pub fn with_client(config: &StripeConfig, client: Client) -> Self {
        Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
            currency: config.currency.to_lowercase(),
        }
    }

    /// Currency every session is denominated in.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Convert a catalog price into a line item in this client's currency.
    pub fn line_item(
        &self,
        name: impl Into<String>,
        price: Decimal,
    ) -> Result<CheckoutLineItem, ServiceError> {
        Ok(CheckoutLineItem {
            name: name.into(),
            unit_amount: to_minor_units(price, &self.currency)?,
            quantity: 1,
        })
    }

    /// Creates a Checkout Session in `payment` mode for the given line items.
    ///
    /// `client_reference_id` carries the buying user's id so the completion
    /// webhook can be correlated back to an account.
    #[instrument(skip(self, line_items), fields(item_count = line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        client_reference_id: &str,
        line_items: &[CheckoutLineItem],
    ) -> Result<CreatedCheckoutSession, ServiceError> {
        if line_items.is_empty() {
            return Err(ServiceError::BadRequest(
                "Cannot create a checkout session with no line items".to_string(),
            ));
        }

        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "payment_method_types[0]".to_string(),
                "card".to_string(),
            ),
            (
                "client_reference_id".to_string(),
                client_reference_id.to_string(),
            ),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];
        for (idx, item) in line_items.iter().enumerate() {
            params.push((
                format!("line_items[{}][quantity]", idx),
                item.quantity.to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][currency]", idx),
                self.currency.clone(),
            ));
            params.push((
                format!("line_items[{}][price_data][unit_amount]", idx),
                item.unit_amount.to_string(),
            ));
            params.push((
                format!("line_items[{}][price_data][product_data][name]", idx),
                item.name.clone(),
            ));
        }

        let url = format!("{}/v1/checkout/sessions", self.api_base);
        debug!(%url, "Creating Stripe checkout session");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Stripe session creation request failed: {}", e);
                ServiceError::UpstreamError(format!("Failed to reach payment provider: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_stripe_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), "Stripe rejected session creation: {}", message);
            return Err(ServiceError::UpstreamError(message));
        }

        response.json::<CreatedCheckoutSession>().await.map_err(|e| {
            error!("Failed to decode Stripe session response: {}", e);
            ServiceError::UpstreamError(format!("Invalid response from payment provider: {}", e))
        })
    }

    /// Fetches a Checkout Session by id and returns the provider's JSON
    /// unmodified, for clients polling payment status after redirect.
    #[instrument(skip(self))]
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<serde_json::Value, ServiceError> {
        let url = format!("{}/v1/checkout/sessions/{}", self.api_base, session_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                error!("Stripe session lookup request failed: {}", e);
                ServiceError::UpstreamError(format!("Failed to reach payment provider: {}", e))
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ServiceError::NotFound(format!(
                "Checkout session {} not found",
                session_id
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_stripe_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), "Stripe rejected session lookup: {}", message);
            return Err(ServiceError::UpstreamError(message));
        }

        response.json::<serde_json::Value>().await.map_err(|e| {
            error!("Failed to decode Stripe session response: {}", e);
            ServiceError::UpstreamError(format!("Invalid response from payment provider: {}", e))
        })
    }
}

/// Scale a major-unit price to the smallest unit of `currency`.
///
/// Fails on amounts that do not land on a whole minor unit, rather than
/// silently rounding a price the catalog should never contain.
pub fn to_minor_units(price: Decimal, currency: &str) -> Result<i64, ServiceError> {
    let scaled = if ZERO_DECIMAL_CURRENCIES.contains(currency.to_lowercase().as_str()) {
        price
    } else {
        price * Decimal::from(100)
    };
    let normalized = scaled.normalize();
    if normalized.fract() != Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "Price {} cannot be expressed in minor units of {}",
            price, currency
        )));
    }
    normalized.to_i64().ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "Price {} overflows minor units of {}",
            price, currency
        ))
    })
}

/// Inverse of [`to_minor_units`], for amounts reported back by the provider.
pub fn from_minor_units(amount: i64, currency: &str) -> Decimal {
    if ZERO_DECIMAL_CURRENCIES.contains(currency.to_lowercase().as_str()) {
        Decimal::from(amount)
    } else {
        Decimal::from(amount) / Decimal::from(100)
    }
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix ts>` and one or more `v1=<hex hmac>` entries;
/// the signed payload is `"{t}.{body}"`. A delivery older than
/// `tolerance_secs` is rejected even with a valid signature, which bounds
/// replay of captured webhooks.
pub fn verify_stripe_signature(
    signature_header: &str,
    payload: &str,
    secret: &str,
    tolerance_secs: i64,
) -> bool {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        warn!("Stripe signature header missing t= component");
        return false;
    };
    if candidates.is_empty() {
        warn!("Stripe signature header missing v1= component");
        return false;
    }

    let Ok(signed_at) = timestamp.parse::<i64>() else {
        warn!("Stripe signature header carries a non-numeric timestamp");
        return false;
    };
    if tolerance_secs > 0 && (Utc::now().timestamp() - signed_at).abs() > tolerance_secs {
        warn!("Stripe webhook timestamp outside the accepted tolerance window");
        return false;
    }

    let signed_payload = format!("{}.{}", timestamp, payload);
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    // Multiple v1 entries appear while the endpoint secret is being rolled.
    candidates
        .iter()
        .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn extract_stripe_error(status: u16, body: &str) -> String {
    #[derive(Deserialize)]
    struct StripeErrorEnvelope {
        error: StripeErrorBody,
    }
    #[derive(Deserialize)]
    struct StripeErrorBody {
        #[serde(default)]
        message: Option<String>,
    }

    match serde_json::from_str::<StripeErrorEnvelope>(body) {
        Ok(envelope) => envelope
            .error
            .message
            .unwrap_or_else(|| format!("Payment provider returned status {}", status)),
        Err(_) => format!("Payment provider returned status {}", status),
    }
}
