//! Integration tests for provider webhook fulfillment.
//!
//! Tests cover:
//! - Turning `checkout.session.completed` into a paid order
//! - Redelivery deduplication on the payment intent
//! - Signature verification when a webhook secret is configured
//! - Acknowledge-and-drop for unrelated event kinds

mod common;

use axum::http::Method;
use common::{read_json, TestApp};
use hmac::{Hmac, Mac};
use rust_decimal_macros::dec;
use serde_json::json;
use sha2::Sha256;
use streamcart_api::entities::content::ContentCategory;
use uuid::Uuid;

/// Signs `payload` the way the provider does: HMAC-SHA256 over
/// `"{timestamp}.{payload}"`, presented as `t=...,v1=...`.
fn sign_payload(payload: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

fn completed_event(user_id: Uuid, payment_intent: &str, amount_total: Option<i64>) -> String {
    json!({
        "id": "evt_test_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_1",
                "client_reference_id": user_id.to_string(),
                "payment_intent": payment_intent,
                "amount_total": amount_total,
                "currency": amount_total.map(|_| "usd"),
            }
        }
    })
    .to_string()
}

async fn fill_cart(app: &TestApp, token: &str) {
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let video = app
        .seed_content("React Basics Tutorial", ContentCategory::Video, dec!(49))
        .await;
    app.request(
        Method::POST,
        "/api/v1/cart",
        Some(json!({"content_id": movie.id, "kind": "buy", "price": "299"})),
        Some(token),
    )
    .await;
    app.request(
        Method::POST,
        "/api/v1/cart",
        Some(json!({"content_id": video.id, "kind": "rent", "price": "49"})),
        Some(token),
    )
    .await;
}

// ==================== Fulfillment ====================

#[tokio::test]
async fn completed_session_creates_a_paid_order_from_the_cart() {
    let app = TestApp::new().await;
    let user = app.register_and_login("alice").await;
    fill_cart(&app, &user.access_token).await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            completed_event(user.user_id, "pi_test_1", Some(34_800)),
            &[],
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(read_json(response).await, json!({ "received": true }));

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some(&user.access_token))
        .await;
    let body = read_json(response).await;
    assert_eq!(body["total"], 1);
    let order = &body["orders"][0];
    assert_eq!(order["status"], "paid");
    assert_eq!(order["total"], "348.00", "provider amount is in minor units");
    assert_eq!(order["currency"], "usd");
    assert_eq!(order["payment_intent_id"], "pi_test_1");

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    for line in items {
        assert!(line["content_id"].is_null(), "webhook lines carry no catalog link");
        assert!(line["kind"].is_null());
        assert!(line["name"].is_string());
    }

    // Fulfillment clears the cart in the same transaction.
    let cart = read_json(
        app.request(Method::GET, "/api/v1/cart", None, Some(&user.access_token))
            .await,
    )
    .await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn fulfillment_without_provider_amount_totals_the_cart() {
    let app = TestApp::new().await;
    let user = app.register_and_login("bob").await;
    fill_cart(&app, &user.access_token).await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            completed_event(user.user_id, "pi_test_2", None),
            &[],
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = read_json(
        app.request(Method::GET, "/api/v1/orders", None, Some(&user.access_token))
            .await,
    )
    .await;
    assert_eq!(body["orders"][0]["total"], "348", "falls back to the cart total");
}

#[tokio::test]
async fn fulfillment_with_no_cart_still_records_the_payment() {
    let app = TestApp::new().await;
    let user = app.register_and_login("carol").await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            completed_event(user.user_id, "pi_test_3", Some(50_000)),
            &[],
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = read_json(
        app.request(Method::GET, "/api/v1/orders", None, Some(&user.access_token))
            .await,
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["orders"][0]["status"], "paid");
    assert_eq!(body["orders"][0]["items"].as_array().unwrap().len(), 0);
}

// ==================== Deduplication ====================

#[tokio::test]
async fn redelivered_events_do_not_duplicate_the_order() {
    let app = TestApp::new().await;
    let user = app.register_and_login("dave").await;
    fill_cart(&app, &user.access_token).await;

    let payload = completed_event(user.user_id, "pi_test_4", Some(34_800));
    for _ in 0..3 {
        let response = app
            .request_raw(Method::POST, "/api/v1/payments/webhook", payload.clone(), &[])
            .await;
        assert_eq!(response.status(), 200, "redeliveries are acknowledged");
    }

    let body = read_json(
        app.request(Method::GET, "/api/v1/orders", None, Some(&user.access_token))
            .await,
    )
    .await;
    assert_eq!(body["total"], 1, "one order per payment intent");
}

// ==================== Event filtering and validation ====================

#[tokio::test]
async fn unrelated_event_kinds_are_acknowledged_and_dropped() {
    let app = TestApp::new().await;
    let user = app.register_and_login("erin").await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            json!({
                "id": "evt_test_9",
                "type": "payment_intent.succeeded",
                "data": { "object": {} }
            })
            .to_string(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(read_json(response).await, json!({ "received": true }));

    let body = read_json(
        app.request(Method::GET, "/api/v1/orders", None, Some(&user.access_token))
            .await,
    )
    .await;
    assert_eq!(body["total"], 0, "no order for an ignored event");
}

#[tokio::test]
async fn completed_session_without_a_client_reference_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            json!({
                "type": "checkout.session.completed",
                "data": { "object": { "id": "cs_test_x", "payment_intent": "pi_x" } }
            })
            .to_string(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Missing client reference"));
}

#[tokio::test]
async fn completed_session_with_a_garbage_reference_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            json!({
                "type": "checkout.session.completed",
                "data": { "object": { "client_reference_id": "not-a-uuid" } }
            })
            .to_string(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid client reference"));
}

#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            "{not json".to_string(),
            &[],
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Malformed webhook event"));
}

// ==================== Signature verification ====================

#[tokio::test]
async fn configured_secret_rejects_unsigned_deliveries() {
    let app = TestApp::with_config(|cfg| {
        cfg.stripe.webhook_secret = Some("whsec_test_secret".to_string());
    })
    .await;
    let user = app.register_and_login("frank").await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            completed_event(user.user_id, "pi_test_5", Some(1_000)),
            &[],
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(read_json(response).await["message"], "Invalid webhook signature");
}

#[tokio::test]
async fn configured_secret_rejects_a_wrong_key() {
    let app = TestApp::with_config(|cfg| {
        cfg.stripe.webhook_secret = Some("whsec_test_secret".to_string());
    })
    .await;
    let user = app.register_and_login("grace").await;

    let payload = completed_event(user.user_id, "pi_test_6", Some(1_000));
    let signature = sign_payload(&payload, "whsec_wrong_secret");
    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            payload,
            &[("Stripe-Signature", &signature)],
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn correctly_signed_deliveries_are_fulfilled() {
    let app = TestApp::with_config(|cfg| {
        cfg.stripe.webhook_secret = Some("whsec_test_secret".to_string());
    })
    .await;
    let user = app.register_and_login("heidi").await;
    fill_cart(&app, &user.access_token).await;

    let payload = completed_event(user.user_id, "pi_test_7", Some(34_800));
    let signature = sign_payload(&payload, "whsec_test_secret");
    let response = app
        .request_raw(
            Method::POST,
            "/api/v1/payments/webhook",
            payload,
            &[("Stripe-Signature", &signature)],
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = read_json(
        app.request(Method::GET, "/api/v1/orders", None, Some(&user.access_token))
            .await,
    )
    .await;
    assert_eq!(body["orders"][0]["status"], "paid");
}
