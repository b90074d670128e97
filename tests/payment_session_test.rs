//! Integration tests for hosted payment sessions, with the provider API
//! stubbed out by a local mock server.
//!
//! Tests cover:
//! - Session creation from the caller's cart
//! - Provider failures surfacing as bad-gateway responses
//! - Post-redirect session lookup

mod common;

use axum::http::Method;
use common::{read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use streamcart_api::entities::content::ContentCategory;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn app_against(mock: &MockServer) -> TestApp {
    let base = mock.uri();
    TestApp::with_config(move |cfg| {
        cfg.stripe.api_base = base;
    })
    .await
}

// ==================== Session creation ====================

#[tokio::test]
async fn checkout_session_is_created_for_a_full_cart() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test_streamcart"))
        .and(body_string_contains("mode=payment"))
        .and(body_string_contains("client_reference_id"))
        .and(body_string_contains("line_items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_live_1",
            "url": "https://pay.example/cs_live_1",
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let app = app_against(&mock).await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let user = app.register_and_login("alice").await;
    app.request(
        Method::POST,
        "/api/v1/cart",
        Some(json!({"content_id": movie.id, "kind": "buy", "price": "299"})),
        Some(&user.access_token),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/checkout-session",
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = read_json(response).await;
    assert_eq!(body["id"], "cs_live_1");
    assert_eq!(body["url"], "https://pay.example/cs_live_1");
}

#[tokio::test]
async fn empty_carts_never_reach_the_provider() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock)
        .await;

    let app = app_against(&mock).await;
    let user = app.register_and_login("bob").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/checkout-session",
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = read_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Cart is empty"));
}

#[tokio::test]
async fn session_creation_requires_authentication() {
    let mock = MockServer::start().await;
    let app = app_against(&mock).await;

    let response = app
        .request(Method::POST, "/api/v1/payments/checkout-session", None, None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn provider_rejections_surface_as_bad_gateway() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid API Key provided" }
        })))
        .mount(&mock)
        .await;

    let app = app_against(&mock).await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let user = app.register_and_login("carol").await;
    app.request(
        Method::POST,
        "/api/v1/cart",
        Some(json!({"content_id": movie.id, "kind": "buy", "price": "299"})),
        Some(&user.access_token),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/checkout-session",
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 502);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid API Key provided"));
}

// ==================== Session lookup ====================

#[tokio::test]
async fn session_lookup_passes_the_provider_object_through() {
    let mock = MockServer::start().await;
    let session = json!({
        "id": "cs_live_2",
        "payment_status": "paid",
        "amount_total": 34_800,
    });
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_live_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session.clone()))
        .mount(&mock)
        .await;

    let app = app_against(&mock).await;
    let response = app
        .request(
            Method::GET,
            "/api/v1/payments/session?session_id=cs_live_2",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(read_json(response).await, session);
}

#[tokio::test]
async fn session_lookup_requires_an_id() {
    let mock = MockServer::start().await;
    let app = app_against(&mock).await;

    let response = app
        .request(Method::GET, "/api/v1/payments/session", None, None)
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(read_json(response).await["message"], "session_id is required");

    let response = app
        .request(
            Method::GET,
            "/api/v1/payments/session?session_id=%20%20",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unknown_sessions_read_as_not_found() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "message": "No such checkout session" }
        })))
        .mount(&mock)
        .await;

    let app = app_against(&mock).await;
    let response = app
        .request(
            Method::GET,
            "/api/v1/payments/session?session_id=cs_missing",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
    let body = read_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Checkout session"));
}
