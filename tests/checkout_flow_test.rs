//! Integration tests for the checkout flow.
//!
//! Tests cover:
//! - Snapshotting the cart into a pending order
//! - The immediate vs deferred cart-clearing policies
//! - Empty-cart and unauthenticated rejections

mod common;

use axum::http::Method;
use common::{read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use streamcart_api::config::ClearPolicy;
use streamcart_api::entities::content::ContentCategory;

async fn fill_cart(app: &TestApp, token: &str) -> (serde_json::Value, serde_json::Value) {
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let video = app
        .seed_content("React Basics Tutorial", ContentCategory::Video, dec!(49))
        .await;

    app.request(
        Method::POST,
        "/api/v1/cart",
        Some(json!({"content_id": movie.id, "kind": "buy", "price": movie.price})),
        Some(token),
    )
    .await;
    app.request(
        Method::POST,
        "/api/v1/cart",
        Some(json!({"content_id": video.id, "kind": "rent", "price": video.price})),
        Some(token),
    )
    .await;

    (json!(movie.id), json!(video.id))
}

// ==================== Order creation ====================

#[tokio::test]
async fn checkout_snapshots_the_cart_into_a_pending_order() {
    let app = TestApp::new().await;
    let user = app.register_and_login("alice").await;
    let (movie_id, _) = fill_cart(&app, &user.access_token).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", None, Some(&user.access_token))
        .await;
    assert_eq!(response.status(), 201);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Checkout complete");

    let order = &body["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], "348");
    assert_eq!(order["currency"], "usd");
    assert!(order["payment_intent_id"].is_null(), "no payment yet");
    assert_eq!(order["version"], 1);

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    let movie_line = items
        .iter()
        .find(|line| line["content_id"] == movie_id)
        .expect("movie line present");
    assert_eq!(movie_line["name"], "Inception");
    assert_eq!(movie_line["kind"], "buy");
    assert_eq!(movie_line["price"], "299");
}

#[tokio::test]
async fn immediate_policy_clears_the_cart_in_the_same_transaction() {
    let app = TestApp::new().await;
    let user = app.register_and_login("bob").await;
    fill_cart(&app, &user.access_token).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", None, Some(&user.access_token))
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&user.access_token))
        .await;
    let cart = read_json(response).await;
    assert_eq!(
        cart["items"].as_array().unwrap().len(),
        0,
        "immediate policy empties the cart"
    );
    assert_eq!(cart["total"], "0");
}

#[tokio::test]
async fn deferred_policy_leaves_the_cart_intact() {
    let app = TestApp::with_config(|cfg| {
        cfg.checkout.clear_policy = ClearPolicy::Deferred;
    })
    .await;
    let user = app.register_and_login("carol").await;
    fill_cart(&app, &user.access_token).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", None, Some(&user.access_token))
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&user.access_token))
        .await;
    let cart = read_json(response).await;
    assert_eq!(
        cart["items"].as_array().unwrap().len(),
        2,
        "deferred policy keeps the cart until the payment webhook lands"
    );
}

#[tokio::test]
async fn repeat_checkouts_create_separate_orders() {
    let app = TestApp::with_config(|cfg| {
        cfg.checkout.clear_policy = ClearPolicy::Deferred;
    })
    .await;
    let user = app.register_and_login("dave").await;
    fill_cart(&app, &user.access_token).await;

    let first = read_json(
        app.request(Method::POST, "/api/v1/checkout", None, Some(&user.access_token))
            .await,
    )
    .await;
    let second = read_json(
        app.request(Method::POST, "/api/v1/checkout", None, Some(&user.access_token))
            .await,
    )
    .await;

    assert_ne!(
        first["order"]["id"], second["order"]["id"],
        "each checkout snapshots a fresh order"
    );
    assert_eq!(first["order"]["total"], second["order"]["total"]);
}

// ==================== Rejections ====================

#[tokio::test]
async fn checkout_rejects_an_empty_cart() {
    let app = TestApp::new().await;
    let user = app.register_and_login("erin").await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", None, Some(&user.access_token))
        .await;
    assert_eq!(response.status(), 400);
    let body = read_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Cart is empty"));
}

#[tokio::test]
async fn checkout_requires_authentication() {
    let app = TestApp::new().await;

    let response = app.request(Method::POST, "/api/v1/checkout", None, None).await;
    assert_eq!(response.status(), 401);
}
