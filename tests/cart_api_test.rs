//! Integration tests for the per-user cart.
//!
//! Tests cover:
//! - Transient empty reads before the first add
//! - Adding items with price snapshots and duplicate rejection
//! - Removing lines and the running total
//! - Per-user isolation

mod common;

use axum::http::Method;
use common::{read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use streamcart_api::entities::content::ContentCategory;

#[tokio::test]
async fn cart_reads_empty_before_first_add() {
    let app = TestApp::new().await;
    let user = app.register_and_login("alice").await;

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&user.access_token))
        .await;
    assert_eq!(response.status(), 200);
    let body = read_json(response).await;
    assert!(body["id"].is_null(), "no cart row exists yet");
    assert!(body["version"].is_null());
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], "0");
}

#[tokio::test]
async fn adding_items_accumulates_the_total() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let video = app
        .seed_content("React Basics Tutorial", ContentCategory::Video, dec!(49.50))
        .await;
    let user = app.register_and_login("bob").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart",
            Some(json!({"content_id": movie.id, "kind": "buy", "price": "299"})),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = read_json(response).await;
    assert!(body["id"].is_string(), "first add persists the cart");
    assert_eq!(body["version"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["kind"], "buy");
    assert_eq!(body["total"], "299");

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart",
            Some(json!({"content_id": video.id, "kind": "rent", "price": "49.50"})),
            Some(&user.access_token),
        )
        .await;
    let body = read_json(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], "348.50");
}

#[tokio::test]
async fn same_content_and_kind_cannot_be_added_twice() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let user = app.register_and_login("carol").await;

    let payload = json!({"content_id": movie.id, "kind": "rent", "price": "99"});
    let response = app
        .request(
            Method::POST,
            "/api/v1/cart",
            Some(payload.clone()),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart",
            Some(payload),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = read_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Item already in cart"));

    // The same content under a different acquisition kind is a new line.
    let response = app
        .request(
            Method::POST,
            "/api/v1/cart",
            Some(json!({"content_id": movie.id, "kind": "buy", "price": "299"})),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(read_json(response).await["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn add_rejects_unknown_content_and_negative_prices() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let user = app.register_and_login("dave").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart",
            Some(json!({
                "content_id": "00000000-0000-0000-0000-000000000000",
                "kind": "buy",
                "price": "10",
            })),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart",
            Some(json!({"content_id": movie.id, "kind": "buy", "price": "-1"})),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn removing_a_line_updates_the_cart() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let other = app
        .seed_content("Interstellar", ContentCategory::Movie, dec!(349))
        .await;
    let user = app.register_and_login("erin").await;

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
            "/api/v1/cart",
            Some(json!({"content_id": other.id, "kind": "buy", "price": "349"})),
            Some(&user.access_token),
        )
        .await;
    let cart = read_json(response).await;
    let first_item_id = cart["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["content_id"] == json!(movie.id))
        .expect("movie line present")["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/items/{}", first_item_id),
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Item removed successfully");
    assert_eq!(body["cart"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["cart"]["total"], "349");

    // Removing it again is a lookup miss.
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/items/{}", first_item_id),
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn removing_from_an_absent_cart_is_a_miss() {
    let app = TestApp::new().await;
    let user = app.register_and_login("frank").await;

    let response = app
        .request(
            Method::DELETE,
            "/api/v1/cart/items/00000000-0000-0000-0000-000000000000",
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn carts_are_isolated_per_user() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let alice = app.register_and_login("alice").await;
    let bob = app.register_and_login("bob").await;

    app.request(
        Method::POST,
        "/api/v1/cart",
        Some(json!({"content_id": movie.id, "kind": "buy", "price": "299"})),
        Some(&alice.access_token),
    )
    .await;

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&bob.access_token))
        .await;
    let body = read_json(response).await;
    assert_eq!(
        body["items"].as_array().unwrap().len(),
        0,
        "one user's cart must not leak into another's"
    );
}
