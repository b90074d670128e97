//! Integration tests for the per-user watchlist.
//!
//! Tests cover:
//! - Adding and removing catalog entries
//! - Duplicate and lookup-miss handling
//! - Per-user isolation

mod common;

use axum::http::Method;
use common::{read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use streamcart_api::entities::content::ContentCategory;

#[tokio::test]
async fn watchlist_starts_empty() {
    let app = TestApp::new().await;
    let user = app.register_and_login("alice").await;

    let response = app
        .request(Method::GET, "/api/v1/watchlist", None, Some(&user.access_token))
        .await;
    assert_eq!(response.status(), 200);
    let body = read_json(response).await;
    assert_eq!(body["watchlist"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn added_entries_come_back_as_full_catalog_rows() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let video = app
        .seed_content("React Basics Tutorial", ContentCategory::Video, dec!(0))
        .await;
    let user = app.register_and_login("bob").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/watchlist",
            Some(json!({"content_id": movie.id})),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Content added to watchlist");
    assert_eq!(body["watchlist"].as_array().unwrap().len(), 1);
    assert_eq!(body["watchlist"][0]["title"], "Inception");
    assert_eq!(body["watchlist"][0]["category"], "movie");
    assert_eq!(body["watchlist"][0]["price"], "299");

    let response = app
        .request(
            Method::POST,
            "/api/v1/watchlist",
            Some(json!({"content_id": video.id})),
            Some(&user.access_token),
        )
        .await;
    let body = read_json(response).await;
    assert_eq!(body["watchlist"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_adds_conflict() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let user = app.register_and_login("carol").await;

    let payload = json!({"content_id": movie.id});
    let response = app
        .request(
            Method::POST,
            "/api/v1/watchlist",
            Some(payload.clone()),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            Method::POST,
            "/api/v1/watchlist",
            Some(payload),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 409);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Content already in watchlist"));
}

#[tokio::test]
async fn adding_unknown_content_is_a_miss() {
    let app = TestApp::new().await;
    let user = app.register_and_login("dave").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/watchlist",
            Some(json!({"content_id": "00000000-0000-0000-0000-000000000000"})),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn removal_shrinks_the_watchlist() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let other = app
        .seed_content("Interstellar", ContentCategory::Movie, dec!(349))
        .await;
    let user = app.register_and_login("erin").await;

    for id in [movie.id, other.id] {
        app.request(
            Method::POST,
            "/api/v1/watchlist",
            Some(json!({"content_id": id})),
            Some(&user.access_token),
        )
        .await;
    }

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/watchlist/{}", movie.id),
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Content removed from watchlist");
    assert_eq!(body["watchlist"].as_array().unwrap().len(), 1);
    assert_eq!(body["watchlist"][0]["title"], "Interstellar");

    // Removing an entry that is not on the list is a miss.
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/watchlist/{}", movie.id),
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(response.status(), 404);
    let body = read_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Content not in watchlist"));
}

#[tokio::test]
async fn watchlists_are_isolated_per_user() {
    let app = TestApp::new().await;
    let movie = app
        .seed_content("Inception", ContentCategory::Movie, dec!(299))
        .await;
    let alice = app.register_and_login("alice").await;
    let bob = app.register_and_login("bob").await;

    app.request(
        Method::POST,
        "/api/v1/watchlist",
        Some(json!({"content_id": movie.id})),
        Some(&alice.access_token),
    )
    .await;

    let body = read_json(
        app.request(Method::GET, "/api/v1/watchlist", None, Some(&bob.access_token))
            .await,
    )
    .await;
    assert_eq!(body["watchlist"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn watchlist_requires_authentication() {
    let app = TestApp::new().await;

    for (method, uri) in [
        (Method::GET, "/api/v1/watchlist"),
        (Method::POST, "/api/v1/watchlist"),
        (
            Method::DELETE,
            "/api/v1/watchlist/00000000-0000-0000-0000-000000000000",
        ),
    ] {
        let response = app.request(method, uri, None, None).await;
        assert_eq!(response.status(), 401, "unauthenticated {}", uri);
    }
}
