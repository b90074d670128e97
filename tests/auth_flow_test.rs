//! Integration tests for the account lifecycle.
//!
//! Tests cover:
//! - Registration, login, and profile reads
//! - Duplicate usernames and credential validation
//! - Refresh token issuance and revocation on logout
//! - Bearer enforcement on protected endpoints

mod common;

use axum::http::Method;
use common::{read_json, TestApp};
use serde_json::json;

// ==================== Registration and Login ====================

#[tokio::test]
async fn register_login_and_read_profile() {
    let app = TestApp::new().await;

    let register = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "alice",
                "password": "password123",
                "date_of_birth": "1995-01-01",
                "address": "Mumbai, India",
            })),
            None,
        )
        .await;
    assert_eq!(register.status(), 201);
    let body = read_json(register).await;
    assert_eq!(body["message"], "User registered successfully");

    let login = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({"username": "alice", "password": "password123"})),
            None,
        )
        .await;
    assert_eq!(login.status(), 200);
    let body = read_json(login).await;
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["username"], "alice");
    assert!(
        body["user"].get("password_hash").is_none(),
        "credential hash must never be exposed"
    );

    let token = body["access_token"].as_str().unwrap().to_string();
    let me = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await;
    assert_eq!(me.status(), 200);
    let profile = read_json(me).await;
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["date_of_birth"], "1995-01-01");
    assert_eq!(profile["address"], "Mumbai, India");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = TestApp::new().await;
    app.register_and_login("bob").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({"username": "bob", "password": "password123"})),
            None,
        )
        .await;
    assert_eq!(response.status(), 409);
    let body = read_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Username already taken"),
        "conflict body should name the clash: {}",
        body
    );
}

#[tokio::test]
async fn registration_enforces_credential_rules() {
    let app = TestApp::new().await;

    // Password shorter than eight characters
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({"username": "carol", "password": "short"})),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);

    // Username shorter than three characters
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({"username": "cd", "password": "password123"})),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_read_the_same() {
    let app = TestApp::new().await;
    app.register_and_login("dave").await;

    let wrong_password = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({"username": "dave", "password": "not-the-password"})),
            None,
        )
        .await;
    assert_eq!(wrong_password.status(), 401);
    let wrong_body = read_json(wrong_password).await;

    let unknown_user = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({"username": "nobody", "password": "password123"})),
            None,
        )
        .await;
    assert_eq!(unknown_user.status(), 401);
    let unknown_body = read_json(unknown_user).await;

    // The two failures must be indistinguishable to the caller.
    assert_eq!(wrong_body["message"], unknown_body["message"]);
    assert!(wrong_body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid credentials"));
}

// ==================== Refresh and Logout ====================

#[tokio::test]
async fn refresh_issues_a_working_access_token() {
    let app = TestApp::new().await;
    let user = app.register_and_login("erin").await;

    let refresh = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(json!({"refresh_token": user.refresh_token})),
            None,
        )
        .await;
    assert_eq!(refresh.status(), 200);
    let body = read_json(refresh).await;
    let fresh_token = body["access_token"].as_str().unwrap().to_string();

    let me = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&fresh_token))
        .await;
    assert_eq!(me.status(), 200);
    assert_eq!(read_json(me).await["username"], "erin");
}

#[tokio::test]
async fn refresh_rejects_garbage_tokens() {
    let app = TestApp::new().await;
    app.register_and_login("frank").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(json!({"refresh_token": "not-a-jwt"})),
            None,
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn logout_revokes_the_stored_refresh_token() {
    let app = TestApp::new().await;
    let user = app.register_and_login("grace").await;

    let logout = app
        .request(
            Method::POST,
            "/api/v1/auth/logout",
            None,
            Some(&user.access_token),
        )
        .await;
    assert_eq!(logout.status(), 200);
    assert_eq!(read_json(logout).await["message"], "Logged out successfully");

    // The refresh token no longer matches anything stored.
    let refresh = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(json!({"refresh_token": user.refresh_token})),
            None,
        )
        .await;
    assert_eq!(refresh.status(), 403);
}

#[tokio::test]
async fn refresh_token_does_not_work_as_access_token() {
    let app = TestApp::new().await;
    let user = app.register_and_login("heidi").await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/auth/me",
            None,
            Some(&user.refresh_token),
        )
        .await;
    assert_eq!(
        response.status(),
        401,
        "tokens signed with the refresh secret must not authenticate requests"
    );
}

// ==================== Bearer Enforcement ====================

#[tokio::test]
async fn protected_endpoints_require_a_token() {
    let app = TestApp::new().await;

    for uri in [
        "/api/v1/auth/me",
        "/api/v1/cart",
        "/api/v1/orders",
        "/api/v1/watchlist",
    ] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), 401, "{} should require auth", uri);
    }

    let checkout = app.request(Method::POST, "/api/v1/checkout", None, None).await;
    assert_eq!(checkout.status(), 401);
}

#[tokio::test]
async fn malformed_bearer_tokens_are_rejected() {
    let app = TestApp::new().await;

    let malformed = [
        "not_a_jwt",
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9",
        "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiIxMjM0NTY3ODkwIn0",
    ];
    for token in malformed {
        let response = app
            .request(Method::GET, "/api/v1/auth/me", None, Some(token))
            .await;
        assert_eq!(response.status(), 401, "token '{}' should be rejected", token);
    }
}

#[tokio::test]
async fn public_catalog_endpoints_need_no_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/content", None, None).await;
    assert_eq!(response.status(), 200);
}
