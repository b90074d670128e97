//! Streamcart API Library
//!
//! This crate provides the core functionality for the Streamcart API: a
//! content storefront with accounts, engagement, carts, checkout and
//! payment-provider integration.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod migrator;
pub mod openapi;
pub mod payments;
pub mod request_id;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Builds the `/api/v1` route tree
///
/// Each handler module contributes its own router and decides which of its
/// routes sit behind the bearer middleware.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/content", handlers::content::content_routes())
        .nest("/cart", handlers::carts::cart_routes())
        .nest("/checkout", handlers::checkout::checkout_routes())
        .nest("/orders", handlers::orders::order_routes())
        .nest("/watchlist", handlers::watchlist::watchlist_routes())
        .nest("/payments", handlers::payments::payment_routes())
}
