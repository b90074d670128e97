//! Seed data script - populates the database with demo accounts and catalog
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 2 demo accounts (alice, bob)
//! - 4 catalog entries across the movie, video and live categories

use rust_decimal_macros::dec;
use sea_orm::ConnectOptions;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::info;

use streamcart_api::auth::{AuthConfig, AuthService, RegisterRequest, UserResponse};
use streamcart_api::db::run_migrations;
use streamcart_api::entities::content::ContentCategory;
use streamcart_api::services::catalog::NewContent;
use streamcart_api::services::{AccountService, CatalogService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Streamcart API Seed Data ===");
    info!("Creating demo accounts and catalog entries...\n");

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://streamcart.db?mode=rwc".to_string());

    let mut options = ConnectOptions::new(database_url.clone());
    options
        .max_connections(5)
        .min_connections(1)
        .connect_timeout(StdDuration::from_secs(10))
        .acquire_timeout(StdDuration::from_secs(10));

    info!("Connecting to database: {}", database_url);
    let db = sea_orm::Database::connect(options).await?;
    run_migrations(&db).await?;
    let db = Arc::new(db);
    info!("Connected!\n");

    // The auth service is only used for credential hashing here; the signing
    // secrets never leave this process.
    let auth_cfg = AuthConfig::new(
        "seed-only-access-secret-not-used-for-serving".to_string(),
        "seed-only-refresh-secret-not-used-for-serving".to_string(),
        "streamcart-clients".to_string(),
        "streamcart-api".to_string(),
        StdDuration::from_secs(3600),
        StdDuration::from_secs(604_800),
    );
    let auth = Arc::new(AuthService::new(auth_cfg, db.clone()));
    let accounts = AccountService::new(db.clone(), auth, None);
    let catalog = CatalogService::new(db.clone(), None);

    info!("Creating accounts...");
    let users = create_accounts(&accounts).await?;
    info!("  Created {} accounts", users.len());

    info!("Creating catalog entries...");
    let content_count = create_catalog(&catalog).await?;
    info!("  Created {} catalog entries", content_count);

    info!("\n=== Seed Data Complete ===");
    info!("Your Streamcart API is now populated with demo data!");
    info!("");
    info!("Try these API calls:");
    info!("  curl http://localhost:8080/api/v1/content");
    info!("  curl http://localhost:8080/api/v1/content/category/movie");
    info!("  curl 'http://localhost:8080/api/v1/content/search?q=inter'");
    info!("  curl -X POST http://localhost:8080/api/v1/auth/login \\");
    info!("       -H 'Content-Type: application/json' \\");
    info!("       -d '{{\"username\":\"alice\",\"password\":\"password123\"}}'");
    info!("");
    info!("Or explore interactively at: http://localhost:8080/swagger-ui");

    Ok(())
}

async fn create_accounts(accounts: &AccountService) -> anyhow::Result<Vec<UserResponse>> {
    let accounts_data = vec![
        ("alice", "password123", "1995-01-01", "Mumbai, India"),
        ("bob", "password123", "1998-05-12", "Delhi, India"),
    ];

    let mut created = Vec::new();

    for (username, password, date_of_birth, address) in accounts_data {
        let user = accounts
            .register(RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
                date_of_birth: Some(date_of_birth.parse()?),
                address: Some(address.to_string()),
            })
            .await?;
        created.push(user);
    }

    Ok(created)
}

async fn create_catalog(catalog: &CatalogService) -> anyhow::Result<usize> {
    let catalog_data = vec![
        NewContent {
            title: "Inception".to_string(),
            description: Some("A thief who steals corporate secrets through dream-sharing technology.".to_string()),
            category: ContentCategory::Movie,
            price: dec!(299),
            stream_url: Some("https://cdn.example.com/streams/inception".to_string()),
            thumbnail_url: Some("https://cdn.example.com/thumbs/inception.jpg".to_string()),
            duration_secs: Some(8880),
        },
        NewContent {
            title: "Interstellar".to_string(),
            description: Some("Explorers travel through a wormhole in space to ensure humanity's survival.".to_string()),
            category: ContentCategory::Movie,
            price: dec!(349),
            stream_url: Some("https://cdn.example.com/streams/interstellar".to_string()),
            thumbnail_url: Some("https://cdn.example.com/thumbs/interstellar.jpg".to_string()),
            duration_secs: Some(10140),
        },
        NewContent {
            title: "React Basics Tutorial".to_string(),
            description: Some("A hands-on introduction to building interfaces with React.".to_string()),
            category: ContentCategory::Video,
            price: dec!(0),
            stream_url: Some("https://cdn.example.com/streams/react-basics".to_string()),
            thumbnail_url: Some("https://cdn.example.com/thumbs/react-basics.jpg".to_string()),
            duration_secs: Some(3600),
        },
        NewContent {
            title: "Node.js Live Coding".to_string(),
            description: Some("Live session: building an HTTP service from scratch in Node.js.".to_string()),
            category: ContentCategory::Live,
            price: dec!(0),
            stream_url: Some("https://cdn.example.com/live/nodejs-live".to_string()),
            thumbnail_url: Some("https://cdn.example.com/thumbs/nodejs-live.jpg".to_string()),
            duration_secs: None,
        },
    ];

    let mut count = 0;
    for entry in catalog_data {
        catalog.create_content(entry).await?;
        count += 1;
    }

    Ok(count)
}
