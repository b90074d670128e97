// Shared across several test binaries; not every binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware,
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use streamcart_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::content::ContentCategory,
    events::{self, EventSender},
    handlers::AppServices,
    payments::StripeClient,
    request_id::request_id_middleware,
    services::catalog::{ContentResponse, NewContent},
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application backed by a throwaway
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

/// An account registered through the API, with its session tokens.
pub struct TestUser {
    pub user_id: Uuid,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application after letting the caller adjust the
    /// configuration (clear policy, webhook secret, provider base URL).
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("streamcart_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_access_secret_that_is_at_least_32_chars".to_string(),
            "test_refresh_secret_that_is_at_least_32c".to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.stripe.secret_key = "sk_test_streamcart".to_string();
        // Unroutable unless a test points it at a mock provider.
        cfg.stripe.api_base = "http://127.0.0.1:1".to_string();
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg), db_arc.clone()));
        let stripe =
            Arc::new(StripeClient::from_config(&cfg.stripe).expect("stripe client for tests"));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender),
            auth_service.clone(),
            stripe,
            cfg.checkout.clear_policy,
        );

        let state = Arc::new(AppState {
            db: db_arc,
            config: cfg,
            services,
        });

        // Mirror the serving router: bearer-protected routes resolve the
        // auth service from request extensions, inserted by this layer.
        let router = Router::new()
            .nest("/api/v1", streamcart_api::api_v1_routes())
            .layer(middleware::from_fn_with_state(
                auth_service,
                |State(auth): State<Arc<AuthService>>,
                 mut req: Request<Body>,
                 next: middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .layer(middleware::from_fn(request_id_middleware))
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request with arbitrary extra headers and a raw string body.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: String,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(Body::from(body))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Register an account through the API and log it in.
    pub async fn register_and_login(&self, username: &str) -> TestUser {
        let register = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                Some(json!({
                    "username": username,
                    "password": "password123",
                })),
                None,
            )
            .await;
        assert_eq!(register.status(), 201, "registration should succeed");

        let login = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                Some(json!({
                    "username": username,
                    "password": "password123",
                })),
                None,
            )
            .await;
        assert_eq!(login.status(), 200, "login should succeed");

        let body = read_json(login).await;
        TestUser {
            user_id: body["user"]["id"]
                .as_str()
                .and_then(|id| Uuid::parse_str(id).ok())
                .expect("login response carries the user id"),
            username: username.to_string(),
            access_token: body["access_token"]
                .as_str()
                .expect("login response carries an access token")
                .to_string(),
            refresh_token: body["refresh_token"]
                .as_str()
                .expect("login response carries a refresh token")
                .to_string(),
        }
    }

    /// Insert a catalog row directly through the service layer.
    pub async fn seed_content(
        &self,
        title: &str,
        category: ContentCategory,
        price: Decimal,
    ) -> ContentResponse {
        self.state
            .services
            .catalog
            .create_content(NewContent {
                title: title.to_string(),
                description: Some(format!("{} description", title)),
                category,
                price,
                stream_url: Some(format!(
                    "https://cdn.example.com/streams/{}",
                    title.to_lowercase().replace(' ', "-")
                )),
                thumbnail_url: None,
                duration_secs: Some(5400),
            })
            .await
            .expect("seed content for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Decode a response body as JSON.
pub async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response body")
}
