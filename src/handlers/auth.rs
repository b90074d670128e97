use crate::auth::{
    auth_middleware, AccessTokenResponse, AuthUser, LoginRequest, LoginResponse,
    RefreshTokenRequest, RegisterRequest, UserResponse,
};
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, MessageResponse};
use crate::AppState;
use axum::{
    extract::{Json, State},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates the router for authentication endpoints
///
/// Register, login and refresh are reachable without a token; logout and the
/// profile endpoint require a bearer token.
pub fn auth_routes() -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route_layer(axum::middleware::from_fn(auth_middleware));

    public.merge(protected)
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Invalid registration data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username already taken", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    state.services.accounts.register(payload).await?;
    Ok(created_response(MessageResponse::new(
        "User registered successfully",
    )))
}

/// Exchange credentials for a token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let response = state.services.accounts.login(payload).await?;
    Ok(success_response(response))
}

/// Mint a fresh access token from a refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 403, description = "Invalid refresh token", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Response, ApiError> {
    let response = state.services.accounts.refresh(payload).await?;
    Ok(success_response(response))
}

/// Invalidate the caller's stored refresh token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    state.services.accounts.logout(user.user_id).await?;
    Ok(success_response(MessageResponse::new(
        "Logged out successfully",
    )))
}

/// Fetch the caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn me(State(state): State<Arc<AppState>>, user: AuthUser) -> Result<Response, ApiError> {
    let profile = state.services.accounts.profile(user.user_id).await?;
    Ok(success_response(profile))
}
