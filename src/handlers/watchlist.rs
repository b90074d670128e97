use crate::auth::{auth_middleware, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::services::catalog::ContentResponse;
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for watchlist endpoints; every route needs a bearer token
pub fn watchlist_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_watchlist))
        .route("/", post(add_to_watchlist))
        .route("/:content_id", delete(remove_from_watchlist))
        .route_layer(axum::middleware::from_fn(auth_middleware))
}

/// Request to pin a catalog entry onto the watchlist
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddWatchlistRequest {
    pub content_id: Uuid,
}

/// Watchlist contents, resolved to catalog entries
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WatchlistResponse {
    pub watchlist: Vec<ContentResponse>,
}

/// Acknowledgement plus the updated watchlist
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WatchlistActionResponse {
    pub message: String,
    pub watchlist: Vec<ContentResponse>,
}

/// Fetch the caller's watchlist
#[utoipa::path(
    get,
    path = "/api/v1/watchlist",
    responses(
        (status = 200, description = "Watchlist entries in insertion order", body = WatchlistResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "watchlist"
)]
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let watchlist = state.services.catalog.get_watchlist(user.user_id).await?;
    Ok(success_response(WatchlistResponse { watchlist }))
}

/// Pin a catalog entry onto the caller's watchlist
#[utoipa::path(
    post,
    path = "/api/v1/watchlist",
    request_body = AddWatchlistRequest,
    responses(
        (status = 200, description = "Updated watchlist", body = WatchlistActionResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already on the watchlist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "watchlist"
)]
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<AddWatchlistRequest>,
) -> Result<Response, ApiError> {
    let watchlist = state
        .services
        .catalog
        .add_to_watchlist(user.user_id, payload.content_id)
        .await?;
    Ok(success_response(WatchlistActionResponse {
        message: "Content added to watchlist".to_string(),
        watchlist,
    }))
}

/// Drop a catalog entry from the caller's watchlist
#[utoipa::path(
    delete,
    path = "/api/v1/watchlist/{content_id}",
    params(("content_id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Updated watchlist", body = WatchlistActionResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not on the watchlist", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "watchlist"
)]
pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let watchlist = state
        .services
        .catalog
        .remove_from_watchlist(user.user_id, content_id)
        .await?;
    Ok(success_response(WatchlistActionResponse {
        message: "Content removed from watchlist".to_string(),
        watchlist,
    }))
}
