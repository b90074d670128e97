use crate::auth::{auth_middleware, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, PaginationParams};
use crate::services::catalog::{
    AddCommentRequest, AddReviewRequest, CommentResponse, ContentListResponse, ContentResponse,
    ReviewResponse, SortBy, SortOrder,
};
use crate::AppState;
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Creates the router for catalog endpoints
///
/// Browsing is public; likes, comments and reviews need a bearer token.
pub fn content_routes() -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/", get(list_content))
        .route("/search", get(search_content))
        .route("/category/:category", get(list_by_category))
        .route("/sorted/:category", get(list_sorted))
        .route("/:id", get(get_content))
        .route("/:id/comments", get(list_comments))
        .route("/:id/reviews", get(list_reviews));

    let protected = Router::new()
        .route("/:id/like", post(like_content))
        .route("/:id/like", delete(unlike_content))
        .route("/:id/comments", post(add_comment))
        .route("/:id/reviews", post(add_review))
        .route_layer(axum::middleware::from_fn(auth_middleware));

    public.merge(protected)
}

/// Search parameters for title lookup
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Title fragment, matched case-insensitively
    pub q: Option<String>,
    /// Optional category filter (`all` lifts it)
    pub category: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Sort parameters for the sorted listing
#[derive(Debug, Deserialize, IntoParams)]
pub struct SortQuery {
    #[serde(default)]
    #[param(value_type = String, example = "price")]
    pub sort_by: SortBy,
    #[serde(default)]
    #[param(value_type = String, example = "asc")]
    pub sort_order: SortOrder,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Like acknowledgement with the resulting counter
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LikeStatusResponse {
    pub message: String,
    pub like_count: u64,
}

/// List catalog entries, newest first
#[utoipa::path(
    get,
    path = "/api/v1/content",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated catalog entries", body = ContentListResponse),
    ),
    tag = "content"
)]
pub async fn list_content(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let listing = state
        .services
        .catalog
        .list_content(pagination.page, pagination.limit)
        .await?;
    Ok(success_response(listing))
}

/// Search the catalog by title
#[utoipa::path(
    get,
    path = "/api/v1/content/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching catalog entries", body = ContentListResponse),
        (status = 400, description = "Missing or invalid query", body = crate::errors::ErrorResponse),
    ),
    tag = "content"
)]
pub async fn search_content(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let listing = state
        .services
        .catalog
        .search(
            query.q.as_deref().unwrap_or(""),
            query.category.as_deref(),
            query.page.unwrap_or(1),
            query.limit.unwrap_or(20),
        )
        .await?;
    Ok(success_response(listing))
}

/// List catalog entries for one category
#[utoipa::path(
    get,
    path = "/api/v1/content/category/{category}",
    params(
        ("category" = String, Path, description = "Category name, or `all`"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated catalog entries", body = ContentListResponse),
        (status = 400, description = "Unknown category", body = crate::errors::ErrorResponse),
    ),
    tag = "content"
)]
pub async fn list_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let listing = state
        .services
        .catalog
        .list_by_category(&category, pagination.page, pagination.limit)
        .await?;
    Ok(success_response(listing))
}

/// List catalog entries with a caller-chosen sort
#[utoipa::path(
    get,
    path = "/api/v1/content/sorted/{category}",
    params(
        ("category" = String, Path, description = "Category name, or `all`"),
        SortQuery,
    ),
    responses(
        (status = 200, description = "Sorted catalog entries", body = ContentListResponse),
        (status = 400, description = "Unknown category or sort key", body = crate::errors::ErrorResponse),
    ),
    tag = "content"
)]
pub async fn list_sorted(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    Query(query): Query<SortQuery>,
) -> Result<Response, ApiError> {
    let listing = state
        .services
        .catalog
        .list_sorted(
            &category,
            query.sort_by,
            query.sort_order,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(20),
        )
        .await?;
    Ok(success_response(listing))
}

/// Fetch a single catalog entry
#[utoipa::path(
    get,
    path = "/api/v1/content/{id}",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Catalog entry", body = ContentResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    tag = "content"
)]
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let content = state
        .services
        .catalog
        .get_content(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Content not found".to_string()))?;
    Ok(success_response(content))
}

/// Like a catalog entry
#[utoipa::path(
    post,
    path = "/api/v1/content/{id}/like",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Like recorded", body = LikeStatusResponse),
        (status = 400, description = "Already liked", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "content"
)]
pub async fn like_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let like_count = state.services.catalog.like_content(user.user_id, id).await?;
    Ok(success_response(LikeStatusResponse {
        message: "Content liked".to_string(),
        like_count,
    }))
}

/// Remove a previously recorded like
#[utoipa::path(
    delete,
    path = "/api/v1/content/{id}/like",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Like removed", body = LikeStatusResponse),
        (status = 400, description = "Not liked yet", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "content"
)]
pub async fn unlike_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    let like_count = state
        .services
        .catalog
        .unlike_content(user.user_id, id)
        .await?;
    Ok(success_response(LikeStatusResponse {
        message: "Like removed".to_string(),
        like_count,
    }))
}

/// Comment on a catalog entry
#[utoipa::path(
    post,
    path = "/api/v1/content/{id}/comments",
    params(("id" = Uuid, Path, description = "Content ID")),
    request_body = AddCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Empty comment", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "content"
)]
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<AddCommentRequest>,
) -> Result<Response, ApiError> {
    let comment = state
        .services
        .catalog
        .add_comment(user.user_id, id, payload)
        .await?;
    Ok(created_response(comment))
}

/// List comments for a catalog entry, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/content/{id}/comments",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Comments in posting order", body = [CommentResponse]),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    tag = "content"
)]
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let comments = state.services.catalog.list_comments(id).await?;
    Ok(success_response(comments))
}

/// Review a movie
#[utoipa::path(
    post,
    path = "/api/v1/content/{id}/reviews",
    params(("id" = Uuid, Path, description = "Content ID")),
    request_body = AddReviewRequest,
    responses(
        (status = 201, description = "Review added", body = ReviewResponse),
        (status = 400, description = "Empty review or non-movie content", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "content"
)]
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    Json(payload): Json<AddReviewRequest>,
) -> Result<Response, ApiError> {
    let review = state
        .services
        .catalog
        .add_review(user.user_id, id, payload)
        .await?;
    Ok(created_response(review))
}

/// List reviews for a movie, newest first
#[utoipa::path(
    get,
    path = "/api/v1/content/{id}/reviews",
    params(("id" = Uuid, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Reviews, newest first", body = [ReviewResponse]),
        (status = 400, description = "Non-movie content", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    tag = "content"
)]
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let reviews = state.services.catalog.list_reviews(id).await?;
    Ok(success_response(reviews))
}
