use crate::{
    db::DbPool,
    entities::content::{self, ContentCategory, Entity as ContentEntity},
    entities::content_comment::{self, Entity as ContentCommentEntity},
    entities::content_like::{self, Entity as ContentLikeEntity},
    entities::content_review::{self, Entity as ContentReviewEntity},
    entities::watchlist_item::{self, Entity as WatchlistItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Largest page size a single listing request may ask for.
const MAX_PAGE_SIZE: u64 = 100;

/// Sort keys accepted by the sorted-listing endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Price,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "movie")]
    pub category: ContentCategory,
    pub price: Decimal,
    pub stream_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<content::Model> for ContentResponse {
    fn from(model: content::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            category: model.category,
            price: model.price,
            stream_url: model.stream_url,
            thumbnail_url: model.thumbnail_url,
            duration_secs: model.duration_secs,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentListResponse {
    pub items: Vec<ContentResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub content_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<content_comment::Model> for CommentResponse {
    fn from(model: content_comment::Model) -> Self {
        Self {
            id: model.id,
            content_id: model.content_id,
            user_id: model.user_id,
            body: model.body,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub content_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<content_review::Model> for ReviewResponse {
    fn from(model: content_review::Model) -> Self {
        Self {
            id: model.id,
            content_id: model.content_id,
            user_id: model.user_id,
            body: model.body,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, message = "Comment text is required"))]
    #[schema(example = "Awesome movie!")]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddReviewRequest {
    #[validate(length(min = 1, message = "Review text is required"))]
    #[schema(example = "Mind-blowing plot!")]
    pub body: String,
}

/// Catalog row as fed in by the seeding binary.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewContent {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub category: ContentCategory,
    pub price: Decimal,
    pub stream_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<i32>,
}

/// Resolves a category path segment: `all` lifts the filter, anything else
/// must be a known category.
pub fn parse_category_filter(raw: &str) -> Result<Option<ContentCategory>, ServiceError> {
    if raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    ContentCategory::from_str(raw)
        .map(Some)
        .map_err(|_| ServiceError::InvalidInput(format!("Unknown content category: {}", raw)))
}

/// Service for catalog browsing, engagement (likes/comments/reviews) and
/// per-user watchlists.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send domain event");
            }
        }
    }

    /// Inserts a catalog row; used by the seeding binary.
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create_content(&self, request: NewContent) -> Result<ContentResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if request.price < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Price must be non-negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let model = content::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title),
            description: Set(request.description),
            category: Set(request.category),
            price: Set(request.price),
            stream_url: Set(request.stream_url),
            thumbnail_url: Set(request.thumbnail_url),
            duration_secs: Set(request.duration_secs),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert content");
            ServiceError::DatabaseError(e)
        })?;

        info!(content_id = %model.id, "Content created");
        Ok(model.into())
    }

    /// Paginated catalog listing, newest first.
    #[instrument(skip(self))]
    pub async fn list_content(&self, page: u64, limit: u64) -> Result<ContentListResponse, ServiceError> {
        self.run_listing(ContentEntity::find().order_by_desc(content::Column::CreatedAt), page, limit)
            .await
    }

    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn get_content(&self, content_id: Uuid) -> Result<Option<ContentResponse>, ServiceError> {
        let db = &*self.db_pool;
        let content = ContentEntity::find_by_id(content_id).one(db).await.map_err(|e| {
            error!(error = %e, content_id = %content_id, "Failed to fetch content");
            ServiceError::DatabaseError(e)
        })?;
        Ok(content.map(ContentResponse::from))
    }

    /// Category listing; `all` returns the unfiltered catalog.
    #[instrument(skip(self))]
    pub async fn list_by_category(
        &self,
        category: &str,
        page: u64,
        limit: u64,
    ) -> Result<ContentListResponse, ServiceError> {
        let mut query = ContentEntity::find().order_by_desc(content::Column::CreatedAt);
        if let Some(category) = parse_category_filter(category)? {
            query = query.filter(content::Column::Category.eq(category));
        }
        self.run_listing(query, page, limit).await
    }

    /// Case-insensitive title search with an optional category filter.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        q: &str,
        category: Option<&str>,
        page: u64,
        limit: u64,
    ) -> Result<ContentListResponse, ServiceError> {
        let needle = q.trim();
        if needle.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Search query is required".to_string(),
            ));
        }

        let mut query = ContentEntity::find().order_by_desc(content::Column::CreatedAt);
        if let Some(category) = category {
            if let Some(category) = parse_category_filter(category)? {
                query = query.filter(content::Column::Category.eq(category));
            }
        }
        let pattern = format!("%{}%", needle.to_lowercase());
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(content::Column::Title))).like(pattern),
        );

        self.run_listing(query, page, limit).await
    }

    /// Category filter combined with a caller-chosen sort key and direction.
    #[instrument(skip(self))]
    pub async fn list_sorted(
        &self,
        category: &str,
        sort_by: SortBy,
        sort_order: SortOrder,
        page: u64,
        limit: u64,
    ) -> Result<ContentListResponse, ServiceError> {
        let column = match sort_by {
            SortBy::CreatedAt => content::Column::CreatedAt,
            SortBy::Price => content::Column::Price,
            SortBy::Title => content::Column::Title,
        };
        let order = match sort_order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        let mut query = ContentEntity::find().order_by(column, order);
        if let Some(category) = parse_category_filter(category)? {
            query = query.filter(content::Column::Category.eq(category));
        }
        self.run_listing(query, page, limit).await
    }

    async fn run_listing(
        &self,
        query: sea_orm::Select<ContentEntity>,
        page: u64,
        limit: u64,
    ) -> Result<ContentListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count content");
            ServiceError::DatabaseError(e)
        })?;
        let items = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page = page, limit = limit, "Failed to fetch content page");
            ServiceError::DatabaseError(e)
        })?;

        Ok(ContentListResponse {
            items: items.into_iter().map(ContentResponse::from).collect(),
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    async fn require_content(&self, content_id: Uuid) -> Result<content::Model, ServiceError> {
        let db = &*self.db_pool;
        ContentEntity::find_by_id(content_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, content_id = %content_id, "Failed to fetch content");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Content not found".to_string()))
    }

    /// Records a like; a second like by the same user is rejected and the
    /// count is left unchanged.
    #[instrument(skip(self), fields(content_id = %content_id, user_id = %user_id))]
    pub async fn like_content(&self, user_id: Uuid, content_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        self.require_content(content_id).await?;

        let existing = ContentLikeEntity::find()
            .filter(content_like::Column::ContentId.eq(content_id))
            .filter(content_like::Column::UserId.eq(user_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check existing like");
                ServiceError::DatabaseError(e)
            })?;
        if existing.is_some() {
            return Err(ServiceError::BadRequest(
                "Content already liked".to_string(),
            ));
        }

        let insert = content_like::ActiveModel {
            id: Set(Uuid::new_v4()),
            content_id: Set(content_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await;
        if let Err(e) = insert {
            // Concurrent double-like lands on the unique (content, user) index.
            return match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(ServiceError::BadRequest(
                    "Content already liked".to_string(),
                )),
                _ => {
                    error!(error = %e, "Failed to insert like");
                    Err(ServiceError::DatabaseError(e))
                }
            };
        }

        let count = self.like_count(content_id).await?;
        info!(content_id = %content_id, like_count = count, "Content liked");
        self.emit(Event::ContentLiked {
            content_id,
            user_id,
        })
        .await;
        Ok(count)
    }

    /// Removes a like; absent likes are rejected rather than ignored.
    #[instrument(skip(self), fields(content_id = %content_id, user_id = %user_id))]
    pub async fn unlike_content(&self, user_id: Uuid, content_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        self.require_content(content_id).await?;

        let existing = ContentLikeEntity::find()
            .filter(content_like::Column::ContentId.eq(content_id))
            .filter(content_like::Column::UserId.eq(user_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check existing like");
                ServiceError::DatabaseError(e)
            })?;
        let Some(existing) = existing else {
            return Err(ServiceError::BadRequest(
                "Content not liked yet".to_string(),
            ));
        };

        ContentLikeEntity::delete_by_id(existing.id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete like");
                ServiceError::DatabaseError(e)
            })?;

        let count = self.like_count(content_id).await?;
        info!(content_id = %content_id, like_count = count, "Content unliked");
        self.emit(Event::ContentUnliked {
            content_id,
            user_id,
        })
        .await;
        Ok(count)
    }

    async fn like_count(&self, content_id: Uuid) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        ContentLikeEntity::find()
            .filter(content_like::Column::ContentId.eq(content_id))
            .count(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to count likes");
                ServiceError::DatabaseError(e)
            })
    }

    /// Appends a comment; any category of content accepts comments.
    #[instrument(skip(self, request), fields(content_id = %content_id, user_id = %user_id))]
    pub async fn add_comment(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        request: AddCommentRequest,
    ) -> Result<CommentResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        self.require_content(content_id).await?;

        let db = &*self.db_pool;
        let model = content_comment::ActiveModel {
            id: Set(Uuid::new_v4()),
            content_id: Set(content_id),
            user_id: Set(user_id),
            body: Set(request.body),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert comment");
            ServiceError::DatabaseError(e)
        })?;

        info!(comment_id = %model.id, content_id = %content_id, "Comment added");
        self.emit(Event::CommentAdded {
            content_id,
            comment_id: model.id,
        })
        .await;
        Ok(model.into())
    }

    /// Comments in the order they were appended.
    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn list_comments(&self, content_id: Uuid) -> Result<Vec<CommentResponse>, ServiceError> {
        self.require_content(content_id).await?;

        let db = &*self.db_pool;
        let comments = ContentCommentEntity::find()
            .filter(content_comment::Column::ContentId.eq(content_id))
            .order_by_asc(content_comment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch comments");
                ServiceError::DatabaseError(e)
            })?;
        Ok(comments.into_iter().map(CommentResponse::from).collect())
    }

    /// Adds a review; only movie content accepts reviews.
    #[instrument(skip(self, request), fields(content_id = %content_id, user_id = %user_id))]
    pub async fn add_review(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        request: AddReviewRequest,
    ) -> Result<ReviewResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let content = self.require_content(content_id).await?;
        if content.category != ContentCategory::Movie {
            return Err(ServiceError::BadRequest(
                "Reviews are only allowed for movies".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let model = content_review::ActiveModel {
            id: Set(Uuid::new_v4()),
            content_id: Set(content_id),
            user_id: Set(user_id),
            body: Set(request.body),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert review");
            ServiceError::DatabaseError(e)
        })?;

        info!(review_id = %model.id, content_id = %content_id, "Review added");
        self.emit(Event::ReviewAdded {
            content_id,
            review_id: model.id,
        })
        .await;
        Ok(model.into())
    }

    /// Reviews for a movie, newest first; non-movie content is rejected.
    #[instrument(skip(self), fields(content_id = %content_id))]
    pub async fn list_reviews(&self, content_id: Uuid) -> Result<Vec<ReviewResponse>, ServiceError> {
        let content = self.require_content(content_id).await?;
        if content.category != ContentCategory::Movie {
            return Err(ServiceError::BadRequest(
                "Reviews are only allowed for movies".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let reviews = ContentReviewEntity::find()
            .filter(content_review::Column::ContentId.eq(content_id))
            .order_by_desc(content_review::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch reviews");
                ServiceError::DatabaseError(e)
            })?;
        Ok(reviews.into_iter().map(ReviewResponse::from).collect())
    }

    /// The caller's watchlist, resolved to content rows, oldest entry first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_watchlist(&self, user_id: Uuid) -> Result<Vec<ContentResponse>, ServiceError> {
        let db = &*self.db_pool;
        let entries = WatchlistItemEntity::find()
            .filter(watchlist_item::Column::UserId.eq(user_id))
            .find_also_related(ContentEntity)
            .order_by_asc(watchlist_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch watchlist");
                ServiceError::DatabaseError(e)
            })?;

        Ok(entries
            .into_iter()
            .filter_map(|(_, content)| content.map(ContentResponse::from))
            .collect())
    }

    /// Adds content to the caller's watchlist; duplicates are rejected.
    #[instrument(skip(self), fields(user_id = %user_id, content_id = %content_id))]
    pub async fn add_to_watchlist(
        &self,
        user_id: Uuid,
        content_id: Uuid,
    ) -> Result<Vec<ContentResponse>, ServiceError> {
        let db = &*self.db_pool;
        self.require_content(content_id).await?;

        let existing = WatchlistItemEntity::find()
            .filter(watchlist_item::Column::UserId.eq(user_id))
            .filter(watchlist_item::Column::ContentId.eq(content_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check watchlist entry");
                ServiceError::DatabaseError(e)
            })?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "Content already in watchlist".to_string(),
            ));
        }

        let insert = watchlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            content_id: Set(content_id),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await;
        if let Err(e) = insert {
            return match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(ServiceError::Conflict(
                    "Content already in watchlist".to_string(),
                )),
                _ => {
                    error!(error = %e, "Failed to insert watchlist entry");
                    Err(ServiceError::DatabaseError(e))
                }
            };
        }

        info!(user_id = %user_id, content_id = %content_id, "Content added to watchlist");
        self.get_watchlist(user_id).await
    }

    /// Removes a watchlist entry; absent entries are a lookup miss.
    #[instrument(skip(self), fields(user_id = %user_id, content_id = %content_id))]
    pub async fn remove_from_watchlist(
        &self,
        user_id: Uuid,
        content_id: Uuid,
    ) -> Result<Vec<ContentResponse>, ServiceError> {
        let db = &*self.db_pool;

        let existing = WatchlistItemEntity::find()
            .filter(watchlist_item::Column::UserId.eq(user_id))
            .filter(watchlist_item::Column::ContentId.eq(content_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check watchlist entry");
                ServiceError::DatabaseError(e)
            })?;
        let Some(existing) = existing else {
            return Err(ServiceError::NotFound(
                "Content not in watchlist".to_string(),
            ));
        };

        WatchlistItemEntity::delete_by_id(existing.id)
            .exec(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete watchlist entry");
                ServiceError::DatabaseError(e)
            })?;

        info!(user_id = %user_id, content_id = %content_id, "Content removed from watchlist");
        self.get_watchlist(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case("all", None ; "all clears the filter")]
    #[test_case("movie", Some(ContentCategory::Movie) ; "movie")]
    #[test_case("video", Some(ContentCategory::Video) ; "video")]
    #[test_case("LIVE", Some(ContentCategory::Live) ; "match is case insensitive")]
    fn category_filter_accepts_all_and_known_values(
        raw: &str,
        expected: Option<ContentCategory>,
    ) {
        assert_eq!(parse_category_filter(raw).unwrap(), expected);
    }

    #[test_case("music")]
    #[test_case("")]
    #[test_case("movies")]
    fn category_filter_rejects_unknown_values(raw: &str) {
        assert_matches!(
            parse_category_filter(raw),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn sort_params_deserialize_and_default() {
        let sort: SortBy = serde_json::from_str("\"price\"").unwrap();
        assert_eq!(sort, SortBy::Price);
        let order: SortOrder = serde_json::from_str("\"asc\"").unwrap();
        assert_eq!(order, SortOrder::Asc);
        assert_eq!(SortBy::default(), SortBy::CreatedAt);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }

    #[test]
    fn content_model_maps_to_response() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let model = content::Model {
            id,
            title: "Inception".to_string(),
            description: Some("A mind-bending thriller.".to_string()),
            category: ContentCategory::Movie,
            price: dec!(299),
            stream_url: Some("https://example.com/inception.mp4".to_string()),
            thumbnail_url: Some("https://example.com/inception.jpg".to_string()),
            duration_secs: Some(8880),
            created_at: now,
            updated_at: Some(now),
        };

        let response = ContentResponse::from(model);
        assert_eq!(response.id, id);
        assert_eq!(response.title, "Inception");
        assert_eq!(response.category, ContentCategory::Movie);
        assert_eq!(response.price, dec!(299));
    }

    #[test]
    fn empty_comment_fails_validation() {
        let request = AddCommentRequest {
            body: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
