use crate::{
    db::DbPool,
    entities::cart::{self, Entity as CartEntity},
    entities::cart_item::{self, AcquisitionKind, Entity as CartItemEntity},
    entities::content::Entity as ContentEntity,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub content_id: Uuid,
    #[schema(value_type = String, example = "rent")]
    pub kind: AcquisitionKind,
    /// Price snapshot recorded on the item; not re-derived from the catalog.
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub content_id: Uuid,
    #[schema(value_type = String, example = "buy")]
    pub kind: AcquisitionKind,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<cart_item::Model> for CartItemResponse {
    fn from(model: cart_item::Model) -> Self {
        Self {
            id: model.id,
            content_id: model.content_id,
            kind: model.kind,
            price: model.price_at_add,
            created_at: model.created_at,
        }
    }
}

/// A cart read never creates a row, so `id`/`version` are absent until the
/// first add persists the cart.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub id: Option<Uuid>,
    pub items: Vec<CartItemResponse>,
    pub total: Decimal,
    pub version: Option<i32>,
}

impl CartResponse {
    fn empty() -> Self {
        Self {
            id: None,
            items: Vec::new(),
            total: Decimal::ZERO,
            version: None,
        }
    }
}

/// Linear sum of the price snapshots stored on the items.
pub(crate) fn compute_total(items: &[cart_item::Model]) -> Decimal {
    items.iter().map(|item| item.price_at_add).sum()
}

/// Deletes every item of `cart` and bumps its version counter, failing with
/// `Conflict` when another writer got there first. Runs on whatever
/// connection the caller is holding so fulfillment can include it in its
/// transaction.
pub(crate) async fn clear_items_and_bump<C: ConnectionTrait>(
    conn: &C,
    cart: &cart::Model,
) -> Result<(), ServiceError> {
    CartItemEntity::delete_many()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .exec(conn)
        .await
        .map_err(|e| {
            error!(error = %e, cart_id = %cart.id, "Failed to delete cart items");
            ServiceError::DatabaseError(e)
        })?;
    bump_version(conn, cart).await
}

/// Optimistic version bump: the update is a no-op when the stored version no
/// longer matches the one we read.
pub(crate) async fn bump_version<C: ConnectionTrait>(
    conn: &C,
    cart: &cart::Model,
) -> Result<(), ServiceError> {
    let result = CartEntity::update_many()
        .col_expr(cart::Column::Version, Expr::value(cart.version + 1))
        .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cart::Column::Id.eq(cart.id))
        .filter(cart::Column::Version.eq(cart.version))
        .exec(conn)
        .await
        .map_err(|e| {
            error!(error = %e, cart_id = %cart.id, "Failed to bump cart version");
            ServiceError::DatabaseError(e)
        })?;
    if result.rows_affected == 0 {
        warn!(cart_id = %cart.id, version = cart.version, "Cart version clash");
        return Err(ServiceError::Conflict(
            "Cart was updated elsewhere. Please try again.".to_string(),
        ));
    }
    Ok(())
}

pub(crate) async fn find_cart_by_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Option<cart::Model>, ServiceError> {
    CartEntity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(conn)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to fetch cart");
            ServiceError::DatabaseError(e)
        })
}

pub(crate) async fn load_cart_items<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<Vec<cart_item::Model>, ServiceError> {
    CartItemEntity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(|e| {
            error!(error = %e, cart_id = %cart_id, "Failed to fetch cart items");
            ServiceError::DatabaseError(e)
        })
}

/// Service for the per-user cart aggregate.
#[derive(Clone)]
pub struct CartService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CartService {
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

    /// The caller's cart; an empty transient cart when none has been
    /// persisted yet.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartResponse, ServiceError> {
        let db = &*self.db_pool;
        let Some(cart) = find_cart_by_user(db, user_id).await? else {
            return Ok(CartResponse::empty());
        };
        let items = load_cart_items(db, cart.id).await?;
        Ok(Self::to_response(&cart, items))
    }

    /// Appends an item to the caller's cart, creating the cart row on first
    /// use. No two items in a cart may share (content, kind).
    #[instrument(skip(self, request), fields(user_id = %user_id, content_id = %request.content_id))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        request: AddCartItemRequest,
    ) -> Result<CartResponse, ServiceError> {
        if request.price < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Price must be non-negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for cart add");
            ServiceError::DatabaseError(e)
        })?;

        let content = ContentEntity::find_by_id(request.content_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch content for cart add");
                ServiceError::DatabaseError(e)
            })?;
        if content.is_none() {
            return Err(ServiceError::NotFound("Content not found".to_string()));
        }

        let cart = match find_cart_by_user(&txn, user_id).await? {
            Some(cart) => cart,
            None => cart::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                version: Set(1),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to create cart");
                ServiceError::DatabaseError(e)
            })?,
        };

        let duplicate = CartItemEntity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ContentId.eq(request.content_id))
            .filter(cart_item::Column::Kind.eq(request.kind))
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check for duplicate cart item");
                ServiceError::DatabaseError(e)
            })?;
        if duplicate.is_some() {
            return Err(ServiceError::BadRequest(
                "Item already in cart".to_string(),
            ));
        }

        let insert = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart.id),
            content_id: Set(request.content_id),
            kind: Set(request.kind),
            price_at_add: Set(request.price),
            created_at: Set(now),
        }
        .insert(&txn)
        .await;
        if let Err(e) = insert {
            // Concurrent adds of the same (content, kind) land on the unique index.
            return match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(ServiceError::BadRequest(
                    "Item already in cart".to_string(),
                )),
                _ => {
                    error!(error = %e, "Failed to insert cart item");
                    Err(ServiceError::DatabaseError(e))
                }
            };
        }

        bump_version(&txn, &cart).await?;

        let items = load_cart_items(&txn, cart.id).await?;
        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit cart add");
            ServiceError::DatabaseError(e)
        })?;

        info!(cart_id = %cart.id, content_id = %request.content_id, kind = %request.kind, "Cart item added");
        self.emit(Event::CartItemAdded {
            cart_id: cart.id,
            content_id: request.content_id,
            kind: request.kind.to_string(),
        })
        .await;

        let mut cart = cart;
        cart.version += 1;
        Ok(Self::to_response(&cart, items))
    }

    /// Removes one item from the caller's cart by item id.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartResponse, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for cart removal");
            ServiceError::DatabaseError(e)
        })?;

        let Some(cart) = find_cart_by_user(&txn, user_id).await? else {
            return Err(ServiceError::NotFound("Cart not found".to_string()));
        };

        let item = CartItemEntity::find_by_id(item_id)
            .filter(cart_item::Column::CartId.eq(cart.id))
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch cart item");
                ServiceError::DatabaseError(e)
            })?;
        let Some(item) = item else {
            return Err(ServiceError::NotFound(
                "Item not found in cart".to_string(),
            ));
        };

        CartItemEntity::delete_by_id(item.id)
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete cart item");
                ServiceError::DatabaseError(e)
            })?;

        bump_version(&txn, &cart).await?;

        let items = load_cart_items(&txn, cart.id).await?;
        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit cart removal");
            ServiceError::DatabaseError(e)
        })?;

        info!(cart_id = %cart.id, item_id = %item_id, "Cart item removed");
        self.emit(Event::CartItemRemoved {
            cart_id: cart.id,
            item_id,
        })
        .await;

        let mut cart = cart;
        cart.version += 1;
        Ok(Self::to_response(&cart, items))
    }

    /// Empties the caller's cart in place. Clearing an absent or already
    /// empty cart succeeds.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for cart clear");
            ServiceError::DatabaseError(e)
        })?;

        let Some(cart) = find_cart_by_user(&txn, user_id).await? else {
            return Ok(());
        };

        clear_items_and_bump(&txn, &cart).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit cart clear");
            ServiceError::DatabaseError(e)
        })?;

        info!(cart_id = %cart.id, "Cart cleared");
        self.emit(Event::CartCleared(cart.id)).await;
        Ok(())
    }

    fn to_response(cart: &cart::Model, items: Vec<cart_item::Model>) -> CartResponse {
        let total = compute_total(&items);
        CartResponse {
            id: Some(cart.id),
            items: items.into_iter().map(CartItemResponse::from).collect(),
            total,
            version: Some(cart.version),
        }
    }
}
