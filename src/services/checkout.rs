use crate::{
    config::ClearPolicy,
    db::DbPool,
    entities::cart_item,
    entities::content::{self, Entity as ContentEntity},
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item,
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{from_minor_units, CreatedCheckoutSession, StripeClient, WebhookSessionObject},
    services::carts::{clear_items_and_bump, compute_total, find_cart_by_user, load_cart_items},
    services::orders::{order_to_response, OrderResponse},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// What a completion webhook delivery amounted to.
#[derive(Debug)]
pub enum FulfillmentOutcome {
    /// A paid order was created and the cart cleared.
    Fulfilled(OrderResponse),
    /// The payment intent had already been fulfilled; the redelivery is
    /// acknowledged without creating a second order.
    AlreadyProcessed,
}

/// Orchestrates checkout: snapshotting the cart into an order, creating
/// provider payment sessions, and fulfilling completion webhooks.
#[derive(Clone)]
pub struct CheckoutService {
    db_pool: Arc<DbPool>,
    stripe: Arc<StripeClient>,
    event_sender: Option<Arc<EventSender>>,
    clear_policy: ClearPolicy,
}

impl CheckoutService {
    pub fn new(
        db_pool: Arc<DbPool>,
        stripe: Arc<StripeClient>,
        event_sender: Option<Arc<EventSender>>,
        clear_policy: ClearPolicy,
    ) -> Self {
        Self {
            db_pool,
            stripe,
            event_sender,
            clear_policy,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send domain event");
            }
        }
    }

    /// Snapshots the caller's cart into a pending order.
    ///
    /// Under the `immediate` clear policy the cart is emptied in the same
    /// transaction; under `deferred` it stays intact until the provider's
    /// completion webhook arrives.
    #[instrument(skip(self), fields(user_id = %user_id, policy = ?self.clear_policy))]
    pub async fn checkout(&self, user_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        let Some(cart) = find_cart_by_user(&txn, user_id).await? else {
            return Err(ServiceError::BadRequest("Cart is empty".to_string()));
        };
        let cart_items = load_cart_items(&txn, cart.id).await?;
        if cart_items.is_empty() {
            return Err(ServiceError::BadRequest("Cart is empty".to_string()));
        }

        let total = compute_total(&cart_items);
        let titles = self.content_titles(&txn, &cart_items).await?;

        let order_model = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            total_amount: Set(total),
            currency: Set(self.stripe.currency().to_string()),
            payment_intent_id: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        let mut item_models = Vec::with_capacity(cart_items.len());
        for item in &cart_items {
            let model = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_model.id),
                content_id: Set(Some(item.content_id)),
                name: Set(line_name(&titles, item.content_id)),
                kind: Set(Some(item.kind)),
                unit_price: Set(item.price_at_add),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to insert order item");
                ServiceError::DatabaseError(e)
            })?;
            item_models.push(model);
        }

        let cleared = match self.clear_policy {
            ClearPolicy::Immediate => {
                clear_items_and_bump(&txn, &cart).await?;
                true
            }
            ClearPolicy::Deferred => false,
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_model.id,
            total = %total,
            cleared_cart = cleared,
            "Checkout complete"
        );
        let order_id = order_model.id;
        self.emit(Event::OrderCreated(order_id)).await;
        self.emit(Event::CheckoutCompleted {
            order_id,
            user_id,
            total,
        })
        .await;
        if cleared {
            self.emit(Event::CartCleared(cart.id)).await;
        }

        Ok(order_to_response(order_model, item_models))
    }

    /// Creates a hosted payment session for the caller's current cart.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn create_payment_session(
        &self,
        user_id: Uuid,
    ) -> Result<CreatedCheckoutSession, ServiceError> {
        let db = &*self.db_pool;

        let Some(cart) = find_cart_by_user(db, user_id).await? else {
            return Err(ServiceError::BadRequest("Cart is empty".to_string()));
        };
        let cart_items = load_cart_items(db, cart.id).await?;
        if cart_items.is_empty() {
            return Err(ServiceError::BadRequest("Cart is empty".to_string()));
        }

        let titles = self.content_titles(db, &cart_items).await?;
        let line_items = cart_items
            .iter()
            .map(|item| {
                self.stripe
                    .line_item(line_name(&titles, item.content_id), item.price_at_add)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let session = self
            .stripe
            .create_checkout_session(&user_id.to_string(), &line_items)
            .await?;

        info!(session_id = %session.id, "Payment session created");
        self.emit(Event::PaymentSessionCreated {
            user_id,
            session_id: session.id.clone(),
        })
        .await;
        Ok(session)
    }

    /// Pass-through read of a provider session, for post-redirect polling.
    pub async fn retrieve_payment_session(
        &self,
        session_id: &str,
    ) -> Result<serde_json::Value, ServiceError> {
        self.stripe.retrieve_checkout_session(session_id).await
    }

    /// Turns a `checkout.session.completed` notification into a paid order.
    ///
    /// Line items come from the user's *current* cart; the cart is cleared in
    /// the same transaction. Fulfillment is keyed on the provider payment
    /// intent, so a redelivered event acknowledges without a second order.
    #[instrument(skip(self, session), fields(payment_intent = ?session.payment_intent))]
    pub async fn fulfill_completed_session(
        &self,
        session: WebhookSessionObject,
    ) -> Result<FulfillmentOutcome, ServiceError> {
        let Some(reference) = session.client_reference_id.as_deref() else {
            return Err(ServiceError::BadRequest(
                "Missing client reference on checkout session".to_string(),
            ));
        };
        let user_id = Uuid::parse_str(reference).map_err(|_| {
            ServiceError::BadRequest("Invalid client reference on checkout session".to_string())
        })?;

        let db = &*self.db_pool;
        if let Some(payment_intent) = session.payment_intent.as_deref() {
            let existing = OrderEntity::find()
                .filter(order::Column::PaymentIntentId.eq(payment_intent))
                .one(db)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to check for fulfilled payment intent");
                    ServiceError::DatabaseError(e)
                })?;
            if existing.is_some() {
                info!(payment_intent = payment_intent, "Payment intent already fulfilled");
                return Ok(FulfillmentOutcome::AlreadyProcessed);
            }
        }

        let now = Utc::now();
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start fulfillment transaction");
            ServiceError::DatabaseError(e)
        })?;

        let cart = find_cart_by_user(&txn, user_id).await?;
        let cart_items = match &cart {
            Some(cart) => load_cart_items(&txn, cart.id).await?,
            None => Vec::new(),
        };
        if cart_items.is_empty() {
            warn!(user_id = %user_id, "Completion webhook arrived with an empty cart");
        }
        let titles = self.content_titles(&txn, &cart_items).await?;

        let currency = session
            .currency
            .as_deref()
            .unwrap_or(self.stripe.currency())
            .to_lowercase();
        let total = match session.amount_total {
            Some(amount) => from_minor_units(amount, &currency),
            None => compute_total(&cart_items),
        };

        let insert = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            status: Set(OrderStatus::Paid),
            total_amount: Set(total),
            currency: Set(currency),
            payment_intent_id: Set(session.payment_intent.clone()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        }
        .insert(&txn)
        .await;
        let order_model = match insert {
            Ok(model) => model,
            // A redelivery that raced the pre-check lands on the unique
            // payment-intent column.
            Err(e) => {
                return match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        info!("Payment intent already fulfilled (concurrent delivery)");
                        Ok(FulfillmentOutcome::AlreadyProcessed)
                    }
                    _ => {
                        error!(error = %e, "Failed to insert fulfilled order");
                        Err(ServiceError::DatabaseError(e))
                    }
                };
            }
        };

        let mut item_models = Vec::with_capacity(cart_items.len());
        for item in &cart_items {
            // Webhook-created lines carry name and price only.
            let model = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_model.id),
                content_id: Set(None),
                name: Set(line_name(&titles, item.content_id)),
                kind: Set(None),
                unit_price: Set(item.price_at_add),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to insert fulfilled order item");
                ServiceError::DatabaseError(e)
            })?;
            item_models.push(model);
        }

        if let Some(cart) = &cart {
            clear_items_and_bump(&txn, cart).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit fulfillment transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_model.id, user_id = %user_id, "Order fulfilled from completion webhook");
        self.emit(Event::OrderPaid {
            order_id: order_model.id,
            payment_intent_id: session.payment_intent.clone(),
        })
        .await;
        if let Some(cart) = &cart {
            self.emit(Event::CartCleared(cart.id)).await;
        }

        Ok(FulfillmentOutcome::Fulfilled(order_to_response(
            order_model,
            item_models,
        )))
    }

    async fn content_titles<C: ConnectionTrait>(
        &self,
        conn: &C,
        items: &[cart_item::Model],
    ) -> Result<HashMap<Uuid, String>, ServiceError> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = items.iter().map(|item| item.content_id).collect();
        let rows = ContentEntity::find()
            .filter(content::Column::Id.is_in(ids))
            .all(conn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to resolve content titles");
                ServiceError::DatabaseError(e)
            })?;
        Ok(rows.into_iter().map(|row| (row.id, row.title)).collect())
    }
}

/// Line-item display name, falling back to the raw id when the catalog row
/// has gone away between add and checkout.
fn line_name(titles: &HashMap<Uuid, String>, content_id: Uuid) -> String {
    titles
        .get(&content_id)
        .cloned()
        .unwrap_or_else(|| format!("Content {}", content_id))
}
