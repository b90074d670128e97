use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Account events
    UserRegistered(Uuid),
    UserLoggedIn(Uuid),

    // Engagement events
    ContentLiked { content_id: Uuid, user_id: Uuid },
    ContentUnliked { content_id: Uuid, user_id: Uuid },
    CommentAdded { content_id: Uuid, comment_id: Uuid },
    ReviewAdded { content_id: Uuid, review_id: Uuid },

    // Cart events
    CartItemAdded {
        cart_id: Uuid,
        content_id: Uuid,
        kind: String,
    },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartCleared(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderPaid {
        order_id: Uuid,
        payment_intent_id: Option<String>,
    },
    CheckoutCompleted {
        order_id: Uuid,
        user_id: Uuid,
        total: Decimal,
    },

    // Payment provider events
    PaymentSessionCreated { user_id: Uuid, session_id: String },
}

/// Processes events received on the event channel.
/// Spawned once at startup; runs until the sender side closes.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        // Process events based on type
        match event {
            Event::OrderCreated(order_id) => {
                if let Err(e) = handle_order_created(order_id).await {
                    error!(
                        "Failed to handle order created event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::OrderPaid {
                order_id,
                payment_intent_id,
            } => {
                if let Err(e) = handle_order_paid(order_id, payment_intent_id.as_deref()).await {
                    error!(
                        "Failed to handle order paid event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::CheckoutCompleted {
                order_id,
                user_id,
                total,
            } => {
                info!(
                    "Checkout completed: order_id={}, user_id={}, total={}",
                    order_id, user_id, total
                );
            }
            _ => {
                info!("No specific handler for event: {:?}", event);
            }
        }
    }

    info!("Event processing loop stopped");
}

async fn handle_order_created(order_id: Uuid) -> Result<(), String> {
    // Downstream side effects (entitlement grants, receipts) hook in here
    info!("Processing order created event for order {}", order_id);

    Ok(())
}

async fn handle_order_paid(order_id: Uuid, payment_intent_id: Option<&str>) -> Result<(), String> {
    info!(
        "Processing order paid event for order {} (payment_intent={})",
        order_id,
        payment_intent_id.unwrap_or("none")
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let order_id = Uuid::new_v4();
        sender.send(Event::OrderCreated(order_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(received)) => assert_eq!(received, order_id),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::CartCleared(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
