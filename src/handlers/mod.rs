pub mod auth;
pub mod carts;
pub mod checkout;
pub mod common;
pub mod content;
pub mod orders;
pub mod payment_webhooks;
pub mod payments;
pub mod watchlist;

use crate::auth::AuthService;
use crate::config::ClearPolicy;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::payments::StripeClient;
use crate::services::{
    AccountService, CartService, CatalogService, CheckoutService, OrderService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    /// Build the services container shared by all HTTP handlers
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        stripe: Arc<StripeClient>,
        clear_policy: ClearPolicy,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(
                db_pool.clone(),
                auth_service,
                Some(event_sender.clone()),
            )),
            catalog: Arc::new(CatalogService::new(
                db_pool.clone(),
                Some(event_sender.clone()),
            )),
            cart: Arc::new(CartService::new(
                db_pool.clone(),
                Some(event_sender.clone()),
            )),
            checkout: Arc::new(CheckoutService::new(
                db_pool.clone(),
                stripe,
                Some(event_sender),
                clear_policy,
            )),
            orders: Arc::new(OrderService::new(db_pool)),
        }
    }
}
