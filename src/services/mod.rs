// Account lifecycle and sessions
pub mod accounts;

// Catalog browsing, engagement, watchlist
pub mod catalog;

// Per-user cart aggregate
pub mod carts;

// Checkout orchestration and webhook fulfillment
pub mod checkout;

// Order history
pub mod orders;

pub use accounts::AccountService;
pub use carts::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use orders::OrderService;
