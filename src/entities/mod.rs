pub mod cart;
pub mod cart_item;
pub mod content;
pub mod content_comment;
pub mod content_like;
pub mod content_review;
pub mod order;
pub mod order_item;
pub mod user;
pub mod watchlist_item;
