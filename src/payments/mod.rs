pub mod stripe;

pub use stripe::{
    from_minor_units, to_minor_units, verify_stripe_signature, CheckoutLineItem,
    CreatedCheckoutSession, StripeClient, StripeWebhookEvent, WebhookSessionObject,
    CHECKOUT_SESSION_COMPLETED,
};
