use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Streamcart API",
        version = "1.0.0",
        description = r#"
# Streamcart Content Commerce API

A backend for a streaming storefront: browse a catalog of movies, videos and
live streams, engage with likes, comments and reviews, keep a watchlist, fill
a cart and check out through a hosted payment-provider session.

## Authentication

Account, cart, checkout, watchlist and order endpoints require a JWT access
token. Include it in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

Tokens are issued by `/api/v1/auth/login` and renewed via
`/api/v1/auth/refresh`.

## Pagination

List endpoints accept the following query parameters:
- `page`: Page number (default: 1)
- `limit`: Items per page (default: 20, max: 100)
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Account registration and token issuance"),
        (name = "content", description = "Catalog browsing and engagement"),
        (name = "cart", description = "Per-user shopping cart"),
        (name = "checkout", description = "Cart-to-order conversion"),
        (name = "orders", description = "Order history"),
        (name = "watchlist", description = "Per-user watchlist"),
        (name = "payments", description = "Payment-provider sessions and webhooks")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,

        // Content
        crate::handlers::content::list_content,
        crate::handlers::content::search_content,
        crate::handlers::content::list_by_category,
        crate::handlers::content::list_sorted,
        crate::handlers::content::get_content,
        crate::handlers::content::like_content,
        crate::handlers::content::unlike_content,
        crate::handlers::content::add_comment,
        crate::handlers::content::list_comments,
        crate::handlers::content::add_review,
        crate::handlers::content::list_reviews,

        // Cart
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_item,
        crate::handlers::carts::remove_item,

        // Checkout
        crate::handlers::checkout::checkout,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,

        // Watchlist
        crate::handlers::watchlist::get_watchlist,
        crate::handlers::watchlist::add_to_watchlist,
        crate::handlers::watchlist::remove_from_watchlist,

        // Payments
        crate::handlers::payments::create_checkout_session,
        crate::handlers::payments::get_payment_session,
        crate::handlers::payment_webhooks::stripe_webhook,
    ),
    components(
        schemas(
            // Auth types
            crate::auth::RegisterRequest,
            crate::auth::LoginRequest,
            crate::auth::RefreshTokenRequest,
            crate::auth::LoginResponse,
            crate::auth::AccessTokenResponse,
            crate::auth::UserResponse,

            // Content types
            crate::services::catalog::ContentResponse,
            crate::services::catalog::ContentListResponse,
            crate::services::catalog::CommentResponse,
            crate::services::catalog::ReviewResponse,
            crate::services::catalog::AddCommentRequest,
            crate::services::catalog::AddReviewRequest,
            crate::handlers::content::LikeStatusResponse,

            // Cart types
            crate::services::carts::AddCartItemRequest,
            crate::services::carts::CartItemResponse,
            crate::services::carts::CartResponse,
            crate::handlers::carts::CartActionResponse,

            // Checkout and order types
            crate::handlers::checkout::CheckoutCompleteResponse,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderListResponse,

            // Watchlist types
            crate::handlers::watchlist::AddWatchlistRequest,
            crate::handlers::watchlist::WatchlistResponse,
            crate::handlers::watchlist::WatchlistActionResponse,

            // Payments types
            crate::payments::CreatedCheckoutSession,

            // Common types
            crate::handlers::common::MessageResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

/// Registers the bearer scheme referenced by `security(("Bearer" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_covers_the_api_surface() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Streamcart API"));
        assert!(json.contains("/api/v1/content/search"));
        assert!(json.contains("/api/v1/payments/webhook"));
        assert!(json.contains("Bearer"));
    }
}
