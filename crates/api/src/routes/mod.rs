//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                     - Banner
//! GET  /health                               - Liveness
//! GET  /health/ready                         - Database readiness
//!
//! # Auth (rate limited)
//! POST /api/auth/register                    - Create a customer account
//! POST /api/auth/login                       - Exchange credentials for a token
//!
//! # Products
//! GET  /api/products                         - Listing (cached)
//! GET  /api/products/{id}                    - Detail
//! POST /api/products                         - Create (admin)
//! PUT  /api/products/{id}                    - Partial update (admin)
//! DELETE /api/products/{id}                  - Remove (admin)
//!
//! # Orders
//! GET  /api/orders                           - All orders (admin)
//! GET  /api/orders/my-orders                 - Caller's orders
//! POST /api/orders                           - Checkout
//! PUT  /api/orders/{id}/status               - Set any status (admin)
//! PUT  /api/orders/{id}/assign               - Assign or clear courier (admin)
//!
//! # Delivery (courier)
//! GET  /api/orders/delivery/assigned         - Caller's assigned orders
//! POST /api/orders/delivery/{id}/generate-otp - Issue and text a delivery code
//! POST /api/orders/delivery/{id}/verify-otp   - Confirm delivery (rate limited)
//! PUT  /api/orders/delivery/{id}/status      - Set a non-delivered status
//!
//! # Users
//! GET  /api/users                            - All users (admin)
//! ```

pub mod auth;
pub mod delivery;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use std::str::FromStr;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::error::{AppError, Result};
use crate::middleware::{auth_rate_limiter, otp_rate_limiter};
use crate::state::AppState;

/// Parse a path id; anything unparseable is reported as `not_found`.
pub(crate) fn parse_id<T: FromStr>(raw: &str, not_found: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| AppError::NotFound(not_found.to_owned()))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the order routes router, courier endpoints included.
pub fn order_routes() -> Router<AppState> {
    let verify = Router::new()
        .route("/delivery/{id}/verify-otp", post(delivery::verify_otp))
        .layer(otp_rate_limiter());

    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/my-orders", get(orders::mine))
        .route("/{id}/status", put(orders::set_status))
        .route("/{id}/assign", put(orders::assign))
        .route("/delivery/assigned", get(delivery::assigned))
        .route("/delivery/{id}/generate-otp", post(delivery::generate_otp))
        .route("/delivery/{id}/status", put(delivery::set_status))
        .merge(verify)
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new().route("/", get(users::index))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/users", user_routes())
}
