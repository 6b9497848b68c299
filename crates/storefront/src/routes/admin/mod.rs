//! Admin route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin),
//! which re-reads the admin flag from the user store per request.

pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Largest accepted product upload (main image, extra images and video).
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Create the admin routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(products::dashboard))
        .route(
            "/products",
            post(products::create).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/products/{id}/remove", post(products::remove))
        .route("/categories", post(categories::create))
        .route("/categories/{id}/remove", post(categories::remove))
        .route("/orders", get(orders::index))
        .route("/orders/update-status", post(orders::update_status))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/users/{id}/promote", post(users::promote))
}
