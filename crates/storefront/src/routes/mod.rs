//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Database readiness check
//!
//! # Catalog
//! GET  /                                - Landing: products + categories
//! GET  /main                            - Catalog overview (login required)
//! GET  /products                        - All products + categories
//! GET  /products/{id}                   - Product detail
//! GET  /search?q=                       - Product and category search
//! GET  /category/{slug}                 - Category page
//! GET  /image/{id}                      - Product image
//! GET  /video/{id}                      - Product video (Range aware)
//!
//! # Auth
//! POST /user/signup                     - Create account, start session
//! POST /user/login                      - Start session
//! GET  /user/signout                    - End session
//!
//! # Cart (session)
//! GET  /cart                            - Cart view with checkout notice
//! POST /cart/add/{product_id}           - Add one unit
//! POST /cart/remove/{product_id}        - Remove entry
//! POST /cart/update/{product_id}        - Set quantity
//!
//! # Checkout
//! POST /checkout/create-session         - Open hosted checkout
//! GET  /checkout/success?session_id=    - Reconcile payment into an order
//! GET  /checkout/cancel                 - Back to the cart
//!
//! # Orders (login required)
//! GET  /orders                          - My orders
//! GET  /order/{id}                      - Order detail (owner or admin)
//!
//! # Admin (admin flag required)
//! GET  /admin/dashboard?q=              - Products + categories
//! POST /admin/products                  - Add product (multipart)
//! POST /admin/products/{id}/remove      - Delete product
//! POST /admin/categories                - Add category
//! POST /admin/categories/{id}/remove    - Delete category
//! GET  /admin/orders                    - All orders with customers
//! POST /admin/orders/update-status      - Change status/tracking
//! POST /admin/orders/{id}/cancel        - Delete order
//! POST /admin/users/{id}/promote        - Grant admin
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod media;
pub mod orders;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::{credentials_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .layer(credentials_rate_limiter());

    Router::new()
        .merge(credentials)
        .route("/signout", get(auth::signout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{product_id}", post(cart::add))
        .route("/remove/{product_id}", post(cart::remove))
        .route("/update/{product_id}", post(cart::update))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/create-session", post(checkout::create_session))
        .route("/success", get(checkout::success))
        .route("/cancel", get(checkout::cancel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Catalog
        .route("/", get(catalog::landing))
        .route("/main", get(catalog::main_page))
        .route("/products", get(catalog::products))
        .route("/products/{id}", get(catalog::product))
        .route("/search", get(catalog::search))
        .route("/category/{slug}", get(catalog::category))
        .route("/image/{id}", get(media::image))
        .route("/video/{id}", get(media::video))
        // Session flows
        .nest("/user", user_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        // Orders
        .route("/orders", get(orders::index))
        .route("/order/{id}", get(orders::show))
        // Admin
        .nest("/admin", admin::routes())
}

/// Build the complete application router.
///
/// The session store is a parameter so tests can run the same router over
/// an in-memory session store.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(session_layer)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use axum::http::StatusCode;
    use secrecy::SecretString;
    use tower::ServiceExt;

    use crate::config::{StorefrontConfig, StripeConfig};
    use crate::db::Stores;
    use crate::middleware::create_session_layer;

    fn test_app() -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://unused@localhost/emporium"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://shop.test".to_string(),
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_unused"),
                currency: "usd".to_string(),
                api_base: "http://payments.invalid".to_string(),
                shipping_countries: Vec::new(),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let session_layer =
            create_session_layer(tower_sessions::MemoryStore::default(), &config);
        let state = AppState::new(config, Stores::memory()).unwrap();
        app(state, session_layer)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_echoes_request_id() {
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "lb-7")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "lb-7");
    }

    #[tokio::test]
    async fn test_readiness_without_pool() {
        let response = test_app().oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = test_app().oneshot(get("/wp-admin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_cart_view() {
        let response = test_app().oneshot(get("/cart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let cart: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(cart["item_count"], 0);
        assert!(cart["notice"].is_null());
    }
}
