//! Integration test harness for Emporium.
//!
//! [`TestContext`] runs the complete storefront router over in-memory stores,
//! an in-memory session store, and [`FakePaymentProvider`]. Requests go
//! through `tower::ServiceExt::oneshot`, so no socket or database is needed.
//!
//! Tests that talk to a running storefront over HTTP are marked
//! `#[ignore = "Requires running storefront"]` and read its address from
//! `STOREFRONT_BASE_URL`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

pub mod client;
pub mod payments;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::Router;
use secrecy::SecretString;

use emporium_core::Price;
use emporium_storefront::config::{StorefrontConfig, StripeConfig};
use emporium_storefront::db::{
    CatalogStore, MediaStore, MemoryStore, NewMedia, OrderStore, Stores, UserStore,
};
use emporium_storefront::middleware::create_session_layer;
use emporium_storefront::models::{NewProduct, Product, User};
use emporium_storefront::routes;
use emporium_storefront::services::auth::AuthService;
use emporium_storefront::state::AppState;

pub use client::{Part, TestClient, TestResponse};
pub use payments::FakePaymentProvider;

/// Base URL the test storefront believes it is served from.
pub const BASE_URL: &str = "http://shop.test";

/// Password used by the seeding helpers.
pub const PASSWORD: &str = "correct-horse-battery";

/// Smallest valid PNG, used as the seeded product image.
pub const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89,
];

/// Configuration for an in-process storefront.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused@localhost/emporium"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: BASE_URL.to_string(),
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_unused"),
            currency: "usd".to_string(),
            api_base: "http://payments.invalid".to_string(),
            shipping_countries: vec!["US".to_string(), "CA".to_string()],
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// An in-process storefront with direct access to its stores.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub payments: Arc<FakePaymentProvider>,
    router: Router,
    clients: AtomicU32,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Build a fresh storefront with empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::build(|store| store as Arc<dyn OrderStore>)
    }

    /// Build a storefront whose order store wraps the in-memory one.
    #[must_use]
    pub fn with_orders<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<MemoryStore>) -> Arc<dyn OrderStore>,
    {
        Self::build(wrap)
    }

    fn build<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<MemoryStore>) -> Arc<dyn OrderStore>,
    {
        let store = Arc::new(MemoryStore::default());
        let payments = Arc::new(FakePaymentProvider::default());
        let config = test_config();

        let stores = Stores::from_memory(&store).with_orders(wrap(store.clone()));
        let session_layer =
            create_session_layer(tower_sessions::MemoryStore::default(), &config);
        let state = AppState::with_payments(config, stores, payments.clone());

        Self {
            store,
            payments,
            router: routes::app(state, session_layer),
            clients: AtomicU32::new(0),
        }
    }

    /// A new browser: its own cookie jar and its own client address, so
    /// rate limits do not leak between clients.
    pub fn client(&self) -> TestClient {
        let n = self.clients.fetch_add(1, Ordering::Relaxed) + 1;
        let [_, a, b, c] = n.to_be_bytes();
        TestClient::new(self.router.clone(), format!("10.{a}.{b}.{}", c.max(1)))
    }

    /// Store a product with a one-pixel main image.
    pub async fn seed_product(&self, name: &str, price: &str, category: &str) -> Product {
        let image = MediaStore::put(
            self.store.as_ref(),
            NewMedia {
                filename: format!("{name}.png"),
                content_type: "image/png".to_string(),
                data: PIXEL_PNG.to_vec(),
            },
        )
        .await
        .expect("store image");

        CatalogStore::create_product(
            self.store.as_ref(),
            &NewProduct {
                name: name.to_string(),
                price: Price::parse(price).expect("valid price"),
                stock: 10,
                description: format!("A fine {name}"),
                category: category.to_string(),
                main_image: image,
                additional_images: Vec::new(),
                video: None,
            },
        )
        .await
        .expect("create product")
    }

    /// Register a customer with [`PASSWORD`].
    pub async fn seed_user(&self, name: &str, email: &str) -> User {
        AuthService::new(self.store.as_ref())
            .signup(name, email, PASSWORD)
            .await
            .expect("signup")
    }

    /// Register an administrator with [`PASSWORD`].
    pub async fn seed_admin(&self, name: &str, email: &str) -> User {
        let user = self.seed_user(name, email).await;
        UserStore::set_admin(self.store.as_ref(), user.id, true)
            .await
            .expect("grant admin")
    }

    /// A client already signed in as `email`.
    pub async fn signed_in(&self, email: &str) -> TestClient {
        let mut client = self.client();
        let response = client
            .post_form("/user/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status, 200, "login failed: {}", response.text());
        client
    }
}
