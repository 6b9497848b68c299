//! Storage adapters for the storefront.
//!
//! # Database: `emporium`
//!
//! ## Tables
//!
//! - `users` - Accounts with argon2 password hashes and the admin flag
//! - `categories` - Category names (products reference them by name)
//! - `products` - Catalog with media references
//! - `media` - Uploaded image and video blobs
//! - `orders` - Orders with a unique `payment_intent_id`
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Every store is a trait object so handlers and services never see a
//! concrete backend. `Stores::postgres` wires the `PostgreSQL` adapters,
//! `Stores::memory` wires the in-memory adapters used by tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```

pub mod catalog;
pub mod media;
pub mod memory;
pub mod orders;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::{CatalogStore, PgCatalogStore};
pub use media::{MediaStore, NewMedia, PgMediaStore, StoredMedia};
pub use memory::MemoryStore;
pub use orders::{OrderStore, PgOrderStore};
pub use users::{PgUserStore, UserStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be converted into a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Entity not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// The set of stores the application runs against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub media: Arc<dyn MediaStore>,
    pool: Option<PgPool>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one connection pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            catalog: Arc::new(PgCatalogStore::new(pool.clone())),
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            media: Arc::new(PgMediaStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// In-memory stores sharing one [`MemoryStore`].
    #[must_use]
    pub fn memory() -> Self {
        Self::from_memory(&Arc::new(MemoryStore::default()))
    }

    /// Stores backed by an existing [`MemoryStore`], so callers can seed and
    /// inspect it directly.
    #[must_use]
    pub fn from_memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            catalog: store.clone(),
            orders: store.clone(),
            media: store.clone(),
            pool: None,
        }
    }

    /// Replace the order store.
    #[must_use]
    pub fn with_orders(mut self, orders: Arc<dyn OrderStore>) -> Self {
        self.orders = orders;
        self
    }

    /// The connection pool, when running against `PostgreSQL`.
    #[must_use]
    pub const fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
