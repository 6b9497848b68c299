//! Payment provider boundary.
//!
//! The provider is the source of truth for what was paid: the checkout
//! service opens hosted sessions through [`PaymentProvider`] and later reads
//! them back to build orders. [`StripeClient`] is the production
//! implementation.

pub mod stripe;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use stripe::StripeClient;
pub use types::{
    Address, CheckoutSession, CheckoutSessionRequest, Customer, CustomerDetails, Expandable,
    LineItem, LineItemRequest, LinePrice, List, PRODUCT_ID_METADATA_KEY, PaymentIntent,
    PaymentStatus, ProviderProduct, ShippingDetails,
};

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Hosted checkout operations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the provider rejects the request or is
    /// unreachable.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Retrieve a session with its line items and payment intent expanded.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the session cannot be fetched or parsed.
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError>;

    /// List every line item of a session, following pages to the end.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the list cannot be fetched or parsed.
    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, PaymentError>;

    /// Retrieve a customer record.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the customer cannot be fetched or parsed.
    async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, PaymentError>;
}
