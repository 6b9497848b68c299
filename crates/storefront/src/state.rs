//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Stores;
use crate::payments::{PaymentError, PaymentProvider, StripeClient};
use crate::services::checkout::CheckoutSettings;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores, the payment provider and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stores: Stores,
    payments: Arc<dyn PaymentProvider>,
    checkout: CheckoutSettings,
}

impl AppState {
    /// Create application state backed by Stripe.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` if the Stripe client cannot be built.
    pub fn new(config: StorefrontConfig, stores: Stores) -> Result<Self, PaymentError> {
        let payments = Arc::new(StripeClient::new(&config.stripe)?);
        Ok(Self::with_payments(config, stores, payments))
    }

    /// Create application state with an explicit payment provider.
    #[must_use]
    pub fn with_payments(
        config: StorefrontConfig,
        stores: Stores,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        let checkout = CheckoutSettings::from_config(&config);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                payments,
                checkout,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the stores.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Get a reference to the payment provider.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentProvider {
        self.inner.payments.as_ref()
    }

    /// Get a reference to the checkout settings.
    #[must_use]
    pub fn checkout_settings(&self) -> &CheckoutSettings {
        &self.inner.checkout
    }
}
