//! Checkout: opening hosted payment sessions and turning paid sessions into
//! orders.
//!
//! The payment provider is the source of truth for what was bought. Orders
//! are built from the provider's line items, not from the local cart, and
//! are keyed by payment intent so the return handler can run any number of
//! times for the same payment and still produce one order.
//!
//! Once the provider reports a payment as completed, every failure is
//! returned as [`CheckoutError::Unrecorded`] carrying a reference the
//! shopper can quote to support.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use emporium_core::{Price, UserId};

use crate::config::StorefrontConfig;
use crate::db::{CatalogStore, OrderStore, RepositoryError};
use crate::models::{
    Cart, CurrentUser, NewOrder, Order, OrderItem, PostalAddress, ShippingAddress,
};
use crate::payments::{
    Address, CheckoutSession, CheckoutSessionRequest, LineItem, LineItemRequest, PaymentError,
    PaymentProvider,
};

/// Name used for a provider line item that carries no description.
const FALLBACK_ITEM_NAME: &str = "Item";

/// Metadata keys attached to every checkout session.
pub mod metadata_keys {
    pub const USER_ID: &str = "user_id";
    pub const TOTAL: &str = "total";
    pub const ITEM_COUNT: &str = "item_count";
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Every cart entry was skipped.
    #[error("no valid items in cart")]
    NoValidItems,

    /// Return request without a session ID.
    #[error("missing checkout session id")]
    MissingSessionId,

    /// The provider could not open a session.
    #[error("payment provider unavailable: {0}")]
    ProviderUnavailable(#[source] PaymentError),

    /// The provider could not confirm a returning session.
    #[error("could not verify checkout session {reference}: {source}")]
    Provider {
        reference: String,
        #[source]
        source: PaymentError,
    },

    /// Paid at the provider but no order could be stored.
    #[error("payment {reference} received but the order was not recorded: {reason}")]
    Unrecorded { reference: String, reason: String },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What became of a returning checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// A new order was stored.
    Placed(Order),
    /// An order already existed for this payment.
    AlreadyPlaced(Order),
    /// The provider does not report the payment as completed.
    Incomplete,
}

impl CheckoutOutcome {
    /// The order, when one exists.
    #[must_use]
    pub const fn order(&self) -> Option<&Order> {
        match self {
            Self::Placed(order) | Self::AlreadyPlaced(order) => Some(order),
            Self::Incomplete => None,
        }
    }
}

/// A freshly opened hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSession {
    pub session_id: String,
    pub url: Option<String>,
}

/// Checkout parameters taken from configuration.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Public base URL, without a trailing slash.
    pub base_url: String,
    pub currency: String,
    pub shipping_countries: Vec<String>,
}

impl CheckoutSettings {
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currency: config.stripe.currency.clone(),
            shipping_countries: config.stripe.shipping_countries.clone(),
        }
    }

    /// Where the provider sends the shopper after paying. The provider
    /// substitutes `{CHECKOUT_SESSION_ID}`.
    #[must_use]
    pub fn success_url(&self) -> String {
        format!(
            "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.base_url
        )
    }

    #[must_use]
    pub fn cancel_url(&self) -> String {
        format!("{}/checkout/cancel", self.base_url)
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    catalog: &'a dyn CatalogStore,
    orders: &'a dyn OrderStore,
    payments: &'a dyn PaymentProvider,
    settings: &'a CheckoutSettings,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        catalog: &'a dyn CatalogStore,
        orders: &'a dyn OrderStore,
        payments: &'a dyn PaymentProvider,
        settings: &'a CheckoutSettings,
    ) -> Self {
        Self {
            catalog,
            orders,
            payments,
            settings,
        }
    }

    /// Open a hosted checkout for the cart at current catalog prices.
    ///
    /// Entries whose product no longer exists, or whose price is not
    /// positive, are skipped.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` or `CheckoutError::NoValidItems`
    /// for carts that cannot be paid for, and
    /// `CheckoutError::ProviderUnavailable` if the provider call fails.
    #[instrument(skip_all, fields(entries = cart.len()))]
    pub async fn create_session(
        &self,
        cart: &Cart,
        user: Option<&CurrentUser>,
    ) -> Result<CreatedSession, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let products = self.catalog.get_products(&cart.product_ids()).await?;

        let mut line_items = Vec::new();
        let mut total = Price::ZERO;
        for (product_id, quantity) in cart.entries() {
            let Some(product) = products.iter().find(|p| p.id == product_id) else {
                tracing::debug!(%product_id, "Skipping deleted product at checkout");
                continue;
            };
            let unit_amount = match product.price.to_minor_units() {
                Ok(amount) if amount > 0 => amount,
                Ok(_) => {
                    tracing::debug!(%product_id, "Skipping product without a positive price");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%product_id, error = %e, "Skipping product with unusable price");
                    continue;
                }
            };

            total = total + product.price.times(quantity);
            line_items.push(LineItemRequest {
                product_id,
                name: product.name.clone(),
                currency: self.settings.currency.clone(),
                unit_amount,
                quantity,
            });
        }

        if line_items.is_empty() {
            return Err(CheckoutError::NoValidItems);
        }

        let item_count = line_items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity));
        let metadata = BTreeMap::from([
            (
                metadata_keys::USER_ID.to_string(),
                user.map_or_else(|| "guest".to_string(), |u| u.id.to_string()),
            ),
            (metadata_keys::TOTAL.to_string(), total.amount().to_string()),
            (metadata_keys::ITEM_COUNT.to_string(), item_count.to_string()),
        ]);

        let request = CheckoutSessionRequest {
            line_items,
            success_url: self.settings.success_url(),
            cancel_url: self.settings.cancel_url(),
            customer_email: user.map(|u| u.email.to_string()),
            metadata,
            shipping_countries: self.settings.shipping_countries.clone(),
        };

        let session = self
            .payments
            .create_checkout_session(&request)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create checkout session");
                CheckoutError::ProviderUnavailable(e)
            })?;

        Ok(CreatedSession {
            session_id: session.id,
            url: session.url,
        })
    }

    /// Reconcile a returning checkout session into an order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingSessionId` without a session ID,
    /// `CheckoutError::Provider` if the session cannot be retrieved, and
    /// `CheckoutError::Unrecorded` if the payment completed but storing the
    /// order failed.
    #[instrument(skip(self, user), fields(user_id = user.map(|u| u.id.as_i32())))]
    pub async fn complete(
        &self,
        session_id: Option<&str>,
        user: Option<&CurrentUser>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(CheckoutError::MissingSessionId)?;

        let session = self
            .payments
            .retrieve_checkout_session(session_id)
            .await
            .map_err(|source| {
                tracing::error!(session_id, error = %source, "Failed to retrieve checkout session");
                CheckoutError::Provider {
                    reference: session_id.to_string(),
                    source,
                }
            })?;

        // Sessions without a payment intent fall back to the session ID
        let payment_key = session
            .payment_intent_id()
            .unwrap_or(&session.id)
            .to_string();

        match self.reconcile(&session, &payment_key, user).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if session.is_paid() => {
                tracing::error!(
                    session_id,
                    payment_intent = %payment_key,
                    error = %e,
                    "Payment received but order was not recorded"
                );
                Err(CheckoutError::Unrecorded {
                    reference: payment_key,
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn reconcile(
        &self,
        session: &CheckoutSession,
        payment_key: &str,
        user: Option<&CurrentUser>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if let Some(existing) = self.orders.get_by_payment_intent(payment_key).await? {
            tracing::info!(order_id = %existing.id, payment_intent = %payment_key, "Order already recorded");
            return Ok(CheckoutOutcome::AlreadyPlaced(existing));
        }

        if !session.is_paid() {
            tracing::info!(
                session_id = %session.id,
                payment_status = ?session.payment_status,
                "Checkout session not paid"
            );
            return Ok(CheckoutOutcome::Incomplete);
        }

        // The embedded list is only the first page of a longer one
        let embedded = session
            .line_items
            .as_ref()
            .filter(|list| !list.has_more && !list.data.is_empty());
        let line_items = match embedded {
            Some(list) => list.data.clone(),
            None => self
                .payments
                .list_line_items(&session.id)
                .await
                .map_err(|source| CheckoutError::Provider {
                    reference: session.id.clone(),
                    source,
                })?,
        };
        let items = order_items(&line_items)?;
        if items.is_empty() {
            return Err(CheckoutError::NoValidItems);
        }

        let email = self.customer_email(session, user).await;
        let shipping = shipping_address(session, user, email);
        let user_id = user.map(|u| u.id).or_else(|| metadata_user_id(session));

        let new_order = NewOrder::new(user_id, items, payment_key.to_string(), shipping);
        if let Some(paid) = session.amount_total
            && new_order.total_amount.to_minor_units().ok() != Some(paid)
        {
            tracing::warn!(
                payment_intent = %payment_key,
                paid,
                total = %new_order.total_amount,
                "Order total differs from amount charged"
            );
        }

        match self.orders.create(&new_order).await {
            Ok(order) => {
                tracing::info!(order_id = %order.id, payment_intent = %payment_key, "Order placed");
                Ok(CheckoutOutcome::Placed(order))
            }
            Err(RepositoryError::Conflict(_)) => {
                // Another request for the same payment won the insert
                let order = self
                    .orders
                    .get_by_payment_intent(payment_key)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                Ok(CheckoutOutcome::AlreadyPlaced(order))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the customer email: the signed-in user, then the contact
    /// details entered at checkout, then the guest email, then the provider's
    /// customer record.
    async fn customer_email(
        &self,
        session: &CheckoutSession,
        user: Option<&CurrentUser>,
    ) -> Option<String> {
        let known = user
            .map(|u| u.email.to_string())
            .or_else(|| {
                session
                    .customer_details
                    .as_ref()
                    .and_then(|d| non_blank(d.email.as_deref()))
            })
            .or_else(|| non_blank(session.customer_email.as_deref()));
        if known.is_some() {
            return known;
        }

        let customer = session.customer.as_ref()?;
        if let Some(expanded) = customer.as_object() {
            return non_blank(expanded.email.as_deref());
        }

        match self.payments.retrieve_customer(customer.id()).await {
            Ok(record) => non_blank(record.email.as_deref()),
            Err(e) => {
                tracing::warn!(customer_id = customer.id(), error = %e, "Customer lookup failed");
                None
            }
        }
    }
}

/// Convert provider line items into order items priced as charged.
fn order_items(line_items: &[LineItem]) -> Result<Vec<OrderItem>, CheckoutError> {
    line_items
        .iter()
        .map(|item| {
            let price = Price::from_minor_units(item.unit_amount()).map_err(|e| {
                CheckoutError::Unrecorded {
                    reference: item.id.clone(),
                    reason: format!("line item price: {e}"),
                }
            })?;
            Ok(OrderItem {
                product_id: item.catalog_product_id(),
                name: item.display_name().unwrap_or(FALLBACK_ITEM_NAME).to_string(),
                price,
                quantity: item.quantity.unwrap_or(1),
            })
        })
        .collect()
}

/// Shipping details from the session, falling back to the contact details.
fn shipping_address(
    session: &CheckoutSession,
    user: Option<&CurrentUser>,
    email: Option<String>,
) -> ShippingAddress {
    let shipping = session.shipping_details.clone().unwrap_or_default();
    let details = session.customer_details.clone().unwrap_or_default();

    ShippingAddress {
        name: non_blank(shipping.name.as_deref())
            .or_else(|| non_blank(details.name.as_deref()))
            .or_else(|| user.map(|u| u.name.clone()))
            .unwrap_or_default(),
        phone: non_blank(shipping.phone.as_deref())
            .or_else(|| non_blank(details.phone.as_deref()))
            .unwrap_or_default(),
        email: email.unwrap_or_default(),
        address: shipping
            .address
            .or(details.address)
            .map(postal_address)
            .unwrap_or_default(),
        ..ShippingAddress::default()
    }
}

fn postal_address(address: Address) -> PostalAddress {
    PostalAddress {
        line1: address.line1.unwrap_or_default(),
        line2: address.line2.unwrap_or_default(),
        city: address.city.unwrap_or_default(),
        state: address.state.unwrap_or_default(),
        postal_code: address.postal_code.unwrap_or_default(),
        country: address.country.unwrap_or_default(),
    }
}

fn metadata_user_id(session: &CheckoutSession) -> Option<UserId> {
    session.metadata.get(metadata_keys::USER_ID)?.parse().ok()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Messages shown on the cart page after a checkout redirect, keyed by the
/// `error` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutNotice {
    Canceled,
    MissingSession,
    PaymentIncomplete,
    PaymentUnverified,
    OrderNotRecorded,
}

impl CheckoutNotice {
    /// Query parameter value.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Canceled => "checkout_canceled",
            Self::MissingSession => "missing_session",
            Self::PaymentIncomplete => "payment_incomplete",
            Self::PaymentUnverified => "payment_unverified",
            Self::OrderNotRecorded => "order_not_recorded",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        [
            Self::Canceled,
            Self::MissingSession,
            Self::PaymentIncomplete,
            Self::PaymentUnverified,
            Self::OrderNotRecorded,
        ]
        .into_iter()
        .find(|notice| notice.code() == code)
    }

    /// The notice for a failed [`CheckoutService::complete`].
    #[must_use]
    pub const fn for_error(error: &CheckoutError) -> Self {
        match error {
            CheckoutError::MissingSessionId => Self::MissingSession,
            CheckoutError::Provider { .. } => Self::PaymentUnverified,
            _ => Self::OrderNotRecorded,
        }
    }

    /// Text for the shopper. `reference` is quoted for support where given.
    #[must_use]
    pub fn message(self, reference: Option<&str>) -> String {
        let reference = reference.map(str::trim).filter(|r| !r.is_empty());
        match self {
            Self::Canceled => "Checkout was canceled. Your cart has been kept.".to_string(),
            Self::MissingSession => {
                "We could not find your checkout session. Please try again.".to_string()
            }
            Self::PaymentIncomplete => {
                "Your payment has not completed, so no order was placed. Your cart is unchanged."
                    .to_string()
            }
            Self::PaymentUnverified => match reference {
                Some(r) => format!(
                    "We could not confirm your payment. If you were charged, contact support with reference {r}. Otherwise please try again."
                ),
                None => "We could not confirm your payment. Please try again.".to_string(),
            },
            Self::OrderNotRecorded => match reference {
                Some(r) => format!(
                    "Your payment was received, but we could not record your order. Please contact support with reference {r}."
                ),
                None => "Your payment was received, but we could not record your order. Please contact support.".to_string(),
            },
        }
    }
}
