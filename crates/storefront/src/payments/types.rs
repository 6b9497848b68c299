//! Checkout session types exchanged with the payment provider.
//!
//! Field names follow Stripe's wire format. Everything the provider may omit
//! is an `Option` or defaults, so a sparse response still deserializes.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use emporium_core::ProductId;

/// Metadata key carrying the catalog product ID on a provider product.
pub const PRODUCT_ID_METADATA_KEY: &str = "product_id";

/// A request to open a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItemRequest>,
    pub success_url: String,
    pub cancel_url: String,
    /// Prefills the email field on the hosted page.
    pub customer_email: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// ISO country codes for shipping address collection. Empty disables it.
    pub shipping_countries: Vec<String>,
}

/// One line of a checkout request, priced in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub name: String,
    pub currency: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

/// A field the provider returns either as a bare ID or, when expanded, as
/// the full object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T: HasId> Expandable<T> {
    /// The object's ID, whether or not it was expanded.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Object(object) => object.id(),
        }
    }

    /// The expanded object, if present.
    #[must_use]
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Object(object) => Some(object),
        }
    }
}

/// Provider objects that carry an ID.
pub trait HasId {
    fn id(&self) -> &str;
}

/// Payment state of a checkout session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    #[default]
    Unpaid,
    NoPaymentRequired,
    #[serde(other)]
    Unknown,
}

/// A paginated list.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// A hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted checkout page; present while the session is open.
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    pub customer: Option<Expandable<Customer>>,
    /// Email entered for guest checkout.
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    pub shipping_details: Option<ShippingDetails>,
    pub amount_total: Option<i64>,
    /// Present when retrieved with `expand[]=line_items`.
    pub line_items: Option<List<LineItem>>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Whether the provider reports the payment as completed.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// The payment intent ID, if the session has one.
    #[must_use]
    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent.as_ref().map(Expandable::id)
    }

    /// The customer ID, if the session is attached to a customer record.
    #[must_use]
    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(Expandable::id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: Option<String>,
}

impl HasId for PaymentIntent {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A customer record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl HasId for Customer {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Contact details entered on the hosted page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

/// Shipping details collected on the hosted page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ShippingDetails {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// One purchased line as the provider recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub amount_total: i64,
    pub price: Option<LinePrice>,
}

impl LineItem {
    /// The unit price in minor units. Falls back to the line total divided
    /// by quantity when the price object is missing.
    #[must_use]
    pub fn unit_amount(&self) -> i64 {
        self.price
            .as_ref()
            .and_then(|p| p.unit_amount)
            .unwrap_or_else(|| self.amount_total / i64::from(self.quantity.unwrap_or(1).max(1)))
    }

    /// The expanded provider product, if any.
    #[must_use]
    pub fn product(&self) -> Option<&ProviderProduct> {
        self.price
            .as_ref()
            .and_then(|p| p.product.as_ref())
            .and_then(Expandable::as_object)
    }

    /// The catalog product this line was created from, read back from the
    /// provider product's metadata.
    #[must_use]
    pub fn catalog_product_id(&self) -> Option<ProductId> {
        self.product()?
            .metadata
            .get(PRODUCT_ID_METADATA_KEY)?
            .parse()
            .ok()
    }

    /// Display name: the line description, else the product name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.product().map(|p| p.name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinePrice {
    pub id: String,
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
    pub product: Option<Expandable<ProviderProduct>>,
}

/// The provider's product object, created inline from `price_data`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderProduct {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl HasId for ProviderProduct {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_with_unexpanded_fields() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "url": null,
            "payment_status": "paid",
            "payment_intent": "pi_123",
            "customer": "cus_9",
            "amount_total": 1998
        }))
        .unwrap();

        assert!(session.is_paid());
        assert_eq!(session.payment_intent_id(), Some("pi_123"));
        assert_eq!(session.customer_id(), Some("cus_9"));
        assert!(session.line_items.is_none());
        assert!(session.metadata.is_empty());
    }

    #[test]
    fn test_session_with_expanded_fields() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_2",
            "payment_status": "unpaid",
            "payment_intent": { "id": "pi_456", "object": "payment_intent", "status": "requires_payment_method" },
            "line_items": {
                "object": "list",
                "has_more": false,
                "data": [{
                    "id": "li_1",
                    "description": "Mug",
                    "quantity": 2,
                    "amount_total": 1998,
                    "price": {
                        "id": "price_1",
                        "unit_amount": 999,
                        "currency": "usd",
                        "product": { "id": "prod_1", "name": "Mug", "metadata": { "product_id": "12" } }
                    }
                }]
            }
        }))
        .unwrap();

        assert!(!session.is_paid());
        assert_eq!(session.payment_intent_id(), Some("pi_456"));

        let item = &session.line_items.unwrap().data[0];
        assert_eq!(item.unit_amount(), 999);
        assert_eq!(item.catalog_product_id(), Some(ProductId::new(12)));
        assert_eq!(item.display_name(), Some("Mug"));
    }

    #[test]
    fn test_unknown_payment_status() {
        let status: PaymentStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(status, PaymentStatus::Unknown);
        let status: PaymentStatus = serde_json::from_str("\"no_payment_required\"").unwrap();
        assert_eq!(status, PaymentStatus::NoPaymentRequired);
    }

    #[test]
    fn test_line_item_unit_amount_fallback() {
        let item = LineItem {
            id: "li_2".to_string(),
            description: None,
            quantity: Some(3),
            amount_total: 3000,
            price: None,
        };
        assert_eq!(item.unit_amount(), 1000);
        assert_eq!(item.catalog_product_id(), None);
        assert_eq!(item.display_name(), None);
    }
}
