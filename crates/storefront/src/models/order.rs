//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::{OrderId, OrderStatus, Price, ProductId, UserId};

/// Shipping method recorded when the provider does not report one.
pub const DEFAULT_SHIPPING_METHOD: &str = "Standard Shipping";

fn default_shipping_method() -> String {
    DEFAULT_SHIPPING_METHOD.to_owned()
}

/// One purchased product, frozen at the time of purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Catalog product, when the payment provider reported one.
    pub product_id: Option<ProductId>,
    pub name: String,
    /// Unit price paid.
    pub price: Price,
    pub quantity: u32,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Structured postal address. Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostalAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Where and how an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: PostalAddress,
    pub shipping_method: String,
}

impl Default for ShippingAddress {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: String::new(),
            email: String::new(),
            address: PostalAddress::default(),
            shipping_method: default_shipping_method(),
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Owner; `None` for guest checkout.
    pub user_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub total_amount: Price,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    /// Payment provider identifier; at most one order exists per value.
    pub payment_intent_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order ready to be inserted.
///
/// The total is always derived from the items, so a stored order satisfies
/// `sum(price * quantity) == total_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub total_amount: Price,
    pub payment_intent_id: String,
    pub shipping_address: ShippingAddress,
}

impl NewOrder {
    #[must_use]
    pub fn new(
        user_id: Option<UserId>,
        items: Vec<OrderItem>,
        payment_intent_id: String,
        shipping_address: ShippingAddress,
    ) -> Self {
        let total_amount = items.iter().map(OrderItem::line_total).sum();
        Self {
            user_id,
            items,
            total_amount,
            payment_intent_id,
            shipping_address,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(price: &str, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: Some(ProductId::new(1)),
            name: "Widget".to_owned(),
            price: Price::parse(price).unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_new_order_total_is_sum_of_lines() {
        let order = NewOrder::new(
            Some(UserId::new(1)),
            vec![item("9.99", 2), item("0.50", 3)],
            "pi_123".to_owned(),
            ShippingAddress::default(),
        );
        assert_eq!(order.total_amount, Price::parse("21.48").unwrap());
    }

    #[test]
    fn test_shipping_address_defaults_fill_missing_fields() {
        let address: ShippingAddress =
            serde_json::from_value(serde_json::json!({ "name": "Ada" })).unwrap();
        assert_eq!(address.name, "Ada");
        assert_eq!(address.email, "");
        assert_eq!(address.address, PostalAddress::default());
        assert_eq!(address.shipping_method, "Standard Shipping");
    }
}
