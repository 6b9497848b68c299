//! Order lifecycle status.
//!
//! The status set is flat: any status may follow any other through the admin
//! update action. Labels are the human-readable strings shown to shoppers and
//! stored in the database.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a label is not one of the known order statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order status: {0:?}")]
pub struct InvalidOrderStatus(pub String);

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Order Placed")]
    OrderPlaced,
    #[serde(rename = "Order Confirmed")]
    OrderConfirmed,
    #[serde(rename = "Order Processing")]
    OrderProcessing,
    #[serde(rename = "Shipped")]
    Shipped,
    #[serde(rename = "In Transit")]
    InTransit,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Shipment Failed")]
    ShipmentFailed,
    #[serde(rename = "Canceled")]
    Canceled,
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Expected Delivery")]
    ExpectedDelivery,
    #[serde(rename = "Failed Delivery")]
    FailedDelivery,
}

impl OrderStatus {
    /// Status assigned to every newly created order.
    pub const INITIAL: Self = Self::OrderPlaced;

    /// Every status, in the order the admin UI lists them.
    pub const ALL: [Self; 12] = [
        Self::OrderPlaced,
        Self::OrderConfirmed,
        Self::OrderProcessing,
        Self::Shipped,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
        Self::ShipmentFailed,
        Self::Canceled,
        Self::Pending,
        Self::ExpectedDelivery,
        Self::FailedDelivery,
    ];

    /// The stored and displayed label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderPlaced => "Order Placed",
            Self::OrderConfirmed => "Order Confirmed",
            Self::OrderProcessing => "Order Processing",
            Self::Shipped => "Shipped",
            Self::InTransit => "In Transit",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::ShipmentFailed => "Shipment Failed",
            Self::Canceled => "Canceled",
            Self::Pending => "Pending",
            Self::ExpectedDelivery => "Expected Delivery",
            Self::FailedDelivery => "Failed Delivery",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = InvalidOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidOrderStatus(s.to_owned()))
    }
}
