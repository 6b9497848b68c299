//! Session cart.
//!
//! The cart is a mapping from product to quantity that lives only in the
//! shopper's session. Entries whose product has since been deleted are kept;
//! rendering and checkout skip them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use emporium_core::ProductId;

/// Largest quantity held for one product. Payment providers refuse larger
/// line quantities.
pub const MAX_QUANTITY: u32 = 999_999;

/// Returned by [`Cart::set_quantity`] when the quantity is not an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("quantity must be a whole number, got {0:?}")]
pub struct InvalidQuantity(pub String);

/// Product quantities held in the session. Every stored quantity is at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: BTreeMap<ProductId, u32>,
}

impl Cart {
    /// Increment the quantity of a product by one, up to [`MAX_QUANTITY`].
    pub fn add(&mut self, product_id: ProductId) {
        let quantity = self.items.entry(product_id).or_insert(0);
        *quantity = quantity.saturating_add(1).min(MAX_QUANTITY);
    }

    /// Remove a product. Returns whether it was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.items.remove(&product_id).is_some()
    }

    /// Set the quantity from raw form input.
    ///
    /// Positive values replace the quantity, capped at [`MAX_QUANTITY`]. Zero
    /// or negative values remove the entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` and leaves the cart unchanged if the input is
    /// not an integer.
    pub fn set_quantity(&mut self, product_id: ProductId, raw: &str) -> Result<(), InvalidQuantity> {
        let quantity: i64 = raw
            .trim()
            .parse()
            .map_err(|_| InvalidQuantity(raw.to_owned()))?;

        if quantity > 0 {
            let quantity = u32::try_from(quantity)
                .unwrap_or(MAX_QUANTITY)
                .min(MAX_QUANTITY);
            self.items.insert(product_id, quantity);
        } else {
            self.items.remove(&product_id);
        }
        Ok(())
    }

    /// Quantity of a product, if present.
    #[must_use]
    pub fn quantity(&self, product_id: ProductId) -> Option<u32> {
        self.items.get(&product_id).copied()
    }

    /// Iterate over `(product, quantity)` pairs in product order.
    pub fn entries(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.items.iter().map(|(id, qty)| (*id, *qty))
    }

    /// Product IDs in the cart.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.keys().copied().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.values().fold(0, |acc, qty| acc.saturating_add(*qty))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
