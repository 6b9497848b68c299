//! Cart operations over the session-held [`Cart`].
//!
//! The cart stores only product IDs and quantities. Prices and names are
//! resolved from the catalog every time the cart is viewed, so the view
//! always shows current prices. Entries whose product has been deleted
//! stay in the cart but are left out of the view.

use serde::Serialize;
use thiserror::Error;

use emporium_core::{Price, ProductId};

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Cart, InvalidQuantity, MediaRef, Product};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No product with this ID.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Quantity was not an integer.
    #[error(transparent)]
    InvalidQuantity(#[from] InvalidQuantity),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// One resolved cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub subtotal: Price,
    pub image: MediaRef,
}

/// The cart as shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Price,
    pub item_count: u32,
}

impl CartView {
    /// Resolve cart entries against already-fetched products.
    #[must_use]
    pub fn build(cart: &Cart, products: &[Product]) -> Self {
        let lines: Vec<CartLine> = cart
            .entries()
            .filter_map(|(product_id, quantity)| {
                let product = products.iter().find(|p| p.id == product_id)?;
                Some(CartLine {
                    product_id,
                    name: product.name.clone(),
                    unit_price: product.price,
                    quantity,
                    subtotal: product.price.times(quantity),
                    image: product.main_image.clone(),
                })
            })
            .collect();

        let total = lines.iter().map(|line| line.subtotal).sum();
        let item_count = lines
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity));

        Self {
            lines,
            total,
            item_count,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Cart service.
pub struct CartService<'a> {
    catalog: &'a dyn CatalogStore,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore) -> Self {
        Self { catalog }
    }

    /// Add one unit of a product. Returns the product so callers can name it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product doesn't exist; the
    /// cart is left unchanged.
    pub async fn add(&self, cart: &mut Cart, product_id: ProductId) -> Result<Product, CartError> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        cart.add(product_id);
        tracing::debug!(%product_id, quantity = cart.quantity(product_id), "Added to cart");
        Ok(product)
    }

    /// Remove a product's entry. Returns whether anything was removed.
    pub fn remove(cart: &mut Cart, product_id: ProductId) -> bool {
        cart.remove(product_id)
    }

    /// Set a quantity from raw form input. Zero or negative removes the entry.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if the input isn't an integer; the
    /// cart is left unchanged.
    pub fn set_quantity(cart: &mut Cart, product_id: ProductId, raw: &str) -> Result<(), CartError> {
        cart.set_quantity(product_id, raw)?;
        Ok(())
    }

    /// Resolve the cart at current catalog prices.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the catalog lookup fails.
    pub async fn view(&self, cart: &Cart) -> Result<CartView, CartError> {
        if cart.is_empty() {
            return Ok(CartView::build(cart, &[]));
        }

        let products = self.catalog.get_products(&cart.product_ids()).await?;
        Ok(CartView::build(cart, &products))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewProduct;
    use emporium_core::MediaId;

    async fn product(store: &MemoryStore, name: &str, price: &str) -> Product {
        store
            .create_product(&NewProduct {
                name: name.to_string(),
                price: Price::parse(price).unwrap(),
                stock: 5,
                description: String::new(),
                category: "Kitchen".to_string(),
                main_image: MediaRef {
                    id: MediaId::new(1),
                    content_type: "image/png".to_string(),
                },
                additional_images: Vec::new(),
                video: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_twice_shows_quantity_and_subtotal() {
        let store = MemoryStore::default();
        let mug = product(&store, "Mug", "9.99").await;
        let service = CartService::new(&store);
        let mut cart = Cart::default();

        service.add(&mut cart, mug.id).await.unwrap();
        service.add(&mut cart, mug.id).await.unwrap();

        let view = service.view(&cart).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 2);
        assert_eq!(view.lines[0].subtotal, Price::parse("19.98").unwrap());
        assert_eq!(view.total, Price::parse("19.98").unwrap());
        assert_eq!(view.item_count, 2);
    }

    #[tokio::test]
    async fn test_add_unknown_product_leaves_cart_unchanged() {
        let store = MemoryStore::default();
        let service = CartService::new(&store);
        let mut cart = Cart::default();

        let err = service.add(&mut cart, ProductId::new(42)).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound(_)));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_from_view() {
        let store = MemoryStore::default();
        let mug = product(&store, "Mug", "9.99").await;
        let service = CartService::new(&store);
        let mut cart = Cart::default();
        service.add(&mut cart, mug.id).await.unwrap();

        CartService::set_quantity(&mut cart, mug.id, "0").unwrap();

        assert!(service.view(&cart).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_rejects_non_integer() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1));

        let err = CartService::set_quantity(&mut cart, ProductId::new(1), "two").unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(_)));
        assert_eq!(cart.quantity(ProductId::new(1)), Some(1));
    }

    #[tokio::test]
    async fn test_view_skips_deleted_products_but_keeps_entry() {
        let store = MemoryStore::default();
        let mug = product(&store, "Mug", "9.99").await;
        let bowl = product(&store, "Bowl", "4.50").await;
        let service = CartService::new(&store);
        let mut cart = Cart::default();
        service.add(&mut cart, mug.id).await.unwrap();
        service.add(&mut cart, bowl.id).await.unwrap();

        store.delete_product(mug.id).await.unwrap();

        let view = service.view(&cart).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.total, Price::parse("4.50").unwrap());
        assert_eq!(cart.quantity(mug.id), Some(1));
    }

    #[tokio::test]
    async fn test_view_item_count_saturates() {
        let store = MemoryStore::default();
        let mug = product(&store, "Mug", "9.99").await;
        let bowl = product(&store, "Bowl", "4.50").await;
        let service = CartService::new(&store);

        // A session written before quantities were capped
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "items": { (mug.id.to_string()): u32::MAX, (bowl.id.to_string()): u32::MAX }
        }))
        .unwrap();

        let view = service.view(&cart).await.unwrap();
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.item_count, u32::MAX);
    }

    #[tokio::test]
    async fn test_view_uses_current_price() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1));

        let mut listed = Product {
            id: ProductId::new(1),
            name: "Mug".to_string(),
            price: Price::parse("9.99").unwrap(),
            stock: 1,
            description: String::new(),
            category: String::new(),
            main_image: MediaRef {
                id: MediaId::new(1),
                content_type: "image/png".to_string(),
            },
            additional_images: Vec::new(),
            video: None,
            created_at: chrono::Utc::now(),
        };
        listed.price = Price::parse("12.00").unwrap();

        let view = CartView::build(&cart, &[listed]);
        assert_eq!(view.total, Price::parse("12.00").unwrap());
    }
}
