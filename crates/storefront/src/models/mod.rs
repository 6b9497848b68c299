//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from database row types and
//! from the JSON views returned by route handlers.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{Cart, InvalidQuantity, MAX_QUANTITY};
pub use catalog::{Category, MediaRef, NewProduct, Product};
pub use order::{NewOrder, Order, OrderItem, PostalAddress, ShippingAddress};
pub use session::{CurrentUser, session_keys};
pub use user::{NewUser, User};
