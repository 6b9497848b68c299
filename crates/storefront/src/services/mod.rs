//! Business logic services for the storefront.
//!
//! Services borrow the stores they need for the duration of one request and
//! hold no state of their own. Handlers build them from [`AppState`] and map
//! their errors into `AppError`.
//!
//! # Services
//!
//! - `auth` - Signup, login and admin authorization
//! - `cart` - Session cart operations and pricing
//! - `catalog` - Browsing, search and product/category administration
//! - `checkout` - Hosted checkout sessions and order reconciliation
//! - `media` - Upload validation and byte-range delivery
//! - `orders` - Order history, detail and status administration
//!
//! [`AppState`]: crate::state::AppState

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod media;
pub mod orders;
