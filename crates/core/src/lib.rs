//! Emporium Core - Shared types library.
//!
//! This crate provides the domain types used across all Emporium components:
//! - `storefront` - Public storefront and admin HTTP service
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encodings are available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, emails, order statuses and category slugs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
