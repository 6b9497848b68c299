//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use emporium_core::{Email, UserId};

/// A storefront account.
///
/// The password hash is not part of this type; it only ever
/// leaves the identity store through `UserStore::get_credentials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name given at signup.
    pub name: String,
    /// Normalized email address (unique).
    pub email: Email,
    /// Whether the account may use the admin surface.
    pub is_admin: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub is_admin: bool,
}
