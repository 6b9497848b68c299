//! Administrator account commands.
//!
//! Accounts are managed through the storefront's `AuthService`, so the CLI
//! applies the same email and password rules as signup.

use secrecy::{ExposeSecret, SecretString};

use emporium_storefront::db::PgUserStore;
use emporium_storefront::services::auth::AuthService;

use super::{CommandError, connect};

/// Create an administrator, or promote the existing account with this email.
pub async fn create(email: &str, name: &str, password: &SecretString) -> Result<(), CommandError> {
    let users = PgUserStore::new(connect().await?);
    let user = AuthService::new(&users)
        .ensure_admin(name, email, password.expose_secret())
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Administrator ready");
    Ok(())
}

/// Grant the admin flag to an existing account.
pub async fn promote(email: &str) -> Result<(), CommandError> {
    let users = PgUserStore::new(connect().await?);
    let user = AuthService::new(&users).promote_email(email).await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Account promoted to administrator");
    Ok(())
}
