//! Admin user handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use emporium_core::UserId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Grant the admin flag to a user.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn promote(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let not_found = || AppError::NotFound("user".to_string());
    let id: UserId = id.parse().map_err(|_| not_found())?;

    let user = AuthService::new(state.stores().users.as_ref())
        .promote(id)
        .await
        .map_err(|e| match e {
            AuthError::UserNotFound => not_found(),
            other => other.into(),
        })?;
    Ok(Json(user))
}
