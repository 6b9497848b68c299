//! Authentication extractors.
//!
//! Route guards are extractors: a handler that takes [`RequireLogin`] or
//! [`RequireAdmin`] only runs once the check has passed.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, User, session_keys};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Where anonymous visitors are sent.
pub const LOGIN_REDIRECT: &str = "/";

/// Where signed-in users without admin rights are sent.
pub const ADMIN_DENIED_REDIRECT: &str = "/main";

/// Extractor that requires a signed-in user.
///
/// If nobody is signed in, returns a redirect to the landing page.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequireLogin(user): RequireLogin) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireLogin(pub CurrentUser);

/// Extractor that requires an administrator.
///
/// The admin flag is re-read from the user store on every request, so a
/// revoked flag takes effect immediately.
pub struct RequireAdmin(pub User);

/// Extractor that optionally gets the signed-in user.
pub struct OptionalUser(pub Option<CurrentUser>);

/// Rejection returned by the guards.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in.
    RedirectToLogin,
    /// Signed in, but not an administrator.
    RedirectToMain,
    /// No session layer in front of the handler.
    MissingSession,
    /// The user store could not be read.
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_REDIRECT).into_response(),
            Self::RedirectToMain => Redirect::to(ADMIN_DENIED_REDIRECT).into_response(),
            Self::MissingSession | Self::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

async fn session_user(parts: &Parts) -> Result<Option<CurrentUser>, AuthRejection> {
    // Set by SessionManagerLayer
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::MissingSession)?;

    Ok(session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten())
}

impl<S> FromRequestParts<S> for RequireLogin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await?
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = session_user(parts)
            .await?
            .ok_or(AuthRejection::RedirectToLogin)?;

        let auth = AuthService::new(state.stores().users.as_ref());
        match auth.authorize_admin(current.id).await {
            Ok(user) => Ok(Self(user)),
            Err(AuthError::NotAdmin | AuthError::UserNotFound) => {
                tracing::warn!(user_id = %current.id, path = %parts.uri.path(), "Admin access denied");
                Err(AuthRejection::RedirectToMain)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to authorize admin");
                Err(AuthRejection::Internal)
            }
        }
    }
}

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await.ok().flatten()))
    }
}

/// Store the signed-in user in the session.
///
/// The session ID is cycled first so a pre-login session cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the session entirely (sign out).
///
/// # Errors
///
/// Returns an error if the session cannot be flushed.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
