//! Checkout handlers.
//!
//! `create_session` hands the cart to the payment provider. The provider
//! sends the shopper back to `success`, which reconciles the payment into an
//! order and redirects: to the order page for signed-in users, to the
//! landing page for guests, or to the cart with a notice when something is
//! wrong.

use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::OptionalUser;
use crate::models::{Cart, CurrentUser};
use crate::routes::cart::{load_cart, save_cart};
use crate::services::checkout::{
    CheckoutError, CheckoutNotice, CheckoutOutcome, CheckoutService, CreatedSession,
};
use crate::state::AppState;

/// Return query from the payment provider.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

fn checkout(state: &AppState) -> CheckoutService<'_> {
    let stores = state.stores();
    CheckoutService::new(
        stores.catalog.as_ref(),
        stores.orders.as_ref(),
        state.payments(),
        state.checkout_settings(),
    )
}

/// Cart redirect carrying a notice code and optional support reference.
fn cart_notice(notice: CheckoutNotice, reference: Option<&str>) -> Redirect {
    let mut location = format!("/cart?error={}", notice.code());
    if let Some(reference) = reference {
        location.push_str("&reference=");
        location.push_str(&urlencoding::encode(reference));
    }
    Redirect::to(&location)
}

/// Open a hosted checkout for the session cart.
#[instrument(skip_all)]
pub async fn create_session(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
) -> Result<Json<CreatedSession>, AppError> {
    let cart = load_cart(&session).await;
    let created = checkout(&state)
        .create_session(&cart, user.as_ref())
        .await?;

    tracing::info!(session_id = %created.session_id, "Checkout session created");
    Ok(Json(created))
}

/// Reconcile a returning checkout session.
#[instrument(skip(state, session, user))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
    Query(query): Query<SuccessQuery>,
) -> Result<Redirect, AppError> {
    let result = checkout(&state)
        .complete(query.session_id.as_deref(), user.as_ref())
        .await;

    match result {
        Ok(CheckoutOutcome::Placed(order) | CheckoutOutcome::AlreadyPlaced(order)) => {
            save_cart(&session, &Cart::default()).await?;
            Ok(order_redirect(user.as_ref(), &order.id.to_string()))
        }
        Ok(CheckoutOutcome::Incomplete) => Ok(cart_notice(CheckoutNotice::PaymentIncomplete, None)),
        Err(e) => {
            let notice = CheckoutNotice::for_error(&e);
            let reference = match &e {
                CheckoutError::Provider { reference, .. }
                | CheckoutError::Unrecorded { reference, .. } => Some(reference.as_str()),
                _ => None,
            };

            if matches!(e, CheckoutError::Unrecorded { .. }) {
                // The payment went through, so the cart is spent
                save_cart(&session, &Cart::default()).await?;
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Checkout not recorded");
            } else {
                tracing::warn!(error = %e, "Checkout return failed");
            }

            Ok(cart_notice(notice, reference))
        }
    }
}

fn order_redirect(user: Option<&CurrentUser>, order_id: &str) -> Redirect {
    if user.is_some() {
        Redirect::to(&format!("/order/{order_id}"))
    } else {
        Redirect::to(&format!("/?order_placed={order_id}"))
    }
}

/// The shopper left the hosted checkout.
pub async fn cancel() -> Redirect {
    cart_notice(CheckoutNotice::Canceled, None)
}
