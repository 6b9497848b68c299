//! Customer order handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use emporium_core::OrderId;

use crate::error::AppError;
use crate::middleware::RequireLogin;
use crate::models::Order;
use crate::services::orders::OrderService;
use crate::state::AppState;

fn orders(state: &AppState) -> OrderService<'_> {
    let stores = state.stores();
    OrderService::new(stores.orders.as_ref(), stores.users.as_ref())
}

/// The signed-in user's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireLogin(user): RequireLogin,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(orders(&state).for_user(user.id).await?))
}

/// One order, for its owner or an administrator.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireLogin(user): RequireLogin,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let id: OrderId = id
        .parse()
        .map_err(|_| AppError::NotFound("order".to_string()))?;
    Ok(Json(orders(&state).detail(id, user.id).await?))
}
