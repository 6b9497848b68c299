//! Admin order handlers.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::OrderId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::services::orders::{AdminOrders, OrderService};
use crate::state::AppState;

/// Status update form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub status: String,
    pub tracking_number: Option<String>,
}

fn orders(state: &AppState) -> OrderService<'_> {
    let stores = state.stores();
    OrderService::new(stores.orders.as_ref(), stores.users.as_ref())
}

/// All orders with their customers, newest first.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<AdminOrders>, AppError> {
    Ok(Json(orders(&state).admin_overview().await?))
}

/// Change an order's status and tracking number.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<StatusForm>,
) -> Result<Json<Order>, AppError> {
    let order = orders(&state)
        .update_status(&form.order_id, &form.status, form.tracking_number.as_deref())
        .await?;
    Ok(Json(order))
}

/// Cancel (delete) an order.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: OrderId = id
        .parse()
        .map_err(|_| AppError::NotFound("order".to_string()))?;
    orders(&state).cancel(id).await?;
    Ok(Redirect::to("/admin/orders"))
}
