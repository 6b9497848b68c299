//! Order viewing and administration.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use emporium_core::{OrderId, OrderStatus, UserId};

use crate::db::{OrderStore, RepositoryError, UserStore};
use crate::models::Order;

/// Shown in the admin listing for orders without an account.
pub const GUEST_NAME: &str = "Guest";

/// Shown in the admin listing when the owner's email is unknown.
pub const NO_EMAIL: &str = "No email";

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A required form field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The status is not one of the fixed labels.
    #[error("invalid order status: {0:?}")]
    InvalidStatus(String),

    /// Order not found.
    #[error("order not found")]
    NotFound,

    /// Viewer may not see this order.
    #[error("not allowed to view this order")]
    Forbidden,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// An order with its owner's contact details, for the admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub user_name: String,
    pub user_email: String,
}

/// The admin order listing.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOrders {
    pub orders: Vec<AdminOrder>,
    pub statuses: [OrderStatus; 12],
}

/// Order service.
pub struct OrderService<'a> {
    orders: &'a dyn OrderStore,
    users: &'a dyn UserStore,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(orders: &'a dyn OrderStore, users: &'a dyn UserStore) -> Self {
        Self { orders, users }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.get_for_user(user_id).await?)
    }

    /// One order, visible to its owner or to an administrator. The admin
    /// flag is re-read from the user store.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist and
    /// `OrderError::Forbidden` if the viewer may not see it.
    pub async fn detail(&self, id: OrderId, viewer: UserId) -> Result<Order, OrderError> {
        let order = self.orders.get_by_id(id).await?.ok_or(OrderError::NotFound)?;
        if order.user_id == Some(viewer) {
            return Ok(order);
        }

        let is_admin = self
            .users
            .get_by_id(viewer)
            .await?
            .is_some_and(|user| user.is_admin);
        if !is_admin {
            tracing::warn!(order_id = %id, viewer = %viewer, "Order access denied");
            return Err(OrderError::Forbidden);
        }

        Ok(order)
    }

    /// Every order, newest first, joined with the owning user.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn admin_overview(&self) -> Result<AdminOrders, OrderError> {
        let orders = self.orders.list_all().await?;

        let mut user_ids: Vec<UserId> = orders.iter().filter_map(|o| o.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = self.users.get_many(&user_ids).await?;

        let orders = orders
            .into_iter()
            .map(|order| {
                let owner = order.user_id.and_then(|id| users.get(&id));
                AdminOrder {
                    user_name: owner.map_or_else(|| GUEST_NAME.to_string(), |u| u.name.clone()),
                    user_email: owner
                        .map_or_else(|| NO_EMAIL.to_string(), |u| u.email.to_string()),
                    order,
                }
            })
            .collect();

        Ok(AdminOrders {
            orders,
            statuses: OrderStatus::ALL,
        })
    }

    /// Change an order's status from raw form input. A blank tracking number
    /// keeps the stored one.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::MissingField` or `OrderError::InvalidStatus` for
    /// bad input (the order is not touched), and `OrderError::NotFound` if
    /// the order doesn't exist.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        raw_order_id: &str,
        raw_status: &str,
        raw_tracking: Option<&str>,
    ) -> Result<Order, OrderError> {
        let raw_order_id = raw_order_id.trim();
        if raw_order_id.is_empty() {
            return Err(OrderError::MissingField("order_id"));
        }
        let raw_status = raw_status.trim();
        if raw_status.is_empty() {
            return Err(OrderError::MissingField("status"));
        }

        let status: OrderStatus = raw_status
            .parse()
            .map_err(|_| OrderError::InvalidStatus(raw_status.to_string()))?;
        let id: OrderId = raw_order_id.parse().map_err(|_| OrderError::NotFound)?;
        let tracking = raw_tracking.map(str::trim).filter(|t| !t.is_empty());

        let order = self
            .orders
            .update_status(id, status, tracking)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound,
                other => OrderError::Repository(other),
            })?;

        tracing::info!(order_id = %id, status = %status, "Order status updated");
        Ok(order)
    }

    /// Cancel an order by deleting it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order doesn't exist.
    pub async fn cancel(&self, id: OrderId) -> Result<(), OrderError> {
        if !self.orders.delete(id).await? {
            return Err(OrderError::NotFound);
        }
        tracing::info!(order_id = %id, "Order canceled");
        Ok(())
    }
}
