//! Catalog browsing handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::{OrderId, ProductId};

use crate::error::AppError;
use crate::middleware::RequireLogin;
use crate::models::Product;
use crate::services::catalog::{CatalogOverview, CatalogService, CategoryPage};
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Set by the checkout return handler after a guest order is placed.
#[derive(Debug, Deserialize)]
pub struct LandingQuery {
    pub order_placed: Option<String>,
}

/// Landing page body.
#[derive(Debug, Serialize)]
pub struct LandingPage {
    #[serde(flatten)]
    pub overview: CatalogOverview,
    pub notice: Option<String>,
}

/// Confirmation shown to a guest. Values that are not order IDs are ignored.
fn order_placed_notice(raw: Option<&str>) -> Option<String> {
    let order_id: OrderId = raw?.trim().parse().ok()?;
    Some(format!(
        "Thank you! Your order {order_id} has been placed. Quote this number if you contact support."
    ))
}

fn catalog(state: &AppState) -> CatalogService<'_> {
    let stores = state.stores();
    CatalogService::new(stores.catalog.as_ref(), stores.media.as_ref())
}

/// Landing page: every product with the category list, and an order
/// confirmation when a guest returns from checkout.
#[instrument(skip(state))]
pub async fn landing(
    State(state): State<AppState>,
    Query(query): Query<LandingQuery>,
) -> Result<Json<LandingPage>, AppError> {
    let overview = catalog(&state).overview().await?;
    let notice = order_placed_notice(query.order_placed.as_deref());
    Ok(Json(LandingPage { overview, notice }))
}

/// Catalog overview for signed-in users.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn main_page(
    State(state): State<AppState>,
    RequireLogin(user): RequireLogin,
) -> Result<Json<CatalogOverview>, AppError> {
    Ok(Json(catalog(&state).overview().await?))
}

/// All products with the category list.
#[instrument(skip(state))]
pub async fn products(State(state): State<AppState>) -> Result<Json<CatalogOverview>, AppError> {
    Ok(Json(catalog(&state).overview().await?))
}

/// One product.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::NotFound("product".to_string()))?;
    Ok(Json(catalog(&state).product(id).await?))
}

/// Product and category search. A blank query goes back to `/main`.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let results = catalog(&state)
        .search(query.q.as_deref().unwrap_or_default())
        .await?;

    Ok(match results {
        Some(results) => Json(results).into_response(),
        None => Redirect::to("/main").into_response(),
    })
}

/// Products in one category.
#[instrument(skip(state))]
pub async fn category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryPage>, AppError> {
    Ok(Json(catalog(&state).category_page(&slug).await?))
}
