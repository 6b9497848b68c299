//! Admin category handlers.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::CategoryId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// New category form data.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub category_name: String,
}

fn catalog(state: &AppState) -> CatalogService<'_> {
    let stores = state.stores();
    CatalogService::new(stores.catalog.as_ref(), stores.media.as_ref())
}

/// Create a category.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<CategoryForm>,
) -> Result<impl IntoResponse, AppError> {
    let category = catalog(&state).add_category(&form.category_name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Delete a category.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: CategoryId = id
        .parse()
        .map_err(|_| AppError::NotFound("category".to_string()))?;
    catalog(&state).remove_category(id).await?;
    Ok(Redirect::to("/admin/dashboard"))
}
