//! Admin product handlers.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::ProductId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::services::catalog::{CatalogOverview, CatalogService, ProductForm, Upload};
use crate::state::AppState;

/// Dashboard search parameters.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub q: Option<String>,
}

fn catalog(state: &AppState) -> CatalogService<'_> {
    let stores = state.stores();
    CatalogService::new(stores.catalog.as_ref(), stores.media.as_ref())
}

/// Products (optionally filtered) with the category list.
#[instrument(skip(state, _admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<CatalogOverview>, AppError> {
    Ok(Json(catalog(&state).admin_dashboard(query.q.as_deref()).await?))
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {e}")))
}

async fn read_upload(field: Field<'_>) -> Result<Upload, AppError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
    Ok(Upload {
        filename,
        data: data.to_vec(),
    })
}

/// Collect the multipart product form.
///
/// Text fields: `name`, `price`, `stock`, `description`, `category`.
/// Files: `main_image`, `additional_images` (repeatable), `video`.
async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, AppError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => form.name = read_text(field).await?,
            "price" => form.price = read_text(field).await?,
            "stock" => form.stock = read_text(field).await?,
            "description" => form.description = read_text(field).await?,
            "category" => form.category = read_text(field).await?,
            "main_image" => form.main_image = Some(read_upload(field).await?),
            "additional_images" => form.additional_images.push(read_upload(field).await?),
            "video" => form.video = Some(read_upload(field).await?),
            other => tracing::debug!(field = other, "Ignoring unknown product form field"),
        }
    }

    Ok(form)
}

/// Add a product from a multipart form.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_product_form(multipart).await?;
    let product = catalog(&state).add_product(form).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Delete a product.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::NotFound("product".to_string()))?;
    catalog(&state).remove_product(id).await?;
    Ok(Redirect::to("/admin/dashboard"))
}
