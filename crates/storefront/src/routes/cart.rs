//! Cart route handlers.
//!
//! The cart lives in the session under `session_keys::CART`. Every mutation
//! answers with the re-priced cart.

use axum::{
    Form, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use emporium_core::ProductId;

use crate::error::AppError;
use crate::models::{Cart, session_keys};
use crate::services::cart::{CartService, CartView};
use crate::services::checkout::CheckoutNotice;
use crate::state::AppState;

/// Notice parameters set by checkout redirects.
#[derive(Debug, Deserialize)]
pub struct NoticeQuery {
    pub error: Option<String>,
    pub reference: Option<String>,
}

/// Quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    #[serde(default)]
    pub qty: String,
}

/// The cart page.
#[derive(Debug, Serialize)]
pub struct CartPage {
    #[serde(flatten)]
    pub cart: CartView,
    pub notice: Option<String>,
}

/// Load the session cart. A cart that no longer deserializes is replaced
/// by an empty one.
pub(crate) async fn load_cart(session: &Session) -> Cart {
    match session.get::<Cart>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable session cart");
            Cart::default()
        }
    }
}

/// Save the session cart.
pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<(), AppError> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

fn parse_product_id(raw: &str) -> Result<ProductId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("product".to_string()))
}

/// Show the cart, with a checkout notice when redirected here.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NoticeQuery>,
) -> Result<Json<CartPage>, AppError> {
    let cart = load_cart(&session).await;
    let view = CartService::new(state.stores().catalog.as_ref())
        .view(&cart)
        .await?;

    let notice = query
        .error
        .as_deref()
        .and_then(CheckoutNotice::from_code)
        .map(|notice| notice.message(query.reference.as_deref()));

    Ok(Json(CartPage { cart: view, notice }))
}

/// Add one unit of a product.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<String>,
) -> Result<Json<CartView>, AppError> {
    let product_id = parse_product_id(&product_id)?;
    let service = CartService::new(state.stores().catalog.as_ref());

    let mut cart = load_cart(&session).await;
    service.add(&mut cart, product_id).await?;
    save_cart(&session, &cart).await?;

    Ok(Json(service.view(&cart).await?))
}

/// Remove a product's entry. Removing an absent product is a no-op.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<String>,
) -> Result<Json<CartView>, AppError> {
    let product_id = parse_product_id(&product_id)?;

    let mut cart = load_cart(&session).await;
    if CartService::remove(&mut cart, product_id) {
        save_cart(&session, &cart).await?;
    }

    let view = CartService::new(state.stores().catalog.as_ref())
        .view(&cart)
        .await?;
    Ok(Json(view))
}

/// Set a product's quantity. Zero or less removes it.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<String>,
    Form(form): Form<UpdateForm>,
) -> Result<Json<CartView>, AppError> {
    let product_id = parse_product_id(&product_id)?;

    let mut cart = load_cart(&session).await;
    CartService::set_quantity(&mut cart, product_id, &form.qty)?;
    save_cart(&session, &cart).await?;

    let view = CartService::new(state.stores().catalog.as_ref())
        .view(&cart)
        .await?;
    Ok(Json(view))
}
