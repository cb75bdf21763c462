//! Cart route handlers.
//!
//! The cart belongs to the caller's [`Session`]. Adding an item (re)issues
//! the session cookie so a client that arrived without one keeps its cart;
//! clearing the cart expires it.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use pola_core::{CartItemId, ProductId};

use super::{ApiJson, ApiPath};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{Session, clear_session_cookie, set_session_cookie};
use crate::models::{Cart, CartItemUpdate, RemovedCartItem};
use crate::services::CartService;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i32,
}

/// Response for clearing the cart.
#[derive(Debug, Serialize)]
pub struct ClearedCart {
    pub cleared: u64,
}

/// Show the session's cart.
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<Cart>> {
    Ok(Json(CartService::new(state.store()).get(&session.id).await?))
}

/// Add a product to the cart.
#[instrument(
    skip_all,
    fields(session_id = %session.id, product_id = %req.product_id, quantity = req.quantity)
)]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<AddToCartRequest>,
) -> Result<impl IntoResponse> {
    let line = CartService::new(state.store())
        .add(&session.id, req.product_id, req.quantity)
        .await?;

    let product_id = req.product_id.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str())]),
    );
    tracing::info!(cart_item_id = %line.item.id, "Added to cart");

    Ok((
        StatusCode::CREATED,
        set_session_cookie(&session.id, state.config().secure_cookies()),
        Json(line),
    ))
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip_all, fields(session_id = %session.id, cart_item_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    ApiPath(id): ApiPath<CartItemId>,
    ApiJson(req): ApiJson<UpdateCartRequest>,
) -> Result<Json<CartItemUpdate>> {
    let update = CartService::new(state.store())
        .update(&session.id, id, req.quantity)
        .await?;
    Ok(Json(update))
}

/// Remove a line.
#[instrument(skip_all, fields(session_id = %session.id, cart_item_id = %id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    ApiPath(id): ApiPath<CartItemId>,
) -> Result<Json<RemovedCartItem>> {
    Ok(Json(
        CartService::new(state.store())
            .remove(&session.id, id)
            .await?,
    ))
}

/// Empty the cart and expire the session cookie.
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let cleared = CartService::new(state.store()).clear(&session.id).await?;
    Ok((
        clear_session_cookie(state.config().secure_cookies()),
        Json(ClearedCart { cleared }),
    ))
}
