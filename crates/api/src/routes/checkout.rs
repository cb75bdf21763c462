//! Checkout route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::instrument;

use super::{ApiJson, ApiPath};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::Session;
use crate::models::{CheckoutRequest, Order};
use crate::services::CheckoutService;
use crate::state::AppState;

/// Place an order for everything in the session's cart.
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<impl IntoResponse> {
    let order = CheckoutService::new(state.store())
        .process(&session.id, &req)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    Ok((StatusCode::CREATED, Json(order)))
}

/// Look up an order by number.
#[instrument(skip(state))]
pub async fn show_order(
    State(state): State<AppState>,
    ApiPath(order_number): ApiPath<String>,
) -> Result<Json<Order>> {
    Ok(Json(
        CheckoutService::new(state.store())
            .get_order(&order_number)
            .await?,
    ))
}

/// Orders placed from the caller's session, newest first.
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn orders(State(state): State<AppState>, session: Session) -> Result<Json<Vec<Order>>> {
    Ok(Json(
        CheckoutService::new(state.store())
            .list_orders(&session.id)
            .await?,
    ))
}
