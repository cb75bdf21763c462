//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET    /api/products              - List (?category= | ?search=, ?page=, ?limit=)
//! POST   /api/products              - Create
//! GET    /api/products/{id}         - Detail
//! PUT    /api/products/{id}         - Partial update
//! DELETE /api/products/{id}         - Delete
//! GET    /api/categories            - Distinct categories
//!
//! # Cart (session scoped)
//! GET    /api/cart                  - Cart with totals
//! POST   /api/cart                  - Add item (sets session cookie)
//! DELETE /api/cart                  - Clear (clears session cookie)
//! PUT    /api/cart/{id}             - Set quantity (<= 0 removes)
//! DELETE /api/cart/{id}             - Remove item
//!
//! # Checkout (session scoped)
//! POST   /api/checkout              - Place order
//! GET    /api/checkout/orders       - Orders for the session
//! GET    /api/checkout/orders/{n}   - Order by number
//! ```

pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    routing::get,
};

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejections render as [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections render as [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/{id}", axum::routing::put(cart::update).delete(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(checkout::place_order))
        .route("/orders", get(checkout::orders))
        .route("/orders/{order_number}", get(checkout::show_order))
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .route("/categories", get(products::categories))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
}
