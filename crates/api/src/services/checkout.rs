//! Checkout service.
//!
//! Placement is delegated to [`OrderStore::place_order`], which re-checks
//! stock and prices and writes everything in one transaction. This service
//! validates the request, snapshots the cart and retries on order number
//! collisions.
//!
//! [`OrderStore::place_order`]: crate::db::OrderStore::place_order

use rand::Rng;
use thiserror::Error;

use pola_core::{ProductId, SessionId};

use super::{CatalogError, CatalogService};
use crate::db::{PlaceOrderError, RepositoryError, Store};
use crate::models::{
    CartLine, CheckedOutLine, CheckoutRequest, InvalidField, NewOrder, Order, OrderItem,
};

/// Attempts at finding an unused order number before giving up.
const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Order number prefix.
const ORDER_NUMBER_PREFIX: &str = "POLA";

/// Checkout errors.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Invalid checkout details: {0}")]
    Invalid(#[from] InvalidField),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient stock for product: {0}")]
    InsufficientStock(String),

    #[error("Price changed for product: {0}")]
    PriceChanged(String),

    #[error("Cart changed during checkout")]
    CartChanged,

    #[error("Could not allocate a unique order number")]
    OrderNumberExhausted,

    #[error("Order with number {0} not found")]
    OrderNotFound(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    store: &'a dyn Store,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Turn the session's cart into an order.
    ///
    /// On success stock has been decremented, the order stored with status
    /// `pending` and the checked-out lines removed from the cart. On any
    /// error nothing is written.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::Invalid` for bad customer details
    /// - `CheckoutError::EmptyCart` if there is nothing to buy
    /// - `CheckoutError::InsufficientStock` naming the first product short
    ///   of stock
    /// - `CheckoutError::PriceChanged` if a price changed mid-checkout
    /// - `CheckoutError::CartChanged` if a cart line was edited or removed
    ///   mid-checkout
    /// - `CheckoutError::OrderNumberExhausted` after repeated collisions
    #[tracing::instrument(skip_all, fields(session_id = %session))]
    pub async fn process(
        &self,
        session: &SessionId,
        request: &CheckoutRequest,
    ) -> Result<Order, CheckoutError> {
        let customer = request.validate()?;

        let lines = self.store.cart_lines(session).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let catalog = CatalogService::new(self.store);
        for line in &lines {
            if !catalog
                .check_stock(line.product.id, line.item.quantity)
                .await?
            {
                tracing::warn!(
                    product_id = %line.product.id,
                    requested = line.item.quantity,
                    "Checkout rejected: insufficient stock"
                );
                return Err(CheckoutError::InsufficientStock(line.product.name.clone()));
            }
        }

        let items: Vec<OrderItem> = lines.iter().map(OrderItem::from).collect();
        let total = items.iter().map(|item| item.total).sum();
        let mut order = NewOrder {
            order_number: String::new(),
            customer_name: customer.name,
            customer_email: customer.email,
            shipping_address: customer.shipping_address,
            total,
            session_id: session.clone(),
            items,
            lines: lines.iter().map(CheckedOutLine::from).collect(),
        };

        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            order.order_number = generate_order_number();
            match self.store.place_order(&order).await {
                Ok(placed) => {
                    tracing::info!(
                        order_number = %placed.order_number,
                        total = %placed.total,
                        items = placed.items.len(),
                        "Order placed"
                    );
                    return Ok(placed);
                }
                Err(PlaceOrderError::DuplicateOrderNumber) => {
                    tracing::warn!(
                        order_number = %order.order_number,
                        attempt,
                        "Order number collision, retrying"
                    );
                }
                Err(PlaceOrderError::InsufficientStock(id)) => {
                    tracing::warn!(product_id = %id, "Checkout rejected: stock taken concurrently");
                    return Err(CheckoutError::InsufficientStock(product_name(&lines, id)));
                }
                Err(PlaceOrderError::PriceChanged(id)) => {
                    tracing::warn!(product_id = %id, "Checkout rejected: price changed");
                    return Err(CheckoutError::PriceChanged(product_name(&lines, id)));
                }
                Err(PlaceOrderError::CartChanged) => {
                    tracing::warn!("Checkout rejected: cart changed");
                    return Err(CheckoutError::CartChanged);
                }
                Err(PlaceOrderError::Repository(e)) => return Err(e.into()),
            }
        }

        Err(CheckoutError::OrderNumberExhausted)
    }

    /// Look up an order by its number.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` if there is no such order.
    pub async fn get_order(&self, order_number: &str) -> Result<Order, CheckoutError> {
        self.store
            .get_order_by_number(order_number)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(order_number.to_owned()))
    }

    /// Orders placed from the session, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the store fails.
    pub async fn list_orders(&self, session: &SessionId) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.store.list_orders(session).await?)
    }
}

/// Generate an order number: `POLA-<unix millis>-<000..999>`.
#[must_use]
pub fn generate_order_number() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u16 = rand::rng().random_range(0..1000);
    format!("{ORDER_NUMBER_PREFIX}-{millis}-{suffix:03}")
}

fn product_name(lines: &[CartLine], id: ProductId) -> String {
    lines
        .iter()
        .find(|line| line.product.id == id)
        .map_or_else(|| id.to_string(), |line| line.product.name.clone())
}
