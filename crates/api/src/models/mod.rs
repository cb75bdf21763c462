//! Domain models for the catalog, cart and orders.
//!
//! These types are what the services and routes work with; database row
//! types live next to the queries in [`crate::db`] and are converted into
//! these at the storage boundary.

pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartItem, CartItemUpdate, CartLine, CartProduct, RemovedCartItem};
pub use order::{CheckedOutLine, CheckoutRequest, NewOrder, Order, OrderItem};
pub use product::{Dimensions, NewProduct, Product, ProductChanges};

/// A client-supplied field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} {reason}")]
pub struct InvalidField {
    /// Wire name of the offending field.
    pub field: &'static str,
    /// Human-readable reason, phrased to follow the field name.
    pub reason: String,
}

impl InvalidField {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
