//! Business logic services.
//!
//! # Services
//!
//! - `catalog` - Product lookup, search and maintenance
//! - `cart` - Per-session cart with stock checks
//! - `checkout` - Turns a cart into an order
//!
//! Services borrow the store for the duration of one request:
//!
//! ```rust,ignore
//! let cart = CartService::new(state.store()).get(&session).await?;
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;

pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService, ProductFilter};
pub use checkout::{CheckoutError, CheckoutService};
