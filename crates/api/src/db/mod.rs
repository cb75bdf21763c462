//! Storage for the catalog, carts and orders.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL`, used in production
//! - [`MemoryStore`] - process-local maps, used by tests and
//!   `POLA_STORAGE=memory`
//!
//! Both implement the [`ProductStore`], [`CartStore`] and [`OrderStore`]
//! traits; handlers only ever see `Arc<dyn Store>`.
//!
//! ## Tables
//!
//! - `products` - Catalog, unique `sku`, `stock_quantity >= 0`
//! - `cart_items` - One row per (session, product), cascades on product delete
//! - `orders` - Placed orders with a JSONB snapshot of their lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p pola-cli -- migrate
//! ```

mod cart;
mod memory;
mod orders;
mod products;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use pola_core::{CartItemId, Page, PageRequest, ProductId, SessionId};

use crate::models::{CartLine, NewOrder, NewProduct, Order, Product, ProductChanges};

pub use memory::MemoryStore;
pub use products::escape_like;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique SKU).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Reasons an order could not be placed. Nothing is written in any case.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The product no longer has enough stock for the ordered quantity.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// The product's price changed after the cart was read.
    #[error("price changed for product {0}")]
    PriceChanged(ProductId),

    /// Another order already uses this order number.
    #[error("duplicate order number")]
    DuplicateOrderNumber,

    /// A checked-out cart line was removed or changed quantity.
    #[error("cart changed during checkout")]
    CartChanged,

    /// The storage backend failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Catalog storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, newest first.
    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>, RepositoryError>;

    /// Products whose category matches case-insensitively, by name.
    async fn list_products_by_category(
        &self,
        category: &str,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError>;

    /// Products whose name, description or category contains `query`
    /// (case-insensitive, matched literally), by name.
    async fn search_products(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a product.
    ///
    /// Returns `RepositoryError::Conflict` if the SKU is taken.
    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Merge `changes` into a product. `None` if it does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product and the cart lines referencing it. Returns whether
    /// a product was deleted.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Distinct categories, sorted ascending.
    async fn list_categories(&self) -> Result<Vec<String>, RepositoryError>;

    /// Subtract `quantity` from the stock only if at least that much is
    /// available. Returns whether the subtraction applied.
    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError>;
}

/// Per-session cart storage.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// A session's lines joined with their products, oldest first.
    async fn cart_lines(&self, session: &SessionId) -> Result<Vec<CartLine>, RepositoryError>;

    /// One line, only if it belongs to `session`.
    async fn cart_line(
        &self,
        id: CartItemId,
        session: &SessionId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// The session's line for `product`, if any.
    async fn cart_line_for_product(
        &self,
        session: &SessionId,
        product: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Add `quantity` to the session's line for `product`, creating the line
    /// if needed.
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    async fn add_cart_item(
        &self,
        session: &SessionId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartLine, RepositoryError>;

    /// Overwrite a line's quantity. `None` if the line is not in `session`.
    async fn set_cart_quantity(
        &self,
        id: CartItemId,
        session: &SessionId,
        quantity: i32,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Delete one line. Returns whether it existed in `session`.
    async fn delete_cart_item(
        &self,
        id: CartItemId,
        session: &SessionId,
    ) -> Result<bool, RepositoryError>;

    /// Delete every line in the session. Returns how many were removed.
    async fn clear_cart(&self, session: &SessionId) -> Result<u64, RepositoryError>;
}

/// Order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically place an order: decrement stock for every line (checking
    /// it is still sufficient and the unit price unchanged), insert the
    /// order and remove the checked-out cart lines. Lines added to the cart
    /// after it was read stay there.
    async fn place_order(&self, order: &NewOrder) -> Result<Order, PlaceOrderError>;

    async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Orders placed from `session`, newest first.
    async fn list_orders(&self, session: &SessionId) -> Result<Vec<Order>, RepositoryError>;
}

/// A complete storage backend.
#[async_trait]
pub trait Store: ProductStore + CartStore + OrderStore {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Release resources held by the backend.
    async fn close(&self) {}
}

/// `PostgreSQL` storage backend.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a row count to the `u64` used in [`Page`].
fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

/// `LIMIT`/`OFFSET` bind values for a page request.
fn limit_offset(page: PageRequest) -> (i64, i64) {
    (
        i64::from(page.limit()),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

/// Map a unique-key violation to `Conflict`, everything else to `Database`.
fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Parse a session id read back from the database.
fn stored_session(raw: &str) -> Result<SessionId, RepositoryError> {
    SessionId::parse(raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid session id in database: {e}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset() {
        assert_eq!(limit_offset(PageRequest::new(1, 20).unwrap()), (20, 0));
        assert_eq!(limit_offset(PageRequest::new(4, 5).unwrap()), (5, 15));
    }

    #[test]
    fn test_count_to_u64() {
        assert_eq!(count_to_u64(42), 42);
        assert_eq!(count_to_u64(-1), 0);
    }

    #[test]
    fn test_stored_session_rejects_garbage() {
        assert!(matches!(
            stored_session("nope"),
            Err(RepositoryError::DataCorruption(_))
        ));
        let id = SessionId::generate();
        assert_eq!(stored_session(id.as_str()).unwrap(), id);
    }
}
