//! Cart service.

use thiserror::Error;

use pola_core::{CartItemId, ProductId, SessionId};

use crate::db::{RepositoryError, Store};
use crate::models::{Cart, CartItemUpdate, CartLine, RemovedCartItem};

/// Cart errors.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product with ID {0} not found")]
    ProductNotFound(ProductId),

    #[error("Cart item with ID {0} not found")]
    ItemNotFound(CartItemId),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Insufficient stock. Available: {available}")]
    InsufficientStock { available: i32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Add `quantity` of a product to the session's cart. Adding a product
    /// already in the cart increases that line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for `quantity < 1`,
    /// `CartError::ProductNotFound` for an unknown product, and
    /// `CartError::InsufficientStock` if the line would hold more than the
    /// stock on hand.
    pub async fn add(
        &self,
        session: &SessionId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartLine, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        let in_cart = self
            .store
            .cart_line_for_product(session, product_id)
            .await?
            .map_or(0, |line| line.item.quantity);
        let wanted = in_cart
            .checked_add(quantity)
            .ok_or(CartError::InvalidQuantity)?;
        if !product.has_stock(wanted) {
            tracing::warn!(
                product_id = %product_id,
                requested = wanted,
                available = product.stock_quantity,
                "Add to cart rejected: insufficient stock"
            );
            return Err(CartError::InsufficientStock {
                available: product.stock_quantity,
            });
        }

        self.store
            .add_cart_item(session, product_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::ProductNotFound(product_id),
                other => CartError::Repository(other),
            })
    }

    /// The session's cart with totals.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn get(&self, session: &SessionId) -> Result<Cart, CartError> {
        Ok(Cart::from_lines(self.store.cart_lines(session).await?))
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in the session's
    /// cart and `CartError::InsufficientStock` if the quantity exceeds the
    /// stock on hand.
    pub async fn update(
        &self,
        session: &SessionId,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItemUpdate, CartError> {
        let line = self
            .store
            .cart_line(id, session)
            .await?
            .ok_or(CartError::ItemNotFound(id))?;

        if quantity <= 0 {
            return self.remove(session, id).await.map(CartItemUpdate::Removed);
        }
        if line.product.stock_quantity < quantity {
            return Err(CartError::InsufficientStock {
                available: line.product.stock_quantity,
            });
        }

        self.store
            .set_cart_quantity(id, session, quantity)
            .await?
            .map(CartItemUpdate::Updated)
            .ok_or(CartError::ItemNotFound(id))
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in the session's
    /// cart.
    pub async fn remove(
        &self,
        session: &SessionId,
        id: CartItemId,
    ) -> Result<RemovedCartItem, CartError> {
        if !self.store.delete_cart_item(id, session).await? {
            return Err(CartError::ItemNotFound(id));
        }
        Ok(RemovedCartItem::new(id))
    }

    /// Empty the session's cart. Returns the number of lines removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn clear(&self, session: &SessionId) -> Result<u64, CartError> {
        Ok(self.store.clear_cart(session).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{MemoryStore, ProductStore};
    use crate::models::{NewProduct, Product};

    async fn product(store: &MemoryStore, sku: &str, price: i64, stock: i32) -> Product {
        store
            .create_product(&NewProduct {
                name: format!("Product {sku}"),
                description: String::new(),
                price: Decimal::from(price),
                category: "Parts".to_string(),
                image_url: None,
                specifications: None,
                stock_quantity: stock,
                sku: sku.to_string(),
                weight: None,
                dimensions: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cart_totals() {
        let store = MemoryStore::new();
        let session = SessionId::generate();
        let p1 = product(&store, "P1", 10, 10).await;
        let p2 = product(&store, "P2", 5, 10).await;
        let cart = CartService::new(&store);

        cart.add(&session, p1.id, 2).await.unwrap();
        cart.add(&session, p2.id, 1).await.unwrap();

        let contents = cart.get(&session).await.unwrap();
        assert_eq!(contents.total, Decimal::from(25));
        assert_eq!(contents.item_count, 3);
        let ids: Vec<_> = contents.items.iter().map(|l| l.product.id).collect();
        assert_eq!(ids, vec![p1.id, p2.id]);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity_and_unknown_product() {
        let store = MemoryStore::new();
        let session = SessionId::generate();
        let p = product(&store, "P1", 10, 10).await;
        let cart = CartService::new(&store);

        assert!(matches!(
            cart.add(&session, p.id, 0).await.unwrap_err(),
            CartError::InvalidQuantity
        ));
        assert!(matches!(
            cart.add(&session, ProductId::new(999), 1).await.unwrap_err(),
            CartError::ProductNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_add_checks_combined_quantity() {
        let store = MemoryStore::new();
        let session = SessionId::generate();
        let p = product(&store, "P1", 10, 3).await;
        let cart = CartService::new(&store);

        cart.add(&session, p.id, 2).await.unwrap();
        let err = cart.add(&session, p.id, 2).await.unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 3 }));

        let line = cart.add(&session, p.id, 1).await.unwrap();
        assert_eq!(line.item.quantity, 3);
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_then_not_found() {
        let store = MemoryStore::new();
        let session = SessionId::generate();
        let p = product(&store, "P1", 10, 10).await;
        let cart = CartService::new(&store);
        let line = cart.add(&session, p.id, 2).await.unwrap();

        let update = cart.update(&session, line.item.id, 0).await.unwrap();
        assert!(matches!(update, CartItemUpdate::Removed(r) if r.id == line.item.id));

        let err = cart.update(&session, line.item.id, 0).await.unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_checks_stock() {
        let store = MemoryStore::new();
        let session = SessionId::generate();
        let p = product(&store, "P1", 10, 4).await;
        let cart = CartService::new(&store);
        let line = cart.add(&session, p.id, 1).await.unwrap();

        assert!(matches!(
            cart.update(&session, line.item.id, 5).await.unwrap_err(),
            CartError::InsufficientStock { available: 4 }
        ));
        let CartItemUpdate::Updated(updated) = cart.update(&session, line.item.id, 4).await.unwrap()
        else {
            panic!("expected an updated line");
        };
        assert_eq!(updated.item.quantity, 4);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = MemoryStore::new();
        let session = SessionId::generate();
        let p1 = product(&store, "P1", 10, 10).await;
        let p2 = product(&store, "P2", 10, 10).await;
        let cart = CartService::new(&store);
        let line = cart.add(&session, p1.id, 1).await.unwrap();
        cart.add(&session, p2.id, 1).await.unwrap();

        cart.remove(&session, line.item.id).await.unwrap();
        assert!(matches!(
            cart.remove(&session, line.item.id).await.unwrap_err(),
            CartError::ItemNotFound(_)
        ));
        assert_eq!(cart.clear(&session).await.unwrap(), 1);
        assert_eq!(cart.clear(&session).await.unwrap(), 0);
    }
}
