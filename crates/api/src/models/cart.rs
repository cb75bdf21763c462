//! Shopping cart types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pola_core::{CartItemId, ProductId, SessionId, UserId};

use super::Product;

/// A stored cart line: one product in one session's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    /// Always at least 1; a line whose quantity would drop below that is
    /// deleted instead.
    pub quantity: i32,
    pub session_id: SessionId,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The live product data shown alongside a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            stock_quantity: product.stock_quantity,
        }
    }
}

/// A cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: CartProduct,
}

impl CartLine {
    /// `price × quantity` at the product's current price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.item.quantity)
    }
}

/// A session's cart with derived totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub total: Decimal,
    pub item_count: i64,
}

impl Cart {
    /// Derive totals from the lines.
    #[must_use]
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let total = items.iter().map(CartLine::line_total).sum();
        let item_count = items.iter().map(|line| i64::from(line.item.quantity)).sum();
        Self {
            items,
            total,
            item_count,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Body returned when a cart line is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedCartItem {
    pub id: CartItemId,
    pub removed: bool,
}

impl RemovedCartItem {
    #[must_use]
    pub const fn new(id: CartItemId) -> Self {
        Self { id, removed: true }
    }
}

/// Outcome of setting a cart line's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CartItemUpdate {
    Updated(CartLine),
    Removed(RemovedCartItem),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, price: Decimal, quantity: i32) -> CartLine {
        let now = Utc::now();
        CartLine {
            item: CartItem {
                id: CartItemId::new(id),
                product_id: ProductId::new(id),
                quantity,
                session_id: SessionId::generate(),
                user_id: None,
                created_at: now,
                updated_at: now,
            },
            product: CartProduct {
                id: ProductId::new(id),
                name: format!("Product {id}"),
                price,
                image_url: None,
                stock_quantity: 100,
            },
        }
    }

    #[test]
    fn test_totals() {
        let cart = Cart::from_lines(vec![
            line(1, Decimal::from(10), 2),
            line(2, Decimal::from(5), 1),
        ]);
        assert_eq!(cart.total, Decimal::from(25));
        assert_eq!(cart.item_count, 3);
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let cart = Cart::from_lines(Vec::new());
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
        assert_eq!(cart.item_count, 0);
    }

    #[test]
    fn test_line_serializes_flat_with_product() {
        let json = serde_json::to_value(line(7, Decimal::new(4599, 2), 2)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["productId"], 7);
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["product"]["price"], "45.99");
        assert!(json["sessionId"].is_string());
    }

    #[test]
    fn test_removed_update_shape() {
        let update = CartItemUpdate::Removed(RemovedCartItem::new(CartItemId::new(3)));
        let json = serde_json::to_value(update).unwrap();
        assert_eq!(json, serde_json::json!({"id": 3, "removed": true}));
    }
}
