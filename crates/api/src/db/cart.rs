//! Cart queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use pola_core::{CartItemId, ProductId, SessionId, UserId};

use super::{CartStore, PgStore, RepositoryError, stored_session};
use crate::models::{CartItem, CartLine, CartProduct};

const LINE_SELECT: &str = "SELECT ci.id, ci.product_id, ci.quantity, ci.session_id, ci.user_id, \
            ci.created_at, ci.updated_at, \
            p.name AS product_name, p.price AS product_price, \
            p.image_url AS product_image_url, p.stock_quantity AS product_stock_quantity \
     FROM cart_items ci \
     JOIN products p ON p.id = ci.product_id";

/// A cart line joined with its product.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    product_id: i32,
    quantity: i32,
    session_id: String,
    user_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: String,
    product_price: Decimal,
    product_image_url: Option<String>,
    product_stock_quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let product_id = ProductId::new(row.product_id);
        Ok(Self {
            item: CartItem {
                id: CartItemId::new(row.id),
                product_id,
                quantity: row.quantity,
                session_id: stored_session(&row.session_id)?,
                user_id: row.user_id.map(UserId::new),
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            product: CartProduct {
                id: product_id,
                name: row.product_name,
                price: row.product_price,
                image_url: row.product_image_url,
                stock_quantity: row.product_stock_quantity,
            },
        })
    }
}

impl PgStore {
    async fn fetch_line(
        &self,
        id: CartItemId,
        session: &SessionId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        sqlx::query_as::<_, CartLineRow>(&format!(
            "{LINE_SELECT} WHERE ci.id = $1 AND ci.session_id = $2"
        ))
        .bind(id.as_i32())
        .bind(session.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(CartLine::try_from)
        .transpose()
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_lines(&self, session: &SessionId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&format!(
            "{LINE_SELECT} WHERE ci.session_id = $1 ORDER BY ci.created_at ASC, ci.id ASC"
        ))
        .bind(session.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn cart_line(
        &self,
        id: CartItemId,
        session: &SessionId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        self.fetch_line(id, session).await
    }

    async fn cart_line_for_product(
        &self,
        session: &SessionId,
        product: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        sqlx::query_as::<_, CartLineRow>(&format!(
            "{LINE_SELECT} WHERE ci.session_id = $1 AND ci.product_id = $2"
        ))
        .bind(session.as_str())
        .bind(product.as_i32())
        .fetch_optional(&self.pool)
        .await?
        .map(CartLine::try_from)
        .transpose()
    }

    async fn add_cart_item(
        &self,
        session: &SessionId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartLine, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO cart_items (product_id, quantity, session_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (session_id, product_id) DO UPDATE \
             SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = now() \
             RETURNING id",
        )
        .bind(product.as_i32())
        .bind(quantity)
        .bind(session.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Product deleted between the caller's lookup and this insert
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        self.fetch_line(CartItemId::new(id), session)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_cart_quantity(
        &self,
        id: CartItemId,
        session: &SessionId,
        quantity: i32,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE cart_items SET quantity = $3, updated_at = now() \
             WHERE id = $1 AND session_id = $2",
        )
        .bind(id.as_i32())
        .bind(session.as_str())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_line(id, session).await
    }

    async fn delete_cart_item(
        &self,
        id: CartItemId,
        session: &SessionId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND session_id = $2")
            .bind(id.as_i32())
            .bind(session.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, session: &SessionId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
            .bind(session.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
