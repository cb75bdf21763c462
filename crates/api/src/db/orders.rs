//! Order queries, including atomic order placement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use pola_core::{Email, OrderId, OrderStatus, SessionId, UserId};

use super::{OrderStore, PgStore, PlaceOrderError, RepositoryError, stored_session};
use crate::models::{NewOrder, Order, OrderItem};

const ORDER_COLUMNS: &str = "id, order_number, customer_name, customer_email, shipping_address, \
     total, status, session_id, user_id, items, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    customer_name: String,
    customer_email: String,
    shipping_address: String,
    total: Decimal,
    status: OrderStatus,
    session_id: String,
    user_id: Option<i32>,
    items: Json<Vec<OrderItem>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let customer_email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            order_number: row.order_number,
            customer_name: row.customer_name,
            customer_email,
            shipping_address: row.shipping_address,
            total: row.total,
            status: row.status,
            session_id: stored_session(&row.session_id)?,
            user_id: row.user_id.map(UserId::new),
            items: row.items.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, order: &NewOrder) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        // Consume exactly the lines checkout read. The row locks taken here
        // hold off concurrent edits to those lines until commit.
        let (ids, quantities): (Vec<i32>, Vec<i32>) = order
            .lines
            .iter()
            .map(|line| (line.cart_item_id.as_i32(), line.quantity))
            .unzip();
        let deleted = sqlx::query(
            "DELETE FROM cart_items c \
             USING unnest($2::int4[], $3::int4[]) AS s(id, quantity) \
             WHERE c.session_id = $1 AND c.id = s.id AND c.quantity = s.quantity",
        )
        .bind(order.session_id.as_str())
        .bind(&ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if usize::try_from(deleted).ok() != Some(order.lines.len()) {
            return Err(PlaceOrderError::CartChanged);
        }

        for item in &order.items {
            let current_price: Option<Decimal> = sqlx::query_scalar(
                "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now() \
                 WHERE id = $1 AND stock_quantity >= $2 \
                 RETURNING price",
            )
            .bind(item.product_id.as_i32())
            .bind(item.quantity)
            .fetch_optional(&mut *tx)
            .await?;

            match current_price {
                None => return Err(PlaceOrderError::InsufficientStock(item.product_id)),
                Some(price) if price != item.price => {
                    return Err(PlaceOrderError::PriceChanged(item.product_id));
                }
                Some(_) => {}
            }
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders \
             (order_number, customer_name, customer_email, shipping_address, total, \
              status, session_id, items) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.order_number)
        .bind(&order.customer_name)
        .bind(order.customer_email.as_str())
        .bind(&order.shipping_address)
        .bind(order.total)
        .bind(OrderStatus::Pending)
        .bind(order.session_id.as_str())
        .bind(Json(&order.items))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return PlaceOrderError::DuplicateOrderNumber;
            }
            PlaceOrderError::from(e)
        })?;

        let placed = Order::try_from(row)?;
        tx.commit().await?;

        Ok(placed)
    }

    async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn list_orders(&self, session: &SessionId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE session_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(session.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }
}
