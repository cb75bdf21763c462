//! Catalog queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::types::Json;

use pola_core::{Page, PageRequest, ProductId};

use super::{PgStore, ProductStore, RepositoryError, conflict_on_unique, count_to_u64, limit_offset};
use crate::models::{Dimensions, NewProduct, Product, ProductChanges};

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, image_url, specifications, \
     stock_quantity, sku, weight, dimensions, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    image_url: Option<String>,
    specifications: Option<Json<Map<String, Value>>>,
    stock_quantity: i32,
    sku: String,
    weight: Option<Decimal>,
    dimensions: Option<Json<Dimensions>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            image_url: row.image_url,
            specifications: row.specifications.map(|Json(map)| map),
            stock_quantity: row.stock_quantity,
            sku: row.sku,
            weight: row.weight,
            dimensions: row.dimensions.map(|Json(dims)| dims),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Escape `%`, `_` and `\` so `value` matches literally inside a `LIKE`
/// pattern using the default `\` escape character.
#[must_use]
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ProductStore for PgStore {
    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>, RepositoryError> {
        let (limit, offset) = limit_offset(page);
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            count_to_u64(total),
            page,
        ))
    }

    async fn list_products_by_category(
        &self,
        category: &str,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError> {
        let (limit, offset) = limit_offset(page);
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE lower(category) = lower($1)")
                .bind(category)
                .fetch_one(&self.pool)
                .await?;
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE lower(category) = lower($1) \
             ORDER BY name ASC, id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            count_to_u64(total),
            page,
        ))
    }

    async fn search_products(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError> {
        let (limit, offset) = limit_offset(page);
        let pattern = format!("%{}%", escape_like(query));
        let filter = "name ILIKE $1 OR description ILIKE $1 OR category ILIKE $1";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {filter}"))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {filter} \
             ORDER BY name ASC, id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            count_to_u64(total),
            page,
        ))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products \
             (name, description, price, category, image_url, specifications, \
              stock_quantity, sku, weight, dimensions) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.image_url)
        .bind(product.specifications.as_ref().map(Json))
        .bind(product.stock_quantity)
        .bind(&product.sku)
        .bind(product.weight)
        .bind(product.dimensions.map(Json))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a product with this SKU"))?;

        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                price = COALESCE($4, price), \
                category = COALESCE($5, category), \
                image_url = COALESCE($6, image_url), \
                specifications = COALESCE($7, specifications), \
                stock_quantity = COALESCE($8, stock_quantity), \
                weight = COALESCE($9, weight), \
                dimensions = COALESCE($10, dimensions), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.price)
        .bind(&changes.category)
        .bind(&changes.image_url)
        .bind(changes.specifications.as_ref().map(Json))
        .bind(changes.stock_quantity)
        .bind(changes.weight)
        .bind(changes.dimensions.map(Json))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        // cart_items.product_id is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(categories)
    }

    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = now() \
             WHERE id = $1 AND stock_quantity >= $2",
        )
        .bind(id.as_i32())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
