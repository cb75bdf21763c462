//! Seed the catalog from a YAML file.
//!
//! The file holds a `products` list whose entries use the same field names
//! as the `POST /api/products` body. Every entry is validated before the
//! database is touched.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use pola_api::db::{self, PgStore, ProductStore, RepositoryError};
use pola_api::models::NewProduct;

/// Parsed seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<NewProduct>,
}

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub skipped: usize,
}

/// Parse a seed file's contents.
///
/// # Errors
///
/// Returns the YAML error if the document does not match [`SeedFile`].
pub fn parse(content: &str) -> Result<SeedFile, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Collect every problem in the seed file, each prefixed with the SKU (or
/// list position) it belongs to.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut skus = HashSet::new();

    for (index, product) in seed.products.iter().enumerate() {
        let label = if product.sku.trim().is_empty() {
            format!("products[{index}]")
        } else {
            product.sku.clone()
        };
        if let Err(e) = product.validate() {
            errors.push(format!("{label}: {e}"));
        }
        if !skus.insert(product.sku.as_str()) {
            errors.push(format!("{label}: duplicate sku"));
        }
    }

    errors
}

/// Insert products from `file_path`.
///
/// Without `clear_existing` nothing is inserted when the catalog already
/// has products.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or fails validation, or a database operation fails.
pub async fn products(
    file_path: &str,
    clear_existing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed = parse(&content)?;

    info!(products = seed.products.len(), "Parsed seed file");

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let database_url = super::database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    if clear_existing {
        let deleted = delete_all(&pool).await?;
        info!(deleted, "Cleared existing products");
    } else {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&pool)
            .await?;
        if existing > 0 {
            info!(existing, "Products already exist, skipping seeding (use --clear to replace)");
            return Ok(());
        }
    }

    let store = PgStore::new(pool);
    let result = insert_all(&store, &seed.products).await?;

    info!("Seeding complete!");
    info!("  Products inserted: {}", result.inserted);
    info!("  Products skipped (sku exists): {}", result.skipped);

    store.pool().close().await;
    Ok(())
}

/// Delete every product. Cart lines referencing them cascade.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the delete fails.
pub async fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;
    let pool = db::create_pool(&database_url).await?;

    let deleted = delete_all(&pool).await?;
    info!(deleted, "Cleared products");

    pool.close().await;
    Ok(())
}

async fn delete_all(pool: &sqlx::PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Insert products one by one, skipping SKUs that already exist.
async fn insert_all(
    store: &dyn ProductStore,
    products: &[NewProduct],
) -> Result<SeedResult, RepositoryError> {
    let mut result = SeedResult::default();

    for product in products {
        match store.create_product(product).await {
            Ok(created) => {
                info!(id = %created.id, sku = %created.sku, "Inserted product");
                result.inserted += 1;
            }
            Err(RepositoryError::Conflict(msg)) => {
                warn!(%msg, "Skipping product");
                result.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(result)
}
