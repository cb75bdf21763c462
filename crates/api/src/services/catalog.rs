//! Catalog service.

use thiserror::Error;

use pola_core::{Page, PageRequest, ProductId};

use crate::db::{RepositoryError, Store};
use crate::models::{InvalidField, NewProduct, Product, ProductChanges};

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product with ID {0} not found")]
    NotFound(ProductId),

    #[error("Invalid product: {0}")]
    Invalid(#[from] InvalidField),

    #[error("A product with SKU {0} already exists")]
    DuplicateSku(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// How a product listing is filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductFilter {
    All,
    Category(String),
    Search(String),
}

impl ProductFilter {
    /// Build a filter from query parameters. A category wins over a search
    /// term; blank values are ignored.
    #[must_use]
    pub fn from_query(category: Option<&str>, search: Option<&str>) -> Self {
        fn non_blank(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }

        if let Some(category) = non_blank(category) {
            return Self::Category(category.to_owned());
        }
        if let Some(search) = non_blank(search) {
            return Self::Search(search.to_owned());
        }
        Self::All
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// List products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, CatalogError> {
        let products = match filter {
            ProductFilter::All => self.store.list_products(page).await?,
            ProductFilter::Category(category) => {
                self.store.list_products_by_category(category, page).await?
            }
            ProductFilter::Search(query) => self.store.search_products(query, page).await?,
        };
        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no such product exists.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a failed field check and
    /// `CatalogError::DuplicateSku` if the SKU is taken.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, CatalogError> {
        product.validate()?;
        let created = self.store.create_product(product).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => CatalogError::DuplicateSku(product.sku.clone()),
            other => CatalogError::Repository(other),
        })?;
        tracing::info!(product_id = %created.id, sku = %created.sku, "Product created");
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a failed field check and
    /// `CatalogError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Product, CatalogError> {
        changes.validate()?;
        self.store
            .update_product(id, changes)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// Delete a product and any cart lines holding it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if !self.store.delete_product(id).await? {
            return Err(CatalogError::NotFound(id));
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Distinct categories, sorted.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    /// Whether `quantity` units of a product are in stock. Unknown products
    /// have no stock.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn check_stock(&self, id: ProductId, quantity: i32) -> Result<bool, CatalogError> {
        Ok(self
            .store
            .get_product(id)
            .await?
            .is_some_and(|p| p.has_stock(quantity)))
    }

    /// Take `quantity` units out of stock if that many are available.
    /// Returns whether the stock changed.
    ///
    /// Stock adjustments outside checkout go through here. Order placement
    /// decrements inside its own transaction instead.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn decrement_stock(&self, id: ProductId, quantity: i32) -> Result<bool, CatalogError> {
        Ok(self.store.decrement_stock(id, quantity).await?)
    }
}
