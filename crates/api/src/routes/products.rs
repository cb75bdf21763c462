//! Product route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use pola_core::{Page, PageRequest, ProductId};

use super::{ApiJson, ApiPath, ApiQuery};
use crate::error::Result;
use crate::models::{NewProduct, Product, ProductChanges};
use crate::services::{CatalogService, ProductFilter};
use crate::state::AppState;

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// List products, filtered by category or search term.
#[instrument(skip_all, fields(category = ?query.category, search = ?query.search))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let page = PageRequest::from_query(query.page, query.limit)?;
    let filter = ProductFilter::from_query(query.category.as_deref(), query.search.as_deref());
    let products = CatalogService::new(state.store()).list(&filter, page).await?;
    Ok(Json(products))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(CatalogService::new(state.store()).get(id).await?))
}

/// Create a product.
#[instrument(skip_all, fields(sku = %product.sku))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(product): ApiJson<NewProduct>,
) -> Result<impl IntoResponse> {
    let created = CatalogService::new(state.store()).create(&product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Partially update a product.
#[instrument(skip(state, changes))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> Result<Json<Product>> {
    Ok(Json(
        CatalogService::new(state.store()).update(id, &changes).await?,
    ))
}

/// Delete a product.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    CatalogService::new(state.store()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Distinct product categories.
#[instrument(skip_all)]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(CatalogService::new(state.store()).categories().await?))
}
