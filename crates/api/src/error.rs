//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error is rendered as
//! `{"statusCode": 404, "error": "Not Found", "message": "..."}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use pola_core::PaginationError;

use crate::services::{CartError, CatalogError, CheckoutError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Checkout operation failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    error: &'static str,
    message: String,
}

const fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
        CatalogError::DuplicateSku(_) => StatusCode::CONFLICT,
        CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(err) => catalog_status(err),
            Self::Cart(err) => match err {
                CartError::ProductNotFound(_) | CartError::ItemNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CartError::InvalidQuantity | CartError::InsufficientStock { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::Invalid(_)
                | CheckoutError::EmptyCart
                | CheckoutError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
                CheckoutError::PriceChanged(_)
                | CheckoutError::CartChanged
                | CheckoutError::OrderNumberExhausted => StatusCode::CONFLICT,
                CheckoutError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::Catalog(err) => catalog_status(err),
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message shown to the client.
    fn client_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Catalog(CatalogError::Invalid(field))
            | Self::Checkout(CheckoutError::Invalid(field)) => field.to_string(),
            // Don't expose internal error details to clients
            _ if self.status().is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error"),
            message: self.client_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PaginationError> for AppError {
    fn from(err: PaginationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use pola_core::{CartItemId, ProductId};

    use super::*;
    use crate::db::RepositoryError;
    use crate::models::InvalidField;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: impl Into<AppError>) -> StatusCode {
            err.into().into_response().status()
        }

        assert_eq!(
            get_status(CatalogError::NotFound(ProductId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CartError::InsufficientStock { available: 1 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::ItemNotFound(CartItemId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CatalogError::DuplicateSku("X".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(get_status(CheckoutError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(CheckoutError::PriceChanged("Frame".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(PaginationError::PageOutOfRange),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(CheckoutError::CartChanged), StatusCode::CONFLICT);
        assert_eq!(
            get_status(CheckoutError::Catalog(CatalogError::Repository(
                RepositoryError::NotFound
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, json) = body_json(CatalogError::NotFound(ProductId::new(5)).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["error"], "Not Found");
        assert_eq!(json["message"], "Product with ID 5 not found");
    }

    #[tokio::test]
    async fn test_invalid_field_message() {
        let err = CatalogError::Invalid(InvalidField::new("price", "must not be negative"));
        let (_, json) = body_json(err.into()).await;
        assert_eq!(json["message"], "price must not be negative");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = CatalogError::Repository(RepositoryError::DataCorruption(
            "secret table state".to_string(),
        ));
        let (status, json) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal server error");
    }
}
