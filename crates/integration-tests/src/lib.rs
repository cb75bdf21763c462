//! Integration test harness for the Pola API.
//!
//! Drives the full router (middleware included) in-process over a
//! [`MemoryStore`], so no database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pola-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog` - Products, categories and pagination
//! - `cart` - Session carts and the session cookie
//! - `checkout` - Orders, stock and concurrency

#![allow(clippy::missing_panics_doc)]

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use pola_api::config::ApiConfig;
use pola_api::db::MemoryStore;
use pola_api::middleware::SESSION_COOKIE_NAME;
use pola_api::state::AppState;
use pola_core::SessionId;

/// Response captured from the router.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// JSON body, `Value::String` for plain text, `Value::Null` when empty.
    pub body: Value,
}

impl TestResponse {
    /// Value of the session cookie set by this response, if any.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        let prefix = format!("{SESSION_COOKIE_NAME}=");
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix(prefix.as_str()))
            .map(|rest| rest.split(';').next().unwrap_or_default().to_owned())
    }

    /// Raw `Set-Cookie` header, if any.
    #[must_use]
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }
}

/// The application under test.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Fresh app over an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        let state = AppState::new(ApiConfig::in_memory(), Arc::new(MemoryStore::new()));
        Self {
            router: pola_api::app(state),
        }
    }

    /// Send a request without any session.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.send_with(method, uri, body, HeaderMap::new()).await
    }

    /// Send a request carrying `session` in the session cookie.
    pub async fn send_as(
        &self,
        session: &SessionId,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("{SESSION_COOKIE_NAME}={session}")
                .parse()
                .expect("valid cookie header"),
        );
        self.send_with(method, uri, body, headers).await
    }

    /// Send a request with explicit headers.
    pub async fn send_with(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Create a product and return its JSON.
    pub async fn create_product(
        &self,
        name: &str,
        category: &str,
        price: &str,
        stock: i32,
    ) -> Value {
        let sku = format!("SKU-{}", name.to_uppercase().replace(' ', "-"));
        let response = self
            .send(
                Method::POST,
                "/api/products",
                Some(json!({
                    "name": name,
                    "description": format!("{name} for testing"),
                    "price": price,
                    "category": category,
                    "stockQuantity": stock,
                    "sku": sku,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }

    /// Add a product to `session`'s cart.
    pub async fn add_to_cart(
        &self,
        session: &SessionId,
        product_id: i64,
        quantity: i32,
    ) -> TestResponse {
        self.send_as(
            session,
            Method::POST,
            "/api/cart",
            Some(json!({ "productId": product_id, "quantity": quantity })),
        )
        .await
    }
}

/// Read a decimal serialized as a JSON string or number.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}

/// Product id from a product JSON body.
#[must_use]
pub fn id_of(value: &Value) -> i64 {
    value
        .get("id")
        .and_then(Value::as_i64)
        .expect("numeric id")
}

/// Valid checkout body.
#[must_use]
pub fn checkout_body() -> Value {
    json!({
        "customerName": "Ada Lovelace",
        "customerEmail": "ada@example.com",
        "shippingAddress": "12 Analytical Way, London",
    })
}
