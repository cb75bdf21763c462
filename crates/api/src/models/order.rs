//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pola_core::{CartItemId, Email, OrderId, OrderStatus, ProductId, SessionId, UserId};

use super::{CartLine, InvalidField};

/// One line of an order, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    /// Unit price at checkout.
    pub price: Decimal,
    pub total: Decimal,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id,
            product_name: line.product.name.clone(),
            quantity: line.item.quantity,
            price: line.product.price,
            total: line.line_total(),
        }
    }
}

/// A cart line as it was when checkout read the cart.
///
/// Placing the order consumes exactly these lines. If any of them has been
/// removed or had its quantity changed since, the order is not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckedOutLine {
    pub cart_item_id: CartItemId,
    pub quantity: i32,
}

impl From<&CartLine> for CheckedOutLine {
    fn from(line: &CartLine) -> Self {
        Self {
            cart_item_id: line.item.id,
            quantity: line.item.quantity,
        }
    }
}

/// A placed order. Only `status` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub shipping_address: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub session_id: SessionId,
    pub user_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Email,
    pub shipping_address: String,
    pub total: Decimal,
    pub session_id: SessionId,
    pub items: Vec<OrderItem>,
    /// Cart lines this order consumes.
    pub lines: Vec<CheckedOutLine>,
}

/// Checkout request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
}

/// Customer details after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Email,
    pub shipping_address: String,
}

impl CheckoutRequest {
    /// Trim and validate the customer details.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidField`] for a blank name or address or a malformed
    /// email.
    pub fn validate(&self) -> Result<CustomerDetails, InvalidField> {
        let name = self.customer_name.trim();
        if name.is_empty() {
            return Err(InvalidField::new("customerName", "must not be empty"));
        }
        let shipping_address = self.shipping_address.trim();
        if shipping_address.is_empty() {
            return Err(InvalidField::new("shippingAddress", "must not be empty"));
        }
        let email = Email::parse(&self.customer_email)
            .map_err(|e| InvalidField::new("customerEmail", e.to_string()))?;

        Ok(CustomerDetails {
            name: name.to_string(),
            email,
            shipping_address: shipping_address.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "  Ada Lovelace ".to_string(),
            customer_email: "ada@example.com".to_string(),
            shipping_address: "1 Analytical Way, London".to_string(),
        }
    }

    #[test]
    fn test_validate_trims() {
        let details = request().validate().unwrap();
        assert_eq!(details.name, "Ada Lovelace");
        assert_eq!(details.email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let mut req = request();
        req.customer_name = " ".to_string();
        assert_eq!(req.validate().unwrap_err().field, "customerName");
    }

    #[test]
    fn test_validate_rejects_blank_address() {
        let mut req = request();
        req.shipping_address = String::new();
        assert_eq!(req.validate().unwrap_err().field, "shippingAddress");
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let mut req = request();
        req.customer_email = "ada.example.com".to_string();
        assert_eq!(req.validate().unwrap_err().field, "customerEmail");
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{"customerName":"A","customerEmail":"a@b.co","shippingAddress":"X"}"#;
        let req: CheckoutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.customer_email, "a@b.co");
    }
}
