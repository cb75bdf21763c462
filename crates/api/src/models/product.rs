//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pola_core::ProductId;

use super::InvalidField;

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_url: Option<String>,
    /// Free-form technical specifications (e.g. `{"kv": 470}`).
    pub specifications: Option<Map<String, Value>>,
    pub stock_quantity: i32,
    pub sku: String,
    /// Weight in grams.
    pub weight: Option<Decimal>,
    pub dimensions: Option<Dimensions>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can currently be sold.
    #[must_use]
    pub const fn has_stock(&self, quantity: i32) -> bool {
        self.stock_quantity >= quantity
    }
}

/// Physical dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

impl Dimensions {
    fn validate(&self) -> Result<(), InvalidField> {
        if self.length.is_sign_negative()
            || self.width.is_sign_negative()
            || self.height.is_sign_negative()
        {
            return Err(InvalidField::new("dimensions", "must not be negative"));
        }
        Ok(())
    }
}

/// Payload for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub specifications: Option<Map<String, Value>>,
    pub stock_quantity: i32,
    pub sku: String,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

impl NewProduct {
    /// Check every field against the catalog rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidField`] found.
    pub fn validate(&self) -> Result<(), InvalidField> {
        require_text("name", &self.name, NAME_MAX_CHARS)?;
        require_text("category", &self.category, CATEGORY_MAX_CHARS)?;
        require_text("sku", &self.sku, SKU_MAX_CHARS)?;
        require_price(self.price)?;
        require_non_negative_stock(self.stock_quantity)?;
        if let Some(url) = &self.image_url {
            require_http_url(url)?;
        }
        if let Some(weight) = self.weight {
            require_weight(weight)?;
        }
        if let Some(dimensions) = &self.dimensions {
            dimensions.validate()?;
        }
        Ok(())
    }
}

/// Partial update for a product. Absent fields are left untouched; the SKU
/// cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub specifications: Option<Map<String, Value>>,
    #[serde(default)]
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

impl ProductChanges {
    /// Check the supplied fields against the catalog rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidField`] found.
    pub fn validate(&self) -> Result<(), InvalidField> {
        if let Some(name) = &self.name {
            require_text("name", name, NAME_MAX_CHARS)?;
        }
        if let Some(category) = &self.category {
            require_text("category", category, CATEGORY_MAX_CHARS)?;
        }
        if let Some(price) = self.price {
            require_price(price)?;
        }
        if let Some(stock) = self.stock_quantity {
            require_non_negative_stock(stock)?;
        }
        if let Some(url) = &self.image_url {
            require_http_url(url)?;
        }
        if let Some(weight) = self.weight {
            require_weight(weight)?;
        }
        if let Some(dimensions) = &self.dimensions {
            dimensions.validate()?;
        }
        Ok(())
    }

    /// Merge the supplied fields into `product`.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = &self.category {
            product.category.clone_from(category);
        }
        if let Some(url) = &self.image_url {
            product.image_url = Some(url.clone());
        }
        if let Some(specifications) = &self.specifications {
            product.specifications = Some(specifications.clone());
        }
        if let Some(stock) = self.stock_quantity {
            product.stock_quantity = stock;
        }
        if let Some(weight) = self.weight {
            product.weight = Some(weight);
        }
        if let Some(dimensions) = self.dimensions {
            product.dimensions = Some(dimensions);
        }
    }
}

/// Column widths, in characters.
const NAME_MAX_CHARS: usize = 255;
const CATEGORY_MAX_CHARS: usize = 100;
const SKU_MAX_CHARS: usize = 100;
const IMAGE_URL_MAX_CHARS: usize = 500;

/// Digits before the decimal point; both amounts keep two after it.
const PRICE_INTEGER_DIGITS: u32 = 8;
const WEIGHT_INTEGER_DIGITS: u32 = 6;
const AMOUNT_SCALE: u32 = 2;

fn require_text(field: &'static str, value: &str, max_chars: usize) -> Result<(), InvalidField> {
    if value.trim().is_empty() {
        return Err(InvalidField::new(field, "must not be empty"));
    }
    require_max_chars(field, value, max_chars)
}

fn require_max_chars(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), InvalidField> {
    if value.chars().count() > max_chars {
        return Err(InvalidField::new(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(())
}

fn require_amount(
    field: &'static str,
    value: Decimal,
    integer_digits: u32,
) -> Result<(), InvalidField> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(InvalidField::new(field, "must not be negative"));
    }
    let limit = Decimal::from(10_i64.pow(integer_digits));
    if value >= limit {
        return Err(InvalidField::new(field, format!("must be less than {limit}")));
    }
    if value.normalize().scale() > AMOUNT_SCALE {
        return Err(InvalidField::new(
            field,
            format!("must have at most {AMOUNT_SCALE} decimal places"),
        ));
    }
    Ok(())
}

fn require_price(price: Decimal) -> Result<(), InvalidField> {
    require_amount("price", price, PRICE_INTEGER_DIGITS)
}

fn require_weight(weight: Decimal) -> Result<(), InvalidField> {
    require_amount("weight", weight, WEIGHT_INTEGER_DIGITS)
}

fn require_non_negative_stock(stock: i32) -> Result<(), InvalidField> {
    if stock < 0 {
        return Err(InvalidField::new("stockQuantity", "must not be negative"));
    }
    Ok(())
}

fn require_http_url(value: &str) -> Result<(), InvalidField> {
    require_max_chars("imageUrl", value, IMAGE_URL_MAX_CHARS)?;
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(InvalidField::new("imageUrl", "must be an absolute http(s) URL")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn frame_kit() -> NewProduct {
        NewProduct {
            name: "DJI F450 Frame Kit".to_string(),
            description: "Carbon fiber frame kit".to_string(),
            price: Decimal::new(8999, 2),
            category: "Frames".to_string(),
            image_url: Some("https://images.example.com/f450.jpg".to_string()),
            specifications: None,
            stock_quantity: 15,
            sku: "DJI-F450-KIT".to_string(),
            weight: Some(Decimal::from(280)),
            dimensions: Some(Dimensions {
                length: Decimal::from(450),
                width: Decimal::from(450),
                height: Decimal::from(50),
            }),
        }
    }

    #[test]
    fn test_valid_product_passes() {
        assert!(frame_kit().validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut product = frame_kit();
        product.name = "   ".to_string();
        let err = product.validate().unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut product = frame_kit();
        product.price = Decimal::new(-1, 2);
        assert_eq!(product.validate().unwrap_err().field, "price");
    }

    #[test]
    fn test_price_must_fit_column() {
        let mut product = frame_kit();
        product.price = Decimal::new(9_999_999_999, 2);
        assert!(product.validate().is_ok());

        product.price = Decimal::from(100_000_000);
        let err = product.validate().unwrap_err();
        assert_eq!(err.field, "price");
        assert_eq!(err.reason, "must be less than 100000000");

        product.price = Decimal::new(1999, 3);
        let err = product.validate().unwrap_err();
        assert_eq!(err.field, "price");
        assert_eq!(err.reason, "must have at most 2 decimal places");
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_decimal_places() {
        let mut product = frame_kit();
        product.price = Decimal::new(19_900, 3);
        product.weight = Some(Decimal::new(2_800_000, 4));
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_weight_must_fit_column() {
        let mut product = frame_kit();
        product.weight = Some(Decimal::from(1_000_000));
        assert_eq!(product.validate().unwrap_err().field, "weight");

        product.weight = Some(Decimal::new(1, 3));
        assert_eq!(product.validate().unwrap_err().field, "weight");
    }

    #[test]
    fn test_text_lengths_limited() {
        let mut product = frame_kit();
        product.name = "n".repeat(255);
        product.category = "c".repeat(100);
        product.sku = "s".repeat(100);
        assert!(product.validate().is_ok());

        product.name = "n".repeat(256);
        let err = product.validate().unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.reason, "must be at most 255 characters");

        let mut product = frame_kit();
        product.category = "c".repeat(101);
        assert_eq!(product.validate().unwrap_err().field, "category");

        let mut product = frame_kit();
        product.sku = "s".repeat(101);
        assert_eq!(product.validate().unwrap_err().field, "sku");

        // Counted in characters, not bytes
        let mut product = frame_kit();
        product.name = "é".repeat(255);
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_long_image_url_rejected() {
        let mut product = frame_kit();
        let url = format!("https://images.example.com/{}.jpg", "a".repeat(480));
        product.image_url = Some(url);
        let err = product.validate().unwrap_err();
        assert_eq!(err.field, "imageUrl");
        assert_eq!(err.reason, "must be at most 500 characters");
    }

    #[test]
    fn test_negative_stock_rejected() {
        let mut product = frame_kit();
        product.stock_quantity = -1;
        assert_eq!(product.validate().unwrap_err().field, "stockQuantity");
    }

    #[test]
    fn test_relative_image_url_rejected() {
        let mut product = frame_kit();
        product.image_url = Some("/img/f450.jpg".to_string());
        assert_eq!(product.validate().unwrap_err().field, "imageUrl");
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let mut product = frame_kit();
        product.dimensions = Some(Dimensions {
            length: Decimal::from(-1),
            width: Decimal::ONE,
            height: Decimal::ONE,
        });
        assert_eq!(product.validate().unwrap_err().field, "dimensions");
    }

    #[test]
    fn test_deserialize_camel_case_with_numeric_price() {
        let json = r#"{
            "name": "Motor",
            "description": "Brushless",
            "price": 45.99,
            "category": "Motors",
            "stockQuantity": 25,
            "sku": "TM-MN3110-470"
        }"#;
        let product: NewProduct = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Decimal::new(4599, 2));
        assert_eq!(product.stock_quantity, 25);
        assert!(product.image_url.is_none());
    }

    #[test]
    fn test_changes_apply_only_supplied_fields() {
        let now = Utc::now();
        let mut product = Product {
            id: ProductId::new(1),
            name: "Old".to_string(),
            description: "Desc".to_string(),
            price: Decimal::from(10),
            category: "Frames".to_string(),
            image_url: None,
            specifications: None,
            stock_quantity: 3,
            sku: "SKU-1".to_string(),
            weight: None,
            dimensions: None,
            created_at: now,
            updated_at: now,
        };
        let changes = ProductChanges {
            name: Some("New".to_string()),
            stock_quantity: Some(9),
            ..ProductChanges::default()
        };
        assert!(changes.validate().is_ok());
        changes.apply(&mut product);

        assert_eq!(product.name, "New");
        assert_eq!(product.stock_quantity, 9);
        assert_eq!(product.description, "Desc");
        assert_eq!(product.price, Decimal::from(10));
        assert_eq!(product.sku, "SKU-1");
    }

    #[test]
    fn test_changes_validate_supplied_fields() {
        let changes = ProductChanges {
            price: Some(Decimal::from(-5)),
            ..ProductChanges::default()
        };
        assert_eq!(changes.validate().unwrap_err().field, "price");

        let changes = ProductChanges {
            name: Some("n".repeat(256)),
            ..ProductChanges::default()
        };
        assert_eq!(changes.validate().unwrap_err().field, "name");

        let changes = ProductChanges {
            weight: Some(Decimal::new(12_345, 3)),
            ..ProductChanges::default()
        };
        assert_eq!(changes.validate().unwrap_err().field, "weight");
    }

    #[test]
    fn test_has_stock() {
        let mut product_json = serde_json::to_value(frame_kit()).unwrap();
        product_json["id"] = 1.into();
        product_json["createdAt"] = "2026-01-01T00:00:00Z".into();
        product_json["updatedAt"] = "2026-01-01T00:00:00Z".into();
        let product: Product = serde_json::from_value(product_json).unwrap();
        assert!(product.has_stock(15));
        assert!(!product.has_stock(16));
    }
}
