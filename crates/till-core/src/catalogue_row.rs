//! # Catalogue Rows
//!
//! Mapping between products and the flat rows of the catalogue CSV format.
//!
//! ## Column Order
//! ```text
//! name,sku,purchase_price,selling_price,stock,category,supplier,description,image_path,min_stock
//! └──────────── mandatory ────────────┘ └────────────── optional, blank-tolerant ──────────────┘
//! ```
//!
//! Reading and writing the actual CSV text lives in the application; this
//! module only knows how one row becomes a [`NewProduct`] and back.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{NewProduct, Product};

/// Header of the catalogue CSV, in order.
pub const CATALOGUE_COLUMNS: [&str; 10] = [
    "name",
    "sku",
    "purchase_price",
    "selling_price",
    "stock",
    "category",
    "supplier",
    "description",
    "image_path",
    "min_stock",
];

/// One catalogue row as text. Field order is the column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub purchase_price: String,
    #[serde(default)]
    pub selling_price: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub category: String,
    /// Accepted on import and ignored.
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub min_stock: String,
}

impl CatalogueRow {
    /// Builds the export row for a product. Supplier is always blank.
    pub fn from_product(product: &Product) -> Self {
        CatalogueRow {
            name: product.name.clone(),
            sku: product.sku.clone(),
            purchase_price: product.purchase_price().to_string(),
            selling_price: product.selling_price().to_string(),
            stock: product.stock.to_string(),
            category: product.category.clone().unwrap_or_default(),
            supplier: String::new(),
            description: product.description.clone().unwrap_or_default(),
            image_path: product.image_path.clone().unwrap_or_default(),
            min_stock: product.min_stock.to_string(),
        }
    }

    /// Parses and validates the row into a product input.
    pub fn into_new_product(self) -> Result<NewProduct, ValidationError> {
        let name = required("name", &self.name)?;
        let sku = required("sku", &self.sku)?;
        let purchase_price = Money::parse("purchase_price", required("purchase_price", &self.purchase_price)?)?;
        let selling_price = Money::parse("selling_price", required("selling_price", &self.selling_price)?)?;

        let product = NewProduct {
            name: name.to_string(),
            sku: sku.to_string(),
            purchase_price,
            selling_price,
            stock: optional_count("stock", &self.stock)?,
            category: Some(self.category),
            description: Some(self.description),
            image_path: Some(self.image_path),
            min_stock: optional_count("min_stock", &self.min_stock)?,
        };

        product.validate()
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(value)
}

fn optional_count(field: &str, value: &str) -> Result<i64, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<i64>()
        .map_err(|_| ValidationError::invalid_format(field, format!("'{}' is not a whole number", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(name: &str, sku: &str, purchase: &str, selling: &str) -> CatalogueRow {
        CatalogueRow {
            name: name.to_string(),
            sku: sku.to_string(),
            purchase_price: purchase.to_string(),
            selling_price: selling.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_row_defaults_optional_fields() {
        let product = row("Cola", "A1", "0.60", "1").into_new_product().unwrap();

        assert_eq!(product.purchase_price.cents(), 60);
        assert_eq!(product.selling_price.cents(), 100);
        assert_eq!(product.stock, 0);
        assert_eq!(product.min_stock, 0);
        assert_eq!(product.category, None);
        assert_eq!(product.description, None);
    }

    #[test]
    fn test_missing_mandatory_fields() {
        assert_eq!(
            row("", "A1", "1", "2").into_new_product(),
            Err(ValidationError::required("name"))
        );
        assert_eq!(
            row("Cola", "A1", "1", " ").into_new_product(),
            Err(ValidationError::required("selling_price"))
        );
    }

    #[test]
    fn test_non_numeric_fields() {
        assert!(row("Cola", "A1", "abc", "2").into_new_product().is_err());

        let mut bad_stock = row("Cola", "A1", "1", "2");
        bad_stock.stock = "lots".to_string();
        assert!(matches!(
            bad_stock.into_new_product(),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_supplier_is_ignored() {
        let mut with_supplier = row("Cola", "A1", "1", "2");
        with_supplier.supplier = "ACME".to_string();
        assert!(with_supplier.into_new_product().is_ok());
    }

    #[test]
    fn test_export_row_round_trips() {
        let product = Product {
            id: "p1".to_string(),
            name: "Cola".to_string(),
            sku: "A1".to_string(),
            purchase_price_cents: 60,
            selling_price_cents: 1099,
            stock: 12,
            category_id: Some("c1".to_string()),
            category: Some("Drinks".to_string()),
            description: Some("Can".to_string()),
            image_path: None,
            min_stock: 3,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let exported = CatalogueRow::from_product(&product);
        assert_eq!(exported.selling_price, "10.99");
        assert_eq!(exported.supplier, "");

        let parsed = exported.into_new_product().unwrap();
        assert_eq!(parsed.selling_price.cents(), 1099);
        assert_eq!(parsed.stock, 12);
        assert_eq!(parsed.category.as_deref(), Some("Drinks"));
        assert_eq!(parsed.image_path, None);
        assert_eq!(parsed.min_stock, 3);
    }
}
