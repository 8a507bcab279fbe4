//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │ InventoryLog    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  product_id     │       │
//! │  │  sku (business) │   │  receipt_number │   │  delta (signed) │       │
//! │  │  prices (cents) │   │  total_cents    │   │  reason         │       │
//! │  │  stock          │   │  cashier        │   │  reference_id   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │      Role       │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Admin          │   │  Cash           │       │
//! │  │  700 = 7.00%    │   │  Manager        │   │  Card           │       │
//! │  └─────────────────┘   │  Cashier        │   │  Mobile         │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, username, receipt_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 700 bps = 7.00%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage such as `8.25`.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Role
// =============================================================================

/// A user's role.
///
/// Roles do not nest or inherit: every permission check below is a plain
/// comparison on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management.
    Admin,
    /// Catalogue and reports.
    Manager,
    /// Sales only.
    Cashier,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Cashier];

    /// Lowercase name as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }

    pub const fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Products, categories, stock adjustments, CSV import/export.
    pub const fn can_manage_catalogue(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    pub const fn can_view_reports(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    pub const fn can_sell(&self) -> bool {
        match self {
            Role::Admin | Role::Manager | Role::Cashier => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Mobile wallet payment.
    Mobile,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Mobile];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "mobile" => Ok(PaymentMethod::Mobile),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Inventory Reason
// =============================================================================

/// Why a stock level changed.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryReason {
    /// Stock left with a finalized sale.
    Sale,
    /// Manual restock, write-off or stock edit.
    Adjustment,
    /// Stock arrived through a CSV import.
    Import,
}

impl InventoryReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InventoryReason::Sale => "sale",
            InventoryReason::Adjustment => "adjustment",
            InventoryReason::Import => "import",
        }
    }
}

impl fmt::Display for InventoryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: String,
    /// Unique, case-sensitive name.
    pub name: String,
    pub description: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    /// What the shop paid per unit, in cents.
    pub purchase_price_cents: i64,

    /// What the customer pays per unit, in cents.
    pub selling_price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    pub category_id: Option<String>,

    /// Category name, joined in by the repository.
    pub category: Option<String>,

    pub description: Option<String>,

    pub image_path: Option<String>,

    /// Low-stock threshold.
    pub min_stock: i64,

    /// False once archived.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// At or below the restock threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub stock: i64,
    /// Category name; created when unknown.
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub min_stock: i64,
}

impl NewProduct {
    /// Creates a product input with the mandatory fields; the rest default
    /// to empty / zero.
    pub fn new(
        name: impl Into<String>,
        sku: impl Into<String>,
        purchase_price: Money,
        selling_price: Money,
    ) -> Self {
        NewProduct {
            name: name.into(),
            sku: sku.into(),
            purchase_price,
            selling_price,
            stock: 0,
            category: None,
            description: None,
            image_path: None,
            min_stock: 0,
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_min_stock(mut self, min_stock: i64) -> Self {
        self.min_stock = min_stock;
        self
    }

    /// Validates every field and normalizes whitespace.
    ///
    /// Blank optional strings become `None`.
    pub fn validate(mut self) -> Result<NewProduct, ValidationError> {
        self.name = self.name.trim().to_string();
        self.sku = self.sku.trim().to_string();

        validation::validate_product_name(&self.name)?;
        validation::validate_sku(&self.sku)?;
        validation::validate_price_cents("purchase_price", self.purchase_price.cents())?;
        validation::validate_price_cents("selling_price", self.selling_price.cents())?;
        validation::validate_stock("stock", self.stock)?;
        validation::validate_stock("min_stock", self.min_stock)?;

        self.category = non_blank(self.category);
        self.description = non_blank(self.description);
        self.image_path = non_blank(self.image_path);

        Ok(self)
    }
}

/// Partial update of a product. `None` leaves a field unchanged.
///
/// For `category`, `description` and `image_path`, `Some("")` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub purchase_price: Option<Money>,
    pub selling_price: Option<Money>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub min_stock: Option<i64>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProductUpdate::default()
    }

    /// Applies the update onto a copy of `product`, validating changed fields.
    ///
    /// `category_id` is left untouched; the caller resolves category names.
    pub fn apply_to(&self, product: &Product) -> Result<Product, ValidationError> {
        let mut updated = product.clone();

        if let Some(name) = &self.name {
            let name = name.trim();
            validation::validate_product_name(name)?;
            updated.name = name.to_string();
        }
        if let Some(sku) = &self.sku {
            let sku = sku.trim();
            validation::validate_sku(sku)?;
            updated.sku = sku.to_string();
        }
        if let Some(price) = self.purchase_price {
            validation::validate_price_cents("purchase_price", price.cents())?;
            updated.purchase_price_cents = price.cents();
        }
        if let Some(price) = self.selling_price {
            validation::validate_price_cents("selling_price", price.cents())?;
            updated.selling_price_cents = price.cents();
        }
        if let Some(stock) = self.stock {
            validation::validate_stock("stock", stock)?;
            updated.stock = stock;
        }
        if let Some(min_stock) = self.min_stock {
            validation::validate_stock("min_stock", min_stock)?;
            updated.min_stock = min_stock;
        }
        if let Some(category) = &self.category {
            updated.category = non_blank(Some(category.clone()));
        }
        if let Some(description) = &self.description {
            updated.description = non_blank(Some(description.clone()));
        }
        if let Some(image_path) = &self.image_path {
            updated.image_path = non_blank(Some(image_path.clone()));
        }

        Ok(updated)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// User
// =============================================================================

/// A user account. The password hash never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale. Never edited after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub receipt_number: String,
    /// Cashier's user id at the time of sale.
    pub cashier_id: String,
    /// Cashier's username at the time of sale (frozen).
    pub cashier_username: String,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Quantity sold.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A finalized sale with its line items, as printed on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

impl Receipt {
    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Inventory Log
// =============================================================================

/// One append-only stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryLogEntry {
    pub id: String,
    pub product_id: String,
    /// SKU at the time of the movement; survives product deletion.
    pub sku_snapshot: String,
    /// Signed change: negative for stock leaving.
    pub delta: i64,
    pub reason: InventoryReason,
    /// Sale id for `reason = sale`.
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
