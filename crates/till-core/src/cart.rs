//! # Cart
//!
//! The in-progress, unsaved collection of line items before a sale is
//! finalized.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cart State Machine                              │
//! │                                                                         │
//! │   ┌───────┐ add_item  ┌──────────┐ apply_discount ┌────────┐            │
//! │   │ Empty │──────────►│ Building │───────────────►│ Priced │            │
//! │   └───────┘           └──────────┘                └────────┘            │
//! │       ▲                   │  ▲  clear_discount        │                 │
//! │       │ clear / remove    │  └────────────────────────┘                 │
//! │       └───────────────────┘                           │                 │
//! │                           │ mark_finalized            │ mark_finalized  │
//! │                           ▼                           ▼                 │
//! │                      ┌───────────────────────────────────┐              │
//! │                      │             Finalized             │              │
//! │                      │   (read only until clear())       │              │
//! │                      └───────────────────────────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart never touches storage. Stock checks here are soft: the
//! finalize transaction in till-db re-reads stock and is authoritative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Product, TaxRate};
use crate::validation::{
    validate_cart_size, validate_discount_bps, validate_price_cents, validate_quantity,
};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Discount
// =============================================================================

/// A discount on the cart subtotal. At most one applies to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Discount {
    /// Percentage of the subtotal in basis points (1000 = 10%).
    Percentage(u32),
    /// Fixed amount off the subtotal.
    Fixed(Money),
}

impl Discount {
    /// Checks the discount is within 0..=100% or non-negative.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            Discount::Percentage(bps) => {
                validate_discount_bps(*bps).map_err(|_| CoreError::InvalidDiscount {
                    reason: format!("percentage {} bps exceeds 100%", bps),
                })
            }
            Discount::Fixed(amount) if amount.is_negative() => Err(CoreError::InvalidDiscount {
                reason: "fixed discount cannot be negative".to_string(),
            }),
            Discount::Fixed(_) => Ok(()),
        }
    }

    /// Amount taken off `subtotal`, never more than the subtotal itself.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        match self {
            Discount::Percentage(bps) => subtotal.percentage(*bps).min(subtotal),
            Discount::Fixed(amount) => (*amount).min(subtotal),
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// An item in the cart.
///
/// Name, SKU and price are frozen when the product is added, so the cart
/// shows consistent data even if the product is edited meanwhile. The sale
/// records exactly this unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price_cents: product.selling_price_cents,
            quantity,
            added_at: Utc::now(),
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartState {
    Empty,
    Building,
    /// Lines present and a discount applied.
    Priced,
    Finalized,
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product merges)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` lines
/// - No mutation once finalized, except `clear()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    discount: Option<Discount>,
    finalized: bool,
    created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            discount: None,
            finalized: false,
            created_at: Utc::now(),
        }
    }

    pub fn state(&self) -> CartState {
        if self.finalized {
            CartState::Finalized
        } else if self.items.is_empty() {
            CartState::Empty
        } else if self.discount.is_some() {
            CartState::Priced
        } else {
            CartState::Building
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn discount(&self) -> Option<Discount> {
        self.discount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn item_by_sku(&self, sku: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.sku == sku)
    }

    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.finalized {
            return Err(CoreError::CartFinalized);
        }
        Ok(())
    }

    /// Adds a product or increases its quantity if already present.
    ///
    /// Soft-checks the merged quantity against `product.stock`.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        self.ensure_open()?;

        check_quantity(quantity)?;
        if !product.is_active {
            return Err(ValidationError::invalid_format("sku", "product is archived").into());
        }
        validate_price_cents("selling_price", product.selling_price_cents)?;

        let merged = self.quantity_of(&product.id) + quantity;
        check_quantity(merged)?;
        if merged > product.stock {
            return Err(CoreError::InsufficientStock {
                sku: product.sku.clone(),
                available: product.stock,
                requested: merged,
            });
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            item.quantity = merged;
            return Ok(());
        }

        validate_cart_size(self.items.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        })?;

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        self.ensure_open()?;

        if quantity == 0 {
            return self.remove_item(product_id);
        }
        check_quantity(quantity)?;

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::NotInCart(product_id.to_string())),
        }
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        self.ensure_open()?;

        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            return Err(CoreError::NotInCart(product_id.to_string()));
        }
        if self.items.is_empty() {
            self.discount = None;
        }
        Ok(())
    }

    /// Sets the cart's single discount, replacing any earlier one.
    pub fn apply_discount(&mut self, discount: Discount) -> CoreResult<()> {
        self.ensure_open()?;
        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        discount.validate()?;
        self.discount = Some(discount);
        Ok(())
    }

    pub fn clear_discount(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        self.discount = None;
        Ok(())
    }

    /// Empties the cart and starts over, also after finalization.
    pub fn clear(&mut self) {
        *self = Cart::new();
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Computes subtotal, discount, tax and total.
    ///
    /// ```text
    /// subtotal = Σ unit_price × quantity
    /// discount = discount.amount_for(subtotal)
    /// taxable  = subtotal − discount
    /// tax      = taxable × rate   (half-up)
    /// total    = taxable + tax
    /// ```
    pub fn totals(&self, tax_rate: TaxRate) -> CartTotals {
        let subtotal = self.subtotal();
        let discount = self
            .discount
            .map(|d| d.amount_for(subtotal))
            .unwrap_or_else(Money::zero);
        let taxable = subtotal - discount;
        let tax = taxable.calculate_tax(tax_rate);

        CartTotals {
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            subtotal,
            discount,
            taxable,
            tax,
            total: taxable + tax,
        }
    }

    /// Checks the cart can be turned into a sale.
    pub fn ensure_finalizable(&self) -> CoreResult<()> {
        self.ensure_open()?;
        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        Ok(())
    }

    /// Marks the cart as finalized after the sale was committed.
    pub fn mark_finalized(&mut self) -> CoreResult<()> {
        self.ensure_finalizable()?;
        self.finalized = true;
        Ok(())
    }
}

/// Cart totals summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub taxable: Money,
    pub tax: Money,
    pub total: Money,
}

/// Line quantities run from 1 to `MAX_ITEM_QUANTITY`; anything larger is
/// reported as [`CoreError::QuantityTooLarge`].
fn check_quantity(quantity: i64) -> CoreResult<()> {
    validate_quantity(quantity).map_err(|err| match err {
        ValidationError::OutOfRange { max, .. } => CoreError::QuantityTooLarge {
            requested: quantity,
            max,
        },
        other => other.into(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            sku: format!("SKU-{}", id),
            purchase_price_cents: price_cents / 2,
            selling_price_cents: price_cents,
            stock,
            category_id: None,
            category: None,
            description: None,
            image_path: None,
            min_stock: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_add_item() {
        let mut cart = Cart::new();
        assert_eq!(cart.state(), CartState::Empty);

        cart.add_item(&test_product("1", 999, 10), 2).unwrap();

        assert_eq!(cart.state(), CartState::Building);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal().cents(), 1998);
    }

    #[test]
    fn test_cart_add_same_product_merges() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);

        cart.add_item(&product, 2).unwrap();
        cart.add_item(&product, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_cart_soft_stock_check_counts_merged_quantity() {
        let mut cart = Cart::new();
        let product = test_product("1", 100, 3);

        cart.add_item(&product, 2).unwrap();
        let err = cart.add_item(&product, 2).unwrap_err();

        assert_eq!(
            err,
            CoreError::InsufficientStock {
                sku: "SKU-1".to_string(),
                available: 3,
                requested: 4
            }
        );
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_cart_rejects_bad_quantities() {
        let mut cart = Cart::new();
        let product = test_product("1", 100, 5000);

        assert!(matches!(
            cart.add_item(&product, 0),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            cart.add_item(&product, 1000),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_cart_quantity_limits_apply_to_merged_and_set_lines() {
        let mut cart = Cart::new();
        let product = test_product("1", 100, 5000);
        cart.add_item(&product, 998).unwrap();

        assert_eq!(
            cart.add_item(&product, 2),
            Err(CoreError::QuantityTooLarge {
                requested: 1000,
                max: crate::MAX_ITEM_QUANTITY
            })
        );
        assert!(matches!(
            cart.set_quantity("1", -1),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(matches!(
            cart.set_quantity("1", i64::MAX),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert_eq!(cart.quantity_of("1"), 998);
    }

    #[test]
    fn test_cart_rejects_prices_beyond_the_limit() {
        let mut cart = Cart::new();
        let err = cart
            .add_item(&test_product("1", i64::MAX / 2, 10), 3)
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_largest_possible_cart_totals_fit() {
        let mut cart = Cart::new();
        let max_qty = crate::MAX_ITEM_QUANTITY;
        for i in 0..MAX_CART_ITEMS {
            let product = test_product(&i.to_string(), crate::MAX_PRICE_CENTS, max_qty);
            cart.add_item(&product, max_qty).unwrap();
        }

        let totals = cart.totals(TaxRate::from_bps(10000));
        let subtotal = crate::MAX_PRICE_CENTS * max_qty * MAX_CART_ITEMS as i64;
        assert_eq!(totals.subtotal.cents(), subtotal);
        assert_eq!(totals.total.cents(), subtotal * 2);
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&test_product(&i.to_string(), 100, 1), 1).unwrap();
        }
        let err = cart.add_item(&test_product("extra", 100, 1), 1).unwrap_err();
        assert_eq!(err, CoreError::CartTooLarge { max: MAX_CART_ITEMS });
    }

    #[test]
    fn test_cart_set_quantity_and_remove() {
        let mut cart = Cart::new();
        let product = test_product("1", 100, 10);
        cart.add_item(&product, 1).unwrap();

        cart.set_quantity("1", 4).unwrap();
        assert_eq!(cart.quantity_of("1"), 4);

        cart.set_quantity("1", 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(
            cart.remove_item("1"),
            Err(CoreError::NotInCart("1".to_string()))
        );
    }

    #[test]
    fn test_worked_example_totals() {
        // A1 at 10.00, 2 units, 10% discount, 8% tax
        let mut cart = Cart::new();
        cart.add_item(&test_product("A1", 1000, 5), 2).unwrap();
        cart.apply_discount(Discount::Percentage(1000)).unwrap();
        assert_eq!(cart.state(), CartState::Priced);

        let totals = cart.totals(TaxRate::from_bps(800));
        assert_eq!(totals.subtotal.cents(), 2000);
        assert_eq!(totals.discount.cents(), 200);
        assert_eq!(totals.taxable.cents(), 1800);
        assert_eq!(totals.tax.cents(), 144);
        assert_eq!(totals.total.cents(), 1944);
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 500, 5), 1).unwrap();
        cart.apply_discount(Discount::Fixed(Money::from_cents(900))).unwrap();

        let totals = cart.totals(TaxRate::from_bps(700));
        assert_eq!(totals.discount.cents(), 500);
        assert_eq!(totals.tax, Money::zero());
        assert_eq!(totals.total, Money::zero());
    }

    #[test]
    fn test_only_one_discount_applies() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 1000, 5), 1).unwrap();
        cart.apply_discount(Discount::Percentage(5000)).unwrap();
        cart.apply_discount(Discount::Fixed(Money::from_cents(100))).unwrap();

        let totals = cart.totals(TaxRate::zero());
        assert_eq!(totals.discount.cents(), 100);
        assert_eq!(totals.total.cents(), 900);
    }

    #[test]
    fn test_invalid_discounts_rejected() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.apply_discount(Discount::Percentage(100)),
            Err(CoreError::EmptyCart)
        );

        cart.add_item(&test_product("1", 1000, 5), 1).unwrap();
        assert!(matches!(
            cart.apply_discount(Discount::Percentage(10001)),
            Err(CoreError::InvalidDiscount { .. })
        ));
        assert!(matches!(
            cart.apply_discount(Discount::Fixed(Money::from_cents(-1))),
            Err(CoreError::InvalidDiscount { .. })
        ));
        assert_eq!(cart.discount(), None);
    }

    #[test]
    fn test_finalized_cart_is_read_only() {
        let mut cart = Cart::new();
        let product = test_product("1", 1000, 5);
        assert_eq!(cart.mark_finalized(), Err(CoreError::EmptyCart));

        cart.add_item(&product, 1).unwrap();
        cart.mark_finalized().unwrap();

        assert_eq!(cart.state(), CartState::Finalized);
        assert_eq!(cart.add_item(&product, 1), Err(CoreError::CartFinalized));
        assert_eq!(cart.mark_finalized(), Err(CoreError::CartFinalized));

        cart.clear();
        assert_eq!(cart.state(), CartState::Empty);
    }
}
