//! # Checkout Service
//!
//! Turns a cart into a sale.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Empty ──add_to_cart──► Building ──apply_discount──► Priced            │
//! │     ▲                      │  ▲                          │              │
//! │     │                      │  └──────clear_discount──────┘              │
//! │     │                      │                             │              │
//! │     │                      └──────────finalize───────────┤              │
//! │     │                                                    ▼              │
//! │     └───────────────────clear────────────────────── Finalized           │
//! │                                                                         │
//! │  finalize: one transaction                                              │
//! │    re-read stock ─► insert sale ─► per line: stock −= qty,              │
//! │                                    insert item, log (sale, −qty)        │
//! │    any shortfall ─► rollback, InsufficientStock, cart unchanged         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`Register`] keeps the cart being rung up plus any carts put on hold
//! during the session. Held carts are not stored and reserve no stock.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use till_core::{Cart, CartState, CartTotals, Discount, PaymentMethod, Receipt, TaxRate, User};
use till_db::Database;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    tax_rate: TaxRate,
}

impl CheckoutService {
    pub fn new(db: Database, tax_rate: TaxRate) -> Self {
        CheckoutService { db, tax_rate }
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// Adds `quantity` of the product with `sku`, merging with an existing
    /// line. Fails when the merged quantity exceeds the current stock.
    pub async fn add_to_cart(&self, cart: &mut Cart, sku: &str, quantity: i64) -> ServiceResult<()> {
        let sku = sku.trim();
        let product = self
            .db
            .products()
            .get_by_sku(sku)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::not_found("Product", sku))?;

        cart.add_item(&product, quantity)?;
        debug!(sku = %sku, quantity, lines = cart.item_count(), "Added to cart");
        Ok(())
    }

    /// Replaces a line's quantity; zero removes the line. Increases are
    /// checked against the current stock.
    pub async fn set_quantity(&self, cart: &mut Cart, sku: &str, quantity: i64) -> ServiceResult<()> {
        let sku = sku.trim();
        let (product_id, current) = cart
            .item_by_sku(sku)
            .map(|item| (item.product_id.clone(), item.quantity))
            .ok_or_else(|| ServiceError::not_found("Cart line", sku))?;

        if quantity > current {
            let stock = self
                .db
                .products()
                .get_by_id(&product_id)
                .await?
                .map(|p| p.stock)
                .unwrap_or(0);
            if quantity > stock {
                return Err(ServiceError::InsufficientStock {
                    sku: sku.to_string(),
                    available: stock,
                    requested: quantity,
                });
            }
        }

        cart.set_quantity(&product_id, quantity)?;
        Ok(())
    }

    pub fn remove_from_cart(&self, cart: &mut Cart, sku: &str) -> ServiceResult<()> {
        let sku = sku.trim();
        let product_id = cart
            .item_by_sku(sku)
            .map(|item| item.product_id.clone())
            .ok_or_else(|| ServiceError::not_found("Cart line", sku))?;

        cart.remove_item(&product_id)?;
        Ok(())
    }

    pub fn apply_discount(&self, cart: &mut Cart, discount: Discount) -> ServiceResult<CartTotals> {
        cart.apply_discount(discount)?;
        Ok(self.totals(cart))
    }

    /// Totals at the configured tax rate.
    pub fn totals(&self, cart: &Cart) -> CartTotals {
        cart.totals(self.tax_rate)
    }

    /// Records the sale atomically and marks the cart finalized.
    ///
    /// ## Returns
    /// * `Ok(Receipt)` - committed sale with its lines
    /// * `Err(Validation)` - cart is empty or already finalized
    /// * `Err(InsufficientStock)` - some line exceeds current stock; nothing was written
    /// * `Err(NotFound)` - a product was deleted or archived since it was added
    pub async fn finalize(
        &self,
        cart: &mut Cart,
        cashier: &User,
        payment_method: PaymentMethod,
    ) -> ServiceResult<Receipt> {
        if !cashier.role.can_sell() {
            return Err(ServiceError::forbidden("record sales"));
        }
        cart.ensure_finalizable()?;

        let totals = self.totals(cart);
        let receipt = self
            .db
            .sales()
            .finalize(cart, &totals, cashier, payment_method)
            .await?;
        cart.mark_finalized()?;

        info!(
            receipt = %receipt.sale.receipt_number,
            total = %receipt.sale.total(),
            payment = %payment_method,
            "Checkout complete"
        );
        Ok(receipt)
    }

    /// A finalized sale with its lines.
    pub async fn receipt(&self, sale_id: &str) -> ServiceResult<Receipt> {
        self.db
            .sales()
            .get_receipt(sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", sale_id))
    }

    pub async fn receipt_by_number(&self, receipt_number: &str) -> ServiceResult<Receipt> {
        let receipt_number = receipt_number.trim();
        self.db
            .sales()
            .get_by_receipt_number(receipt_number)
            .await?
            .ok_or_else(|| ServiceError::not_found("Receipt", receipt_number))
    }
}

/// A cart put aside under a label.
#[derive(Debug, Clone)]
pub struct HeldCart {
    pub label: String,
    pub cart: Cart,
    pub held_at: DateTime<Utc>,
}

/// The cart being rung up and the carts on hold.
#[derive(Debug, Default)]
pub struct Register {
    current: Cart,
    held: Vec<HeldCart>,
}

impl Register {
    pub fn new() -> Self {
        Register::default()
    }

    pub fn current(&self) -> &Cart {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Cart {
        &mut self.current
    }

    /// Held carts, oldest first.
    pub fn held(&self) -> &[HeldCart] {
        &self.held
    }

    /// Puts the current cart on hold and starts an empty one.
    pub fn hold(&mut self, label: &str) -> ServiceResult<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ServiceError::validation("label is required"));
        }
        match self.current.state() {
            CartState::Empty => return Err(ServiceError::validation("Cart is empty")),
            CartState::Finalized => {
                return Err(ServiceError::validation("Cart has already been finalized"))
            }
            CartState::Building | CartState::Priced => {}
        }
        if self.held.iter().any(|h| h.label == label) {
            return Err(ServiceError::validation(format!(
                "A cart is already held as '{}'",
                label
            )));
        }

        let cart = std::mem::take(&mut self.current);
        self.held.push(HeldCart {
            label: label.to_string(),
            cart,
            held_at: Utc::now(),
        });
        debug!(label = %label, held = self.held.len(), "Cart held");
        Ok(())
    }

    /// Makes a held cart current again. The current cart must be empty or
    /// finalized.
    pub fn resume(&mut self, label: &str) -> ServiceResult<()> {
        let label = label.trim();
        if matches!(self.current.state(), CartState::Building | CartState::Priced) {
            return Err(ServiceError::validation(
                "Hold or clear the current cart before resuming another",
            ));
        }
        let index = self
            .held
            .iter()
            .position(|h| h.label == label)
            .ok_or_else(|| ServiceError::not_found("Held cart", label))?;

        self.current = self.held.remove(index).cart;
        debug!(label = %label, "Cart resumed");
        Ok(())
    }

    /// Drops a held cart.
    pub fn discard(&mut self, label: &str) -> ServiceResult<HeldCart> {
        let label = label.trim();
        let index = self
            .held
            .iter()
            .position(|h| h.label == label)
            .ok_or_else(|| ServiceError::not_found("Held cart", label))?;
        Ok(self.held.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{InventoryReason, Money, NewProduct, Role};
    use till_db::DbConfig;

    async fn setup() -> (Database, CheckoutService, User) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(
                &NewProduct::new("Widget", "A1", Money::from_cents(600), Money::from_cents(1000))
                    .with_stock(5),
                InventoryReason::Adjustment,
            )
            .await
            .unwrap();
        let cashier = db.users().insert("carol", "hash", Role::Cashier).await.unwrap();
        let checkout = CheckoutService::new(db.clone(), TaxRate::from_bps(800));
        (db, checkout, cashier)
    }

    #[tokio::test]
    async fn test_add_to_cart_checks_stock() {
        let (_db, checkout, _) = setup().await;
        let mut cart = Cart::new();

        checkout.add_to_cart(&mut cart, "A1", 3).await.unwrap();
        let err = checkout.add_to_cart(&mut cart, "A1", 3).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { available: 5, requested: 6, .. }));
        assert_eq!(cart.total_quantity(), 3);

        let missing = checkout.add_to_cart(&mut cart, "NOPE", 1).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_quantity_and_remove() {
        let (_db, checkout, _) = setup().await;
        let mut cart = Cart::new();
        checkout.add_to_cart(&mut cart, "A1", 1).await.unwrap();

        checkout.set_quantity(&mut cart, "A1", 4).await.unwrap();
        assert_eq!(cart.total_quantity(), 4);

        let err = checkout.set_quantity(&mut cart, "A1", 6).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { .. }));

        checkout.remove_from_cart(&mut cart, "A1").unwrap();
        assert!(cart.is_empty());
        assert!(matches!(
            checkout.remove_from_cart(&mut cart, "A1").unwrap_err(),
            ServiceError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_finalize_worked_example() {
        let (db, checkout, cashier) = setup().await;
        let mut cart = Cart::new();
        checkout.add_to_cart(&mut cart, "A1", 2).await.unwrap();

        let totals = checkout
            .apply_discount(&mut cart, Discount::Percentage(1000))
            .unwrap();
        assert_eq!(totals.total, Money::from_cents(1944));

        let receipt = checkout
            .finalize(&mut cart, &cashier, PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(receipt.sale.subtotal_cents, 2000);
        assert_eq!(receipt.sale.discount_cents, 200);
        assert_eq!(receipt.sale.tax_cents, 144);
        assert_eq!(receipt.sale.total_cents, 1944);
        assert_eq!(cart.state(), CartState::Finalized);

        let product = db.products().get_by_sku("A1").await.unwrap().unwrap();
        assert_eq!(product.stock, 3);

        let again = checkout.receipt(&receipt.sale.id).await.unwrap();
        assert_eq!(again.sale.receipt_number, receipt.sale.receipt_number);

        let err = checkout
            .finalize(&mut cart, &cashier, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_finalize_empty_cart() {
        let (db, checkout, cashier) = setup().await;
        let mut cart = Cart::new();

        let err = checkout
            .finalize(&mut cart, &cashier, PaymentMethod::Card)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_finalize_stock_race_changes_nothing() {
        let (db, checkout, cashier) = setup().await;
        let mut cart = Cart::new();
        checkout.add_to_cart(&mut cart, "A1", 4).await.unwrap();

        // Stock drops after the item was added.
        db.inventory()
            .adjust("A1", -3, InventoryReason::Adjustment, Some("breakage"))
            .await
            .unwrap();

        let err = checkout
            .finalize(&mut cart, &cashier, PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InsufficientStock { available: 2, requested: 4, .. }));
        assert_eq!(cart.state(), CartState::Building);
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.products().get_by_sku("A1").await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_receipt_not_found() {
        let (_db, checkout, _) = setup().await;
        let err = checkout.receipt("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_register_hold_and_resume() {
        let (_db, checkout, _) = setup().await;
        let mut register = Register::new();

        assert!(register.hold("table 1").is_err());

        checkout
            .add_to_cart(register.current_mut(), "A1", 2)
            .await
            .unwrap();
        register.hold("table 1").unwrap();
        assert!(register.current().is_empty());
        assert_eq!(register.held().len(), 1);

        checkout
            .add_to_cart(register.current_mut(), "A1", 1)
            .await
            .unwrap();
        assert!(register.hold("table 1").is_err());
        assert!(register.resume("table 1").is_err());

        register.current_mut().clear();
        register.resume("table 1").unwrap();
        assert_eq!(register.current().total_quantity(), 2);
        assert!(register.held().is_empty());

        assert!(matches!(
            register.resume("table 1").unwrap_err(),
            ServiceError::NotFound { .. }
        ));
    }
}
