//! # Sale Repository
//!
//! Turns a priced cart into a permanent sale, and reads sales back.
//!
//! ## Finalize Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    for each cart line:                                                  │
//! │      SELECT stock FROM products          ← re-read, authoritative      │
//! │      stock < quantity?  ──► ROLLBACK, InsufficientStock                │
//! │    INSERT sales (totals computed from the cart)                         │
//! │    for each cart line:                                                  │
//! │      UPDATE products SET stock = stock - quantity                       │
//! │      INSERT sale_items (unit price frozen in the cart)                  │
//! │      INSERT inventory_log (delta = -quantity, reason = sale)            │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is written.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales are immutable. There is no update, void or delete.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{record_movement, Movement};
use crate::repository::rollback;
use till_core::{Cart, CartTotals, InventoryReason, PaymentMethod, Receipt, Sale, SaleItem, User};

const SELECT_SALE: &str = r#"
    SELECT id, receipt_number, cashier_id, cashier_username, payment_method,
           subtotal_cents, discount_cents, tax_cents, total_cents, created_at
    FROM sales
"#;

const SELECT_ITEM: &str = r#"
    SELECT id, sale_id, product_id, sku_snapshot, name_snapshot,
           quantity, unit_price_cents, line_total_cents
    FROM sale_items
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Writes the sale for `cart` atomically.
    ///
    /// `totals` must be the cart's totals at the configured tax rate; they
    /// are stored as-is.
    ///
    /// ## Returns
    /// * `Ok(Receipt)` - committed sale with its items
    /// * `Err(DbError::InsufficientStock)` - some line exceeds current stock; nothing written
    /// * `Err(DbError::NotFound)` - a product was deleted or archived meanwhile
    pub async fn finalize(
        &self,
        cart: &Cart,
        totals: &CartTotals,
        cashier: &User,
        payment_method: PaymentMethod,
    ) -> DbResult<Receipt> {
        debug!(
            lines = cart.item_count(),
            total = totals.total.cents(),
            cashier = %cashier.username,
            "Finalizing sale"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        // Re-validate every line before writing anything.
        for item in cart.items() {
            let row: Option<(i64, bool)> =
                sqlx::query_as("SELECT stock, is_active FROM products WHERE id = ?1")
                    .bind(&item.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let stock = match row {
                Some((stock, true)) => stock,
                _ => {
                    rollback(tx).await;
                    return Err(DbError::not_found("Product", &item.sku));
                }
            };

            if stock < item.quantity {
                rollback(tx).await;
                return Err(DbError::InsufficientStock {
                    sku: item.sku.clone(),
                    available: stock,
                    requested: item.quantity,
                });
            }
        }

        let created_at = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            receipt_number: next_receipt_number(&mut *tx, created_at).await?,
            cashier_id: cashier.id.clone(),
            cashier_username: cashier.username.clone(),
            payment_method,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            created_at,
        };

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, receipt_number, cashier_id, cashier_username, payment_method,
                subtotal_cents, discount_cents, tax_cents, total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.receipt_number)
        .bind(&sale.cashier_id)
        .bind(&sale.cashier_username)
        .bind(sale.payment_method)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_cents)
        .bind(sale.total_cents)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(cart.item_count());

        for line in cart.items() {
            // The guard re-checks stock in the same statement.
            let updated = sqlx::query(
                "UPDATE products SET stock = stock - ?2, updated_at = ?3 WHERE id = ?1 AND stock >= ?2",
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                rollback(tx).await;
                return Err(DbError::InsufficientStock {
                    sku: line.sku.clone(),
                    available: 0,
                    requested: line.quantity,
                });
            }

            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                sku_snapshot: line.sku.clone(),
                name_snapshot: line.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                line_total_cents: line.line_total().cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, sku_snapshot, name_snapshot,
                    quantity, unit_price_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.sku_snapshot)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;

            record_movement(
                &mut *tx,
                Movement {
                    product_id: &item.product_id,
                    sku: &item.sku_snapshot,
                    delta: -item.quantity,
                    reason: InventoryReason::Sale,
                    reference_id: Some(&sale.id),
                    note: None,
                },
            )
            .await?;

            items.push(item);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            receipt = %sale.receipt_number,
            total = sale.total_cents,
            items = items.len(),
            "Sale finalized"
        );

        Ok(Receipt { sale, items })
    }

    /// Gets a sale with its items by sale id.
    pub async fn get_receipt(&self, sale_id: &str) -> DbResult<Option<Receipt>> {
        let sql = format!("{SELECT_SALE} WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(sale) => {
                let items = self.get_items(&sale.id).await?;
                Ok(Some(Receipt { sale, items }))
            }
            None => Ok(None),
        }
    }

    /// Gets a sale with its items by receipt number (e.g. `R20240115-0003`).
    pub async fn get_by_receipt_number(&self, receipt_number: &str) -> DbResult<Option<Receipt>> {
        let sql = format!("{SELECT_SALE} WHERE receipt_number = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(receipt_number)
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(sale) => {
                let items = self.get_items(&sale.id).await?;
                Ok(Some(Receipt { sale, items }))
            }
            None => Ok(None),
        }
    }

    /// Line items of a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!("{SELECT_ITEM} WHERE sale_id = ?1 ORDER BY rowid");
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Most recent sales, newest first.
    pub async fn recent(&self, limit: i64) -> DbResult<Vec<Sale>> {
        let sql = format!("{SELECT_SALE} ORDER BY created_at DESC, receipt_number DESC LIMIT ?1");
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Generates the next receipt number for the day of `at`.
///
/// ## Format
/// `R{YYYYMMDD}-{NNNN}`, e.g. `R20240115-0003`. The sequence restarts daily.
/// Runs inside the finalize transaction, so numbers never collide.
async fn next_receipt_number(conn: &mut SqliteConnection, at: DateTime<Utc>) -> DbResult<String> {
    let prefix = format!("R{}-", at.format("%Y%m%d"));

    let issued: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE receipt_number LIKE ?1")
        .bind(format!("{prefix}%"))
        .fetch_one(&mut *conn)
        .await?;

    Ok(format!("{prefix}{:04}", issued + 1))
}

// =============================================================================
// Unit Tests
// =============================================================================
