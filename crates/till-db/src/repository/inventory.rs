//! # Inventory Repository
//!
//! The append-only inventory log and manual stock adjustments.
//!
//! ## Stock Movement Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every stock change is a pair, written in ONE transaction:             │
//! │                                                                         │
//! │    UPDATE products SET stock = stock + delta   (never below zero)      │
//! │    INSERT INTO inventory_log (delta, reason, ...)                       │
//! │                                                                         │
//! │  reason = sale        ← checkout (reference_id = sale id)              │
//! │  reason = adjustment  ← restock, write-off, stock edit, initial stock  │
//! │  reason = import      ← CSV import                                     │
//! │                                                                         │
//! │  The log has no UPDATE or DELETE path.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::rollback;
use crate::error::{DbError, DbResult};
use till_core::validation::validate_stock;
use till_core::{InventoryLogEntry, InventoryReason};

const SELECT_ENTRY: &str = r#"
    SELECT id, product_id, sku_snapshot, delta, reason, reference_id, note, created_at
    FROM inventory_log
"#;

/// One stock movement to be written inside an open transaction.
#[derive(Debug, Clone)]
pub(crate) struct Movement<'a> {
    pub product_id: &'a str,
    pub sku: &'a str,
    pub delta: i64,
    pub reason: InventoryReason,
    pub reference_id: Option<&'a str>,
    pub note: Option<&'a str>,
}

/// Appends a log entry using the caller's connection (normally a transaction).
pub(crate) async fn record_movement(
    conn: &mut SqliteConnection,
    movement: Movement<'_>,
) -> DbResult<()> {
    debug!(
        sku = %movement.sku,
        delta = movement.delta,
        reason = %movement.reason,
        "Recording stock movement"
    );

    sqlx::query(
        r#"
        INSERT INTO inventory_log (
            id, product_id, sku_snapshot, delta, reason, reference_id, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(movement.product_id)
    .bind(movement.sku)
    .bind(movement.delta)
    .bind(movement.reason)
    .bind(movement.reference_id)
    .bind(movement.note)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for stock adjustments and the inventory log.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Changes a product's stock by `delta` and logs it, atomically.
    ///
    /// ## Returns
    /// * `Ok(new_stock)`
    /// * `Err(DbError::NotFound)` - no product with this SKU
    /// * `Err(DbError::InsufficientStock)` - result would be negative; nothing written
    /// * `Err(DbError::Invalid)` - result would exceed `MAX_STOCK`; nothing written
    pub async fn adjust(
        &self,
        sku: &str,
        delta: i64,
        reason: InventoryReason,
        note: Option<&str>,
    ) -> DbResult<i64> {
        debug!(sku = %sku, delta, "Adjusting stock");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT id, stock FROM products WHERE sku = ?1")
                .bind(sku)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((product_id, stock)) = row else {
            rollback(tx).await;
            return Err(DbError::not_found("Product", sku));
        };

        let new_stock = stock.saturating_add(delta);
        if new_stock < 0 {
            rollback(tx).await;
            return Err(DbError::InsufficientStock {
                sku: sku.to_string(),
                available: stock,
                requested: delta.saturating_neg(),
            });
        }
        if let Err(e) = validate_stock("stock", new_stock) {
            rollback(tx).await;
            return Err(e.into());
        }

        sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&product_id)
            .bind(new_stock)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        record_movement(
            &mut *tx,
            Movement {
                product_id: &product_id,
                sku,
                delta,
                reason,
                reference_id: None,
                note,
            },
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(sku = %sku, delta, new_stock, "Stock adjusted");
        Ok(new_stock)
    }

    /// A product's movements, oldest first.
    pub async fn history(&self, product_id: &str) -> DbResult<Vec<InventoryLogEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE product_id = ?1 ORDER BY created_at, rowid");
        let entries = sqlx::query_as::<_, InventoryLogEntry>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Movements caused by one sale (or other referenced operation).
    pub async fn for_reference(&self, reference_id: &str) -> DbResult<Vec<InventoryLogEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE reference_id = ?1 ORDER BY created_at, rowid");
        let entries = sqlx::query_as::<_, InventoryLogEntry>(&sql)
            .bind(reference_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Total number of log entries (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::DbError;
    use till_core::{InventoryReason, Money, NewProduct};

    async fn db_with_product(stock: i64) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = NewProduct::new("Cola", "A1", Money::from_cents(60), Money::from_cents(100))
            .with_stock(stock);
        db.products()
            .insert(&product, InventoryReason::Adjustment)
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_adjust_updates_stock_and_logs() {
        let db = db_with_product(5).await;

        let new_stock = db
            .inventory()
            .adjust("A1", 10, InventoryReason::Adjustment, Some("delivery"))
            .await
            .unwrap();
        assert_eq!(new_stock, 15);

        let product = db.products().get_by_sku("A1").await.unwrap().unwrap();
        assert_eq!(product.stock, 15);

        let history = db.inventory().history(&product.id).await.unwrap();
        let deltas: Vec<i64> = history.iter().map(|e| e.delta).collect();
        assert_eq!(deltas, vec![5, 10]);
        assert_eq!(history[1].note.as_deref(), Some("delivery"));
    }

    #[tokio::test]
    async fn test_adjust_below_zero_changes_nothing() {
        let db = db_with_product(2).await;

        let err = db
            .inventory()
            .adjust("A1", -3, InventoryReason::Adjustment, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));

        let product = db.products().get_by_sku("A1").await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
        assert_eq!(db.inventory().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_adjust_extreme_deltas_change_nothing() {
        let db = db_with_product(5).await;
        let inventory = db.inventory();

        let err = inventory
            .adjust("A1", i64::MAX, InventoryReason::Adjustment, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));

        let err = inventory
            .adjust("A1", i64::MIN, InventoryReason::Adjustment, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 5,
                requested: i64::MAX,
                ..
            }
        ));

        let err = inventory
            .adjust("A1", till_core::MAX_STOCK, InventoryReason::Adjustment, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));

        assert_eq!(db.products().get_by_sku("A1").await.unwrap().unwrap().stock, 5);
        assert_eq!(inventory.count().await.unwrap(), 1);

        // The connection is usable again after each rollback.
        let new_stock = inventory
            .adjust("A1", till_core::MAX_STOCK - 5, InventoryReason::Adjustment, None)
            .await
            .unwrap();
        assert_eq!(new_stock, till_core::MAX_STOCK);
    }

    #[tokio::test]
    async fn test_adjust_unknown_sku() {
        let db = db_with_product(0).await;

        let err = db
            .inventory()
            .adjust("NOPE", 1, InventoryReason::Adjustment, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
