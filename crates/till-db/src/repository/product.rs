//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Case-insensitive name/SKU search, streamed row by row
//! - CRUD with category resolution
//! - Archive (soft delete) and hard delete
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types: "cola"                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  instr(lower(name), 'cola') > 0  OR  instr(lower(sku), 'cola') > 0     │
//! │       │                                                                 │
//! │  │ A1    | Coca-Cola 330ml  │ ← MATCH (name)                            │
//! │  │ COLA2 | Diet Soda        │ ← MATCH (sku)                             │
//! │  │ P-330 | Pepsi 330ml      │                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Stream ordered by name, then SKU (stable)                             │
//! │                                                                         │
//! │  instr() instead of LIKE: '%' and '_' in the query are literal.        │
//! │  lower() folds ASCII only; the needle is folded to match.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use futures_util::stream::{BoxStream, StreamExt};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::category::ensure_category;
use crate::repository::inventory::{record_movement, Movement};
use crate::repository::rollback;
use till_core::{InventoryReason, NewProduct, Product};

/// Builds a product query: columns with the category name joined in,
/// followed by `$tail`.
macro_rules! product_query {
    ($tail:literal) => {
        concat!(
            "SELECT p.id, p.name, p.sku, p.purchase_price_cents, p.selling_price_cents, ",
            "p.stock, p.category_id, c.name AS category, p.description, p.image_path, ",
            "p.min_stock, p.is_active, p.created_at, p.updated_at ",
            "FROM products p LEFT JOIN categories c ON c.id = p.category_id ",
            $tail
        )
    };
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.get_by_sku("A1").await?;
/// let mut matches = repo.search("cola");
/// while let Some(product) = matches.next().await { ... }
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lazily streams active products whose name or SKU contains `query`,
    /// ignoring ASCII case. An empty query matches every active product.
    ///
    /// SQLite's `lower()` folds ASCII only, so the needle is folded the same
    /// way; other letters must match exactly.
    ///
    /// The stream holds a pooled connection until it is dropped.
    pub fn search(&self, query: &str) -> BoxStream<'_, DbResult<Product>> {
        let needle = query.trim().to_ascii_lowercase();
        debug!(query = %needle, "Searching products");

        sqlx::query_as::<_, Product>(product_query!(
            "WHERE p.is_active = 1 \
             AND (instr(lower(p.name), ?1) > 0 OR instr(lower(p.sku), ?1) > 0) \
             ORDER BY p.name, p.sku"
        ))
            .bind(needle)
            .fetch(&self.pool)
            .map(|row| row.map_err(DbError::from))
            .boxed()
    }

    /// Gets a product by its ID, archived or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(product_query!("WHERE p.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU, archived or not.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(product_query!("WHERE p.sku = ?1"))
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// All active products ordered by SKU (export order).
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let products =
            sqlx::query_as::<_, Product>(product_query!("WHERE p.is_active = 1 ORDER BY p.sku"))
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Active products at or below their restock threshold, lowest stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(product_query!(
            "WHERE p.is_active = 1 AND p.stock <= p.min_stock ORDER BY p.stock, p.name"
        ))
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product, creating its category if needed.
    ///
    /// Initial stock above zero is logged with `reason`.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product as stored
    /// * `Err(DbError::UniqueViolation)` - SKU already exists; nothing written
    pub async fn insert(&self, new: &NewProduct, reason: InventoryReason) -> DbResult<Product> {
        debug!(sku = %new.sku, "Inserting product");

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let category_id = match &new.category {
            Some(name) => Some(ensure_category(&mut *tx, name).await?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, purchase_price_cents, selling_price_cents,
                stock, category_id, description, image_path, min_stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?11)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.sku)
        .bind(new.purchase_price.cents())
        .bind(new.selling_price.cents())
        .bind(new.stock)
        .bind(&category_id)
        .bind(&new.description)
        .bind(&new.image_path)
        .bind(new.min_stock)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&new.sku))?;

        if new.stock > 0 {
            record_movement(
                &mut *tx,
                Movement {
                    product_id: &id,
                    sku: &new.sku,
                    delta: new.stock,
                    reason,
                    reference_id: None,
                    note: Some("initial stock"),
                },
            )
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(sku = %new.sku, stock = new.stock, "Product created");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &id))
    }

    /// Writes every editable field of `product`, resolving its category by
    /// name. A stock difference is logged as an adjustment.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product as stored after the update
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(DbError::UniqueViolation)` - new SKU already taken
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, sku = %product.sku, "Updating product");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let previous_stock: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                .bind(&product.id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(previous_stock) = previous_stock else {
            rollback(tx).await;
            return Err(DbError::not_found("Product", &product.id));
        };

        let category_id = match &product.category {
            Some(name) => Some(ensure_category(&mut *tx, name).await?),
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                sku = ?3,
                purchase_price_cents = ?4,
                selling_price_cents = ?5,
                stock = ?6,
                category_id = ?7,
                description = ?8,
                image_path = ?9,
                min_stock = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.purchase_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.stock)
        .bind(&category_id)
        .bind(&product.description)
        .bind(&product.image_path)
        .bind(product.min_stock)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&product.sku))?;

        let delta = product.stock - previous_stock;
        if delta != 0 {
            record_movement(
                &mut *tx,
                Movement {
                    product_id: &product.id,
                    sku: &product.sku,
                    delta,
                    reason: InventoryReason::Adjustment,
                    reference_id: None,
                    note: Some("stock edit"),
                },
            )
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        self.get_by_id(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Checks whether any sale line references the product.
    pub async fn has_sales(&self, id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE product_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Removes the product row. Fails with `ForeignKeyViolation` when sale
    /// lines reference it. Its inventory log entries are kept.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Archived products keep their SKU, history and sale references but
    /// disappear from search, export, valuation and low-stock lists.
    pub async fn archive(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Archiving product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use till_core::Money;

    fn cola() -> NewProduct {
        NewProduct::new("Coca-Cola 330ml", "A1", Money::from_cents(60), Money::from_cents(100))
            .with_stock(5)
            .with_category("Drinks")
    }

    async fn collect(repo: &ProductRepository, query: &str) -> Vec<String> {
        repo.search(query)
            .map(|p| p.unwrap().sku)
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let product = db
            .products()
            .insert(&cola(), InventoryReason::Adjustment)
            .await
            .unwrap();

        assert_eq!(product.sku, "A1");
        assert_eq!(product.stock, 5);
        assert_eq!(product.category.as_deref(), Some("Drinks"));
        assert!(product.is_active);

        let fetched = db.products().get_by_sku("A1").await.unwrap().unwrap();
        assert_eq!(fetched, product);

        let history = db.inventory().history(&product.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].delta, 5);
    }

    #[tokio::test]
    async fn test_duplicate_sku_leaves_original() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(&cola(), InventoryReason::Adjustment)
            .await
            .unwrap();

        let clash = NewProduct::new("Other", "A1", Money::zero(), Money::from_cents(5));
        let err = db
            .products()
            .insert(&clash, InventoryReason::Adjustment)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "A1"));
        let original = db.products().get_by_sku("A1").await.unwrap().unwrap();
        assert_eq!(original.name, "Coca-Cola 330ml");
        assert_eq!(db.inventory().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_ordered() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        for (name, sku) in [("Pepsi", "P1"), ("Cola Zero", "Z9"), ("Apple Juice", "COLA-2")] {
            let product = NewProduct::new(name, sku, Money::zero(), Money::from_cents(100));
            repo.insert(&product, InventoryReason::Adjustment).await.unwrap();
        }

        assert_eq!(collect(&repo, "COLA").await, vec!["COLA-2", "Z9"]);
        assert_eq!(collect(&repo, "").await, vec!["COLA-2", "Z9", "P1"]);
        assert!(collect(&repo, "%").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_folds_ascii_case_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let product = NewProduct::new("ÉCLAIR Box", "E1", Money::zero(), Money::from_cents(100));
        repo.insert(&product, InventoryReason::Adjustment).await.unwrap();

        assert_eq!(collect(&repo, "ÉCLAIR").await, vec!["E1"]);
        assert_eq!(collect(&repo, "Éclair box").await, vec!["E1"]);
        assert!(collect(&repo, "éclair").await.is_empty());
    }

    #[tokio::test]
    async fn test_update_logs_stock_difference() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut product = db
            .products()
            .insert(&cola(), InventoryReason::Adjustment)
            .await
            .unwrap();

        product.stock = 2;
        product.selling_price_cents = 120;
        product.category = Some("Soft Drinks".to_string());
        let updated = db.products().update(&product).await.unwrap();

        assert_eq!(updated.stock, 2);
        assert_eq!(updated.selling_price_cents, 120);
        assert_eq!(updated.category.as_deref(), Some("Soft Drinks"));

        let deltas: Vec<i64> = db
            .inventory()
            .history(&product.id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.delta)
            .collect();
        assert_eq!(deltas, vec![5, -3]);
    }

    #[tokio::test]
    async fn test_archive_hides_from_search_and_low_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&cola().with_min_stock(10), InventoryReason::Adjustment)
            .await
            .unwrap();
        assert_eq!(db.products().low_stock().await.unwrap().len(), 1);

        db.products().archive(&product.id).await.unwrap();

        assert!(collect(&db.products(), "cola").await.is_empty());
        assert!(db.products().low_stock().await.unwrap().is_empty());
        assert!(db.products().list_active().await.unwrap().is_empty());
        let archived = db.products().get_by_sku("A1").await.unwrap().unwrap();
        assert!(!archived.is_active);
    }

    #[tokio::test]
    async fn test_delete_keeps_inventory_log() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&cola(), InventoryReason::Adjustment)
            .await
            .unwrap();

        assert!(!db.products().has_sales(&product.id).await.unwrap());
        db.products().delete(&product.id).await.unwrap();

        assert!(db.products().get_by_sku("A1").await.unwrap().is_none());
        assert_eq!(db.inventory().history(&product.id).await.unwrap().len(), 1);
        assert!(db.products().delete(&product.id).await.unwrap_err().is_not_found());
    }
}
