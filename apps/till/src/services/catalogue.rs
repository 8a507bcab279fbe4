//! # Catalogue Service
//!
//! Products, categories, stock adjustments and the CSV catalogue codec.
//!
//! ## CSV Import
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  name,sku,purchase_price,selling_price,stock,category,supplier,...     │
//! │  Cola,A1,0.50,1.00,24,Drinks,,,,5            ──► Imported("A1")         │
//! │  Crisps,,0.40,0.90,10,,,,,                   ──► Skipped("sku is req…") │
//! │  Cola Zero,A1,0.50,1.00,,,,,,                ──► Skipped("sku 'A1' …")  │
//! │                                                                         │
//! │  Every row is its own transaction. Bad rows are skipped and reported,  │
//! │  never abort the import.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io;

use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use till_core::validation::{validate_category_name, validate_search_query, validate_stock_delta};
use till_core::{
    CatalogueRow, Category, InventoryLogEntry, InventoryReason, NewProduct, Product,
    ProductUpdate, CATALOGUE_COLUMNS,
};
use till_db::{Database, DbError, ProductRepository};

use crate::config::DeletePolicy;
use crate::error::{ServiceError, ServiceResult};

/// What `delete` did to the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Archived,
}

/// Result of one import row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImportOutcome {
    /// Row stored under this SKU.
    Imported(String),
    /// Row rejected for this reason; nothing was written.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRow {
    /// 1-based position among data rows (the header is not counted).
    pub row_number: usize,
    pub outcome: ImportOutcome,
}

/// Per-row results of a catalogue import, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows: Vec<ImportRow>,
}

impl ImportReport {
    pub fn imported_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.outcome, ImportOutcome::Imported(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.rows.len() - self.imported_count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (usize, &str)> {
        self.rows.iter().filter_map(|r| match &r.outcome {
            ImportOutcome::Skipped(reason) => Some((r.row_number, reason.as_str())),
            ImportOutcome::Imported(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CatalogueService {
    db: Database,
    products: ProductRepository,
    delete_policy: DeletePolicy,
}

impl CatalogueService {
    pub fn new(db: Database, delete_policy: DeletePolicy) -> Self {
        let products = db.products();
        CatalogueService {
            db,
            products,
            delete_policy,
        }
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Adds a product. Unknown category names are created; initial stock is
    /// logged as an adjustment.
    pub async fn create(&self, new: NewProduct) -> ServiceResult<Product> {
        let new = new.validate()?;
        if let Some(category) = &new.category {
            validate_category_name(category)?;
        }

        let product = self
            .products
            .insert(&new, InventoryReason::Adjustment)
            .await?;

        info!(sku = %product.sku, "Product added to catalogue");
        Ok(product)
    }

    /// Applies a partial update. A stock change is logged with its delta.
    pub async fn edit(&self, sku: &str, update: ProductUpdate) -> ServiceResult<Product> {
        let current = self.get(sku).await?;
        if update.is_empty() {
            return Ok(current);
        }

        let updated = update.apply_to(&current)?;
        if let Some(category) = &updated.category {
            validate_category_name(category)?;
        }

        let product = self.products.update(&updated).await?;
        info!(sku = %product.sku, previous_sku = %current.sku, "Product edited");
        Ok(product)
    }

    /// Deletes or archives a product according to the configured policy.
    pub async fn delete(&self, sku: &str) -> ServiceResult<DeleteOutcome> {
        let product = self.get(sku).await?;

        match self.delete_policy {
            DeletePolicy::Restrict => {
                if self.products.has_sales(&product.id).await? {
                    return Err(ServiceError::validation(format!(
                        "Product {} has recorded sales and cannot be deleted",
                        product.sku
                    )));
                }
                self.products.delete(&product.id).await?;
                info!(sku = %product.sku, "Product deleted");
                Ok(DeleteOutcome::Deleted)
            }
            DeletePolicy::Archive => {
                self.products.archive(&product.id).await?;
                info!(sku = %product.sku, "Product archived");
                Ok(DeleteOutcome::Archived)
            }
        }
    }

    /// Gets a product by SKU, archived ones included.
    pub async fn get(&self, sku: &str) -> ServiceResult<Product> {
        let sku = sku.trim();
        self.products
            .get_by_sku(sku)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", sku))
    }

    /// Streams active products whose name or SKU contains `query`, ignoring
    /// ASCII case, ordered by name then SKU. An empty query yields everything.
    ///
    /// Letters outside ASCII match only in the same case.
    ///
    /// The stream holds a database connection until dropped.
    pub fn search(&self, query: &str) -> BoxStream<'_, ServiceResult<Product>> {
        match validate_search_query(query) {
            Ok(query) => self
                .products
                .search(&query)
                .map(|row| row.map_err(ServiceError::from))
                .boxed(),
            Err(e) => stream::once(async move { Err(ServiceError::from(e)) }).boxed(),
        }
    }

    /// Active products at or below their restock threshold.
    pub async fn low_stock(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.products.low_stock().await?)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn list_categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.db.categories().list().await?)
    }

    pub async fn add_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> ServiceResult<Category> {
        let name = name.trim();
        validate_category_name(name)?;
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let category = self.db.categories().insert(name, description).await?;
        info!(category = %category.name, "Category added");
        Ok(category)
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Restocks (`delta > 0`) or writes off (`delta < 0`) and returns the new
    /// stock level.
    pub async fn adjust_stock(
        &self,
        sku: &str,
        delta: i64,
        note: Option<&str>,
    ) -> ServiceResult<i64> {
        validate_stock_delta(delta)?;
        let note = note.map(str::trim).filter(|n| !n.is_empty());

        Ok(self
            .db
            .inventory()
            .adjust(sku.trim(), delta, InventoryReason::Adjustment, note)
            .await?)
    }

    /// The product's stock movements, oldest first.
    pub async fn stock_history(&self, sku: &str) -> ServiceResult<Vec<InventoryLogEntry>> {
        let product = self.get(sku).await?;
        Ok(self.db.inventory().history(&product.id).await?)
    }

    // =========================================================================
    // Import / Export
    // =========================================================================

    /// Imports rows one transaction at a time. Malformed rows and duplicate
    /// SKUs are skipped and reported; a storage failure stops the import.
    pub async fn import_rows(
        &self,
        rows: impl IntoIterator<Item = CatalogueRow>,
    ) -> ServiceResult<ImportReport> {
        self.import_parsed(rows.into_iter().map(Ok)).await
    }

    /// Reads a CSV catalogue with a header row and imports it.
    ///
    /// Columns are matched by header name; `name`, `sku`, `purchase_price`
    /// and `selling_price` must be present.
    pub async fn import_csv<R: io::Read>(&self, reader: R) -> ServiceResult<ImportReport> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| ServiceError::validation(format!("Unreadable CSV header: {}", e)))?
            .clone();
        for column in ["name", "sku", "purchase_price", "selling_price"] {
            if !headers.iter().any(|h| h == column) {
                return Err(ServiceError::validation(format!(
                    "CSV header is missing the '{}' column",
                    column
                )));
            }
        }

        let rows: Vec<Result<CatalogueRow, String>> = csv_reader
            .deserialize::<CatalogueRow>()
            .map(|row| row.map_err(|e| format!("unreadable row: {}", e)))
            .collect();

        self.import_parsed(rows).await
    }

    async fn import_parsed(
        &self,
        rows: impl IntoIterator<Item = Result<CatalogueRow, String>>,
    ) -> ServiceResult<ImportReport> {
        let mut report = ImportReport::default();

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            let outcome = match row {
                Ok(row) => self.import_row(row).await?,
                Err(reason) => ImportOutcome::Skipped(reason),
            };

            if let ImportOutcome::Skipped(reason) = &outcome {
                warn!(row = row_number, reason = %reason, "Import row skipped");
            }
            report.rows.push(ImportRow { row_number, outcome });
        }

        info!(
            imported = report.imported_count(),
            skipped = report.skipped_count(),
            "Catalogue import finished"
        );
        Ok(report)
    }

    async fn import_row(&self, row: CatalogueRow) -> ServiceResult<ImportOutcome> {
        let new = match row.into_new_product() {
            Ok(new) => new,
            Err(e) => return Ok(ImportOutcome::Skipped(e.to_string())),
        };
        if let Some(category) = &new.category {
            if let Err(e) = validate_category_name(category) {
                return Ok(ImportOutcome::Skipped(e.to_string()));
            }
        }

        match self.products.insert(&new, InventoryReason::Import).await {
            Ok(product) => {
                debug!(sku = %product.sku, "Imported product");
                Ok(ImportOutcome::Imported(product.sku))
            }
            Err(e @ DbError::UniqueViolation { .. }) => {
                Ok(ImportOutcome::Skipped(ServiceError::from(e).to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Active products as catalogue rows, ordered by SKU.
    pub async fn export_rows(&self) -> ServiceResult<Vec<CatalogueRow>> {
        let products = self.products.list_active().await?;
        Ok(products.iter().map(CatalogueRow::from_product).collect())
    }

    /// Writes the active catalogue as CSV with a header row and returns the
    /// number of data rows.
    pub async fn export_csv<W: io::Write>(&self, writer: W) -> ServiceResult<usize> {
        let rows = self.export_rows().await?;
        let write_failed = |e: csv::Error| ServiceError::Storage(format!("CSV write failed: {}", e));

        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(CATALOGUE_COLUMNS).map_err(write_failed)?;
        for row in &rows {
            csv_writer.serialize(row).map_err(write_failed)?;
        }
        csv_writer
            .flush()
            .map_err(|e| ServiceError::Storage(format!("CSV write failed: {}", e)))?;

        info!(rows = rows.len(), "Catalogue exported");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::Money;
    use till_db::DbConfig;

    async fn service(policy: DeletePolicy) -> CatalogueService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        CatalogueService::new(db, policy)
    }

    fn cola() -> NewProduct {
        NewProduct::new("Cola", "A1", Money::from_cents(50), Money::from_cents(100))
            .with_stock(10)
            .with_category("Drinks")
    }

    fn row(name: &str, sku: &str, purchase: &str, selling: &str, stock: &str) -> CatalogueRow {
        CatalogueRow {
            name: name.to_string(),
            sku: sku.to_string(),
            purchase_price: purchase.to_string(),
            selling_price: selling.to_string(),
            stock: stock.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_duplicate_sku() {
        let catalogue = service(DeletePolicy::Restrict).await;
        let product = catalogue.create(cola()).await.unwrap();
        assert_eq!(product.category.as_deref(), Some("Drinks"));

        let err = catalogue
            .create(NewProduct::new("Other", "A1", Money::zero(), Money::from_cents(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let unchanged = catalogue.get("A1").await.unwrap();
        assert_eq!(unchanged.name, "Cola");

        let history = catalogue.stock_history("A1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].delta, 10);
        assert_eq!(history[0].reason, InventoryReason::Adjustment);
    }

    #[tokio::test]
    async fn test_create_rejects_negative_price() {
        let catalogue = service(DeletePolicy::Restrict).await;
        let err = catalogue
            .create(NewProduct::new("Cola", "A1", Money::from_cents(-1), Money::from_cents(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_price_above_ceiling() {
        let catalogue = service(DeletePolicy::Restrict).await;
        let top = Money::from_cents(till_core::MAX_PRICE_CENTS);

        let err = catalogue
            .create(NewProduct::new("Gold", "G1", top, top + Money::from_cents(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let created = catalogue
            .create(NewProduct::new("Gold", "G1", top, top).with_stock(till_core::MAX_STOCK))
            .await
            .unwrap();
        assert_eq!(created.selling_price_cents, till_core::MAX_PRICE_CENTS);
    }

    #[tokio::test]
    async fn test_edit_logs_stock_delta() {
        let catalogue = service(DeletePolicy::Restrict).await;
        catalogue.create(cola()).await.unwrap();

        let update = ProductUpdate {
            stock: Some(4),
            selling_price: Some(Money::from_cents(120)),
            ..Default::default()
        };
        let product = catalogue.edit("A1", update).await.unwrap();
        assert_eq!(product.stock, 4);
        assert_eq!(product.selling_price_cents, 120);

        let history = catalogue.stock_history("A1").await.unwrap();
        assert_eq!(history.last().map(|e| e.delta), Some(-6));

        let missing = catalogue.edit("ZZ", ProductUpdate::default()).await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_edit_to_existing_sku_fails() {
        let catalogue = service(DeletePolicy::Restrict).await;
        catalogue.create(cola()).await.unwrap();
        catalogue
            .create(NewProduct::new("Water", "B2", Money::from_cents(20), Money::from_cents(60)))
            .await
            .unwrap();

        let update = ProductUpdate {
            sku: Some("A1".to_string()),
            ..Default::default()
        };
        let err = catalogue.edit("B2", update).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(catalogue.get("B2").await.unwrap().name, "Water");
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_ordered() {
        let catalogue = service(DeletePolicy::Restrict).await;
        for (name, sku) in [("Diet Cola", "C2"), ("Cola", "C1"), ("Water", "W1")] {
            catalogue
                .create(NewProduct::new(name, sku, Money::zero(), Money::from_cents(100)))
                .await
                .unwrap();
        }

        let found: Vec<String> = catalogue
            .search("COLA")
            .map(|p| p.unwrap().sku)
            .collect()
            .await;
        assert_eq!(found, vec!["C1", "C2"]);

        let all = catalogue.search("").count().await;
        assert_eq!(all, 3);
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let catalogue = service(DeletePolicy::Restrict).await;
        catalogue.create(cola()).await.unwrap();

        assert_eq!(catalogue.adjust_stock("A1", 5, Some("delivery")).await.unwrap(), 15);

        let err = catalogue.adjust_stock("A1", -16, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { available: 15, .. }));
        assert_eq!(catalogue.get("A1").await.unwrap().stock, 15);

        let zero = catalogue.adjust_stock("A1", 0, None).await.unwrap_err();
        assert!(matches!(zero, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_adjust_stock_rejects_extreme_deltas() {
        let catalogue = service(DeletePolicy::Restrict).await;
        catalogue.create(cola()).await.unwrap();

        for delta in [i64::MAX, i64::MIN, till_core::MAX_STOCK + 1] {
            let err = catalogue.adjust_stock("A1", delta, None).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{delta}: {err:?}");
        }

        // In range on its own, but the result would exceed the stock ceiling.
        let err = catalogue
            .adjust_stock("A1", till_core::MAX_STOCK, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(catalogue.get("A1").await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_delete_policies() {
        let restrict = service(DeletePolicy::Restrict).await;
        restrict.create(cola()).await.unwrap();
        assert_eq!(restrict.delete("A1").await.unwrap(), DeleteOutcome::Deleted);
        assert!(matches!(
            restrict.get("A1").await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(matches!(
            restrict.delete("A1").await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));

        let archive = service(DeletePolicy::Archive).await;
        archive.create(cola()).await.unwrap();
        assert_eq!(archive.delete("A1").await.unwrap(), DeleteOutcome::Archived);
        assert!(!archive.get("A1").await.unwrap().is_active);
        assert_eq!(archive.search("cola").count().await, 0);
    }

    #[tokio::test]
    async fn test_import_rows_reports_each_row() {
        let catalogue = service(DeletePolicy::Restrict).await;

        let report = catalogue
            .import_rows(vec![
                row("Cola", "A1", "0.50", "1.00", "24"),
                row("Crisps", "", "0.40", "0.90", ""),
                row("Cola Zero", "A1", "0.50", "1.00", ""),
                row("Water", "W1", "abc", "0.60", ""),
                row("Gum", "G1", "0.10", "0.30", ""),
            ])
            .await
            .unwrap();

        assert_eq!(report.rows.len(), 5);
        assert_eq!(report.imported_count(), 2);
        assert_eq!(report.rows[0].outcome, ImportOutcome::Imported("A1".to_string()));
        let skipped: Vec<usize> = report.skipped().map(|(n, _)| n).collect();
        assert_eq!(skipped, vec![2, 3, 4]);

        let history = catalogue.stock_history("A1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, InventoryReason::Import);
        assert!(catalogue.stock_history("G1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_csv_round_trip() {
        let source = service(DeletePolicy::Restrict).await;
        source.create(cola()).await.unwrap();
        source
            .create(
                NewProduct::new("Water", "B2", Money::from_cents(20), Money::from_cents(60))
                    .with_min_stock(3),
            )
            .await
            .unwrap();

        let mut buffer = Vec::new();
        assert_eq!(source.export_csv(&mut buffer).await.unwrap(), 2);
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with(
            "name,sku,purchase_price,selling_price,stock,category,supplier,description,image_path,min_stock\n"
        ));
        assert!(text.contains("Cola,A1,0.50,1.00,10,Drinks,,,,0\n"));

        let target = service(DeletePolicy::Restrict).await;
        let report = target.import_csv(buffer.as_slice()).await.unwrap();
        assert_eq!(report.imported_count(), 2);
        assert_eq!(target.export_rows().await.unwrap(), source.export_rows().await.unwrap());
    }

    #[tokio::test]
    async fn test_import_csv_requires_columns() {
        let catalogue = service(DeletePolicy::Restrict).await;
        let err = catalogue
            .import_csv("title,code\nCola,A1\n".as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_import_csv_short_rows() {
        let catalogue = service(DeletePolicy::Restrict).await;
        let csv = "name,sku,purchase_price,selling_price,stock\nCola,A1,0.50,1.00\nGum,G1\n";

        let report = catalogue.import_csv(csv.as_bytes()).await.unwrap();

        assert_eq!(report.imported_count(), 1);
        assert_eq!(catalogue.get("A1").await.unwrap().stock, 0);
        assert_eq!(report.skipped().count(), 1);
    }

    #[tokio::test]
    async fn test_categories() {
        let catalogue = service(DeletePolicy::Restrict).await;
        catalogue.add_category("Snacks", Some("  ")).await.unwrap();
        catalogue.create(cola()).await.unwrap();

        let names: Vec<String> = catalogue
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Drinks", "Snacks"]);

        let err = catalogue.add_category("Snacks", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
