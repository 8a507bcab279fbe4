//! # Repository Module
//!
//! Database repository implementations for Till POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Domain service                                                        │
//! │       │                                                                 │
//! │       │  db.products().get_by_sku("A1")                                 │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── search(&self, query)       → lazy stream                          │
//! │  ├── get_by_sku(&self, sku)                                            │
//! │  ├── insert(&self, new, reason) → one transaction                      │
//! │  └── update(&self, product)     → one transaction                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every multi-row write begins, commits or rolls back its own           │
//! │  transaction here. Services never hold a transaction.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and search
//! - [`CategoryRepository`](category::CategoryRepository) - Categories
//! - [`UserRepository`](user::UserRepository) - Accounts and password hashes
//! - [`SaleRepository`](sale::SaleRepository) - Checkout finalization and receipts
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock adjustments and the log
//! - [`ReportRepository`](report::ReportRepository) - Sales and stock aggregates

use sqlx::{Sqlite, Transaction};
use tracing::warn;

pub mod category;
pub mod inventory;
pub mod product;
pub mod report;
pub mod sale;
pub mod user;

/// Rolls back `tx` on an error path. A failed rollback is logged, never
/// returned, so the caller still sees the error that aborted the write.
pub(crate) async fn rollback(tx: Transaction<'_, Sqlite>) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
}
