//! # Domain Services
//!
//! The operations the text interface calls. Services validate input,
//! apply role rules where they own them, and delegate storage to the
//! `till-db` repositories, which own every transaction.
//!
//! ```text
//! Services
//! ├── catalogue  ◄─── products, categories, stock, CSV import/export
//! ├── checkout   ◄─── cart → sale, receipts, held carts
//! ├── reports    ◄─── sales summary, best sellers, valuation
//! └── users      ◄─── login, accounts, first-run admin
//! ```

pub mod catalogue;
pub mod checkout;
pub mod reports;
pub mod users;

pub use catalogue::{CatalogueService, DeleteOutcome, ImportOutcome, ImportReport, ImportRow};
pub use checkout::{CheckoutService, HeldCart, Register};
pub use reports::ReportService;
pub use users::UserService;

use till_db::Database;

use crate::config::AppConfig;

/// All services over one database, configured from `AppConfig`.
#[derive(Debug, Clone)]
pub struct Services {
    pub catalogue: CatalogueService,
    pub checkout: CheckoutService,
    pub reports: ReportService,
    pub users: UserService,
}

impl Services {
    pub fn new(db: &Database, config: &AppConfig) -> Self {
        Services {
            catalogue: CatalogueService::new(db.clone(), config.delete_policy),
            checkout: CheckoutService::new(db.clone(), config.tax_rate),
            reports: ReportService::new(db.clone()),
            users: UserService::new(db.clone()),
        }
    }
}
