//! # till-core: Pure Business Logic for Till POS
//!
//! This crate is the **heart** of Till POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Till POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Text Interface (apps/till)                     │   │
//! │  │    Login ──► Products ──► Sales ──► Reports ──► Users           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       Domain Services (catalogue, checkout, reports, users)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │   rules   │  │   │
//! │  │   │   Sale    │  │  TaxRate  │  │ Discount  │  │  csv rows │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, User, InventoryLogEntry, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - The cart state machine and its totals
//! - [`catalogue_row`] - Mapping between products and CSV rows
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::Money;
//! use till_core::types::TaxRate;
//!
//! let taxable = Money::from_cents(1800); // 18.00
//! let tax = taxable.calculate_tax(TaxRate::from_bps(800)); // 8%
//! assert_eq!(tax.cents(), 144);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalogue_row;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CartState, CartTotals, Discount};
pub use catalogue_row::{CatalogueRow, CATALOGUE_COLUMNS};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in the cart.
///
/// Guards against typing 1000 instead of 10 at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest accepted unit price, in cents (10,000,000.00).
///
/// Keeps every cart and valuation total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Highest stock level a product may hold.
pub const MAX_STOCK: i64 = 1_000_000;

/// Username of the administrator seeded on first run.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Password of the administrator seeded on first run.
///
/// Publicly documented; the operator is expected to change it immediately.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
