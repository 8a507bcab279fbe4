//! # Till POS Application
//!
//! Domain services, configuration and the text interface of the `till`
//! binary.
//!
//! ## Module Organization
//! ```text
//! till/
//! ├── lib.rs          ◄─── You are here (logging setup)
//! ├── main.rs         ◄─── Startup sequence
//! ├── config.rs       ◄─── AppConfig from TILL_* variables
//! ├── error.rs        ◄─── ServiceError
//! ├── services/
//! │   ├── catalogue.rs ◄─── Products, stock, CSV
//! │   ├── checkout.rs  ◄─── Cart → sale, held carts
//! │   ├── reports.rs   ◄─── Summaries
//! │   └── users.rs     ◄─── Login and accounts
//! └── cli/
//!     ├── mod.rs      ◄─── Login loop and main menu
//!     ├── prompt.rs   ◄─── Line input/output
//!     └── *.rs        ◄─── One menu per area
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod services;

pub use config::{AppConfig, DeletePolicy};
pub use error::{ServiceError, ServiceResult};
pub use services::Services;

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so they do not interleave with the menus on stdout.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till=trace` - Show trace for till crates only
/// - Default: `info,till=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
