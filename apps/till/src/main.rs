//! # Till
//!
//! Offline single-user point of sale on a local SQLite file.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (stderr, `RUST_LOG`)
//! 2. Load configuration from `TILL_*` environment variables
//! 3. Open the database and run migrations
//! 4. Seed the default admin on first run
//! 5. Run the text interface on stdin/stdout

use std::io;

use anyhow::Context;
use tracing::{info, warn};

use till::cli::{Cli, Prompt};
use till::{AppConfig, Services};
use till_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    till::init_tracing();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    info!(
        db_path = %config.db_path.display(),
        tax_rate_bps = config.tax_rate.bps(),
        delete_policy = %config.delete_policy,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(config.db_path.clone()))
        .await
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

    let services = Services::new(&db, &config);
    if let Some(admin) = services
        .users
        .ensure_default_admin()
        .await
        .context("Failed to prepare user accounts")?
    {
        warn!(
            username = %admin.username,
            "First run: default admin created, change its password after logging in"
        );
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut cli = Cli::new(services, config, Prompt::new(stdin.lock(), stdout.lock()));
    cli.run().await.context("Terminal I/O failed")?;

    db.close().await;
    info!("Database closed");
    Ok(())
}
