//! # Application Configuration
//!
//! Loaded once at startup from `TILL_*` environment variables over defaults,
//! read-only afterwards.
//!
//! | Variable               | Default                          |
//! |------------------------|----------------------------------|
//! | `TILL_DB_PATH`         | `<platform data dir>/till.db`    |
//! | `TILL_TAX_RATE`        | `7` (percent)                    |
//! | `TILL_STORE_NAME`      | `Till POS`                       |
//! | `TILL_CURRENCY_SYMBOL` | `$`                              |
//! | `TILL_DELETE_POLICY`   | `restrict` (or `archive`)        |

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use till_core::validation::validate_tax_rate_bps;
use till_core::{Money, TaxRate};

/// Default tax rate in basis points (7%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 700;

/// What deleting a product does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Remove products that were never sold; refuse the rest.
    #[default]
    Restrict,

    /// Hide the product (`is_active = 0`) and keep its row and SKU.
    Archive,
}

impl DeletePolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeletePolicy::Restrict => "restrict",
            DeletePolicy::Archive => "archive",
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "restrict" => Ok(DeletePolicy::Restrict),
            "archive" => Ok(DeletePolicy::Archive),
            other => Err(ConfigError::InvalidValue {
                key: "TILL_DELETE_POLICY".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file.
    pub db_path: PathBuf,

    /// Tax applied to the discounted subtotal at checkout.
    pub tax_rate: TaxRate,

    /// Printed on receipts and the login banner.
    pub store_name: String,

    pub currency_symbol: String,

    pub delete_policy: DeletePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: default_database_path(),
            tax_rate: TaxRate::from_bps(DEFAULT_TAX_RATE_BPS),
            store_name: "Till POS".to_string(),
            currency_symbol: "$".to_string(),
            delete_policy: DeletePolicy::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key lookup. Unset and blank keys keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = AppConfig::default();

        if let Some(path) = get("TILL_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(raw) = get("TILL_TAX_RATE") {
            config.tax_rate = parse_tax_rate(&raw)?;
        }

        if let Some(name) = get("TILL_STORE_NAME") {
            config.store_name = name.trim().to_string();
        }

        if let Some(symbol) = get("TILL_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol.trim().to_string();
        }

        if let Some(policy) = get("TILL_DELETE_POLICY") {
            config.delete_policy = policy.parse()?;
        }

        Ok(config)
    }

    /// Formats an amount with the configured currency symbol: `$19.44`,
    /// `-$2.00`.
    pub fn format_currency(&self, amount: Money) -> String {
        if amount.is_negative() {
            format!("-{}{}", self.currency_symbol, amount.abs())
        } else {
            format!("{}{}", self.currency_symbol, amount)
        }
    }
}

/// Parses a percentage such as `7`, `8.25` or `8.25%`.
fn parse_tax_rate(raw: &str) -> Result<TaxRate, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: "TILL_TAX_RATE".to_string(),
        value: raw.to_string(),
    };

    let pct: f64 = raw
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse()
        .map_err(|_| invalid())?;

    if !pct.is_finite() || pct < 0.0 {
        return Err(invalid());
    }

    let rate = TaxRate::from_percentage(pct);
    validate_tax_rate_bps(rate.bps()).map_err(|_| invalid())?;
    Ok(rate)
}

/// `till.db` in the platform data directory, or the working directory when
/// there is none.
///
/// - **Linux**: `~/.local/share/till-pos/till.db`
/// - **macOS**: `~/Library/Application Support/com.till.pos/till.db`
/// - **Windows**: `%APPDATA%\till\pos\data\till.db`
pub fn default_database_path() -> PathBuf {
    ProjectDirs::from("com", "till", "pos")
        .map(|dirs| dirs.data_dir().join("till.db"))
        .unwrap_or_else(|| PathBuf::from("till.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.tax_rate.bps(), 700);
        assert_eq!(config.store_name, "Till POS");
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.delete_policy, DeletePolicy::Restrict);
        assert!(config.db_path.ends_with("till.db"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TILL_DB_PATH", "/tmp/shop.db"),
            ("TILL_TAX_RATE", "8.25%"),
            ("TILL_STORE_NAME", " Corner Shop "),
            ("TILL_CURRENCY_SYMBOL", "€"),
            ("TILL_DELETE_POLICY", "Archive"),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.tax_rate.bps(), 825);
        assert_eq!(config.store_name, "Corner Shop");
        assert_eq!(config.currency_symbol, "€");
        assert_eq!(config.delete_policy, DeletePolicy::Archive);
    }

    #[test]
    fn test_blank_keeps_default() {
        let config = AppConfig::from_lookup(lookup(&[("TILL_TAX_RATE", "  ")])).unwrap();
        assert_eq!(config.tax_rate.bps(), DEFAULT_TAX_RATE_BPS);
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("TILL_TAX_RATE", "seven"),
            ("TILL_TAX_RATE", "-1"),
            ("TILL_TAX_RATE", "250"),
            ("TILL_DELETE_POLICY", "cascade"),
        ] {
            let err = AppConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { key: ref k, .. } if k == key));
        }
    }

    #[test]
    fn test_format_currency() {
        let config = AppConfig::default();
        assert_eq!(config.format_currency(Money::from_cents(1944)), "$19.44");
        assert_eq!(config.format_currency(Money::from_cents(-200)), "-$2.00");
        assert_eq!(config.format_currency(Money::zero()), "$0.00");
    }
}
