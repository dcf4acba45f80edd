//! Configuration management
//!
//! Settings live in `settings.json` inside the bank directory:
//! ```json
//! {
//!   "ledger": { "startingBalance": "1000", "maxConflictRetries": 3 }
//! }
//! ```
//! Unknown keys are ignored.

use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::result::{Error, Result};

/// Default balance for newly provisioned accounts
pub const DEFAULT_STARTING_BALANCE: i64 = 1000;

/// Default bound on internal retries of conflicting transfers
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Database file name inside the bank directory
pub const DB_FILENAME: &str = "bank.duckdb";

/// Raw settings.json structure
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default)]
    starting_balance: Option<Decimal>,
    #[serde(default)]
    max_conflict_retries: Option<u32>,
}

/// Bank configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Opening balance for accounts created by provisioning
    pub starting_balance: Decimal,
    /// How many times a transfer is retried after a write conflict
    pub max_conflict_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::new(DEFAULT_STARTING_BALANCE, 0),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl Config {
    /// Load config from the bank directory
    ///
    /// Environment variables take precedence over the settings file:
    /// `BANK_STARTING_BALANCE` and `BANK_MAX_CONFLICT_RETRIES`.
    pub fn load(bank_dir: &Path) -> Result<Self> {
        let settings_path = bank_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)?
        } else {
            SettingsFile::default()
        };

        let mut config = Self {
            starting_balance: raw
                .ledger
                .starting_balance
                .unwrap_or_else(|| Decimal::new(DEFAULT_STARTING_BALANCE, 0)),
            max_conflict_retries: raw
                .ledger
                .max_conflict_retries
                .unwrap_or(DEFAULT_MAX_CONFLICT_RETRIES),
        };

        if let Ok(value) = std::env::var("BANK_STARTING_BALANCE") {
            config.starting_balance = Decimal::from_str(value.trim()).map_err(|e| {
                Error::Config(format!("BANK_STARTING_BALANCE is not a decimal: {e}"))
            })?;
        }
        if let Ok(value) = std::env::var("BANK_MAX_CONFLICT_RETRIES") {
            config.max_conflict_retries = value.trim().parse().map_err(|e| {
                Error::Config(format!("BANK_MAX_CONFLICT_RETRIES is not a number: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.starting_balance.is_sign_negative() {
            return Err(Error::Config("starting balance cannot be negative".to_string()));
        }
        Ok(())
    }
}
