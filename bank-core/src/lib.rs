//! Bank Core - ledger and transfer engine for a minimal banking backend
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, TransactionRecord, User)
//! - **ports**: Trait definitions for persistence (LedgerStore, UserStore)
//! - **services**: Business logic orchestration (transfers, provisioning, auth)
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbStore;
use config::{Config, DB_FILENAME};
use domain::result::Result;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult};
pub use domain::{Account, AccountSummary, Session, TransactionKind, TransactionRecord, User};
pub use services::{StatusSummary, TransferReceipt};

/// Main context for bank operations
///
/// Holds the store, the configuration and every service wired to that store.
pub struct BankContext {
    pub config: Config,
    pub store: Arc<DuckDbStore>,
    pub transfer_service: TransferService,
    pub account_service: AccountService,
    pub history_service: HistoryService,
    pub auth_service: AuthService,
    pub status_service: StatusService,
}

impl BankContext {
    /// Open the bank stored in `bank_dir`, creating and migrating it if needed
    pub fn new(bank_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(bank_dir)?;
        let config = Config::load(bank_dir)?;

        let store = Arc::new(DuckDbStore::new(&bank_dir.join(DB_FILENAME))?);
        store.ensure_schema()?;

        Ok(Self::from_store(config, store))
    }

    /// Wire services around an already migrated store
    pub fn from_store(config: Config, store: Arc<DuckDbStore>) -> Self {
        let transfer_service =
            TransferService::with_max_retries(store.clone(), config.max_conflict_retries);
        let account_service = AccountService::new(store.clone(), config.starting_balance);
        let history_service = HistoryService::new(store.clone());
        let auth_service = AuthService::new(store.clone());
        let status_service = StatusService::new(Arc::clone(&store));

        Self {
            config,
            store,
            transfer_service,
            account_service,
            history_service,
            auth_service,
            status_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    #[test]
    fn test_context_creates_bank_dir_and_schema() {
        let dir = tempdir().unwrap();
        let bank_dir = dir.path().join("bank");

        let ctx = BankContext::new(&bank_dir).unwrap();
        assert!(bank_dir.join(DB_FILENAME).exists());
        assert_eq!(ctx.status_service.count_accounts().unwrap(), 0);
    }

    #[test]
    fn test_context_uses_configured_starting_balance() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"ledger":{"startingBalance":"42.50"}}"#,
        )
        .unwrap();

        let ctx = BankContext::new(dir.path()).unwrap();
        let session = ctx.auth_service.register("frank", "pw", None).unwrap();
        let account = ctx.account_service.get_or_create_account(session.user_id).unwrap();
        assert_eq!(account.balance, Decimal::new(4250, 2));
    }
}
