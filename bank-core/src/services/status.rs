//! Status service - ledger-wide counts and totals

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::result::Result;

pub struct StatusService {
    store: Arc<DuckDbStore>,
}

impl StatusService {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Get overall status summary
    ///
    /// `total_balance` only moves when accounts are provisioned; transfers
    /// leave it unchanged.
    pub fn get_status(&self) -> Result<StatusSummary> {
        Ok(StatusSummary {
            total_users: self.store.count_users()?,
            total_accounts: self.store.count_accounts()?,
            total_transactions: self.store.count_transactions()?,
            total_balance: self.store.total_balance()?,
        })
    }

    pub fn count_accounts(&self) -> Result<i64> {
        self.store.count_accounts()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub total_users: i64,
    pub total_accounts: i64,
    pub total_transactions: i64,
    pub total_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, NewTransaction};
    use crate::ports::LedgerStore;
    use uuid::Uuid;

    #[test]
    fn test_status_counts_and_total() {
        let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        let service = StatusService::new(store.clone());

        let empty = service.get_status().unwrap();
        assert_eq!(empty.total_accounts, 0);
        assert_eq!(empty.total_balance, Decimal::ZERO);

        let a = store
            .create_account_if_absent(&Account::open(Uuid::new_v4(), Decimal::new(1000, 0)))
            .unwrap();
        let b = store
            .create_account_if_absent(&Account::open(Uuid::new_v4(), Decimal::new(25050, 2)))
            .unwrap();
        store
            .commit_transfer(
                &a.with_balance(Decimal::new(900, 0)),
                &b.with_balance(Decimal::new(35050, 2)),
                &NewTransaction::transfer(&a.account_number, &b.account_number, Decimal::new(100, 0)),
            )
            .unwrap();

        let status = service.get_status().unwrap();
        assert_eq!(status.total_users, 0);
        assert_eq!(status.total_accounts, 2);
        assert_eq!(status.total_transactions, 1);
        assert_eq!(status.total_balance, Decimal::new(125050, 2));
        assert_eq!(service.count_accounts().unwrap(), 2);
    }
}
