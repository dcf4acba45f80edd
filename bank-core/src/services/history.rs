//! History service - transaction log queries

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::TransactionRecord;
use crate::ports::LedgerStore;

pub struct HistoryService {
    store: Arc<dyn LedgerStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Every record touching the account, newest first
    ///
    /// Records sharing a timestamp come back most recently inserted first.
    /// Unknown accounts yield an empty list.
    pub fn list_transactions(&self, account_number: &str) -> Result<Vec<TransactionRecord>> {
        self.store.list_transactions_for_account(account_number)
    }

    /// History of the user's own account; empty when the user has none
    pub fn list_transactions_for_user(&self, user_id: Uuid) -> Result<Vec<TransactionRecord>> {
        match self.store.get_account_by_user(user_id)? {
            Some(account) => self.list_transactions(&account.account_number),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbStore;
    use crate::domain::{Account, NewTransaction};
    use rust_decimal::Decimal;

    #[test]
    fn test_lists_both_directions() {
        let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        let a = store
            .create_account_if_absent(&Account::open(Uuid::new_v4(), Decimal::new(100, 0)))
            .unwrap();
        let service = HistoryService::new(store.clone());

        store
            .append_transaction(&NewTransaction::transfer(&a.account_number, "ACC000000000001", Decimal::ONE))
            .unwrap();
        store
            .append_transaction(&NewTransaction::transfer("ACC000000000002", &a.account_number, Decimal::TWO))
            .unwrap();
        store
            .append_transaction(&NewTransaction::transfer("ACC000000000001", "ACC000000000002", Decimal::TEN))
            .unwrap();

        let history = service.list_transactions_for_user(a.owner_id).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.involves(&a.account_number)));
    }

    #[test]
    fn test_empty_for_unknown() {
        let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        let service = HistoryService::new(store);

        assert!(service.list_transactions("ACC123456789012").unwrap().is_empty());
        assert!(service.list_transactions_for_user(Uuid::new_v4()).unwrap().is_empty());
    }
}
