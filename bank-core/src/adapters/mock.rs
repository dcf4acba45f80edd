//! Scripted ledger store for testing
//!
//! Wraps a real store and injects failures into `commit_transfer` and
//! `create_account_if_absent`, so retry and rollback handling can be
//! exercised deterministically:
//! - a number of leading commits fail with a conflict or a store error
//! - a hook can run against the inner store just before the first commit
//! - a number of leading account creations report a taken account number

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewTransaction, TransactionRecord};
use crate::ports::LedgerStore;

/// What a failing commit reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Another writer got there first
    Conflict,
    /// The store itself is unreachable
    Unavailable,
}

type CommitHook = Box<dyn FnOnce(&dyn LedgerStore) -> Result<()> + Send>;

/// Ledger store with scripted commit failures
pub struct ScriptedStore {
    inner: Arc<dyn LedgerStore>,
    failure: Mutex<FailureMode>,
    failures_remaining: AtomicU32,
    commit_attempts: AtomicUsize,
    hook: Mutex<Option<CommitHook>>,
    create_failures_remaining: AtomicU32,
    create_attempts: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: Arc<dyn LedgerStore>) -> Self {
        Self {
            inner,
            failure: Mutex::new(FailureMode::Conflict),
            failures_remaining: AtomicU32::new(0),
            commit_attempts: AtomicUsize::new(0),
            hook: Mutex::new(None),
            create_failures_remaining: AtomicU32::new(0),
            create_attempts: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` commits fail without touching the inner store
    pub fn fail_commits(&self, mode: FailureMode, count: u32) {
        *self.failure.lock() = mode;
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Run `hook` against the inner store right before the first commit
    pub fn before_first_commit<F>(&self, hook: F)
    where
        F: FnOnce(&dyn LedgerStore) -> Result<()> + Send + 'static,
    {
        *self.hook.lock() = Some(Box::new(hook));
    }

    /// Number of times `commit_transfer` has been called
    pub fn commit_attempts(&self) -> usize {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    /// Make the next `count` account creations collide on the account number
    pub fn fail_account_creates(&self, count: u32) {
        self.create_failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Number of times `create_account_if_absent` has been called
    pub fn create_attempts(&self) -> usize {
        self.create_attempts.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Option<FailureMode> {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|_| *self.failure.lock())
    }
}

impl LedgerStore for ScriptedStore {
    fn get_account_by_user(&self, user_id: Uuid) -> Result<Option<Account>> {
        self.inner.get_account_by_user(user_id)
    }

    fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        self.inner.get_account_by_number(account_number)
    }

    fn create_account_if_absent(&self, account: &Account) -> Result<Account> {
        self.create_attempts.fetch_add(1, Ordering::SeqCst);

        let collide = self
            .create_failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if collide {
            return Err(Error::conflict(format!(
                "account number {} is already taken",
                account.account_number
            )));
        }
        self.inner.create_account_if_absent(account)
    }

    fn save_account(&self, account: &Account) -> Result<Account> {
        self.inner.save_account(account)
    }

    fn append_transaction(&self, tx: &NewTransaction) -> Result<TransactionRecord> {
        self.inner.append_transaction(tx)
    }

    fn commit_transfer(
        &self,
        debit: &Account,
        credit: &Account,
        tx: &NewTransaction,
    ) -> Result<TransactionRecord> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(hook) = self.hook.lock().take() {
            hook(self.inner.as_ref())?;
        }

        match self.take_failure() {
            Some(FailureMode::Conflict) => Err(Error::conflict(format!(
                "account {} was modified concurrently",
                debit.account_number
            ))),
            Some(FailureMode::Unavailable) => Err(Error::database("connection reset")),
            None => self.inner.commit_transfer(debit, credit, tx),
        }
    }

    fn list_transactions_for_account(&self, account_number: &str) -> Result<Vec<TransactionRecord>> {
        self.inner.list_transactions_for_account(account_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbStore;
    use rust_decimal::Decimal;

    #[test]
    fn test_failures_are_consumed_in_order() {
        let inner = Arc::new(DuckDbStore::open_in_memory().unwrap());
        inner.ensure_schema().unwrap();
        let a = inner
            .create_account_if_absent(&Account::open(Uuid::new_v4(), Decimal::new(10, 0)))
            .unwrap();
        let b = inner
            .create_account_if_absent(&Account::open(Uuid::new_v4(), Decimal::ZERO))
            .unwrap();

        let store = ScriptedStore::new(inner.clone());
        store.fail_commits(FailureMode::Unavailable, 1);

        let tx = NewTransaction::transfer(&a.account_number, &b.account_number, Decimal::ONE);
        let debit = a.with_balance(Decimal::new(9, 0));
        let credit = b.with_balance(Decimal::ONE);

        assert!(matches!(
            store.commit_transfer(&debit, &credit, &tx),
            Err(Error::Database(_))
        ));
        assert!(store.commit_transfer(&debit, &credit, &tx).is_ok());
        assert_eq!(store.commit_attempts(), 2);
        assert_eq!(inner.count_transactions().unwrap(), 1);
    }
}
