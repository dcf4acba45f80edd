//! Transfer service - the transfer engine
//!
//! Moves a positive amount from one account to another and records it.
//! A transfer is validated against freshly read balances while both
//! accounts are locked, then committed through the store as a single
//! atomic write (two balances plus one transaction record).

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::DEFAULT_MAX_CONFLICT_RETRIES;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountSummary, NewTransaction, TransactionRecord};
use crate::ports::LedgerStore;
use crate::services::locks::AccountLocks;

/// Outcome of a successful transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub message: String,
    /// Source account after the debit
    pub account: AccountSummary,
    pub transaction: TransactionRecord,
}

/// Both sides of a validated transfer, with their new balances applied
struct TransferPlan {
    debit: Account,
    credit: Account,
    record: NewTransaction,
}

/// Transfer engine
pub struct TransferService {
    store: Arc<dyn LedgerStore>,
    locks: AccountLocks,
    max_conflict_retries: u32,
}

impl TransferService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self::with_max_retries(store, DEFAULT_MAX_CONFLICT_RETRIES)
    }

    pub fn with_max_retries(store: Arc<dyn LedgerStore>, max_conflict_retries: u32) -> Self {
        Self {
            store,
            locks: AccountLocks::new(),
            max_conflict_retries,
        }
    }

    /// Transfer from the caller's own account
    ///
    /// A user without an account is reported as `SourceNotFound`.
    pub fn transfer_from_user(
        &self,
        user_id: Uuid,
        destination: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt> {
        Self::validate_amount(amount)?;
        let source = self
            .store
            .get_account_by_user(user_id)?
            .ok_or_else(|| Error::SourceNotFound(format!("no account for user {user_id}")))?;
        self.transfer(&source.account_number, destination, amount)
    }

    /// Move `amount` from `source` to `destination`
    ///
    /// Checks run in order and the first failure wins: amount, source,
    /// destination, self-transfer, funds. Validation failures are never
    /// retried; write conflicts are retried up to the configured bound.
    pub fn transfer(&self, source: &str, destination: &str, amount: Decimal) -> Result<TransferReceipt> {
        Self::validate_amount(amount)?;

        let _guard = self.locks.acquire(&[source, destination]);

        let mut attempt = 0;
        loop {
            let plan = self.plan(source, destination, amount)?;

            match self.store.commit_transfer(&plan.debit, &plan.credit, &plan.record) {
                Ok(transaction) => {
                    return Ok(TransferReceipt {
                        message: format!("Transfer successful: ${} to {}", amount, destination),
                        account: plan.debit.summary(),
                        transaction,
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    tracing::warn!(
                        source,
                        destination,
                        attempt,
                        max = self.max_conflict_retries,
                        "transfer conflicted, retrying: {e}"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn validate_amount(amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "amount must be positive, got {amount}"
            )));
        }
        Ok(())
    }

    /// Read current state and compute the new balances
    fn plan(&self, source: &str, destination: &str, amount: Decimal) -> Result<TransferPlan> {
        let from = self
            .store
            .get_account_by_number(source)?
            .ok_or_else(|| Error::SourceNotFound(source.to_string()))?;
        let to = self
            .store
            .get_account_by_number(destination)?
            .ok_or_else(|| Error::DestinationNotFound(destination.to_string()))?;

        if from.account_number == to.account_number {
            return Err(Error::SelfTransfer(from.account_number));
        }

        if from.balance < amount {
            return Err(Error::InsufficientFunds {
                available: from.balance,
                requested: amount,
            });
        }

        let debited = from.balance - amount;
        let credited = to.balance.checked_add(amount).ok_or_else(|| {
            Error::InvalidAmount(format!("amount {amount} overflows destination balance"))
        })?;

        Ok(TransferPlan {
            record: NewTransaction::transfer(&from.account_number, &to.account_number, amount),
            debit: from.with_balance(debited),
            credit: to.with_balance(credited),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbStore;
    use crate::adapters::mock::{FailureMode, ScriptedStore};
    use crate::domain::TransactionKind;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn setup() -> (Arc<DuckDbStore>, TransferService) {
        let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
        store.ensure_schema().unwrap();
        let service = TransferService::new(store.clone());
        (store, service)
    }

    fn open(store: &DuckDbStore, balance: &str) -> Account {
        store
            .create_account_if_absent(&Account::open(Uuid::new_v4(), dec(balance)))
            .unwrap()
    }

    fn balance(store: &DuckDbStore, account: &Account) -> Decimal {
        store
            .get_account_by_number(&account.account_number)
            .unwrap()
            .unwrap()
            .balance
    }

    #[test]
    fn test_transfer_moves_funds_and_records() {
        let (store, service) = setup();
        let a = open(&store, "1000");
        let b = open(&store, "500");

        let receipt = service
            .transfer(&a.account_number, &b.account_number, dec("300"))
            .unwrap();

        assert_eq!(receipt.account.balance, dec("700"));
        assert_eq!(receipt.account.account_number, a.account_number);
        assert_eq!(receipt.transaction.kind, TransactionKind::Transfer);
        assert_eq!(receipt.transaction.amount, dec("300"));
        assert_eq!(receipt.message, format!("Transfer successful: $300 to {}", b.account_number));
        assert_eq!(balance(&store, &a), dec("700"));
        assert_eq!(balance(&store, &b), dec("800"));
        assert_eq!(store.count_transactions().unwrap(), 1);
    }

    #[test]
    fn test_draining_to_zero_is_allowed() {
        let (store, service) = setup();
        let a = open(&store, "100");
        let b = open(&store, "0");

        service.transfer(&a.account_number, &b.account_number, dec("100")).unwrap();
        assert_eq!(balance(&store, &a), Decimal::ZERO);
        assert_eq!(balance(&store, &b), dec("100"));
    }

    #[test]
    fn test_insufficient_funds_changes_nothing() {
        let (store, service) = setup();
        let a = open(&store, "100");
        let b = open(&store, "500");

        let err = service
            .transfer(&a.account_number, &b.account_number, dec("150"))
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(balance(&store, &a), dec("100"));
        assert_eq!(balance(&store, &b), dec("500"));
        assert_eq!(store.count_transactions().unwrap(), 0);
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let (store, service) = setup();
        let a = open(&store, "100");
        let b = open(&store, "100");

        for amount in ["0", "-5", "-0.01"] {
            let err = service
                .transfer(&a.account_number, &b.account_number, dec(amount))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidAmount(_)), "{amount}");
        }
        assert_eq!(store.count_transactions().unwrap(), 0);
    }

    #[test]
    fn test_invalid_amount_wins_over_missing_accounts() {
        let (_store, service) = setup();
        let err = service
            .transfer("ACC000000000001", "ACC000000000002", Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_missing_destination() {
        let (store, service) = setup();
        let a = open(&store, "100");

        let err = service
            .transfer(&a.account_number, "ACC999999999999", dec("10"))
            .unwrap_err();
        assert!(matches!(err, Error::DestinationNotFound(ref n) if n == "ACC999999999999"));
        assert_eq!(balance(&store, &a), dec("100"));
    }

    #[test]
    fn test_rejected_transfers_leave_no_lock_slots() {
        let (store, service) = setup();
        let a = open(&store, "100");
        let b = open(&store, "0");

        for i in 0..200 {
            let err = service
                .transfer(&a.account_number, &format!("UNKNOWN{i}"), dec("1"))
                .unwrap_err();
            assert!(matches!(err, Error::DestinationNotFound(_)));
        }
        service.transfer(&a.account_number, &b.account_number, dec("1")).unwrap();

        assert!(service.locks.is_empty());
    }

    #[test]
    fn test_receipt_matches_stored_record() {
        let (store, service) = setup();
        let a = open(&store, "100");
        let b = open(&store, "0");

        let receipt = service.transfer(&a.account_number, &b.account_number, dec("12.34")).unwrap();
        let stored = store.list_transactions_for_account(&a.account_number).unwrap();
        assert_eq!(stored, vec![receipt.transaction]);
    }

    #[test]
    fn test_missing_source() {
        let (store, service) = setup();
        let b = open(&store, "100");

        let err = service
            .transfer("ACC999999999999", &b.account_number, dec("10"))
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }

    #[test]
    fn test_self_transfer_rejected() {
        let (store, service) = setup();
        let a = open(&store, "100");

        let err = service
            .transfer(&a.account_number, &a.account_number, dec("10"))
            .unwrap_err();
        assert!(matches!(err, Error::SelfTransfer(_)));
        assert_eq!(store.count_transactions().unwrap(), 0);
    }

    #[test]
    fn test_transfer_from_user_without_account() {
        let (store, service) = setup();
        let b = open(&store, "100");

        let err = service
            .transfer_from_user(Uuid::new_v4(), &b.account_number, dec("10"))
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }

    #[test]
    fn test_transfer_from_user() {
        let (store, service) = setup();
        let a = open(&store, "50.25");
        let b = open(&store, "0");

        let receipt = service
            .transfer_from_user(a.owner_id, &b.account_number, dec("0.25"))
            .unwrap();
        assert_eq!(receipt.account.balance, dec("50.00"));
        assert_eq!(balance(&store, &b), dec("0.25"));
    }

    #[test]
    fn test_conflicts_within_bound_are_retried() {
        let inner = Arc::new(DuckDbStore::open_in_memory().unwrap());
        inner.ensure_schema().unwrap();
        let a = open(&inner, "1000");
        let b = open(&inner, "500");

        let scripted = Arc::new(ScriptedStore::new(inner.clone()));
        scripted.fail_commits(FailureMode::Conflict, 2);
        let service = TransferService::with_max_retries(scripted.clone(), 2);

        service.transfer(&a.account_number, &b.account_number, dec("300")).unwrap();

        assert_eq!(scripted.commit_attempts(), 3);
        assert_eq!(balance(&inner, &a), dec("700"));
        assert_eq!(balance(&inner, &b), dec("800"));
    }

    #[test]
    fn test_conflicts_beyond_bound_surface() {
        let inner = Arc::new(DuckDbStore::open_in_memory().unwrap());
        inner.ensure_schema().unwrap();
        let a = open(&inner, "1000");
        let b = open(&inner, "500");

        let scripted = Arc::new(ScriptedStore::new(inner.clone()));
        scripted.fail_commits(FailureMode::Conflict, 10);
        let service = TransferService::with_max_retries(scripted.clone(), 3);

        let err = service
            .transfer(&a.account_number, &b.account_number, dec("300"))
            .unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(scripted.commit_attempts(), 4);
        assert_eq!(balance(&inner, &a), dec("1000"));
        assert_eq!(inner.count_transactions().unwrap(), 0);
    }

    #[test]
    fn test_store_failures_are_not_retried() {
        let inner = Arc::new(DuckDbStore::open_in_memory().unwrap());
        inner.ensure_schema().unwrap();
        let a = open(&inner, "1000");
        let b = open(&inner, "500");

        let scripted = Arc::new(ScriptedStore::new(inner.clone()));
        scripted.fail_commits(FailureMode::Unavailable, 1);
        let service = TransferService::new(scripted.clone());

        let err = service
            .transfer(&a.account_number, &b.account_number, dec("300"))
            .unwrap_err();

        assert!(matches!(err, Error::Database(_)));
        assert_eq!(scripted.commit_attempts(), 1);
        assert_eq!(balance(&inner, &b), dec("500"));
    }

    #[test]
    fn test_validation_failures_attempted_once() {
        let inner = Arc::new(DuckDbStore::open_in_memory().unwrap());
        inner.ensure_schema().unwrap();
        let a = open(&inner, "10");
        let b = open(&inner, "0");

        let scripted = Arc::new(ScriptedStore::new(inner.clone()));
        let service = TransferService::new(scripted.clone());

        let err = service
            .transfer(&a.account_number, &b.account_number, dec("11"))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(scripted.commit_attempts(), 0);
    }

    #[test]
    fn test_retry_rereads_state_written_by_another_writer() {
        let inner = Arc::new(DuckDbStore::open_in_memory().unwrap());
        inner.ensure_schema().unwrap();
        let a = open(&inner, "100");
        let b = open(&inner, "0");

        // Another writer drains the source between the read and the commit
        let scripted = Arc::new(ScriptedStore::new(inner.clone()));
        let drained = a.with_balance(dec("5"));
        scripted.before_first_commit(move |store| {
            store.save_account(&drained).map(|_| ())
        });
        let service = TransferService::new(scripted.clone());

        let err = service
            .transfer(&a.account_number, &b.account_number, dec("50"))
            .unwrap_err();

        // The retry sees the new balance and rejects on funds
        assert!(matches!(err, Error::InsufficientFunds { available, .. } if available == dec("5")));
        assert_eq!(balance(&inner, &a), dec("5"));
        assert_eq!(balance(&inner, &b), Decimal::ZERO);
    }
}
