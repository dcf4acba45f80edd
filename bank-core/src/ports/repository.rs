//! Store ports - persistence abstraction
//!
//! Services depend on these traits only. The DuckDB adapter is the
//! production implementation; tests may substitute their own.

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, NewTransaction, TransactionRecord, User};

/// Durable holder of accounts and transactions
///
/// Every lookup returns `Option` so callers must handle absence. Balance
/// writes are version-checked: writing an account whose `version` no longer
/// matches the stored row fails with `Error::Conflict` and changes nothing.
pub trait LedgerStore: Send + Sync {
    // === Accounts ===

    /// Get the account owned by a user
    fn get_account_by_user(&self, user_id: Uuid) -> Result<Option<Account>>;

    /// Get an account by its number
    fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>>;

    /// Insert the account unless its owner already has one
    ///
    /// Returns whichever account the owner holds after the call. Concurrent
    /// callers for the same owner all observe the same account.
    fn create_account_if_absent(&self, account: &Account) -> Result<Account>;

    /// Write an account's balance, checked against its version
    fn save_account(&self, account: &Account) -> Result<Account>;

    // === Transactions ===

    /// Append a transaction record on its own
    fn append_transaction(&self, tx: &NewTransaction) -> Result<TransactionRecord>;

    /// Write both balances and append the record as one atomic commit
    ///
    /// `debit` and `credit` carry the new balances and the versions that were
    /// read. Either all three writes become visible or none do.
    fn commit_transfer(
        &self,
        debit: &Account,
        credit: &Account,
        tx: &NewTransaction,
    ) -> Result<TransactionRecord>;

    /// All transactions where the account is either party, newest first
    fn list_transactions_for_account(&self, account_number: &str) -> Result<Vec<TransactionRecord>>;
}

/// Credential and session storage
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with a validation error when the username is taken
    fn insert_user(&self, user: &User) -> Result<()>;

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Store a session by token digest
    fn insert_session(&self, token_digest: &str, user_id: Uuid) -> Result<()>;

    /// Resolve a token digest to its user
    fn get_session_user(&self, token_digest: &str) -> Result<Option<Uuid>>;

    /// Returns true if a session was removed
    fn delete_session(&self, token_digest: &str) -> Result<bool>;
}
