//! Account service - lazy account provisioning

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::Account;
use crate::ports::LedgerStore;

/// Fresh account numbers tried before provisioning gives up
const MAX_NUMBER_ATTEMPTS: u32 = 3;

/// Provisions and looks up the single account each user owns
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    starting_balance: Decimal,
}

impl AccountService {
    pub fn new(store: Arc<dyn LedgerStore>, starting_balance: Decimal) -> Self {
        Self {
            store,
            starting_balance,
        }
    }

    /// Return the user's account, creating it with the starting balance if absent
    ///
    /// Safe to call concurrently for the same user: every caller receives the
    /// same account and at most one is ever created.
    pub fn get_or_create_account(&self, user_id: Uuid) -> Result<Account> {
        self.provision(user_id).map(|(account, _)| account)
    }

    /// Like [`Self::get_or_create_account`], also reporting whether this call
    /// created the account
    pub fn provision(&self, user_id: Uuid) -> Result<(Account, bool)> {
        if let Some(existing) = self.store.get_account_by_user(user_id)? {
            return Ok((existing, false));
        }

        if self.starting_balance.is_sign_negative() {
            return Err(Error::Config("starting balance cannot be negative".to_string()));
        }

        let mut attempt = 1;
        loop {
            let candidate = Account::open(user_id, self.starting_balance);
            match self.store.create_account_if_absent(&candidate) {
                Ok(account) => {
                    let created = account.account_number == candidate.account_number;
                    if created {
                        tracing::info!(account = %account.account_number, %user_id, "account provisioned");
                    }
                    return Ok((account, created));
                }
                // Only a clash on the generated number is a conflict here
                Err(e) if e.is_retryable() && attempt < MAX_NUMBER_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(%user_id, attempt, "account number taken, regenerating: {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read-only lookup; never creates
    pub fn get_account(&self, user_id: Uuid) -> Result<Option<Account>> {
        self.store.get_account_by_user(user_id)
    }
}
