//! Transaction domain model
//!
//! A transaction is an immutable record of a completed balance movement.
//! There is no pending state: records only exist once committed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::Error;

/// Kind of balance movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdrawal => "WITHDRAWAL",
            TransactionKind::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(TransactionKind::Deposit),
            "WITHDRAWAL" => Ok(TransactionKind::Withdrawal),
            "TRANSFER" => Ok(TransactionKind::Transfer),
            other => Err(Error::validation(format!("unknown transaction kind: {other}"))),
        }
    }
}

/// A transaction before the store has assigned it an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub timestamp: DateTime<Utc>,
}

impl NewTransaction {
    /// Build the record for a transfer, stamped now
    pub fn transfer(from_account: &str, to_account: &str, amount: Decimal) -> Self {
        Self {
            from_account: from_account.to_string(),
            to_account: to_account.to_string(),
            amount,
            kind: TransactionKind::Transfer,
            timestamp: super::now(),
        }
    }

    /// Attach the store-assigned id
    pub fn into_record(self, id: i64) -> TransactionRecord {
        TransactionRecord {
            id,
            from_account: self.from_account,
            to_account: self.to_account,
            amount: self.amount,
            kind: self.kind,
            timestamp: self.timestamp,
        }
    }
}

/// A committed, append-only transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Monotonically assigned by the store
    pub id: i64,
    /// Account number; a weak reference
    pub from_account: String,
    /// Account number; a weak reference
    pub to_account: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// True when the account is either party of this transaction
    pub fn involves(&self, account_number: &str) -> bool {
        self.from_account == account_number || self.to_account == account_number
    }

    /// Signed effect of this transaction on the given account's balance
    pub fn signed_amount_for(&self, account_number: &str) -> Decimal {
        if self.from_account == self.to_account {
            Decimal::ZERO
        } else if self.from_account == account_number {
            -self.amount
        } else if self.to_account == account_number {
            self.amount
        } else {
            Decimal::ZERO
        }
    }
}
