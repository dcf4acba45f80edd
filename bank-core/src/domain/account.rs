//! Account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix for every generated account number
pub const ACCOUNT_NUMBER_PREFIX: &str = "ACC";

/// Number of digits after the prefix
const ACCOUNT_NUMBER_DIGITS: u32 = 12;

/// A checking-style account, one per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Globally unique, immutable after creation
    pub account_number: String,
    /// Owning user
    pub owner_id: Uuid,
    /// Never negative between transactions
    pub balance: Decimal,
    /// Optimistic concurrency counter, bumped on every balance write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account for a user with an opening balance
    pub fn open(owner_id: Uuid, opening_balance: Decimal) -> Self {
        let now = super::now();
        Self {
            account_number: Self::generate_number(),
            owner_id,
            balance: opening_balance,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Generate a fresh account number: `ACC` followed by 12 digits
    pub fn generate_number() -> String {
        let modulus = 10u128.pow(ACCOUNT_NUMBER_DIGITS);
        let digits = Uuid::new_v4().as_u128() % modulus;
        format!(
            "{}{:0width$}",
            ACCOUNT_NUMBER_PREFIX,
            digits,
            width = ACCOUNT_NUMBER_DIGITS as usize
        )
    }

    /// Check whether a string looks like an account number
    pub fn is_valid_number(number: &str) -> bool {
        number
            .strip_prefix(ACCOUNT_NUMBER_PREFIX)
            .map(|digits| {
                digits.len() == ACCOUNT_NUMBER_DIGITS as usize
                    && digits.chars().all(|c| c.is_ascii_digit())
            })
            .unwrap_or(false)
    }

    /// Copy of this account with a new balance, as written back to the store
    pub fn with_balance(&self, balance: Decimal) -> Self {
        Self {
            balance,
            updated_at: super::now(),
            ..self.clone()
        }
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            account_number: self.account_number.clone(),
            balance: self.balance,
        }
    }
}

/// The externally visible part of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_number: String,
    pub balance: Decimal,
}
