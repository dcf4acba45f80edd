//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod transaction;
mod user;
pub mod result;

pub use account::{Account, AccountSummary, ACCOUNT_NUMBER_PREFIX};
pub use transaction::{NewTransaction, TransactionKind, TransactionRecord};
pub use user::{Session, User};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the microsecond precision the store keeps
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
