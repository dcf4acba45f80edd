//! Per-account mutual exclusion for the transfer engine
//!
//! Each account number maps to its own mutex. A transfer locks both of its
//! accounts for the whole read-validate-write sequence. Locks are always
//! taken in ascending account-number order, so two transfers moving money in
//! opposite directions between the same pair cannot deadlock. A slot is
//! dropped from the table once its last guard is released and nobody is
//! waiting on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

type Slot = Arc<Mutex<()>>;

/// Lock table keyed by account number
#[derive(Default)]
pub struct AccountLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

/// Guards held for the duration of one transfer; released on drop
pub struct AccountGuard<'a> {
    locks: &'a AccountLocks,
    guards: Vec<ArcMutexGuard<RawMutex, ()>>,
    keys: Vec<String>,
}

impl AccountGuard<'_> {
    /// Account numbers held, in acquisition order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every listed account, in sorted order, skipping duplicates
    pub fn acquire(&self, account_numbers: &[&str]) -> AccountGuard<'_> {
        let mut keys: Vec<String> = account_numbers.iter().map(|n| n.to_string()).collect();
        keys.sort();
        keys.dedup();

        // Resolve slots first so the table lock is never held while waiting
        let slots: Vec<Slot> = {
            let mut table = self.slots.lock();
            keys.iter()
                .map(|key| Arc::clone(table.entry(key.clone()).or_default()))
                .collect()
        };

        let guards = slots.iter().map(|slot| slot.lock_arc()).collect();

        AccountGuard {
            locks: self,
            guards,
            keys,
        }
    }

    /// Number of accounts currently held or waited on
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        self.guards.clear();

        // Under the table lock no new clone can appear, so a count of one
        // means only the table still refers to the slot
        let mut table = self.locks.slots.lock();
        for key in &self.keys {
            if table.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
                table.remove(key);
            }
        }
    }
}
