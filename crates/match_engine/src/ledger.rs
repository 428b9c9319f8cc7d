//! Deduplication Ledger
//!
//! In-memory only. A restart forgets everything, which at worst re-sends
//! alerts for occurrences still visible upstream; it never suppresses one.

use crate::key::AlertKey;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<AlertKey>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-record. True exactly once per key for the ledger's lifetime.
    pub fn should_alert(&mut self, key: &AlertKey) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.clone())
    }

    pub fn contains(&self, key: &AlertKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
