//! First-occurrence ledger for (image, function) pairs
//!
//! Every probed function entry asks the ledger whether the pair has been seen
//! before. Only the first caller gets `true` and writes a log line; all later
//! callers, on any thread, get `false`.
//!
//! Keys are a real two-part composite, so an image named `a:b` with function
//! `c` never collides with image `a` and function `b:c`.

use std::collections::HashSet;
use std::fmt;
use std::sync::PoisonError;

#[cfg(not(feature = "loom-model"))]
use std::sync::Mutex;

#[cfg(feature = "loom-model")]
use loom::sync::Mutex;

/// Composite ledger key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallKey {
    pub image: String,
    pub function: String,
}

impl CallKey {
    pub fn new(image: &str, function: &str) -> Self {
        Self {
            image: image.to_string(),
            function: function.to_string(),
        }
    }
}

/// Process-lifetime set of pairs already logged
///
/// Entries are never removed. Share it between threads behind an `Arc`.
pub struct CallLedger {
    seen: Mutex<HashSet<CallKey>>,
}

impl Default for CallLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLedger")
            .field("len", &self.len())
            .finish()
    }
}

impl CallLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Record a call and report whether it is the first for this pair
    ///
    /// Membership test and insert happen under one lock acquisition, so two
    /// racing callers for the same pair can never both see `true`.
    pub fn record_and_check(&self, image: &str, function: &str) -> bool {
        let key = CallKey::new(image, function);
        // Insert is the only mutation, so a poisoned set is still consistent
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.insert(key)
    }

    /// Check whether a pair has already been recorded, without recording it
    pub fn contains(&self, image: &str, function: &str) -> bool {
        let key = CallKey::new(image, function);
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }

    /// Number of distinct pairs recorded so far
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every recorded pair, sorted
    pub fn keys(&self) -> Vec<CallKey> {
        let mut keys: Vec<CallKey> = self
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
