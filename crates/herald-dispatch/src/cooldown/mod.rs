//! Cooldown store.
//!
//! Maps cooldown keys to the instant they expire. Reads and writes are
//! individually thread-safe but a read followed by a write is not atomic:
//! two invocations racing on the same key may both observe "not cooling
//! down" before either applies its cooldown. That window is accepted.

pub mod scope;

pub use scope::{CooldownKey, CooldownScope};

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Longest cooldown the store will hold. Longer requests are clamped.
pub const MAX_COOLDOWN_SECS: u64 = u32::MAX as u64;

/// Concurrent key -> expiry map.
#[derive(Debug, Default)]
pub struct CooldownStore {
    entries: RwLock<HashMap<String, Instant>>,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a cooldown of `seconds` for `key`, clamped to
    /// [`MAX_COOLDOWN_SECS`].
    pub fn apply(&self, key: &str, seconds: u64) {
        self.apply_at(key, seconds, Instant::now());
    }

    pub fn apply_at(&self, key: &str, seconds: u64, now: Instant) {
        let expiry = now
            .checked_add(Duration::from_secs(seconds.min(MAX_COOLDOWN_SECS)))
            .unwrap_or(now);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), expiry);
    }

    /// Whole seconds left on `key`, rounded up. Zero when absent or expired.
    pub fn remaining(&self, key: &str) -> u64 {
        self.remaining_at(key, Instant::now())
    }

    pub fn remaining_at(&self, key: &str, now: Instant) -> u64 {
        let expiry = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(expiry) => *expiry,
                None => return 0,
            }
        };

        if expiry > now {
            return ceil_secs(expiry - now);
        }

        // Expired: drop it now rather than waiting for the sweep.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|current| *current <= now) {
            entries.remove(key);
        }
        0
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, expiry| *expiry > now);
        before - entries.len()
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
