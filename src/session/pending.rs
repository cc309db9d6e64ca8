//! Per-fund "operation in flight" flags.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingEntry {
    started_at_ms: u64,
    token: u64,
}

/// Shared map of fund id → pending flag with its start time.
///
/// Cloning is cheap; all clones see the same flags.
#[derive(Debug, Clone, Default)]
pub struct PendingOperations {
    inner: Arc<DashMap<String, PendingEntry>>,
    next_token: Arc<AtomicU64>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag for `key` unless it is already set.
    ///
    /// The returned guard clears the flag when dropped, unless the watchdog
    /// (or a restart) replaced it in the meantime.
    pub fn try_begin(&self, key: &str, now_ms: u64) -> Option<PendingGuard> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        match self.inner.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    started_at_ms: now_ms,
                    token,
                });
                Some(PendingGuard {
                    ops: self.clone(),
                    key: key.to_string(),
                    token,
                })
            }
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// When the flag for `key` was set.
    pub fn started_at(&self, key: &str) -> Option<u64> {
        self.inner.get(key).map(|e| e.started_at_ms)
    }

    /// Clear a flag unconditionally. Returns whether it was set.
    pub fn clear(&self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }

    /// Remove flags set more than `timeout_ms` before `now_ms`.
    pub fn clear_stuck(&self, now_ms: u64, timeout_ms: u64) -> Vec<String> {
        let stuck: Vec<String> = self
            .inner
            .iter()
            .filter(|e| now_ms.saturating_sub(e.started_at_ms) > timeout_ms)
            .map(|e| e.key().clone())
            .collect();
        for key in &stuck {
            self.inner.remove(key);
            tracing::warn!(key = %key, "Cleared stuck pending flag");
        }
        stuck
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<String, u64> {
        self.inner
            .iter()
            .map(|e| (e.key().clone(), e.started_at_ms))
            .collect()
    }

    /// Restored flags get token 0, which no live guard holds.
    pub(crate) fn restore(&self, flags: BTreeMap<String, u64>) {
        for (key, started_at_ms) in flags {
            self.inner.insert(
                key,
                PendingEntry {
                    started_at_ms,
                    token: 0,
                },
            );
        }
    }

    fn release(&self, key: &str, token: u64) -> bool {
        self.inner.remove_if(key, |_, e| e.token == token).is_some()
    }
}

/// Clears its pending flag on drop.
#[derive(Debug)]
pub struct PendingGuard {
    ops: PendingOperations,
    key: String,
    token: u64,
}

impl PendingGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.ops.release(&self.key, self.token) {
            tracing::debug!(key = %self.key, "Pending flag cleared");
        }
    }
}
