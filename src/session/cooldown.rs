//! Launch cooldown counters.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A cooldown started at `started_at_ms` lasting `duration_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownEntry {
    pub started_at_ms: u64,
    pub duration_secs: u64,
}

impl CooldownEntry {
    /// Whole seconds left, rounded up; 0 once expired.
    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        let end_ms = self
            .started_at_ms
            .saturating_add(self.duration_secs.saturating_mul(1000));
        end_ms.saturating_sub(now_ms).div_ceil(1000)
    }
}

/// Shared map of fund id → launch cooldown.
#[derive(Debug, Clone, Default)]
pub struct LaunchCooldowns {
    inner: Arc<DashMap<String, CooldownEntry>>,
}

impl LaunchCooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the cooldown for `fund_id`.
    pub fn start(&self, fund_id: &str, now_ms: u64, duration_secs: u64) {
        self.inner.insert(
            fund_id.to_string(),
            CooldownEntry {
                started_at_ms: now_ms,
                duration_secs,
            },
        );
    }

    pub fn remaining(&self, fund_id: &str, now_ms: u64) -> u64 {
        self.inner
            .get(fund_id)
            .map(|e| e.remaining_secs(now_ms))
            .unwrap_or(0)
    }

    /// Every active cooldown with its remaining seconds.
    pub fn active(&self, now_ms: u64) -> BTreeMap<String, u64> {
        self.inner
            .iter()
            .map(|e| (e.key().clone(), e.remaining_secs(now_ms)))
            .filter(|(_, secs)| *secs > 0)
            .collect()
    }

    /// Drop cooldowns that reached zero; returns their fund ids.
    pub fn tick(&self, now_ms: u64) -> Vec<String> {
        let expired: Vec<String> = self
            .inner
            .iter()
            .filter(|e| e.remaining_secs(now_ms) == 0)
            .map(|e| e.key().clone())
            .collect();
        for fund_id in &expired {
            self.inner.remove(fund_id);
            tracing::debug!(fund_id = %fund_id, "Launch cooldown finished");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<String, CooldownEntry> {
        self.inner
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    pub(crate) fn restore(&self, entries: BTreeMap<String, CooldownEntry>) {
        for (fund_id, entry) in entries {
            self.inner.insert(fund_id, entry);
        }
    }
}
