//! Session store: pending flags, launch cooldowns, persistence and timer.
//!
//! # Responsibilities
//! - Own the shared [`PendingOperations`] and [`LaunchCooldowns`]
//! - Serialize both through [`SessionSnapshot`] to a JSON file
//! - Run a repeating tick that clears stuck flags and expired cooldowns
//!
//! # Design Decisions
//! - One store per process, shared by `Arc`
//! - Timestamps are wall-clock milliseconds so cooldowns survive restarts
//! - The clock is injectable; tests drive time by hand

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::lifecycle::Shutdown;
use crate::session::cooldown::{CooldownEntry, LaunchCooldowns};
use crate::session::pending::{PendingGuard, PendingOperations};

/// Errors loading or saving the session file.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Wall-clock source in milliseconds since the Unix epoch.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    })
}

/// On-disk form of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub pending: BTreeMap<String, u64>,
    #[serde(default)]
    pub cooldowns: BTreeMap<String, CooldownEntry>,
}

/// What a single tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub cleared_stuck: Vec<String>,
    pub expired_cooldowns: Vec<String>,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        !self.cleared_stuck.is_empty() || !self.expired_cooldowns.is_empty()
    }
}

pub struct SessionStore {
    pending: PendingOperations,
    cooldowns: LaunchCooldowns,
    persistence_path: Option<PathBuf>,
    stuck_timeout_ms: u64,
    cooldown_secs: u64,
    clock: Clock,
}

impl SessionStore {
    /// Empty store; nothing is read from disk.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            pending: PendingOperations::new(),
            cooldowns: LaunchCooldowns::new(),
            persistence_path: config.persistence_path.as_ref().map(PathBuf::from),
            stuck_timeout_ms: config.stuck_timeout_secs.saturating_mul(1000),
            cooldown_secs: config.launch_cooldown_secs,
            clock: system_clock(),
        }
    }

    /// Store restored from `config.persistence_path` when that file exists.
    pub fn load(config: &SessionConfig) -> SessionResult<Self> {
        let store = Self::new(config);
        if let Some(path) = &store.persistence_path {
            if path.exists() {
                let snapshot = read_snapshot(path)?;
                tracing::info!(
                    path = %path.display(),
                    pending = snapshot.pending.len(),
                    cooldowns = snapshot.cooldowns.len(),
                    "Loaded session"
                );
                store.restore(snapshot);
            }
        }
        Ok(store)
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now_ms(&self) -> u64 {
        (self.clock)()
    }

    pub fn pending(&self) -> &PendingOperations {
        &self.pending
    }

    pub fn cooldowns(&self) -> &LaunchCooldowns {
        &self.cooldowns
    }

    /// Mark `key` as in flight; `None` if it already is.
    pub fn begin(&self, key: &str) -> Option<PendingGuard> {
        self.pending.try_begin(key, self.now_ms())
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.is_pending(key)
    }

    /// Start the launch cooldown for `fund_id` and persist it immediately.
    pub fn start_cooldown(&self, fund_id: &str) {
        self.cooldowns
            .start(fund_id, self.now_ms(), self.cooldown_secs);
        self.save_logged();
    }

    pub fn cooldown_remaining(&self, fund_id: &str) -> u64 {
        self.cooldowns.remaining(fund_id, self.now_ms())
    }

    pub fn active_cooldowns(&self) -> BTreeMap<String, u64> {
        self.cooldowns.active(self.now_ms())
    }

    /// One watchdog pass. Saves the snapshot when anything changed.
    pub fn tick(&self) -> TickReport {
        let now = self.now_ms();
        let report = TickReport {
            cleared_stuck: self.pending.clear_stuck(now, self.stuck_timeout_ms),
            expired_cooldowns: self.cooldowns.tick(now),
        };
        if report.changed() {
            self.save_logged();
        }
        report
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            pending: self.pending.snapshot(),
            cooldowns: self.cooldowns.snapshot(),
        }
    }

    pub fn restore(&self, snapshot: SessionSnapshot) {
        self.pending.restore(snapshot.pending);
        self.cooldowns.restore(snapshot.cooldowns);
    }

    /// Write the snapshot to the persistence path, if one is configured.
    pub fn save(&self) -> SessionResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        {
            let writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(writer, &self.snapshot())?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn save_logged(&self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to persist session");
        }
    }

    /// Spawn the repeating tick. It stops when `shutdown` fires or the
    /// returned handle is dropped, saving one last time on shutdown.
    pub fn start(self: &Arc<Self>, every: Duration, shutdown: &Shutdown) -> TimerHandle {
        let store = Arc::clone(self);
        let mut stop = shutdown.subscribe();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        store.tick();
                    }
                    _ = stop.recv() => {
                        tracing::debug!("Session timer stopping");
                        store.save_logged();
                        break;
                    }
                }
            }
        });
        TimerHandle { task }
    }
}

fn read_snapshot(path: &Path) -> SessionResult<SessionSnapshot> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Owns the timer task; dropping it aborts the task.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to exit after shutdown was triggered.
    pub async fn join(mut self) {
        let _ = (&mut self.task).await;
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
