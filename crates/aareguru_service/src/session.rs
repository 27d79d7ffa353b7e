//! Liveness bookkeeping for long-lived push connections.
//!
//! Entries map a session id to its last activity; a reaper task drops ids
//! that stayed silent longer than the timeout.

use common::config::SessionConfig;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

/// Floor for the reaper period; `tokio::time::interval` rejects zero.
pub const MIN_REAP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: DashMap<String, Instant>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session and return its id.
    pub fn open_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), Instant::now());
        debug!("Session opened: {}", id);
        id
    }

    /// Mark `id` as active now, registering it if unknown.
    pub fn record_activity(&self, id: &str) {
        self.sessions.insert(id.to_string(), Instant::now());
    }

    pub fn last_activity(&self, id: &str) -> Option<Instant> {
        self.sessions.get(id).map(|entry| *entry.value())
    }

    /// Drop sessions idle for longer than `timeout`; returns how many went.
    pub fn purge_expired(&self, timeout: Duration) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, last| now.saturating_duration_since(*last) <= timeout);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!("Purged {} expired sessions", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Reaper driven by the `session` settings.
    pub fn spawn_reaper_with(self: Arc<Self>, config: &SessionConfig) -> JoinHandle<()> {
        self.spawn_reaper(config.cleanup_interval(), config.timeout())
    }

    /// Purge every `interval` until the handle is aborted. A zero interval is
    /// raised to [`MIN_REAP_INTERVAL`].
    pub fn spawn_reaper(self: Arc<Self>, interval: Duration, timeout: Duration) -> JoinHandle<()> {
        let interval = interval.max(MIN_REAP_INTERVAL);
        info!(
            "Session reaper started: every {:?}, timeout {:?}",
            interval, timeout
        );
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.purge_expired(timeout);
            }
        })
    }
}
