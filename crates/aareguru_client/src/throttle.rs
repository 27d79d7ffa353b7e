//! Process-wide throttle for upstream dispatches.
//!
//! The Aareguru API asks clients to keep a minimum spacing between calls and
//! rate-limits by client identity, not by query. One gate therefore covers
//! every endpoint and every city.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Enforces a minimum interval between consecutive dispatches.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Throttle {
    /// `Duration::ZERO` disables throttling.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `min_interval` has passed since the previous dispatch, then
    /// record now as the new dispatch time.
    ///
    /// The lock is held across the sleep: the elapsed check, the wait, and the
    /// timestamp update form one critical section, so concurrent callers
    /// queue up and are released one interval apart.
    pub async fn await_turn(&self) {
        let mut last = self.last_dispatch.lock().await;

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:.1}s", wait.as_secs_f64());
                sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Instant of the most recent dispatch, if any.
    pub async fn last_dispatch(&self) -> Option<Instant> {
        *self.last_dispatch.lock().await
    }
}
