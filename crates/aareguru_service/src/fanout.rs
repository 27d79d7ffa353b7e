//! Concurrent multi-key fetches with per-key failure isolation.
//!
//! Every key gets exactly one [`FetchOutcome`]. A failing key never cancels
//! its siblings; failures are recorded next to the successes and the whole
//! call only errors when nothing succeeded.
//!
//! Concurrency here means "in flight together". When the operation goes
//! through the fetch client, dispatches are still spaced by the global
//! throttle while cache hits return immediately.

use common::error::ALL_FAILED_SAMPLE;
use common::Error;
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, info, warn};

/// Result of one key's operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, E> {
    Success(T),
    Failure(E),
}

/// A key paired with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<K, T, E> {
    pub key: K,
    pub outcome: Outcome<T, E>,
}

/// Successes and failures of a fan-out, each in input order.
#[derive(Debug)]
pub struct AggregateResult<K, T, E = Error> {
    pub successes: Vec<(K, T)>,
    pub failures: Vec<(K, E)>,
    pub requested_count: usize,
    pub succeeded_count: usize,
}

impl<K, T, E> AggregateResult<K, T, E> {
    /// Split ordered outcomes into successes and failures.
    pub fn from_outcomes(outcomes: Vec<FetchOutcome<K, T, E>>) -> Self {
        let requested_count = outcomes.len();
        let mut successes = Vec::new();
        let mut failures = Vec::new();

        for FetchOutcome { key, outcome } in outcomes {
            match outcome {
                Outcome::Success(value) => successes.push((key, value)),
                Outcome::Failure(err) => failures.push((key, err)),
            }
        }

        Self {
            succeeded_count: successes.len(),
            successes,
            failures,
            requested_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requested_count == 0
    }

    /// Some, but not all, keys failed.
    pub fn is_partial(&self) -> bool {
        self.succeeded_count > 0 && !self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} succeeded",
            self.succeeded_count, self.requested_count
        )
    }

    /// Success with the highest ordering key; ties keep the earliest.
    /// Successes whose key is `None` or NaN are skipped.
    pub fn pick_max<F>(&self, key_fn: F) -> Option<&(K, T)>
    where
        F: Fn(&T) -> Option<f64>,
    {
        self.pick_by(key_fn, Ordering::Greater)
    }

    /// Success with the lowest ordering key; ties keep the earliest.
    pub fn pick_min<F>(&self, key_fn: F) -> Option<&(K, T)>
    where
        F: Fn(&T) -> Option<f64>,
    {
        self.pick_by(key_fn, Ordering::Less)
    }

    fn pick_by<F>(&self, key_fn: F, better: Ordering) -> Option<&(K, T)>
    where
        F: Fn(&T) -> Option<f64>,
    {
        let mut best: Option<(&(K, T), f64)> = None;
        for entry in &self.successes {
            let Some(score) = key_fn(&entry.1).filter(|s| !s.is_nan()) else {
                continue;
            };
            let replace = match best {
                None => true,
                Some((_, current)) => score.partial_cmp(&current) == Some(better),
            };
            if replace {
                best = Some((entry, score));
            }
        }
        best.map(|(entry, _)| entry)
    }
}

impl<K: Display, T, E: Display> AggregateResult<K, T, E> {
    /// `key: error` lines for every failure.
    pub fn failure_messages(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|(key, err)| format!("{key}: {err}"))
            .collect()
    }

    /// Escalate a non-empty request with zero successes.
    fn into_checked(self) -> Result<Self, Error> {
        if self.requested_count > 0 && self.succeeded_count == 0 {
            let sample = self
                .failure_messages()
                .into_iter()
                .take(ALL_FAILED_SAMPLE)
                .collect();
            return Err(Error::AllFailed {
                requested: self.requested_count,
                sample,
            });
        }
        Ok(self)
    }
}

async fn run_one<K, T, E, F, Fut>(key: K, op: &F) -> FetchOutcome<K, T, E>
where
    K: Clone + Display,
    E: Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    debug!("→ Starting fetch for {}", key);
    let outcome = match op(key.clone()).await {
        Ok(value) => {
            debug!("✓ Fetched {}", key);
            Outcome::Success(value)
        }
        Err(err) => {
            warn!("✗ Failed to fetch {}: {}", key, err);
            Outcome::Failure(err)
        }
    };
    FetchOutcome { key, outcome }
}

fn finish<K, T, E>(outcomes: Vec<FetchOutcome<K, T, E>>) -> Result<AggregateResult<K, T, E>, Error>
where
    K: Display,
    E: Display,
{
    let aggregate = AggregateResult::from_outcomes(outcomes);
    info!("Fan-out complete: {}", aggregate.summary());
    aggregate.into_checked()
}

/// Run `op` for every key concurrently, without a concurrency cap.
///
/// Returns `Error::AllFailed` only when keys were given and all of them
/// failed. An empty key list yields an empty result.
pub async fn fan_out<K, T, E, F, Fut>(
    keys: impl IntoIterator<Item = K>,
    op: F,
) -> Result<AggregateResult<K, T, E>, Error>
where
    K: Clone + Display,
    E: Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let keys: Vec<K> = keys.into_iter().collect();
    info!("Fanning out over {} keys", keys.len());

    let outcomes = join_all(keys.into_iter().map(|key| run_one(key, &op))).await;
    finish(outcomes)
}

/// Like [`fan_out`], with at most `limit` operations in flight. Outcomes are
/// still reported in input order. A `limit` of 0 is treated as 1.
pub async fn fan_out_bounded<K, T, E, F, Fut>(
    keys: impl IntoIterator<Item = K>,
    limit: usize,
    op: F,
) -> Result<AggregateResult<K, T, E>, Error>
where
    K: Clone + Display,
    E: Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let keys: Vec<K> = keys.into_iter().collect();
    let limit = limit.max(1);
    info!("Fanning out over {} keys ({} at a time)", keys.len(), limit);

    let outcomes = stream::iter(keys)
        .map(|key| run_one(key, &op))
        .buffered(limit)
        .collect::<Vec<_>>()
        .await;
    finish(outcomes)
}
