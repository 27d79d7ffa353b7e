//! In-memory TTL cache for decoded upstream responses.
//!
//! Uses `DashMap` so concurrent fetches can read and populate entries
//! without a global lock. Expiry is lazy: an expired entry is dropped by
//! the lookup that finds it. `purge_expired` exists only to bound memory
//! over long runs.

use dashmap::DashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Order-independent cache key for `(endpoint, params)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build the key. Params are sorted by key (then value) before encoding,
    /// so any iteration order of the same pairs yields the same fingerprint.
    pub fn new<K, V>(endpoint: &str, params: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect();
        pairs.sort_unstable();

        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();

        Self(format!("{endpoint}?{query}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached value and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Valid iff `now < expires_at`; a zero TTL is expired on creation.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe TTL store keyed by [`Fingerprint`].
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<Fingerprint, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the value if present and unexpired. An expired entry is
    /// removed as a side effect.
    pub fn get(&self, key: &Fingerprint) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired_at(now) {
                return Some(entry.value.clone());
            }
        }

        // A concurrent `set` may have replaced the entry since the read guard
        // dropped; only remove it if it is still expired.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some()
        {
            tracing::debug!("Cache expired: {}", key);
        }
        None
    }

    /// Insert or replace unconditionally.
    pub fn set(&self, key: Fingerprint, value: V, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
