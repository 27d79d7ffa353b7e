//! Cache-first, throttled fetch of typed upstream payloads.
//!
//! Order of operations for one fetch:
//! 1. fingerprint `(endpoint, params)`
//! 2. on a valid cache entry, return it (no throttle wait, no network)
//! 3. wait for the global throttle
//! 4. dispatch through the [`Upstream`]
//! 5. decode and validate into `T`
//! 6. cache the decoded value when caching is requested

use common::{Error, Settings, Validate};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{Fingerprint, TtlCache};
use crate::metrics::{FetchMetrics, MetricsSnapshot};
use crate::throttle::Throttle;
use crate::upstream::{HttpUpstream, Upstream};

/// Decoded payloads of any type share one cache.
type CachedPayload = Arc<dyn Any + Send + Sync>;

/// Bound for payloads the fetch client can decode and cache.
pub trait Payload: DeserializeOwned + Validate + Clone + Send + Sync + 'static {}

impl<T> Payload for T where T: DeserializeOwned + Validate + Clone + Send + Sync + 'static {}

/// Describe the structure of a JSON payload for decode diagnostics.
pub fn describe_shape(value: &Value) -> String {
    const MAX_KEYS: usize = 8;
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "bool".into(),
        Value::Number(_) => "number".into(),
        Value::String(_) => "string".into(),
        Value::Array(items) => format!("array[{}]", items.len()),
        Value::Object(map) => {
            let mut keys: Vec<&str> = map.keys().map(String::as_str).take(MAX_KEYS).collect();
            if map.len() > MAX_KEYS {
                keys.push("…");
            }
            format!("object{{{}}}", keys.join(","))
        }
    }
}

/// Decode a response body into `T`, then run its schema checks.
pub fn decode<T: Payload>(endpoint: &str, body: &[u8]) -> Result<T, Error> {
    let decode_error = |cause: String, shape: String| Error::Decode {
        endpoint: endpoint.to_string(),
        cause,
        shape,
    };

    let raw: Value = serde_json::from_slice(body).map_err(|e| {
        decode_error(
            format!("invalid JSON: {e}"),
            format!("non-JSON body ({} bytes)", body.len()),
        )
    })?;
    let shape = describe_shape(&raw);

    let value: T =
        serde_json::from_value(raw).map_err(|e| decode_error(e.to_string(), shape.clone()))?;
    value.validate().map_err(|e| decode_error(e, shape))?;

    Ok(value)
}

/// Owns the response cache, the throttle state, and the transport.
///
/// Construct one per process (or per test) and share it by reference; there
/// is no hidden global state.
pub struct FetchClient<U = HttpUpstream> {
    upstream: U,
    cache: TtlCache<CachedPayload>,
    throttle: Throttle,
    cache_ttl: Duration,
    metrics: FetchMetrics,
}

impl FetchClient<HttpUpstream> {
    /// Open a client backed by the real HTTP upstream.
    pub fn open(settings: &Settings) -> Result<Self, Error> {
        Ok(Self::with_upstream(HttpUpstream::new(settings)?, settings))
    }
}

impl<U: Upstream> FetchClient<U> {
    pub fn with_upstream(upstream: U, settings: &Settings) -> Self {
        info!(
            "Fetch client ready: ttl={}s min_interval={:.1}s",
            settings.cache.ttl_seconds,
            settings.min_request_interval().as_secs_f64()
        );

        Self {
            upstream,
            cache: TtlCache::new(),
            throttle: Throttle::new(settings.min_request_interval()),
            cache_ttl: settings.cache_ttl(),
            metrics: FetchMetrics::default(),
        }
    }

    /// Fetch `endpoint` with `params`, decoding into `T`.
    ///
    /// Failures are never cached. With `use_cache = false` the cache is
    /// neither read nor written.
    pub async fn fetch<T: Payload>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        use_cache: bool,
    ) -> Result<T, Error> {
        let key = Fingerprint::new(endpoint, params);

        if use_cache {
            if let Some(hit) = self.cached::<T>(&key) {
                debug!("Cache hit: {}", key);
                self.metrics.record_hit();
                return Ok(hit);
            }
            debug!("Cache miss: {}", key);
            self.metrics.record_miss();
        }

        self.throttle.await_turn().await;
        self.metrics.record_dispatch();

        let body = match self.upstream.get(endpoint, params).await {
            Ok(body) => body,
            Err(e) => {
                self.metrics.record_transport_error();
                warn!("Fetch failed for {}: {}", key, e);
                return Err(e);
            }
        };

        let value: T = decode(endpoint, &body).inspect_err(|e| {
            self.metrics.record_decode_error();
            warn!("{}", e);
        })?;

        if use_cache {
            self.cache
                .set(key.clone(), Arc::new(value.clone()), self.cache_ttl);
            debug!("Cache set: {}", key);
        }

        Ok(value)
    }

    fn cached<T: Payload>(&self, key: &Fingerprint) -> Option<T> {
        let payload = self.cache.get(key)?;
        let typed = payload.downcast_ref::<T>().cloned();
        if typed.is_none() {
            debug!("Cached payload for {} has a different type; refetching", key);
        }
        typed
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.cache.len())
    }

    /// Evict expired entries; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Tear down: cached payloads and throttle state go with the client.
    pub fn close(self) -> MetricsSnapshot {
        let snapshot = self.metrics();
        self.cache.clear();
        info!(
            "Fetch client closed: {} dispatches, {} cache hits",
            snapshot.dispatches, snapshot.cache_hits
        );
        snapshot
    }
}
