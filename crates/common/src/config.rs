//! Settings consumed by the fetch layer and the service above it.
//!
//! The core never parses these itself; the binary loads them (see
//! `src/config.rs`) and hands a `&Settings` down.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the Aareguru API (no trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Application name sent as the `app` query parameter.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Application version sent as the `version` query parameter.
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Response cache parameters.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream throttle parameters.
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// HTTP transport parameters.
    #[serde(default)]
    pub http: HttpConfig,

    /// Multi-city fan-out parameters.
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Push-session liveness tracking.
    #[serde(default)]
    pub session: SessionConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a decoded response stays valid. 0 disables reuse.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Minimum spacing between dispatched upstream calls. 0 disables throttling.
    #[serde(default = "default_min_request_interval")]
    pub min_request_interval_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout.
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: f64,
    /// Upper bound on requests in flight at once.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Idle connections kept alive per host.
    #[serde(default = "default_max_keepalive")]
    pub max_keepalive_connections: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Cap on concurrently running fan-out items. `None` runs every key at once.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are dropped.
    #[serde(default = "default_session_timeout")]
    pub timeout_seconds: u64,
    /// How often the reaper runs.
    #[serde(default = "default_session_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    /// Throttle spacing. Negative or non-finite values collapse to zero.
    pub fn min_request_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.throttle.min_request_interval_seconds)
            .unwrap_or(Duration::ZERO)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.http.timeout_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_http_timeout()))
    }

    /// Settings suited to tests: no throttling, default TTL.
    pub fn unthrottled() -> Self {
        let mut settings = Self::default();
        settings.throttle.min_request_interval_seconds = 0.0;
        settings
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://aareguru.existenz.ch".into()
}
fn default_app_name() -> String {
    "aareguru-rs".into()
}
fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_cache_ttl() -> u64 {
    120
}
fn default_min_request_interval() -> f64 {
    300.0
}

fn default_http_timeout() -> f64 {
    30.0
}
fn default_max_connections() -> usize {
    10
}
fn default_max_keepalive() -> usize {
    5
}

fn default_session_timeout() -> u64 {
    3600
}
fn default_session_cleanup_interval() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_request_interval_seconds: default_min_request_interval(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            max_connections: default_max_connections(),
            max_keepalive_connections: default_max_keepalive(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_session_timeout(),
            cleanup_interval_seconds: default_session_cleanup_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            app_name: default_app_name(),
            app_version: default_app_version(),
            cache: CacheConfig::default(),
            throttle: ThrottleConfig::default(),
            http: HttpConfig::default(),
            fanout: FanoutConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
