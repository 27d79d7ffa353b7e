//! Aareguru API client.
//!
//! Caching, throttled access to `aareguru.existenz.ch`: a TTL response cache
//! and a process-wide throttle sit in front of every call, and responses are
//! decoded into the typed models from `common`.

pub mod cache;
pub mod fetch;
pub mod metrics;
pub mod throttle;
pub mod upstream;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{CacheEntry, Fingerprint, TtlCache};
pub use fetch::{decode, describe_shape, FetchClient, Payload};
pub use metrics::{FetchMetrics, MetricsSnapshot};
pub use throttle::Throttle;
pub use upstream::{HttpUpstream, Upstream};

use common::{CityListItem, CurrentResponse, Error, Settings, TodayResponse};
use serde_json::Value;
use tracing::debug;

pub const CITIES_PATH: &str = "/v2018/cities";
pub const TODAY_PATH: &str = "/v2018/today";
pub const CURRENT_PATH: &str = "/v2018/current";
pub const WIDGET_PATH: &str = "/v2018/widget";
pub const HISTORY_PATH: &str = "/v2018/history";

/// Typed Aareguru endpoints over a [`FetchClient`].
pub struct AareguruClient<U = HttpUpstream> {
    fetch: FetchClient<U>,
    app_name: String,
    app_version: String,
}

impl AareguruClient<HttpUpstream> {
    /// Open a client against the configured base URL.
    pub fn open(settings: &Settings) -> Result<Self, Error> {
        Ok(Self::from_fetch(FetchClient::open(settings)?, settings))
    }
}

impl<U: Upstream> AareguruClient<U> {
    pub fn with_upstream(upstream: U, settings: &Settings) -> Self {
        Self::from_fetch(FetchClient::with_upstream(upstream, settings), settings)
    }

    fn from_fetch(fetch: FetchClient<U>, settings: &Settings) -> Self {
        Self {
            fetch,
            app_name: settings.app_name.clone(),
            app_version: settings.app_version.clone(),
        }
    }

    /// Query pairs plus the `app`/`version` identification the API asks for.
    fn query(&self, pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        query.push(("app".into(), self.app_name.clone()));
        query.push(("version".into(), self.app_version.clone()));
        query
    }

    /// All cities with their latest readings.
    pub async fn get_cities(&self) -> Result<Vec<CityListItem>, Error> {
        let cities: Vec<CityListItem> = self
            .fetch
            .fetch(CITIES_PATH, &self.query(&[]), true)
            .await?;
        debug!("Got {} cities", cities.len());
        Ok(cities)
    }

    /// Minimal current data for one city.
    pub async fn get_today(&self, city: &str) -> Result<TodayResponse, Error> {
        self.fetch
            .fetch(TODAY_PATH, &self.query(&[("city", city)]), true)
            .await
    }

    /// Complete current conditions for one city.
    pub async fn get_current(&self, city: &str) -> Result<CurrentResponse, Error> {
        self.fetch
            .fetch(CURRENT_PATH, &self.query(&[("city", city)]), true)
            .await
    }

    /// Current data for all cities in widget form.
    pub async fn get_widget(&self) -> Result<Value, Error> {
        self.fetch.fetch(WIDGET_PATH, &self.query(&[]), true).await
    }

    /// Historical time series. Never cached: ranges like `-7 days`/`now`
    /// are relative to the moment of the call.
    pub async fn get_history(&self, city: &str, start: &str, end: &str) -> Result<Value, Error> {
        self.fetch
            .fetch(
                HISTORY_PATH,
                &self.query(&[("city", city), ("start", start), ("end", end)]),
                false,
            )
            .await
    }

    pub fn fetch_client(&self) -> &FetchClient<U> {
        &self.fetch
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.fetch.metrics()
    }

    pub fn close(self) -> MetricsSnapshot {
        self.fetch.close()
    }
}
