//! Transport seam between the fetch layer and the network.
//!
//! The fetch client only needs "GET this endpoint with these query pairs and
//! give me the body". Keeping that behind a trait lets tests script upstream
//! behaviour without a live server.

use common::{Error, Settings};
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// One upstream GET.
pub trait Upstream: Send + Sync {
    /// Returns the raw body of a 2xx response. Connect failures, timeouts,
    /// and non-2xx statuses are all `Error::Transport`.
    fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Keep chained causes so network failures (DNS/TLS/socket) are visible.
    let mut message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    };
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn summarize_response_body(raw: &str) -> String {
    const MAX_CHARS: usize = 500;
    let compact = raw.replace(['\n', '\r'], " ");
    match compact.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &compact[..cut]),
        None => compact,
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// reqwest-backed upstream with a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    permits: Arc<Semaphore>,
}

impl HttpUpstream {
    pub fn new(settings: &Settings) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", settings.app_name, settings.app_version))
            .pool_max_idle_per_host(settings.http.max_keepalive_connections)
            .timeout(settings.http_timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&settings.base_url),
            permits: Arc::new(Semaphore::new(settings.http.max_connections.max(1))),
        })
    }

    /// URL helper.
    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

impl Upstream for HttpUpstream {
    async fn get(&self, endpoint: &str, query: &[(String, String)]) -> Result<Vec<u8>, Error> {
        let transport = |cause: String| Error::Transport {
            endpoint: endpoint.to_string(),
            cause,
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| transport("connection pool closed".into()))?;

        let url = self.url(endpoint);
        info!("GET {} {:?}", url, query);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let cause = format_reqwest_error(&e);
                error!("Request error for {}: {}", endpoint, cause);
                transport(cause)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("HTTP error {} for {}", status.as_u16(), endpoint);
            return Err(transport(format!(
                "upstream returned {}: {}",
                status.as_u16(),
                summarize_response_body(&body)
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| transport(format_reqwest_error(&e)))?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let mut settings = Settings::default();
        settings.base_url = " https://aareguru.existenz.ch/ ".into();
        let upstream = HttpUpstream::new(&settings).expect("client should build");
        assert_eq!(
            upstream.url("/v2018/cities"),
            "https://aareguru.existenz.ch/v2018/cities"
        );
    }

    #[test]
    fn test_body_summary_is_truncated_on_char_boundary() {
        let long = "ä".repeat(600);
        let summary = summarize_response_body(&long);
        assert!(summary.ends_with('…'));
        assert_eq!(summary.chars().count(), 501);

        assert_eq!(summarize_response_body("line1\nline2"), "line1 line2");
    }

    #[tokio::test]
    async fn test_connect_failure_is_transport_error() {
        let mut settings = Settings::default();
        // Port 9 (discard) on localhost is closed in test environments.
        settings.base_url = "http://127.0.0.1:9".into();
        settings.http.timeout_seconds = 2.0;
        let upstream = HttpUpstream::new(&settings).expect("client should build");

        let err = upstream
            .get("/v2018/cities", &[])
            .await
            .expect_err("nothing listens on port 9");
        match err {
            Error::Transport { endpoint, .. } => assert_eq!(endpoint, "/v2018/cities"),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
