//! Scripted upstream for tests of this crate and the crates above it.

use crate::upstream::Upstream;
use common::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Responder = dyn Fn(&str, &[(String, String)]) -> Result<Vec<u8>, Error> + Send + Sync;

/// Upstream whose answers come from a closure, recording every dispatch.
pub struct ScriptedUpstream {
    respond: Box<Responder>,
    calls: AtomicUsize,
    log: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl ScriptedUpstream {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, &[(String, String)]) -> Result<Vec<u8>, Error> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the same JSON body.
    pub fn fixed(body: &str) -> Self {
        let body = body.as_bytes().to_vec();
        Self::new(move |_, _| Ok(body.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Endpoint and query of every dispatch, in order.
    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

impl Upstream for ScriptedUpstream {
    async fn get(&self, endpoint: &str, query: &[(String, String)]) -> Result<Vec<u8>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push((endpoint.to_string(), query.to_vec()));
        }
        (self.respond)(endpoint, query)
    }
}

/// Value of `name` in a query, if present.
pub fn param<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Transport error as the HTTP upstream would report it.
pub fn transport_error(endpoint: &str, cause: &str) -> Error {
    Error::Transport {
        endpoint: endpoint.to_string(),
        cause: cause.to_string(),
    }
}
