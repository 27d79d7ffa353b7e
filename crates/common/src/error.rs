//! Unified error type for the Aareguru data layer.

use thiserror::Error;

/// Maximum number of per-key failures rendered into [`Error::AllFailed`].
pub const ALL_FAILED_SAMPLE: usize = 3;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Transport error for {endpoint}: {cause}")]
    Transport { endpoint: String, cause: String },

    #[error("Decode error for {endpoint}: {cause} (payload: {shape})")]
    Decode {
        endpoint: String,
        cause: String,
        shape: String,
    },

    #[error(
        "Failed to fetch data for all {requested} requested keys. Errors: {}",
        .sample.join("; ")
    )]
    AllFailed { requested: usize, sample: Vec<String> },

    #[error("No data available: {0}")]
    NoData(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short variant label, used when rendering per-key failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport { .. } => "TransportError",
            Error::Decode { .. } => "DecodeError",
            Error::AllFailed { .. } => "AllFailedError",
            Error::NoData(_) => "NoData",
            Error::Config(_) => "ConfigError",
            Error::Json(_) => "JsonError",
            Error::Io(_) => "IoError",
        }
    }

    /// True for failures talking to upstream (connect, timeout, status).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_renders_sample() {
        let err = Error::AllFailed {
            requested: 3,
            sample: vec!["bern: boom".into(), "thun: timeout".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("all 3 requested keys"));
        assert!(msg.contains("bern: boom; thun: timeout"));
    }

    #[test]
    fn test_kind_labels() {
        let err = Error::Transport {
            endpoint: "/v2018/current".into(),
            cause: "connection refused".into(),
        };
        assert_eq!(err.kind(), "TransportError");
        assert!(err.is_transport());
        assert!(!Error::NoData("bern".into()).is_transport());
    }
}
