use std::path::PathBuf;

use thiserror::Error;

/// Problems found while turning user input into a runnable plan.
///
/// These are the only errors that stop a run, and they always do so before the
/// first request is issued. Failures of individual requests are never errors;
/// they are recorded as [`crate::Outcome::Failure`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("unsupported scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),
    #[error("no endpoint given")]
    MissingEndpoint,
    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),
    #[error("invalid header {0:?}, expected NAME:VALUE")]
    InvalidHeader(String),
    #[error("payload given both inline and as a file")]
    ConflictingPayload,
    #[error("failed to read payload file {path}: {source}")]
    ReadPayload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failures of a [`crate::Reporter`] while writing a report out.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
