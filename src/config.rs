use bytes::Bytes;
use reqwest::{Method, header::HeaderMap};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    error::ConfigError,
    http::{HttpOptions, StatusPolicy, parse_header, parse_method},
    job::{DispatchPlan, Job},
};

pub const DEFAULT_REQUESTS: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Raw, unvalidated run settings as read from a TOML file or the command line.
///
/// Every field is optional so that a file and command-line flags can be layered
/// with [`LoadConfig::merge`]. [`LoadConfig::resolve`] validates the result.
///
/// ```toml
/// endpoint = "http://localhost:3000/catcher"
/// requests = 1000
/// concurrency = 100
/// data_file = "payload.json"
/// headers = ["Content-Type: application/json"]
/// timeout_ms = 2000
/// status_policy = "server-errors"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    pub endpoint: Option<String>,
    pub requests: Option<usize>,
    pub concurrency: Option<usize>,
    /// Inline payload.
    pub data: Option<String>,
    /// Payload read from a file; mutually exclusive with `data`.
    pub data_file: Option<PathBuf>,
    pub method: Option<String>,
    /// Extra headers in `NAME: VALUE` form.
    pub headers: Vec<String>,
    pub timeout_ms: Option<u64>,
    pub status_policy: Option<StatusPolicy>,
}

/// Validated settings, ready to build a dispatcher and an HTTP sender from.
#[derive(Debug)]
pub struct Settings {
    pub plan: DispatchPlan,
    pub job: Job,
    pub http: HttpOptions,
}

impl LoadConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Values set in `overrides` win. Headers accumulate. Setting either payload
    /// source in `overrides` replaces both payload sources of `self`.
    pub fn merge(mut self, overrides: LoadConfig) -> LoadConfig {
        if overrides.data.is_some() || overrides.data_file.is_some() {
            self.data = overrides.data;
            self.data_file = overrides.data_file;
        }
        self.headers.extend(overrides.headers);

        LoadConfig {
            endpoint: overrides.endpoint.or(self.endpoint),
            requests: overrides.requests.or(self.requests),
            concurrency: overrides.concurrency.or(self.concurrency),
            data: self.data,
            data_file: self.data_file,
            method: overrides.method.or(self.method),
            headers: self.headers,
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
            status_policy: overrides.status_policy.or(self.status_policy),
        }
    }

    /// Validate everything and read the payload, before any request is sent.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let endpoint = self.endpoint.ok_or(ConfigError::MissingEndpoint)?;
        let payload = match (self.data, self.data_file) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingPayload),
            (Some(data), None) => Bytes::from(data),
            (None, Some(path)) => match std::fs::read(&path) {
                Ok(content) => Bytes::from(content),
                Err(source) => return Err(ConfigError::ReadPayload { path, source }),
            },
            (None, None) => Bytes::new(),
        };

        let mut job = Job::new(endpoint, payload)?;
        match self.timeout_ms {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(ms) => job = job.with_timeout(Duration::from_millis(ms)),
            None => {}
        }

        let plan = DispatchPlan::new(
            self.requests.unwrap_or(DEFAULT_REQUESTS),
            self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
        )?;

        let method = match self.method {
            Some(raw) => parse_method(&raw)?,
            None => Method::POST,
        };
        let mut headers = HeaderMap::new();
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            headers.append(name, value);
        }
        let http = HttpOptions::builder()
            .method(method)
            .headers(headers)
            .status_policy(self.status_policy.unwrap_or_default())
            .build();

        Ok(Settings { plan, job, http })
    }
}
