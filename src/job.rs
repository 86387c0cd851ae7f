use bytes::Bytes;
use reqwest::Url;
use std::time::Duration;

use crate::error::ConfigError;

/// What every request of a run sends, and where.
///
/// A `Job` is created once before dispatch starts and is shared read-only by all
/// requests. The payload is a [`Bytes`] so handing it to each request is a
/// reference-count bump rather than a copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    endpoint: String,
    payload: Bytes,
    timeout: Option<Duration>,
}

impl Job {
    /// Build a job after checking that `endpoint` is an absolute `http` or `https` URL.
    pub fn new(endpoint: impl Into<String>, payload: impl Into<Bytes>) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into();
        let url = Url::parse(&endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidEndpoint {
                endpoint,
                reason: "missing host".to_string(),
            });
        }

        Ok(Self {
            endpoint,
            payload: payload.into(),
            timeout: None,
        })
    }

    /// Give up on each request after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// How many requests to issue and how many may be in flight at once.
///
/// A total of zero is a valid plan that does nothing. A concurrency limit above the
/// total is accepted; the total is then the effective ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchPlan {
    total: usize,
    concurrency: usize,
}

impl DispatchPlan {
    pub fn new(total: usize, concurrency: usize) -> Result<Self, ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(Self { total, concurrency })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}
