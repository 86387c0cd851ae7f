//! HTTP request sender backed by [`reqwest`].
//!
//! One [`reqwest::Client`] is built up front and shared by every request, so the
//! run reuses pooled connections instead of opening one per request.
use bytes::Bytes;
use reqwest::{
    Client, Method, StatusCode,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use crate::{
    error::ConfigError,
    outcome::{FailureKind, Outcome},
    sender::RequestSender,
};

/// Which response statuses count as a failed request.
///
/// By default any response that arrives is a success: the request reached the
/// server and came back. The stricter policies are opt-in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatusPolicy {
    /// Every response is a success.
    #[default]
    Accept,
    /// 5xx responses are failures.
    ServerErrors,
    /// 4xx and 5xx responses are failures.
    Errors,
}

impl StatusPolicy {
    pub fn rejects(&self, status: StatusCode) -> bool {
        match self {
            Self::Accept => false,
            Self::ServerErrors => status.is_server_error(),
            Self::Errors => status.is_client_error() || status.is_server_error(),
        }
    }
}

/// Options for building an [`HttpSender`].
#[derive(Clone, Debug, TypedBuilder)]
pub struct HttpOptions {
    #[builder(default = Method::POST)]
    pub method: Method,
    #[builder(default)]
    pub headers: HeaderMap,
    #[builder(default)]
    pub status_policy: StatusPolicy,
}

/// [`RequestSender`] that performs real HTTP requests.
#[derive(Clone, Debug)]
pub struct HttpSender {
    client: Client,
    options: HttpOptions,
}

impl HttpSender {
    pub fn new(options: HttpOptions) -> Result<Self, ConfigError> {
        let client = Client::builder().build().map_err(ConfigError::Client)?;
        Ok(Self { client, options })
    }

    /// Use an already configured client, e.g. one with custom TLS settings.
    pub fn with_client(client: Client, options: HttpOptions) -> Self {
        Self { client, options }
    }

    fn classify(&self, status: StatusCode, elapsed: Duration, bytes: usize) -> Outcome {
        if self.options.status_policy.rejects(status) {
            Outcome::failure(FailureKind::Status(status.as_u16()), elapsed)
        } else {
            Outcome::success(elapsed, status.as_u16(), bytes)
        }
    }
}

impl RequestSender for HttpSender {
    async fn send(&self, endpoint: &str, payload: Bytes, timeout: Option<Duration>) -> Outcome {
        let start = Instant::now();
        let mut request = self
            .client
            .request(self.options.method.clone(), endpoint)
            .headers(self.options.headers.clone())
            .body(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Request to {endpoint} failed: {e}");
                return Outcome::failure(failure_kind(&e), start.elapsed());
            }
        };

        let status = response.status();
        match response.bytes().await {
            Ok(body) => self.classify(status, start.elapsed(), body.len()),
            Err(e) => {
                tracing::debug!("Reading response from {endpoint} failed: {e}");
                Outcome::failure(failure_kind(&e), start.elapsed())
            }
        }
    }
}

fn failure_kind(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Connection
    }
}

/// Parse a `NAME:VALUE` header argument.
pub fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let invalid = || ConfigError::InvalidHeader(raw.to_string());
    let (name, value) = raw.split_once(':').ok_or_else(invalid)?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    Ok((name, value))
}

/// Parse an HTTP method name, case-insensitively.
pub fn parse_method(raw: &str) -> Result<Method, ConfigError> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ConfigError::InvalidMethod(raw.to_string()))
}
