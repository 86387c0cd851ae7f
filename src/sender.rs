use bytes::Bytes;
use std::{future::Future, time::Duration};

use crate::outcome::Outcome;

/// The capability that actually puts a request on the wire.
///
/// The dispatcher knows nothing about HTTP: it only throttles calls to `send` and
/// collects what they return. [`crate::http::HttpSender`] is the built-in
/// implementation; tests and other protocols provide their own.
///
/// Implementations should report every way a request can go wrong as an
/// [`Outcome::Failure`] rather than panicking. The dispatcher enforces the job's
/// timeout around each call regardless of whether the sender honours `timeout`
/// itself, and turns a panic into [`crate::FailureKind::Aborted`].
///
/// # Example
/// ```rust
/// use bytes::Bytes;
/// use std::time::Duration;
/// use volley::{Outcome, RequestSender};
///
/// struct Echo;
///
/// impl RequestSender for Echo {
///     async fn send(&self, _endpoint: &str, payload: Bytes, _timeout: Option<Duration>) -> Outcome {
///         Outcome::success(Duration::ZERO, 200, payload.len())
///     }
/// }
/// ```
pub trait RequestSender: Send + Sync + 'static {
    /// Send `payload` to `endpoint` and report how it went.
    fn send(
        &self,
        endpoint: &str,
        payload: Bytes,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Outcome> + Send;
}
