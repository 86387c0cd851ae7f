use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a single request did not succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The endpoint could not be reached or the exchange broke mid-way.
    Connection,
    /// The request did not complete within the job's timeout.
    Timeout,
    /// A response arrived but the status policy rejected its code.
    Status(u16),
    /// The sender panicked while handling the request.
    Aborted,
}

/// An `Outcome` is the terminal result of one dispatched request.
///
/// Every admitted request produces exactly one outcome, whichever way it ends.
/// Outcomes are plain values: once produced they are only read, either by the
/// [`crate::Summary`] that tallies them or by a consumer of the completion stream.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use volley::{FailureKind, Outcome};
///
/// let ok = Outcome::success(Duration::from_millis(12), 200, 42);
/// let lost = Outcome::failure(FailureKind::Timeout, Duration::from_millis(50));
///
/// assert!(ok.is_success());
/// assert_eq!(lost.failure_kind(), Some(FailureKind::Timeout));
/// ```
#[derive(Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        elapsed: Duration,
        /// Response status code.
        status: u16,
        /// Length of the response body that was read.
        bytes: usize,
    },
    Failure {
        kind: FailureKind,
        elapsed: Duration,
    },
}

impl Outcome {
    pub fn success(elapsed: Duration, status: u16, bytes: usize) -> Self {
        Self::Success {
            elapsed,
            status,
            bytes,
        }
    }

    pub fn failure(kind: FailureKind, elapsed: Duration) -> Self {
        Self::Failure { kind, elapsed }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Time between admission and completion of the request.
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Success { elapsed, .. } | Self::Failure { elapsed, .. } => *elapsed,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Status code of the response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success { status, .. }
            | Self::Failure {
                kind: FailureKind::Status(status),
                ..
            } => Some(*status),
            Self::Failure { .. } => None,
        }
    }
}

/// An [`Outcome`] tagged with the issuance position of its request.
///
/// This is the item type of the dispatcher's completion stream. Items arrive in
/// completion order, so `index` is the only way to line them up with issuance.
#[derive(Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Completion {
    pub index: usize,
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_reported_for_rejected_responses() {
        let rejected = Outcome::failure(FailureKind::Status(503), Duration::from_millis(3));
        assert_eq!(rejected.status(), Some(503));
        assert!(!rejected.is_success());

        let refused = Outcome::failure(FailureKind::Connection, Duration::ZERO);
        assert_eq!(refused.status(), None);
    }

    #[test]
    fn elapsed_covers_both_variants() {
        let d = Duration::from_millis(7);
        assert_eq!(Outcome::success(d, 204, 0).elapsed(), d);
        assert_eq!(Outcome::failure(FailureKind::Aborted, d).elapsed(), d);
    }

    #[test]
    fn serializes_with_result_tag() {
        let value = serde_json::to_value(Outcome::failure(
            FailureKind::Timeout,
            Duration::from_millis(50),
        ))
        .unwrap();

        assert_eq!(value["result"], "failure");
        assert_eq!(value["kind"], "timeout");
    }
}
