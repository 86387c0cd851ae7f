use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

use crate::outcome::{FailureKind, Outcome};

/// The `Summary` collects the [`Outcome`]s of one dispatch run into a compact,
/// serializable tally.
///
/// **Important:** a `Summary` stores raw counters and sums only. Derived values such as
/// the mean latency, success ratio or throughput are computed by
/// [`crate::report::SummaryReport`], which is built from a finished summary. Keeping the
/// two apart lets different reports be derived from the same data.
///
/// # What is tracked
///
/// - **Counts:** `total == successes + failures` at every point of a run.
/// - **Failure breakdown:** one counter per [`FailureKind`]; their sum is `failures`.
/// - **Latency:** the sum, minimum and maximum of per-request elapsed times.
/// - **Statuses:** how many responses carried each status code, whether the status
///   policy accepted them or not.
/// - **Duration:** wall-clock time from the first admission to the last recorded
///   outcome. The dispatcher sets it once the run ends; `record` never touches it.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use volley::{FailureKind, Outcome, Summary};
///
/// let mut summary = Summary::new();
/// summary.record(&Outcome::success(Duration::from_millis(10), 200, 2));
/// summary.record(&Outcome::failure(FailureKind::Connection, Duration::from_millis(1)));
///
/// assert_eq!(summary.total, 2);
/// assert_eq!(summary.successes + summary.failures, summary.total);
/// assert_eq!(summary.connection_errors, 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub duration: Duration,
    pub timeouts: usize,
    pub connection_errors: usize,
    pub status_errors: usize,
    pub aborted: usize,
    pub total_latency: Duration,
    pub min_latency: Option<Duration>,
    pub max_latency: Duration,
    /// Response body bytes read across successful requests.
    pub bytes: usize,
    pub statuses: BTreeMap<u16, usize>,
    /// Set when the run stopped admitting early; `total` then counts only the
    /// requests that finished before the dispatcher returned.
    pub cancelled: bool,
}

impl Summary {
    /// An empty summary, as returned for a plan with no requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Incorporate a single outcome.
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;

        let elapsed = outcome.elapsed();
        self.total_latency += elapsed;
        self.max_latency = self.max_latency.max(elapsed);
        self.min_latency = Some(self.min_latency.map_or(elapsed, |min| min.min(elapsed)));

        if let Some(status) = outcome.status() {
            *self.statuses.entry(status).or_default() += 1;
        }

        match outcome {
            Outcome::Success { bytes, .. } => {
                self.successes += 1;
                self.bytes += bytes;
            }
            Outcome::Failure { kind, .. } => {
                self.failures += 1;
                match kind {
                    FailureKind::Connection => self.connection_errors += 1,
                    FailureKind::Timeout => self.timeouts += 1,
                    FailureKind::Status(_) => self.status_errors += 1,
                    FailureKind::Aborted => self.aborted += 1,
                }
            }
        }
    }
}
