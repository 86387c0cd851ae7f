use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::BTreeMap, fmt, fmt::Debug, future::Future, io::Write};

use crate::{error::ReportError, summary::Summary};

/// A [`Report`] is the processed form of a [`Summary`].
///
/// Reports turn raw counters into meaningful numbers such as ratios, means and
/// throughput. They are pure data: building one performs no I/O, and the same
/// summary can feed several report types with a different focus.
///
/// # Example
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use volley::{Report, Summary};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct FailureRate(f64);
///
/// impl From<Summary> for FailureRate {
///     fn from(s: Summary) -> Self {
///         Self(if s.total == 0 { 0.0 } else { s.failures as f64 / s.total as f64 })
///     }
/// }
///
/// impl Report for FailureRate {}
/// ```
pub trait Report
where
    Self: Send + Sync + Debug + From<Summary> + Serialize + DeserializeOwned,
{
}

/// A [`Reporter`] consumes a [`Report`] and writes it somewhere.
///
/// Reporters are the I/O boundary of a run; everything before them
/// (outcomes, summary, report) is plain data.
pub trait Reporter<R: Report> {
    fn report(&self, report: &R) -> impl Future<Output = Result<(), ReportError>>;
}

/// The default report: the numbers printed at the end of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub connection_errors: usize,
    pub status_errors: usize,
    pub aborted: usize,
    pub cancelled: bool,
    /// Percentage of requests that succeeded.
    pub success_ratio: f64,
    pub duration_ms: f64,
    /// Requests completed per second of wall-clock time.
    pub throughput: f64,
    pub mean_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub bytes: usize,
    pub statuses: BTreeMap<u16, usize>,
}

impl From<Summary> for SummaryReport {
    fn from(value: Summary) -> Self {
        let count = value.total as f64;
        let secs = value.duration.as_secs_f64();
        let ratio = |n: f64, d: f64| if d > 0.0 { n / d } else { 0.0 };

        Self {
            total: value.total,
            successes: value.successes,
            failures: value.failures,
            timeouts: value.timeouts,
            connection_errors: value.connection_errors,
            status_errors: value.status_errors,
            aborted: value.aborted,
            cancelled: value.cancelled,
            success_ratio: ratio(value.successes as f64, count) * 100.0,
            duration_ms: secs * 1000.0,
            throughput: ratio(count, secs),
            mean_latency_ms: ratio(value.total_latency.as_secs_f64(), count) * 1000.0,
            min_latency_ms: value.min_latency.unwrap_or_default().as_secs_f64() * 1000.0,
            max_latency_ms: value.max_latency.as_secs_f64() * 1000.0,
            bytes: value.bytes,
            statuses: value.statuses,
        }
    }
}

impl Report for SummaryReport {}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.cancelled { " (cancelled)" } else { "" };
        writeln!(f, "Requests:    {}{suffix}", self.total)?;
        writeln!(f, "Succeeded:   {} ({:.2}%)", self.successes, self.success_ratio)?;
        writeln!(
            f,
            "Failed:      {} (connection {}, timeout {}, status {}, aborted {})",
            self.failures, self.connection_errors, self.timeouts, self.status_errors, self.aborted
        )?;
        writeln!(f, "Duration:    {:.3}s", self.duration_ms / 1000.0)?;
        writeln!(f, "Throughput:  {:.2} req/s", self.throughput)?;
        writeln!(
            f,
            "Latency:     mean {:.2}ms, min {:.2}ms, max {:.2}ms",
            self.mean_latency_ms, self.min_latency_ms, self.max_latency_ms
        )?;
        write!(f, "Received:    {} bytes", self.bytes)?;
        if !self.statuses.is_empty() {
            let statuses: Vec<String> = self
                .statuses
                .iter()
                .map(|(code, count)| format!("{code} x{count}"))
                .collect();
            write!(f, "\nStatuses:    {}", statuses.join(", "))?;
        }
        Ok(())
    }
}

/// Prints a [`SummaryReport`] as aligned, human-readable lines.
pub struct StdoutReporter;

impl Reporter<SummaryReport> for StdoutReporter {
    async fn report(&self, report: &SummaryReport) -> Result<(), ReportError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{report}")?;
        Ok(())
    }
}

/// Prints any [`Report`] as a single pretty-printed JSON document.
pub struct JsonReporter;

impl<R: Report> Reporter<R> for JsonReporter {
    async fn report(&self, report: &R) -> Result<(), ReportError> {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, report)?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{FailureKind, Outcome};
    use std::time::Duration;

    fn sample() -> Summary {
        let mut summary = Summary::new();
        for _ in 0..3 {
            summary.record(&Outcome::success(Duration::from_millis(20), 200, 4));
        }
        summary.record(&Outcome::failure(FailureKind::Timeout, Duration::from_millis(40)));
        summary.duration = Duration::from_millis(500);
        summary
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn derives_ratios_from_counts() {
        let report = SummaryReport::from(sample());

        assert_eq!(report.total, 4);
        assert_close(report.success_ratio, 75.0);
        assert_close(report.duration_ms, 500.0);
        assert_close(report.throughput, 8.0);
        assert_close(report.mean_latency_ms, 25.0);
        assert_close(report.min_latency_ms, 20.0);
        assert_close(report.max_latency_ms, 40.0);
        assert_eq!(report.bytes, 12);
    }

    #[test]
    fn empty_summary_has_no_nan() {
        let report = SummaryReport::from(Summary::new());

        assert_eq!(report.success_ratio, 0.0);
        assert_eq!(report.throughput, 0.0);
        assert_eq!(report.mean_latency_ms, 0.0);
        assert_eq!(report.min_latency_ms, 0.0);
    }

    #[test]
    fn text_lists_counts_and_statuses() {
        let text = SummaryReport::from(sample()).to_string();

        assert!(text.contains("Requests:    4"));
        assert!(text.contains("Succeeded:   3 (75.00%)"));
        assert!(text.contains("timeout 1"));
        assert!(text.contains("200 x3"));
        assert!(!text.contains("cancelled"));
    }

    #[test]
    fn text_marks_cancelled_runs() {
        let mut summary = sample();
        summary.cancelled = true;
        let text = SummaryReport::from(summary).to_string();

        assert!(text.starts_with("Requests:    4 (cancelled)"));
    }

    #[test]
    fn json_keys_statuses_by_code() {
        let report = SummaryReport::from(sample());
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["total"], 4);
        assert_eq!(value["timeouts"], 1);
        assert_eq!(value["cancelled"], false);
        assert_eq!(value["statuses"]["200"], 3);
    }
}
