//! Volley, a bounded-concurrency HTTP load generator.
//!
//! Volley fires a fixed number of requests carrying the same payload at one endpoint,
//! never letting more than a configured number be in flight at once, and reports how
//! the batch went: how many succeeded, how many failed and why, and how long it took.
//!
//! The library is small: a [`Dispatcher`] drives an injected [`RequestSender`] and
//! folds every [`Outcome`] into a [`Summary`], which a [`Report`] turns into final
//! numbers for a [`Reporter`] to print. The built-in [`http::HttpSender`] speaks HTTP
//! through a shared `reqwest` client, but any sender can be plugged in.
//!
//! # Architecture
//!
//! - [`Job`]: what to send and where, shared read-only by every request.
//! - [`DispatchPlan`]: how many requests, and how many at once.
//! - [`Dispatcher`]: admits requests under the concurrency cap and collects outcomes.
//!   [`BoundedDispatcher`] is the built-in implementation.
//! - [`RequestSender`]: the capability that actually performs a request.
//! - [`Outcome`]: the result of one request, success or a classified failure.
//! - [`Summary`]: raw counters over all outcomes of a run.
//! - [`Report`]: derived statistics built from a summary.
//! - [`Reporter`]: writes a report somewhere (stdout as text or JSON).
//!
//! # Example
//!
//! ```rust,no_run
//! use volley::{
//!     DispatchPlan, Job, Reporter,
//!     http::{HttpOptions, HttpSender},
//!     report::{StdoutReporter, SummaryReport},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build the client once; every request shares its connection pool.
//!     let sender = HttpSender::new(HttpOptions::builder().build())?;
//!     let job = Job::new("http://localhost:3000/catcher", r#"{"token":"abc"}"#)?;
//!
//!     let summary = volley::run(DispatchPlan::new(1000, 100)?, job, sender).await;
//!
//!     StdoutReporter.report(&SummaryReport::from(summary)).await?;
//!     Ok(())
//! }
//! ```
//!
//! Per-request failures never make a run fail: a high failure count is data in the
//! summary. Only invalid configuration is an error, and it is reported before the
//! first request goes out.

/// Settings from files and flags
pub mod config;
/// Admission control and outcome collection
pub mod dispatcher;
/// Configuration and reporting errors
pub mod error;
/// `reqwest`-backed request sender
pub mod http;
/// What to send, and how much of it
pub mod job;
/// Results of single requests
pub mod outcome;
/// Reports and Reporters
pub mod report;
/// The request-sending capability
pub mod sender;
/// Aggregation of outcomes
pub mod summary;

pub use dispatcher::{BoundedDispatcher, Dispatcher, run};
pub use error::{ConfigError, ReportError};
pub use job::{DispatchPlan, Job};
pub use outcome::{Completion, FailureKind, Outcome};
pub use report::{Report, Reporter};
pub use sender::RequestSender;
pub use summary::Summary;
