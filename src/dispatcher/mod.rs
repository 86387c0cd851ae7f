//! Dispatcher: admission control and outcome collection for one run
//!
//! A [`Dispatcher`] takes a [`Job`] and a [`RequestSender`] and drives the sender
//! until the run's plan is exhausted, folding every [`crate::Outcome`] into a
//! [`Summary`]. Different dispatchers can implement different admission strategies;
//! the built-in [`BoundedDispatcher`] caps the number of requests in flight with a
//! semaphore.
//!
//! # High-level flow
//! 1. A semaphore is created with one permit per allowed in-flight request.
//! 2. For each request, in issuance order, the dispatcher acquires a permit and
//!    spawns a task that calls the sender. While it waits for a permit it keeps
//!    collecting the outcomes of finished requests.
//! 3. Each request task owns its permit and drops it when the request ends,
//!    whatever the ending: success, failure, timeout or a panic in the sender.
//! 4. Once all requests have been admitted, the dispatcher waits for the remaining
//!    ones and stamps the summary with the run's duration.
//!
//! # Cancellation
//! A [`tokio_util::sync::CancellationToken`] can be handed to the dispatcher. Once it
//! fires, no further requests are admitted, outcomes that are already available are
//! recorded and the partial summary is returned straight away. Requests still in
//! flight are not interrupted; they finish in the background and release their
//! permits as usual, but their outcomes are not part of the summary.
//!
//! # Notes about correctness
//! - `successes + failures == total` holds for every summary, cancelled or not.
//! - Per-request failures never end a run early. There are no retries: each request
//!   is attempted exactly once.
//! - Completion order is whatever the network makes it. Only aggregate counts and
//!   the concurrency ceiling are guaranteed.
//!
//! # Common pitfalls
//! - **Build heavy clients once.** Create the HTTP client outside the sender's
//!   `send` and share its connection pool across calls, as
//!   [`crate::http::HttpSender`] does.
//! - **Do not block inside `send`.** A blocking call stalls a runtime worker and
//!   distorts every latency measured on it.
pub mod bounded;
pub use bounded::BoundedDispatcher;

use crate::{
    job::{DispatchPlan, Job},
    sender::RequestSender,
    summary::Summary,
};
use std::future::Future;

/// The runtime hook that executes one run of a [`Job`].
///
/// This trait is generic over the sender so a dispatcher can drive HTTP, a test
/// double, or any other protocol without changes.
pub trait Dispatcher
where
    Self: Send + Sync + Sized,
{
    /// Issue the run's requests through `sender` and return the aggregate summary.
    fn dispatch<S: RequestSender>(
        &self,
        job: Job,
        sender: S,
    ) -> impl Future<Output = Summary> + Send;
}

/// Issue `plan.total()` requests for `job` through `sender`, at most
/// `plan.concurrency()` at a time.
///
/// Shorthand for a [`BoundedDispatcher`] with no cancellation and no completion
/// stream.
pub async fn run<S: RequestSender>(plan: DispatchPlan, job: Job, sender: S) -> Summary {
    BoundedDispatcher::builder()
        .plan(plan)
        .build()
        .dispatch(job, sender)
        .await
}
