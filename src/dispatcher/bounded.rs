use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc::UnboundedSender};
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

use super::Dispatcher;
use crate::{
    job::{DispatchPlan, Job},
    outcome::{Completion, FailureKind, Outcome},
    sender::RequestSender,
    summary::Summary,
};

use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc, time::Duration};

/// Dispatcher that keeps at most `plan.concurrency()` requests in flight.
///
/// - Permits come from a [`tokio::sync::Semaphore`] sized to the concurrency limit
///   (or to the total, if that is smaller).
/// - Requests are admitted in issuance order, one spawned task per request.
/// - The permit moves into the request task and is dropped as soon as the sender
///   returns, times out or panics, so capacity is never lost.
/// - `cancel` stops admission early; see the [module docs](super) for what a
///   cancelled run reports.
/// - `completions` receives every recorded outcome tagged with its request index.
///
/// # Example
/// ```rust
/// # use bytes::Bytes;
/// # use std::time::Duration;
/// # use volley::{Outcome, RequestSender};
/// use volley::{BoundedDispatcher, DispatchPlan, Dispatcher, Job};
///
/// # struct Ok200;
/// # impl RequestSender for Ok200 {
/// #     async fn send(&self, _: &str, _: Bytes, _: Option<Duration>) -> Outcome {
/// #         Outcome::success(Duration::ZERO, 200, 0)
/// #     }
/// # }
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let summary = BoundedDispatcher::builder()
///     .plan(DispatchPlan::new(100, 10).unwrap())
///     .build()
///     .dispatch(Job::new("http://localhost:3000", "{}").unwrap(), Ok200)
///     .await;
///
/// assert_eq!(summary.successes, 100);
/// # }
/// ```
#[derive(Debug, TypedBuilder)]
pub struct BoundedDispatcher {
    pub plan: DispatchPlan,
    /// Cancelling this token stops admission and returns a partial summary.
    #[builder(default)]
    pub cancel: CancellationToken,
    /// Optional sink for per-request completions. A closed receiver is ignored.
    #[builder(default, setter(strip_option))]
    pub completions: Option<UnboundedSender<Completion>>,
}

impl Dispatcher for BoundedDispatcher {
    async fn dispatch<S: RequestSender>(&self, job: Job, sender: S) -> Summary {
        let total = self.plan.total();
        if total == 0 {
            tracing::info!("Plan has no requests, nothing to dispatch.");
            return Summary::new();
        }

        let limit = self.plan.concurrency().min(total);
        let limiter = Arc::new(Semaphore::new(limit));
        let job = Arc::new(job);
        let sender = Arc::new(sender);
        let mut in_flight: JoinSet<Outcome> = JoinSet::new();
        let mut collector = Collector::new(limit, self.completions.as_ref());
        let mut first_admission = None;
        let mut cancelled = false;

        tracing::info!(
            "Dispatching {total} requests to {} with at most {limit} in flight...",
            job.endpoint()
        );

        for index in 0..total {
            let permit = loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break None,
                    Some(joined) = in_flight.join_next_with_id(), if !in_flight.is_empty() => {
                        collector.collect(joined);
                    }
                    permit = limiter.clone().acquire_owned() => break permit.ok(),
                }
            };
            let Some(permit) = permit else {
                cancelled = true;
                break;
            };

            first_admission.get_or_insert_with(Instant::now);
            tracing::debug!("Admitting request {index}.");
            let handle = in_flight.spawn(attempt(sender.clone(), job.clone(), permit));
            collector.indices.insert(handle.id(), index);
        }

        if !cancelled {
            tracing::debug!("All requests admitted, waiting for {} in flight...", in_flight.len());
            loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    joined = in_flight.join_next_with_id() => match joined {
                        Some(joined) => collector.collect(joined),
                        None => break,
                    },
                }
            }
        }

        if cancelled {
            while let Some(joined) = in_flight.try_join_next_with_id() {
                collector.collect(joined);
            }
            tracing::warn!(
                "Run cancelled after {} completions, leaving {} requests in flight.",
                collector.summary.total,
                in_flight.len()
            );
            // Detached tasks still drop their permits when they finish.
            in_flight.detach_all();
        }

        let mut summary = collector.finish(first_admission);
        summary.cancelled = cancelled;
        tracing::info!(
            "Done: {} requests, {} succeeded, {} failed in {:?}.",
            summary.total,
            summary.successes,
            summary.failures,
            summary.duration
        );
        summary
    }
}

/// Run a single request while holding its concurrency permit.
async fn attempt<S: RequestSender>(
    sender: Arc<S>,
    job: Arc<Job>,
    permit: OwnedSemaphorePermit,
) -> Outcome {
    let start = Instant::now();
    let call = AssertUnwindSafe(sender.send(job.endpoint(), job.payload().clone(), job.timeout()))
        .catch_unwind();

    let result = match job.timeout() {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Ok(Outcome::failure(FailureKind::Timeout, start.elapsed())),
        },
        None => call.await,
    };
    drop(permit);

    result.unwrap_or_else(|_| {
        tracing::error!("Sender panicked, recording the request as aborted.");
        Outcome::failure(FailureKind::Aborted, start.elapsed())
    })
}

/// Folds finished request tasks into the summary and the completion stream.
struct Collector<'a> {
    summary: Summary,
    indices: HashMap<Id, usize>,
    last_completion: Option<Instant>,
    completions: Option<&'a UnboundedSender<Completion>>,
}

impl<'a> Collector<'a> {
    fn new(capacity: usize, completions: Option<&'a UnboundedSender<Completion>>) -> Self {
        Self {
            summary: Summary::new(),
            indices: HashMap::with_capacity(capacity),
            last_completion: None,
            completions,
        }
    }

    fn collect(&mut self, joined: Result<(Id, Outcome), JoinError>) {
        let (id, outcome) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                // Panics are caught inside the task, so this is a runtime shutdown.
                tracing::error!("Request task failed: {e}");
                (e.id(), Outcome::failure(FailureKind::Aborted, Duration::ZERO))
            }
        };
        self.last_completion = Some(Instant::now());
        self.summary.record(&outcome);

        let index = self.indices.remove(&id);
        tracing::debug!("Request {index:?} completed: {outcome:?}");
        if let (Some(tx), Some(index)) = (self.completions, index) {
            let _ = tx.send(Completion { index, outcome });
        }
    }

    fn finish(mut self, first_admission: Option<Instant>) -> Summary {
        if let (Some(first), Some(last)) = (first_admission, self.last_completion) {
            self.summary.duration = last.duration_since(first);
        }
        self.summary
    }
}
