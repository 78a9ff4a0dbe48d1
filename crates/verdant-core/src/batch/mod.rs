//! Bounded-concurrency batch orchestration.
//!
//! The pipeline regularly has to push thousands of work items (one per
//! company) through a per-item action that is itself a chain of unreliable
//! external calls. [`BatchOptions::run`] processes such a collection in
//! consecutive groups of at most `group_size`: every item in a group starts
//! before any is awaited, the next group never starts before the current one
//! fully settles, and an optional cooldown sleep between groups protects
//! shared downstream rate limits. Group sequencing is the backpressure
//! mechanism: at most `group_size` external calls are in flight at any
//! instant.
//!
//! One item's failure never aborts anything. Every item, success or
//! failure, gets an [`ItemOutcome`] in the final [`BatchSummary`], in input
//! order, so no work item ever silently disappears from the report.
//!
//! There is no partial-completion resumption: a failed run is restarted from
//! the beginning by the caller, which owns idempotency of external writes.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of a single work item. Recorded for every item, success or
/// failure.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome<T> {
    /// The work item itself.
    pub item: T,
    /// Whether the processor completed successfully.
    pub success: bool,
    /// The rendered failure, when `success` is false.
    pub error: Option<String>,
}

/// Aggregated result of a batch run.
///
/// Invariant: `succeeded + failed == total`, and `outcomes` holds exactly
/// one entry per input item, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary<T> {
    /// Number of items processed.
    pub total: usize,
    /// Number of items whose processor returned `Ok`.
    pub succeeded: usize,
    /// Number of items whose processor failed or panicked.
    pub failed: usize,
    /// Per-item outcomes, in input order.
    pub outcomes: Vec<ItemOutcome<T>>,
}

impl<T> BatchSummary<T> {
    /// The failed outcomes, for surfacing in operation reports.
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome<T>> {
        self.outcomes.iter().filter(|outcome| !outcome.success)
    }
}

impl<T> fmt::Display for BatchSummary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {} items: {} succeeded, {} failed",
            self.total, self.succeeded, self.failed
        )
    }
}

/// Configuration for a batch run.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use verdant_core::batch::BatchOptions;
///
/// # async fn example() {
/// let options = BatchOptions::new(5).inter_group_delay(Duration::from_secs(2));
///
/// let summary = options
///     .run(vec!["acme", "globex", "initech"], |company| async move {
///         if company == "globex" {
///             Err("report not found")
///         } else {
///             Ok(())
///         }
///     })
///     .await;
///
/// assert_eq!(summary.total, 3);
/// assert_eq!(summary.failed, 1);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BatchOptions {
    group_size: usize,
    inter_group_delay: Option<Duration>,
}

impl Default for BatchOptions {
    /// Groups of 5, no cooldown between groups.
    fn default() -> Self {
        Self {
            group_size: 5,
            inter_group_delay: None,
        }
    }
}

impl BatchOptions {
    /// Create options with the given group size. A size of zero is treated
    /// as one.
    pub fn new(group_size: usize) -> Self {
        Self {
            group_size: group_size.max(1),
            inter_group_delay: None,
        }
    }

    /// Sleep this long between consecutive groups.
    pub fn inter_group_delay(mut self, delay: Duration) -> Self {
        self.inter_group_delay = Some(delay);
        self
    }

    /// The effective group size.
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Process `items` in bounded concurrent groups.
    ///
    /// Within a group, every `processor` invocation starts before any is
    /// awaited; completion order within the group is unordered, but the
    /// recorded outcomes follow input order. Group `i + 1` starts strictly
    /// after every item of group `i` has settled.
    ///
    /// A processor `Err` (or panic) is captured as a failed
    /// [`ItemOutcome`]; it never aborts the group or the run.
    pub async fn run<T, R, E, F, Fut>(&self, items: Vec<T>, processor: F) -> BatchSummary<T>
    where
        T: Clone,
        E: fmt::Display,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let total = items.len();
        let group_count = total.div_ceil(self.group_size);
        let mut outcomes: Vec<ItemOutcome<T>> = Vec::with_capacity(total);

        for (group_index, group) in items.chunks(self.group_size).enumerate() {
            debug!(
                group = group_index + 1,
                groups = group_count,
                size = group.len(),
                "starting batch group"
            );

            let in_flight: Vec<_> = group
                .iter()
                .cloned()
                .map(|item| {
                    let processor = &processor;
                    let call_item = item.clone();
                    let attempt =
                        std::panic::AssertUnwindSafe(async move { processor(call_item).await });
                    async move {
                        match attempt.catch_unwind().await {
                            Ok(Ok(_)) => ItemOutcome {
                                item,
                                success: true,
                                error: None,
                            },
                            Ok(Err(err)) => {
                                let rendered = err.to_string();
                                warn!(error = %rendered, "batch item failed");
                                ItemOutcome {
                                    item,
                                    success: false,
                                    error: Some(rendered),
                                }
                            }
                            Err(panic) => {
                                let rendered = panic_message(panic);
                                warn!(error = %rendered, "batch item processor panicked");
                                ItemOutcome {
                                    item,
                                    success: false,
                                    error: Some(rendered),
                                }
                            }
                        }
                    }
                })
                .collect();

            outcomes.extend(join_all(in_flight).await);

            if let Some(delay) = self.inter_group_delay {
                if group_index + 1 < group_count {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        let succeeded = outcomes.iter().filter(|outcome| outcome.success).count();
        let summary = BatchSummary {
            total,
            succeeded,
            failed: total - succeeded,
            outcomes,
        };
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch completed"
        );
        summary
    }
}

/// Render a caught panic payload for the outcome record.
fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("processor panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("processor panicked: {message}")
    } else {
        "processor panicked".to_string()
    }
}
