//! The retry executor: runs a call thunk under a policy.

use std::future::Future;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, error, warn};

use crate::classify::{ErrorVerdict, classify};
use crate::error::{CallError, Result};

use super::policy::{QuotaAction, RetryPolicy};

impl RetryPolicy {
    /// Execute an unreliable call under this policy.
    ///
    /// The thunk must be re-invokable: every invocation is a fresh attempt
    /// that reuses no partial state from a prior failed one. Attempts are
    /// made until one succeeds, a failure classifies as fatal, the retry
    /// budget (`max_retries`) is exhausted, or the wall-clock budget
    /// (`overall_timeout`) runs out.
    ///
    /// The wall-clock deadline is armed once, at the start of the first
    /// attempt, and raced against every attempt *and* every backoff sleep:
    /// a single slow attempt cannot be retried into an even longer tail,
    /// and a sleep scheduled near the budget edge cannot outlive it. When
    /// the deadline fires the call fails with
    /// [`CallError::TimeoutExceeded`] immediately, never retrying.
    ///
    /// Quota exhaustion is special-cased per [`QuotaAction`]: by default the
    /// process terminates, because once the upstream quota is provably gone
    /// every future attempt in this process is wasted work.
    ///
    /// # Errors
    ///
    /// The last-seen error once the policy is exhausted, or the first
    /// fatal/timeout error.
    pub async fn execute<F, Fut, T>(&self, thunk: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let deadline = start + self.overall_timeout;
        let mut attempt: u32 = 0;

        loop {
            let outcome = match timeout_at(deadline, thunk()).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(self.budget_exhausted(start, attempt)),
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "call succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            match classify(&err) {
                ErrorVerdict::ProcessFatal => {
                    error!(
                        error = %err,
                        "upstream quota exhausted; further attempts across the process are futile"
                    );
                    match self.quota_action() {
                        QuotaAction::ExitProcess => std::process::exit(1),
                        QuotaAction::Propagate => return Err(err),
                    }
                }
                ErrorVerdict::Fatal => {
                    debug!(error = %err, attempt = attempt + 1, "fatal failure, not retrying");
                    return Err(err);
                }
                ErrorVerdict::Retryable => {
                    if attempt >= self.max_retries() {
                        warn!(
                            attempts = attempt + 1,
                            error = %err,
                            "retries exhausted, propagating last failure"
                        );
                        return Err(err);
                    }

                    let delay = self.next_delay(attempt);
                    debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off before retry"
                    );
                    if timeout_at(deadline, sleep(delay)).await.is_err() {
                        return Err(self.budget_exhausted(start, attempt));
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn budget_exhausted(&self, start: Instant, attempt: u32) -> CallError {
        let elapsed = start.elapsed();
        warn!(
            attempts = attempt + 1,
            budget_ms = self.overall_timeout().as_millis() as u64,
            elapsed_ms = elapsed.as_millis() as u64,
            "wall-clock budget exhausted"
        );
        CallError::TimeoutExceeded {
            budget: self.overall_timeout(),
            elapsed,
        }
    }
}
