#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Resilient call-execution core for the Verdant data-collection pipeline.
//!
//! Almost every step of the pipeline is an unreliable network call: the AI
//! extraction service rate-limits and times out, the spreadsheet store
//! throttles bursts, and extraction responses are free-form text that only
//! approximates well-formed JSON. This crate is the layer the rest of the
//! pipeline leans on to survive that:
//!
//! - **Classification** via [`classify()`]: a total, pure verdict on whether
//!   a failure is worth retrying, fatal to the call, or fatal to the whole
//!   process (quota exhaustion).
//! - **Retry execution** via [`RetryPolicy::execute`]: bounded retries with
//!   jittered exponential backoff under a single wall-clock budget.
//! - **Recovery parsing** via [`recover::parse`]: best-effort extraction of
//!   structured data from truncated, fence-wrapped, or comma-mangled model
//!   output, degrading to a typed [`ParseOutcome::Unparseable`] instead of
//!   an error.
//! - **Batch orchestration** via [`BatchOptions::run`]: fixed-size groups
//!   processed concurrently, per-item failures isolated and fully reported.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use verdant_core::prelude::*;
//!
//! # async fn lookup_report(company: &str) -> verdant_core::Result<String> { Ok(String::new()) }
//! # async fn example() {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(500))
//!     .overall_timeout(Duration::from_secs(120))
//!     .build();
//!
//! let batch = BatchOptions::new(5).inter_group_delay(Duration::from_secs(2));
//! let companies = vec!["acme".to_string(), "globex".to_string()];
//!
//! let summary = batch
//!     .run(companies, |company| {
//!         let policy = policy.clone();
//!         async move {
//!             let raw = policy.execute(|| lookup_report(&company)).await?;
//!             match verdant_core::recover::parse(&raw) {
//!                 ParseOutcome::Structured(_value) => { /* persist */ }
//!                 ParseOutcome::Unparseable(_text) => { /* keep for review */ }
//!             }
//!             Ok::<_, verdant_core::CallError>(())
//!         }
//!     })
//!     .await;
//!
//! println!("{summary}");
//! # }
//! ```

pub mod batch;
pub mod classify;
pub mod error;
pub mod recover;
pub mod retry;

pub use batch::{BatchOptions, BatchSummary, ItemOutcome};
pub use classify::{ErrorVerdict, classify, is_quota_exhaustion};
pub use error::{CallError, Result};
pub use recover::ParseOutcome;
pub use retry::{QuotaAction, RetryPolicy, RetryPolicyBuilder};

/// Convenient re-exports of commonly used items.
///
/// Import the whole call-execution surface with:
///
/// ```rust
/// use verdant_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::batch::{BatchOptions, BatchSummary, ItemOutcome};
    pub use crate::classify::{ErrorVerdict, classify, is_quota_exhaustion};
    pub use crate::error::{CallError, Result};
    pub use crate::recover::{ParseOutcome, parse};
    pub use crate::retry::{QuotaAction, RetryPolicy, RetryPolicyBuilder};
}
