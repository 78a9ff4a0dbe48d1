//! Bounded retry execution with backoff, jitter, and a wall-clock budget.
//!
//! # Key Types
//!
//! - [`RetryPolicy`] - immutable per-call-site retry configuration
//! - [`RetryPolicyBuilder`] - fluent construction with sensible defaults
//! - [`QuotaAction`] - what the executor does on quota exhaustion
//!
//! # Examples
//!
//! ```rust
//! use verdant_core::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! # async fn example() -> verdant_core::Result<()> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(500))
//!     .overall_timeout(Duration::from_secs(120))
//!     .build();
//!
//! let value = policy.execute(|| async {
//!     // One external call per invocation; each invocation is a fresh attempt.
//!     Ok::<_, verdant_core::CallError>(42)
//! }).await?;
//! # Ok(())
//! # }
//! ```

mod executor;
mod policy;

pub use policy::{QuotaAction, RetryPolicy, RetryPolicyBuilder};
