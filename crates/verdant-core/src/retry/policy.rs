//! Retry policy configuration.

use std::time::Duration;

use crate::error::{CallError, Result};

/// How the executor reacts when a failure classifies as process-fatal
/// quota exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaAction {
    /// Log and terminate the process with a non-zero exit code.
    ///
    /// This is the default, on purpose: once the upstream quota is provably
    /// exhausted, every further attempt in the process will burn its whole
    /// retry budget against a condition that cannot self-heal within any
    /// retry horizon. The pipeline chooses a loud, immediate stop over a
    /// silent stall.
    #[default]
    ExitProcess,

    /// Propagate [`CallError::QuotaExhausted`] like any other fatal error.
    ///
    /// For hosts that embed this crate in a larger process and handle
    /// restarts at supervisor level.
    Propagate,
}

/// Retry behavior for a single unreliable call.
///
/// Immutable and supplied per call site; there is no shared mutable retry
/// configuration anywhere in the crate. Delays between retries grow
/// exponentially, `initial_delay * multiplier^n` capped at `max_delay`, with
/// jitter applied to avoid synchronized retry storms. The whole call,
/// attempts and the sleeps between them alike, runs under a single
/// wall-clock `overall_timeout` armed once at the start.
///
/// # Examples
///
/// ```rust
/// use verdant_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// // Defaults: 3 retries, 500ms initial, 60s cap, x2.0, 10% jitter, 10min budget
/// let policy = RetryPolicy::default();
///
/// let custom = RetryPolicy::builder()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30))
///     .multiplier(2.0)
///     .jitter(0.1)
///     .overall_timeout(Duration::from_secs(60))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub(super) max_retries: u32,
    pub(super) initial_delay: Duration,
    pub(super) max_delay: Duration,
    pub(super) multiplier: f64,
    pub(super) jitter: f64,
    pub(super) overall_timeout: Duration,
    pub(super) quota_action: QuotaAction,
}

impl Default for RetryPolicy {
    /// Defaults tuned for the pipeline's providers.
    ///
    /// - `max_retries`: 3 (four attempts total)
    /// - `initial_delay`: 500ms
    /// - `max_delay`: 60s
    /// - `multiplier`: 2.0
    /// - `jitter`: 0.1 (±10%)
    /// - `overall_timeout`: 10 minutes
    /// - `quota_action`: [`QuotaAction::ExitProcess`]
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
            overall_timeout: Duration::from_secs(600),
            quota_action: QuotaAction::default(),
        }
    }
}

impl RetryPolicy {
    /// Create a new builder for configuring a retry policy.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Load a policy from environment variables, on top of the defaults.
    ///
    /// Recognized variables:
    /// - `VERDANT_MAX_RETRIES`
    /// - `VERDANT_INITIAL_DELAY_MS`
    /// - `VERDANT_MAX_DELAY_MS`
    /// - `VERDANT_OVERALL_TIMEOUT_SECS`
    ///
    /// # Errors
    ///
    /// Returns [`CallError::InvalidConfig`] if a variable is set but does
    /// not parse as a number.
    pub fn from_env() -> Result<Self> {
        use std::env;

        let mut policy = Self::default();

        if let Ok(raw) = env::var("VERDANT_MAX_RETRIES") {
            policy.max_retries = raw.parse::<u32>().map_err(|_| {
                CallError::InvalidConfig(format!(
                    "VERDANT_MAX_RETRIES must be a valid number, got: '{raw}'"
                ))
            })?;
        }

        if let Ok(raw) = env::var("VERDANT_INITIAL_DELAY_MS") {
            let millis = raw.parse::<u64>().map_err(|_| {
                CallError::InvalidConfig(format!(
                    "VERDANT_INITIAL_DELAY_MS must be a valid number of milliseconds, got: '{raw}'"
                ))
            })?;
            policy.initial_delay = Duration::from_millis(millis);
        }

        if let Ok(raw) = env::var("VERDANT_MAX_DELAY_MS") {
            let millis = raw.parse::<u64>().map_err(|_| {
                CallError::InvalidConfig(format!(
                    "VERDANT_MAX_DELAY_MS must be a valid number of milliseconds, got: '{raw}'"
                ))
            })?;
            policy.max_delay = Duration::from_millis(millis);
        }

        if let Ok(raw) = env::var("VERDANT_OVERALL_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| {
                CallError::InvalidConfig(format!(
                    "VERDANT_OVERALL_TIMEOUT_SECS must be a valid number of seconds, got: '{raw}'"
                ))
            })?;
            policy.overall_timeout = Duration::from_secs(secs);
        }

        Ok(policy)
    }

    /// Maximum number of retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The whole-call wall-clock budget.
    pub fn overall_timeout(&self) -> Duration {
        self.overall_timeout
    }

    /// What the executor does on quota exhaustion.
    pub fn quota_action(&self) -> QuotaAction {
        self.quota_action
    }

    /// Calculate the jittered delay before the retry following failed
    /// attempt `attempt` (0-indexed: `next_delay(0)` is slept before the
    /// second attempt).
    ///
    /// The base delay is `initial_delay * multiplier^attempt`, capped at
    /// `max_delay`; jitter then shifts it by up to ±`jitter` of the capped
    /// value.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jittered = if self.jitter > 0.0 {
            let offset = capped * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
            (capped + offset).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered)
    }
}

/// Builder for [`RetryPolicy`].
///
/// Unset parameters fall back to the [`RetryPolicy::default`] values.
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_retries: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
    overall_timeout: Option<Duration>,
    quota_action: Option<QuotaAction>,
}

impl RetryPolicyBuilder {
    /// Set the maximum number of retries after the initial attempt.
    ///
    /// `max_retries(0)` means exactly one attempt, no retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the cap on the delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier applied to the delay after each
    /// failed attempt. Must be greater than 1.0 for the backoff to grow.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Set the jitter factor (clamped to 0.0..=1.0). A jitter of 0.1 lets
    /// each delay vary by ±10%.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Set the whole-call wall-clock budget, measured from the start of the
    /// first attempt across all retries and backoff sleeps.
    pub fn overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = Some(timeout);
        self
    }

    /// Set the reaction to quota exhaustion.
    pub fn quota_action(mut self, action: QuotaAction) -> Self {
        self.quota_action = Some(action);
        self
    }

    /// Build the policy, using defaults for any unset parameter.
    pub fn build(self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
            jitter: self.jitter.unwrap_or(defaults.jitter),
            overall_timeout: self.overall_timeout.unwrap_or(defaults.overall_timeout),
            quota_action: self.quota_action.unwrap_or(defaults.quota_action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_calculation_without_jitter() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(10))
            .multiplier(2.0)
            .jitter(0.0)
            .build();

        assert_eq!(policy.next_delay(0), Duration::from_millis(100));
        assert_eq!(policy.next_delay(1), Duration::from_millis(200));
        assert_eq!(policy.next_delay(2), Duration::from_millis(400));
        assert_eq!(policy.next_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(5))
            .multiplier(10.0)
            .jitter(0.0)
            .build();

        for attempt in 1..8 {
            assert!(
                policy.next_delay(attempt) <= Duration::from_secs(5),
                "delay at attempt {attempt} exceeded the cap"
            );
        }
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_secs(1))
            .multiplier(2.0)
            .jitter(0.5)
            .build();

        for _ in 0..50 {
            let millis = policy.next_delay(0).as_millis();
            assert!(
                (500..=1500).contains(&millis),
                "delay with 50% jitter should fall in [500ms, 1500ms], got {millis}ms"
            );
        }
    }

    #[test]
    fn test_jittered_delays_track_the_exponential_curve() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(10))
            .multiplier(2.0)
            .jitter(0.2)
            .build();

        for attempt in 0..6 {
            let theoretical = (0.1 * 2f64.powi(attempt as i32)).min(10.0);
            let actual = policy.next_delay(attempt).as_secs_f64();
            assert!(
                actual >= theoretical * 0.8 && actual <= theoretical * 1.2,
                "attempt {attempt}: {actual}s outside ±20% of {theoretical}s"
            );
        }
    }

    #[test]
    fn test_jitter_varies() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_secs(1))
            .jitter(0.5)
            .build();

        let delays: Vec<_> = (0..20).map(|_| policy.next_delay(0)).collect();
        assert!(
            delays.windows(2).any(|w| w[0] != w[1]),
            "with jitter enabled, delays should vary"
        );
    }

    #[test]
    fn test_builder_defaults() {
        let policy = RetryPolicy::builder().build();

        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.multiplier, 2.0);
        assert_eq!(policy.jitter, 0.1);
        assert_eq!(policy.overall_timeout, Duration::from_secs(600));
        assert_eq!(policy.quota_action, QuotaAction::ExitProcess);
    }

    #[test]
    fn test_jitter_clamped() {
        let policy = RetryPolicy::builder().jitter(2.0).build();
        assert_eq!(policy.jitter, 1.0);

        let policy = RetryPolicy::builder().jitter(-0.5).build();
        assert_eq!(policy.jitter, 0.0);
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("VERDANT_MAX_RETRIES", Some("7")),
                ("VERDANT_INITIAL_DELAY_MS", Some("250")),
                ("VERDANT_MAX_DELAY_MS", Some("30000")),
                ("VERDANT_OVERALL_TIMEOUT_SECS", Some("90")),
            ],
            || {
                let policy = RetryPolicy::from_env().expect("valid env");
                assert_eq!(policy.max_retries, 7);
                assert_eq!(policy.initial_delay, Duration::from_millis(250));
                assert_eq!(policy.max_delay, Duration::from_secs(30));
                assert_eq!(policy.overall_timeout, Duration::from_secs(90));
            },
        );
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        temp_env::with_vars([("VERDANT_MAX_RETRIES", Some("many"))], || {
            let err = RetryPolicy::from_env().expect_err("should reject");
            assert!(matches!(err, CallError::InvalidConfig(_)));
            assert!(err.to_string().contains("VERDANT_MAX_RETRIES"));
        });
    }
}
