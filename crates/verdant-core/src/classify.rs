//! Failure classification.
//!
//! One place decides what a failed call means; call sites never string-match
//! on their own. [`classify`] is total and pure: any [`CallError`], however
//! malformed its message, gets a verdict and nothing ever panics.

use crate::error::CallError;

/// Ceiling on the rendered length of an error before it is treated as
/// pathological rather than inspected further.
const MAX_RENDERED_LEN: usize = 8 * 1024;

/// Status codes the providers use for rate limiting and transient server
/// failure. 403 is included because the report search provider signals
/// rate-limit exhaustion with it.
const RETRYABLE_STATUS: &[u16] = &[403, 429, 500, 502, 503, 504];

/// Message fragments that mark a failure as transient.
const TRANSIENT_PHRASES: &[&str] = &[
    "timeout",
    "timed out",
    "connection reset",
    "service unavailable",
    "socket hang up",
    "backend error",
];

/// Message fragments that mark the upstream quota as exhausted.
const QUOTA_PHRASES: &[&str] = &["quota exceeded", "resource exhausted"];

/// Message fragments that mark an error itself as degenerate.
const PATHOLOGICAL_PHRASES: &[&str] = &[
    "maximum call stack",
    "stack overflow",
    "recursion limit",
];

/// Verdict on a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorVerdict {
    /// Transient; the executor may retry within policy limits.
    Retryable,
    /// Non-retryable; propagate to the caller immediately.
    Fatal,
    /// Unrecoverable resource exhaustion; further attempts anywhere in the
    /// process are futile.
    ProcessFatal,
}

/// Classify a failed call.
///
/// Rules, in priority order:
///
/// 1. An error whose rendered form exceeds a size ceiling, or whose message
///    indicates a stack-depth/recursion failure, is [`ErrorVerdict::Fatal`]:
///    pathological errors are not worth retrying or inspecting further.
/// 2. Quota exhaustion ([`is_quota_exhaustion`]) is
///    [`ErrorVerdict::ProcessFatal`], even when it arrives under a status
///    code that would otherwise be transient.
/// 3. A status code in the rate-limited/transient-server set, a
///    connection-level failure, or a message matching a known transient
///    phrase is [`ErrorVerdict::Retryable`].
/// 4. Everything else is [`ErrorVerdict::Fatal`].
pub fn classify(error: &CallError) -> ErrorVerdict {
    let rendered = error.to_string();
    if rendered.len() > MAX_RENDERED_LEN {
        return ErrorVerdict::Fatal;
    }

    let lowered = rendered.to_lowercase();
    if PATHOLOGICAL_PHRASES.iter().any(|p| lowered.contains(p)) {
        return ErrorVerdict::Fatal;
    }

    if is_quota_exhaustion(error) {
        return ErrorVerdict::ProcessFatal;
    }

    match error {
        // The wall-clock budget is terminal for the call; retrying past it
        // would only lengthen the tail.
        CallError::TimeoutExceeded { .. } => ErrorVerdict::Fatal,
        CallError::Connection(_) => ErrorVerdict::Retryable,
        CallError::Status { status, .. } if RETRYABLE_STATUS.contains(status) => {
            ErrorVerdict::Retryable
        }
        _ if TRANSIENT_PHRASES.iter().any(|p| lowered.contains(p)) => ErrorVerdict::Retryable,
        _ => ErrorVerdict::Fatal,
    }
}

/// Whether a failure reports the upstream quota as exhausted.
///
/// Narrower than [`classify`]: matches the explicit
/// [`CallError::QuotaExhausted`] variant and the quota phrasings the
/// providers put into otherwise ordinary errors.
pub fn is_quota_exhaustion(error: &CallError) -> bool {
    if matches!(error, CallError::QuotaExhausted(_)) {
        return true;
    }
    let lowered = error.to_string().to_lowercase();
    QUOTA_PHRASES.iter().any(|p| lowered.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_status_codes() {
        for &status in RETRYABLE_STATUS {
            let err = CallError::Status {
                status,
                message: "nope".to_string(),
            };
            assert_eq!(classify(&err), ErrorVerdict::Retryable, "status {status}");
        }
    }

    #[test]
    fn test_non_retryable_status_codes() {
        for status in [400, 401, 404, 409, 422] {
            let err = CallError::Status {
                status,
                message: "bad request".to_string(),
            };
            assert_eq!(classify(&err), ErrorVerdict::Fatal, "status {status}");
        }
    }

    #[test]
    fn test_transient_phrases() {
        for phrase in ["socket hang up", "Backend Error", "connection reset by peer"] {
            let err = CallError::Upstream(phrase.to_string());
            assert_eq!(classify(&err), ErrorVerdict::Retryable, "{phrase}");
        }
    }

    #[test]
    fn test_connection_errors_are_retryable() {
        let err = CallError::Connection("ECONNREFUSED".to_string());
        assert_eq!(classify(&err), ErrorVerdict::Retryable);
    }

    #[test]
    fn test_quota_exhaustion_is_process_fatal() {
        let err = CallError::QuotaExhausted("daily limit".to_string());
        assert_eq!(classify(&err), ErrorVerdict::ProcessFatal);
        assert!(is_quota_exhaustion(&err));

        // Quota phrasing wins over an otherwise retryable status.
        let err = CallError::Status {
            status: 403,
            message: "Quota exceeded for quota metric 'Queries'".to_string(),
        };
        assert_eq!(classify(&err), ErrorVerdict::ProcessFatal);

        let err = CallError::Upstream("RESOURCE EXHAUSTED".to_string());
        assert_eq!(classify(&err), ErrorVerdict::ProcessFatal);
    }

    #[test]
    fn test_timeout_exceeded_is_fatal_for_the_call() {
        let err = CallError::TimeoutExceeded {
            budget: std::time::Duration::from_secs(30),
            elapsed: std::time::Duration::from_secs(30),
        };
        assert_eq!(classify(&err), ErrorVerdict::Fatal);
    }

    #[test]
    fn test_oversized_errors_are_fatal() {
        let err = CallError::Upstream("x".repeat(MAX_RENDERED_LEN + 1));
        assert_eq!(classify(&err), ErrorVerdict::Fatal);

        // Even when the body contains transient phrasing.
        let err = CallError::Upstream(format!("timeout {}", "x".repeat(MAX_RENDERED_LEN)));
        assert_eq!(classify(&err), ErrorVerdict::Fatal);
    }

    #[test]
    fn test_pathological_messages_are_fatal() {
        let err = CallError::Upstream("Maximum call stack size exceeded".to_string());
        assert_eq!(classify(&err), ErrorVerdict::Fatal);
    }

    #[test]
    fn test_unknown_errors_default_to_fatal() {
        let err = CallError::Upstream("unsupported payload shape".to_string());
        assert_eq!(classify(&err), ErrorVerdict::Fatal);
    }
}
