//! Classifier totality and verdict properties.

use proptest::prelude::*;
use verdant_core::{CallError, ErrorVerdict, classify, is_quota_exhaustion};

proptest! {
    /// Any status/message combination gets a verdict; classify never panics.
    #[test]
    fn classify_is_total_over_status_errors(status in any::<u16>(), message in ".*") {
        let err = CallError::Status { status, message };
        let verdict = classify(&err);
        prop_assert!(matches!(
            verdict,
            ErrorVerdict::Retryable | ErrorVerdict::Fatal | ErrorVerdict::ProcessFatal
        ));
    }

    /// Free-form upstream text, including pathological content, never panics.
    #[test]
    fn classify_is_total_over_upstream_text(message in ".*") {
        let err = CallError::Upstream(message);
        let _ = classify(&err);
        let _ = is_quota_exhaustion(&err);
    }

    /// Quota phrasing is never treated as merely transient.
    #[test]
    fn quota_phrasing_is_never_retryable(message in ".*") {
        let err = CallError::Upstream(format!("{message} quota exceeded"));
        prop_assert_ne!(classify(&err), ErrorVerdict::Retryable);
        prop_assert!(is_quota_exhaustion(&err));
    }
}

#[test]
fn verdicts_for_the_documented_status_set() {
    for status in [403u16, 429, 500, 502, 503, 504] {
        let err = CallError::Status {
            status,
            message: "try later".to_string(),
        };
        assert_eq!(classify(&err), ErrorVerdict::Retryable);
    }
    for status in [400u16, 401, 404, 422] {
        let err = CallError::Status {
            status,
            message: "bad input".to_string(),
        };
        assert_eq!(classify(&err), ErrorVerdict::Fatal);
    }
}
