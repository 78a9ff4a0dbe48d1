//! Best-effort recovery of structured data from malformed model output.
//!
//! The AI extraction service sometimes truncates its output, wraps JSON in
//! prose or code fences, or produces near-valid JSON with a stray comma.
//! Failing outright on any of these would discard otherwise-usable data, so
//! [`parse`] attempts recovery in strictly increasing order of invasiveness
//! and always degrades to a typed [`ParseOutcome::Unparseable`] carrying the
//! original text; it never returns an error and never panics.
//!
//! Recovery stages, first success wins:
//!
//! 1. strict parse of the entire text;
//! 2. strict parse of the largest brace-delimited substring;
//! 3. cumulative low-risk textual repairs on that substring (strip code
//!    fences, insert missing separators between adjacent braces, strip
//!    trailing separators, close unterminated objects);
//! 4. partial recovery of individual `{`-delimited fragments;
//! 5. last-resort scavenging of `"key": value` pairs into a flat object.
//!
//! Schema validation is a downstream concern: a value that parses but does
//! not match what the caller expected is still [`ParseOutcome::Structured`].

mod repair;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Result of a recovery parse. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseOutcome {
    /// Structured data was recovered, possibly after repairs.
    Structured(Value),
    /// No repair strategy produced valid structured data. The original
    /// text is preserved for downstream logging and manual review.
    Unparseable(String),
}

impl ParseOutcome {
    /// Whether structured data was recovered.
    pub fn is_structured(&self) -> bool {
        matches!(self, ParseOutcome::Structured(_))
    }

    /// The recovered value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ParseOutcome::Structured(value) => Some(value),
            ParseOutcome::Unparseable(_) => None,
        }
    }

    /// Consume the outcome, yielding the recovered value if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            ParseOutcome::Structured(value) => Some(value),
            ParseOutcome::Unparseable(_) => None,
        }
    }

    /// The preserved original text, if recovery failed.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            ParseOutcome::Structured(_) => None,
            ParseOutcome::Unparseable(raw) => Some(raw),
        }
    }
}

/// Recover structured data from raw extraction-service output.
///
/// Runs the staged recovery described at the [module level](self). Total:
/// any input yields either [`ParseOutcome::Structured`] or
/// [`ParseOutcome::Unparseable`] with the input preserved verbatim.
///
/// # Examples
///
/// ```rust
/// use verdant_core::recover::{ParseOutcome, parse};
///
/// // Fence-wrapped output with a trailing comma still recovers.
/// let raw = "```json\n{\"scope1\": 120.5, \"scope2\": 48.2,}\n```";
/// assert!(parse(raw).is_structured());
///
/// // Hopeless input degrades to Unparseable, text preserved.
/// match parse("no data found") {
///     ParseOutcome::Unparseable(text) => assert_eq!(text, "no data found"),
///     ParseOutcome::Structured(_) => unreachable!(),
/// }
/// ```
pub fn parse(raw: &str) -> ParseOutcome {
    // Stage 1: the text may simply be valid.
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return ParseOutcome::Structured(value);
    }

    // Stage 2: the payload is often embedded in prose or fences.
    if let Some(span) = repair::largest_braced_span(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            debug!(span_len = span.len(), "recovered payload embedded in surrounding text");
            return ParseOutcome::Structured(value);
        }

        // Stage 3: cumulative low-risk repairs, re-parsing after each.
        let mut candidate = span.to_string();
        let repairs: [(&str, fn(&str) -> String); 4] = [
            ("strip_code_fences", repair::strip_code_fences),
            ("insert_missing_separators", repair::insert_missing_separators),
            ("strip_trailing_separators", repair::strip_trailing_separators),
            ("close_open_braces", repair::close_open_braces),
        ];
        for (name, fix) in repairs {
            candidate = fix(&candidate);
            if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
                debug!(repair = name, "recovered payload after textual repair");
                return ParseOutcome::Structured(value);
            }
        }
    }

    // Stage 4: partial recovery of individual fragments.
    if let Some(value) = recover_fragments(raw) {
        debug!("recovered partial payload from a fragment");
        return ParseOutcome::Structured(value);
    }

    // Stage 5: scavenge key/value pairs from anywhere in the text.
    if let Some(value) = repair::scavenge_pairs(raw) {
        debug!("reassembled flat payload from scavenged key/value pairs");
        return ParseOutcome::Structured(value);
    }

    ParseOutcome::Unparseable(raw.to_string())
}

/// Try each `{`-opened fragment of the text in turn: first as a balanced
/// prefix, then auto-closed, then with a dangling string literal terminated
/// and the trailing separator stripped.
fn recover_fragments(text: &str) -> Option<Value> {
    for (start, _) in text.match_indices('{') {
        let fragment = &text[start..];

        if let Some(balanced) = repair::balanced_prefix(fragment) {
            if let Ok(value) = serde_json::from_str::<Value>(balanced) {
                return Some(value);
            }
        }

        let closed = repair::close_open_braces(fragment);
        if let Ok(value) = serde_json::from_str::<Value>(&closed) {
            return Some(value);
        }

        let patched = repair::finish_dangling(fragment);
        if let Ok(value) = serde_json::from_str::<Value>(&patched) {
            return Some(value);
        }
    }
    None
}
