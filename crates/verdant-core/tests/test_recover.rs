//! Recovery parser properties: round-trip fidelity, graceful degradation,
//! and the never-throws guarantee.

use proptest::prelude::*;
use rstest::rstest;
use serde_json::{Value, json};
use verdant_core::recover::{ParseOutcome, parse};

#[rstest]
#[case::plain(r#"{"scope1": 12.5}"#, json!({"scope1": 12.5}))]
#[case::prose_wrapped(
    "The report states: {\"scope1\": 12.5} (tonnes CO2e)",
    json!({"scope1": 12.5})
)]
#[case::code_fence("```json\n{\"scope1\": 12.5}\n```", json!({"scope1": 12.5}))]
#[case::trailing_comma(r#"{"scope1": 12.5, "scope2": 3.1,}"#, json!({"scope1": 12.5, "scope2": 3.1}))]
#[case::unterminated(r#"{"scope1": 12.5, "detail": {"unit": "t"}"#, json!({"scope1": 12.5, "detail": {"unit": "t"}}))]
#[case::truncated_mid_key(r#"{"a": 1, "b":"#, json!({"a": 1}))]
#[case::nested_array(r#"{"sources": ["a", "b"], "year": 2024}"#, json!({"sources": ["a", "b"], "year": 2024}))]
#[case::lone_brace_closes_to_empty("{", json!({}))]
fn recovers_structured_value(#[case] raw: &str, #[case] expected: Value) {
    assert_eq!(parse(raw).into_value(), Some(expected), "input: {raw}");
}

#[rstest]
#[case::empty("")]
#[case::prose_only("the company does not publish emissions data")]
#[case::unquoted_keys("{scope1: 12.5}")]
fn degrades_to_unparseable_with_text_preserved(#[case] raw: &str) {
    match parse(raw) {
        ParseOutcome::Unparseable(text) => assert_eq!(text, raw),
        ParseOutcome::Structured(value) => {
            panic!("expected unparseable for {raw:?}, got {value}")
        }
    }
}

proptest! {
    /// parse never panics, whatever the model produced.
    #[test]
    fn parse_never_panics(raw in ".*") {
        let _ = parse(&raw);
    }

    /// Brace-and-quote-heavy noise is the adversarial case for the repair
    /// passes; it must still never panic and never lose the input.
    #[test]
    fn parse_survives_brace_noise(raw in r#"[{}\[\]",:a1 ]{0,64}"#) {
        if let ParseOutcome::Unparseable(text) = parse(&raw) {
            prop_assert_eq!(text, raw);
        }
    }

    /// For well-formed input, recovery agrees with the strict parse.
    #[test]
    fn round_trips_strict_json(raw in ".*") {
        if let Ok(strict) = serde_json::from_str::<Value>(&raw) {
            prop_assert_eq!(parse(&raw), ParseOutcome::Structured(strict));
        }
    }
}
