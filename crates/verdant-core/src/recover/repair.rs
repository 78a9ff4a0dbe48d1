//! Textual repair passes used by the recovery parser.
//!
//! Each pass is a small pure function; the orchestration in
//! [`super::parse`] decides the order and re-parses after every pass. The
//! passes are heuristics over text that was *meant* to be JSON. They trade
//! strictness for salvage, and a pass that guesses wrong simply fails the
//! follow-up strict parse.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SEPARATOR_BETWEEN_OBJECTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\s*\{").expect("failed to compile separator regex"));

static TRAILING_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("failed to compile trailing separator regex"));

static TRAILING_PARTIAL_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#",\s*"[^"]*"\s*:\s*$"#).expect("failed to compile partial member regex")
});

static TRAILING_COMMA_AT_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*$").expect("failed to compile trailing comma regex"));

static KEY_VALUE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""([^"\\]+)"\s*:\s*("(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|true|false|null)"#,
    )
    .expect("failed to compile key/value regex")
});

/// End state of a brace/string scan over a fragment.
struct ScanEnd {
    depth: i32,
    in_string: bool,
}

/// Scan a fragment tracking brace depth outside string literals.
fn scan(text: &str) -> ScanEnd {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else {
            match ch {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
    }

    ScanEnd { depth, in_string }
}

/// The span from the first `{` to the last `}`, the widest substring that
/// could be the intended payload.
pub(super) fn largest_braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Drop markdown code-fence lines (```` ``` ````, ```` ```json ````).
pub(super) fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Insert a comma between adjacent closing and opening braces.
pub(super) fn insert_missing_separators(text: &str) -> String {
    SEPARATOR_BETWEEN_OBJECTS.replace_all(text, "},{").into_owned()
}

/// Strip trailing commas before a closing brace or bracket.
pub(super) fn strip_trailing_separators(text: &str) -> String {
    TRAILING_SEPARATOR.replace_all(text, "$1").into_owned()
}

/// Append the closing braces an unterminated object is missing.
///
/// Counts depth outside string literals; a fragment that ends inside a
/// string is left for [`finish_dangling`].
pub(super) fn close_open_braces(text: &str) -> String {
    let end = scan(text);
    if end.depth <= 0 {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + end.depth as usize);
    out.push_str(text);
    for _ in 0..end.depth {
        out.push('}');
    }
    out
}

/// The prefix of a `{`-opened fragment up to the brace that balances it,
/// if the fragment ever balances.
pub(super) fn balanced_prefix(fragment: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in fragment.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&fragment[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Last-ditch repair of a truncated fragment: terminate a dangling string
/// literal with an empty close, strip a trailing separator or half-written
/// member, then close the remaining open braces.
pub(super) fn finish_dangling(fragment: &str) -> String {
    let mut text = fragment.to_string();
    if scan(&text).in_string {
        text.push('"');
    }
    let text = TRAILING_PARTIAL_MEMBER.replace(&text, "");
    let text = TRAILING_COMMA_AT_END.replace(&text, "");
    close_open_braces(&text)
}

/// Scavenge `"key": value` pairs from anywhere in the text and reassemble
/// them into a flat object. Returns `None` when not a single pair matches.
pub(super) fn scavenge_pairs(text: &str) -> Option<Value> {
    let mut map = serde_json::Map::new();
    for caps in KEY_VALUE_PAIR.captures_iter(text) {
        if let Ok(value) = serde_json::from_str::<Value>(&caps[2]) {
            map.insert(caps[1].to_string(), value);
        }
    }
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}
