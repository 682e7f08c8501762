//! Single normalization boundary for structured completions.
//!
//! Providers return anywhere from clean JSON to JSON wrapped in markdown
//! fences, JSON embedded in prose, a double-encoded JSON string, or a
//! `{"raw": "..."}` envelope. Every call site that expects a schema goes
//! through [`parse_completion`] instead of ad hoc shape checking.

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("empty completion")]
    Empty,

    #[error("no JSON payload found in completion")]
    NoJson,

    #[error("completion did not match expected schema: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Parse a raw completion into `T`, tolerating the response shapes
/// observed in the wild.
pub fn parse_completion<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let stripped = strip_fences(raw);
    if stripped.is_empty() {
        return Err(ParseError::Empty);
    }
    let value = normalize(stripped).ok_or(ParseError::NoJson)?;
    Ok(serde_json::from_value(value)?)
}

/// Peel a ```json / ``` fence off a completion, if one wraps it.
fn strip_fences(raw: &str) -> &str {
    let inner = raw.trim();
    let inner = inner
        .strip_prefix("```json")
        .or_else(|| inner.strip_prefix("```"))
        .unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn normalize(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(unwrap_value(value));
    }
    extract_json(text)
        .and_then(|fragment| serde_json::from_str::<Value>(fragment).ok())
        .map(unwrap_value)
}

/// Unwrap `{"raw": ...}` envelopes and JSON-encoded-as-string payloads.
fn unwrap_value(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let inner = strip_fences(&s);
            match serde_json::from_str::<Value>(inner) {
                Ok(parsed) if parsed.is_object() || parsed.is_array() => unwrap_value(parsed),
                _ => Value::String(s),
            }
        }
        Value::Object(mut map) if map.len() == 1 => {
            if let Some(inner) = map.remove("raw") {
                unwrap_value(inner)
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

/// Find the first balanced `{...}` or `[...]` region in free text.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        if b == b'"' {
            in_string = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..=i]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        score: f64,
        reason: String,
    }

    #[test]
    fn parses_clean_json() {
        let v: Verdict = parse_completion(r#"{"score": 7, "reason": "solid"}"#).unwrap();
        assert_eq!(v.score, 7.0);
        assert_eq!(v.reason, "solid");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"score\": 3.5, \"reason\": \"thin\"}\n```";
        let v: Verdict = parse_completion(raw).unwrap();
        assert_eq!(v.score, 3.5);
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let raw = "Sure! Here is my evaluation:\n{\"score\": 9, \"reason\": \"strong {source}\"}\nLet me know if you need more.";
        let v: Verdict = parse_completion(raw).unwrap();
        assert_eq!(v.score, 9.0);
        assert_eq!(v.reason, "strong {source}");
    }

    #[test]
    fn parses_raw_envelope() {
        let raw = r#"{"raw": "{\"score\": 2, \"reason\": \"weak\"}"}"#;
        let v: Verdict = parse_completion(raw).unwrap();
        assert_eq!(v.score, 2.0);
    }

    #[test]
    fn parses_double_encoded_string() {
        let raw = "\"{\\\"score\\\": 6, \\\"reason\\\": \\\"ok\\\"}\"";
        let v: Verdict = parse_completion(raw).unwrap();
        assert_eq!(v.score, 6.0);
    }

    #[test]
    fn parses_array_payload() {
        let raw = "The groups are: [[1, 3], [2, 4]] as requested.";
        let v: Vec<Vec<u32>> = parse_completion(raw).unwrap();
        assert_eq!(v, vec![vec![1, 3], vec![2, 4]]);
    }

    #[test]
    fn rejects_plain_text() {
        let err = parse_completion::<Verdict>("I could not evaluate this item.").unwrap_err();
        assert!(matches!(err, ParseError::NoJson));
    }

    #[test]
    fn rejects_empty() {
        let err = parse_completion::<Verdict>("```\n```").unwrap_err();
        assert!(matches!(err, ParseError::Empty));
    }

    #[test]
    fn rejects_schema_mismatch() {
        let err = parse_completion::<Verdict>(r#"{"points": 5}"#).unwrap_err();
        assert!(matches!(err, ParseError::Schema(_)));
    }
}
