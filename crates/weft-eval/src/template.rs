//! Template marker scanning and substitution.
//!
//! Strings may embed `{{ <code> }}` markers. A string that is exactly one
//! marker resolves to the marker's value with its type preserved — this is
//! what lets bindings carry arrays and objects, not only strings. Any other
//! shape is substituted textually, left to right, with failed markers
//! degrading to empty spans without aborting their siblings.

use crate::context::EvalContext;
use crate::resolve::resolve_code;
use serde_json::Value;

/// A `{{ … }}` span inside a string. `start..end` covers the braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    start: usize,
    end: usize,
}

/// Find all non-overlapping markers. The inner span is one or more
/// non-`}` characters, so `{{a}b}}` contains no marker.
fn find_markers(s: &str) -> Vec<Marker> {
    let bytes = s.as_bytes();
    let mut markers = Vec::new();
    let mut pos = 0;
    while let Some(offset) = s[pos..].find("{{") {
        let start = pos + offset;
        let inner_start = start + 2;
        match bytes[inner_start..].iter().position(|&b| b == b'}') {
            Some(0) | None => {
                // Empty inner span or unterminated — no marker starts here
                pos = inner_start;
            }
            Some(close) => {
                let close_at = inner_start + close;
                if bytes.get(close_at + 1) == Some(&b'}') {
                    markers.push(Marker {
                        start,
                        end: close_at + 2,
                    });
                    pos = close_at + 2;
                } else {
                    pos = inner_start;
                }
            }
        }
    }
    markers
}

/// Whether a value is a string containing at least one template marker.
pub fn has_markers(value: &Value) -> bool {
    matches!(value, Value::String(s) if !find_markers(s).is_empty())
}

/// Display rendering used when a resolved value is spliced into text.
/// `null` renders empty; structured values render as JSON.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Evaluate every marker in `expression` against `ctx`.
///
/// Returns the input unchanged when it contains no markers. A failed marker
/// is logged and becomes an empty substitution; it never aborts the rest of
/// the string.
pub fn evaluate(expression: &str, ctx: &EvalContext<'_>) -> Value {
    let markers = find_markers(expression);
    if markers.is_empty() {
        return Value::String(expression.to_string());
    }

    // A string that is exactly one marker keeps the resolved value's type
    if markers.len() == 1 && markers[0].start == 0 && markers[0].end == expression.len() {
        let code = expression[markers[0].start + 2..markers[0].end - 2].trim();
        return match resolve_code(code, ctx) {
            Ok(Some(value)) => value,
            Ok(None) => Value::Null,
            Err(err) => {
                log::error!("error evaluating expression `{code}`: {err}");
                Value::Null
            }
        };
    }

    let mut out = String::new();
    let mut cursor = 0;
    for marker in &markers {
        out.push_str(&expression[cursor..marker.start]);
        let code = expression[marker.start + 2..marker.end - 2].trim();
        match resolve_code(code, ctx) {
            Ok(Some(value)) => out.push_str(&display_string(&value)),
            Ok(None) => {}
            Err(err) => {
                log::error!("error evaluating expression `{code}`: {err}");
            }
        }
        cursor = marker.end;
    }
    out.push_str(&expression[cursor..]);
    Value::String(out)
}

/// Recursively apply [`evaluate`] through arrays, maps and strings, leaving
/// other primitives untouched.
pub fn evaluate_deep(value: &Value, ctx: &EvalContext<'_>) -> Value {
    match value {
        Value::String(s) => evaluate(s, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|v| evaluate_deep(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), evaluate_deep(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}
