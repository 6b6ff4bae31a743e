//! Inline validation for input-like components.
//!
//! Rules are computed locally from the component's props and surfaced as
//! inline messages — validation never raises and never blocks other state.
//! Rule order matches the property panel: required, max chars, numeric
//! range, type-specific patterns, then the author's custom regex.

use crate::model::{ComponentNode, PropMap};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").expect("phone pattern"));

/// Result of validating a single input value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_valid: bool,
    /// Inline message shown next to the input when invalid.
    pub message: Option<String>,
}

impl Validation {
    fn ok() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Validate `value` against an input component's validation props
/// (`required`, `maxChars`, `inputType`, `minNum`, `maxNum`, `regex`,
/// `errorMessage`). The first failing rule wins.
pub fn validate_input(props: &PropMap, value: &str) -> Validation {
    let bool_prop = |key: &str| props.get(key).and_then(|v| v.as_bool()).unwrap_or(false);
    let num_prop = |key: &str| props.get(key).and_then(|v| v.as_f64());
    let str_prop = |key: &str| props.get(key).and_then(|v| v.as_str());

    if bool_prop("required") && value.trim().is_empty() {
        return Validation::fail("This field is required");
    }

    if let Some(max_chars) = num_prop("maxChars")
        && max_chars > 0.0
        && value.chars().count() as f64 > max_chars
    {
        return Validation::fail(format!("Maximum {max_chars} characters allowed"));
    }

    let input_type = str_prop("inputType").unwrap_or("TEXT");

    if input_type == "NUMBER" && !value.is_empty() {
        match value.parse::<f64>() {
            Err(_) => return Validation::fail("Please enter a valid number"),
            Ok(n) => {
                if let Some(min) = num_prop("minNum")
                    && n < min
                {
                    return Validation::fail(format!("Minimum value is {min}"));
                }
                if let Some(max) = num_prop("maxNum")
                    && n > max
                {
                    return Validation::fail(format!("Maximum value is {max}"));
                }
            }
        }
    }

    if input_type == "EMAIL" && !value.is_empty() && !EMAIL_RE.is_match(value) {
        return Validation::fail("Please enter a valid email address");
    }

    if input_type == "PHONE" && !value.is_empty() {
        let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        if !PHONE_RE.is_match(&digits) {
            return Validation::fail("Please enter a valid phone number");
        }
    }

    if let Some(pattern) = str_prop("regex")
        && !value.is_empty()
    {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(value) {
                    let message = str_prop("errorMessage").unwrap_or("Invalid format");
                    return Validation::fail(message);
                }
            }
            Err(err) => {
                // An unparsable author pattern never blocks the input
                log::error!("invalid regex pattern {pattern:?}: {err}");
            }
        }
    }

    Validation::ok()
}

/// Validate a component's current text value (`defaultText` prop).
pub fn validate_component(component: &ComponentNode) -> Validation {
    let value = component.str_prop("defaultText").unwrap_or("");
    validate_input(&component.props, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: serde_json::Value) -> PropMap {
        pairs.as_object().unwrap().clone()
    }

    #[test]
    fn required_rejects_blank() {
        let p = props(json!({"required": true}));
        assert!(!validate_input(&p, "   ").is_valid);
        assert!(validate_input(&p, "hello").is_valid);
    }

    #[test]
    fn max_chars_counts_characters() {
        let p = props(json!({"maxChars": 5}));
        assert!(validate_input(&p, "12345").is_valid);
        assert!(!validate_input(&p, "123456").is_valid);
    }

    #[test]
    fn number_range() {
        let p = props(json!({"inputType": "NUMBER", "minNum": 1, "maxNum": 10}));
        assert!(!validate_input(&p, "abc").is_valid);
        assert!(!validate_input(&p, "0").is_valid);
        assert!(!validate_input(&p, "11").is_valid);
        assert!(validate_input(&p, "7").is_valid);
        // Empty value skips the numeric rules (required handles emptiness)
        assert!(validate_input(&p, "").is_valid);
    }

    #[test]
    fn email_and_phone_patterns() {
        let p = props(json!({"inputType": "EMAIL"}));
        assert!(validate_input(&p, "a@b.co").is_valid);
        assert!(!validate_input(&p, "not-an-email").is_valid);

        let p = props(json!({"inputType": "PHONE"}));
        assert!(validate_input(&p, "+4915 1234 5678").is_valid);
        assert!(!validate_input(&p, "0123").is_valid);
    }

    #[test]
    fn custom_regex_uses_author_message() {
        let p = props(json!({"regex": "^[A-Z]{3}$", "errorMessage": "Use a 3-letter code"}));
        let v = validate_input(&p, "abc");
        assert_eq!(v.message.as_deref(), Some("Use a 3-letter code"));
        assert!(validate_input(&p, "ABC").is_valid);
    }

    #[test]
    fn broken_regex_never_blocks() {
        let p = props(json!({"regex": "["}));
        assert!(validate_input(&p, "anything").is_valid);
    }
}
