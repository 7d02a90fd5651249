//! Field errors and value coercion for request input.
//!
//! Body values arrive either as JSON (`serde_json::Value`) or as text (form
//! fields, query parameters, path variables). [`FromField`] converts both
//! into typed values:
//!
//! - JSON numbers become integers by truncation; JSON strings are never
//!   coerced to numbers
//! - Text is parsed; booleans accept `1 t T TRUE true True 0 f F FALSE false False`

use serde_json::Value;
use thiserror::Error;

/// Where a field was looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    JsonBody,
    FormBody,
    Query,
    Path,
}

/// A single input problem. Messages name the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Key absent from its source.
    #[error("{}", missing_message(.key, .location))]
    Missing { key: String, location: FieldSource },

    /// Key present but its value has the wrong type or format.
    #[error("Parse :{key} fail")]
    Parse { key: String },

    /// Body could not be decoded at all.
    #[error("{0}")]
    Malformed(String),

    /// Value parsed but violates a rule (e.g. quantity below one).
    #[error("Invalid {key}: {reason}")]
    Invalid { key: String, reason: String },
}

fn missing_message(key: &str, location: &FieldSource) -> String {
    match location {
        FieldSource::JsonBody => format!("Missing key: {key} in JSON body"),
        FieldSource::FormBody => format!("Missing key: {key} in form body"),
        FieldSource::Query => format!("Missing query: {key} in URI"),
        FieldSource::Path => format!("Missing required parameter: {key}"),
    }
}

impl FieldError {
    pub(crate) fn missing(key: &str, location: FieldSource) -> Self {
        Self::Missing {
            key: key.to_owned(),
            location,
        }
    }

    pub(crate) fn parse(key: &str) -> Self {
        Self::Parse {
            key: key.to_owned(),
        }
    }

    /// Build a rule violation for `key`.
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Types that can be read from a request field.
pub trait FromField: Sized {
    /// Convert a JSON body value.
    fn from_json(value: &Value) -> Option<Self>;

    /// Parse a form, query or path value.
    fn from_text(text: &str) -> Option<Self>;
}

impl FromField for String {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }

    fn from_text(text: &str) -> Option<Self> {
        Some(text.to_owned())
    }
}

impl FromField for f64 {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FromField for i64 {
    #[allow(clippy::cast_possible_truncation)] // Truncation is the documented coercion
    fn from_json(value: &Value) -> Option<Self> {
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.trunc() as Self))
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FromField for i32 {
    fn from_json(value: &Value) -> Option<Self> {
        i64::from_json(value).and_then(|v| Self::try_from(v).ok())
    }

    fn from_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FromField for bool {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn from_text(text: &str) -> Option<Self> {
        match text {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_numbers_truncate_to_integers() {
        assert_eq!(i32::from_json(&json!(3.9)), Some(3));
        assert_eq!(i64::from_json(&json!(-2.5)), Some(-2));
        assert_eq!(i32::from_json(&json!(7)), Some(7));
    }

    #[test]
    fn test_json_strings_are_not_numbers() {
        assert_eq!(i32::from_json(&json!("7")), None);
        assert_eq!(f64::from_json(&json!("1.5")), None);
        assert_eq!(String::from_json(&json!(7)), None);
    }

    #[test]
    fn test_json_out_of_range_int() {
        assert_eq!(i32::from_json(&json!(10_000_000_000_i64)), None);
    }

    #[test]
    fn test_text_bool_values() {
        for t in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(bool::from_text(t), Some(true), "{t}");
        }
        for f in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(bool::from_text(f), Some(false), "{f}");
        }
        assert_eq!(bool::from_text("yes"), None);
    }

    #[test]
    fn test_text_numbers() {
        assert_eq!(i32::from_text("42"), Some(42));
        assert_eq!(i32::from_text("4.2"), None);
        assert_eq!(f64::from_text("4.25"), Some(4.25));
    }

    #[test]
    fn test_error_messages_name_the_field() {
        assert_eq!(
            FieldError::missing("member_id", FieldSource::JsonBody).to_string(),
            "Missing key: member_id in JSON body"
        );
        assert_eq!(
            FieldError::missing("page", FieldSource::Query).to_string(),
            "Missing query: page in URI"
        );
        assert_eq!(FieldError::parse("quantity").to_string(), "Parse :quantity fail");
        assert_eq!(
            FieldError::invalid("quantity", "must be at least 1").to_string(),
            "Invalid quantity: must be at least 1"
        );
    }
}
