//! Error types for the protocol layer.
//!
//! Each crate in kportal defines its own error enum. A `ProtocolError`
//! means the bytes were there but did not have the expected shape.

use serde::Deserialize;
use serde_json::Value;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a request body into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a response body into a type).
    ///
    /// Common causes: the backend changed a field name, sent `null`
    /// for a required field, or returned an HTML error page.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body decoded but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// FastAPI-style error body: `{"detail": "..."}` or
/// `{"detail": [{"loc": [...], "msg": "...", ...}]}` for 422s.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

/// Extracts the human-readable `detail` from an error response body.
///
/// String details are returned as-is. Validation error lists are joined
/// by their `msg` fields. Anything else (empty body, HTML, no `detail`)
/// yields `None`.
pub fn error_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_string() {
        let body = br#"{"detail":"Incorrect email or password"}"#;
        assert_eq!(error_detail(body).as_deref(), Some("Incorrect email or password"));
    }

    #[test]
    fn test_error_detail_validation_list_joins_messages() {
        let body = br#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address"},{"loc":["body","password"],"msg":"field required"}]}"#;
        assert_eq!(
            error_detail(body).as_deref(),
            Some("value is not a valid email address; field required")
        );
    }

    #[test]
    fn test_error_detail_non_json_is_none() {
        assert_eq!(error_detail(b"<html>502 Bad Gateway</html>"), None);
        assert_eq!(error_detail(b""), None);
        assert_eq!(error_detail(br#"{"message":"nope"}"#), None);
    }
}
