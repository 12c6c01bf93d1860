//! Upstream payload decoding
//!
//! Each stream message carries a `data` field holding a flat JSON object of
//! string values:
//!
//! ```json
//! {
//!     "appId": "checkout",
//!     "message": "payment accepted",
//!     "source": "api-3",
//!     "level": "INFO",
//!     "environment": "production",
//!     "metadataString": "{\"orderId\":\"o-17\"}",
//!     "traceId": "a1b2c3",
//!     "userId": "u-42"
//! }
//! ```
//!
//! Unknown keys are ignored. Missing or empty fields fall back to schema
//! defaults rather than failing the message; only structurally invalid JSON
//! is a decode error (the caller counts it and skips the message, leaving
//! the upstream copy pending).

use serde_json::{Map, Value};

use crate::{DecodeError, LogEntry, LogLevel, Result};

/// Decode one upstream payload into a [`LogEntry`].
///
/// `upstream_id` is the stream message id the entry will be acknowledged
/// under once written.
pub fn decode_payload(data: &str, upstream_id: &str) -> Result<LogEntry> {
    let value: Value = serde_json::from_str(data)?;
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    Ok(LogEntry {
        app_id: field_or(obj, "appId", "unknown"),
        message: field_or(obj, "message", "empty"),
        source: field_or(obj, "source", "unknown"),
        level: LogLevel::from_upstream(field(obj, "level")),
        environment: field_or(obj, "environment", "development"),
        metadata: field_or(obj, "metadataString", "{}"),
        trace_id: field(obj, "traceId").to_string(),
        user_id: field(obj, "userId").to_string(),
        upstream_id: upstream_id.to_string(),
    })
}

/// String value of `key`; non-string or absent values read as empty
fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or("")
}

/// String value of `key`, falling back to `default` when missing or empty
fn field_or(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    let value = field(obj, key);
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;
