//! Notification record and frame parser.
//!
//! # Format
//!
//! ```json
//! {
//!   "id": "42",
//!   "message": "alice liked your article",
//!   "created_at": "2025-02-01T10:00:00"
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::SystemTime;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::NotificationId;

// ============================================================================
// NotificationRecord
// ============================================================================

/// A notification received from the server.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    id: NotificationId,
    message: String,
    received_at: SystemTime,
    raw: Value,
}

impl NotificationRecord {
    /// Creates a record received now.
    #[must_use]
    pub fn new(id: impl Into<NotificationId>, message: impl Into<String>, raw: Value) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            received_at: SystemTime::now(),
            raw,
        }
    }

    /// Returns the de-duplication key.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    /// Returns the notification text.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns when the frame was received.
    #[inline]
    #[must_use]
    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    /// Returns the full JSON payload, including fields this crate ignores.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Fields every notification frame must carry.
#[derive(Deserialize)]
struct WireNotification {
    id: NotificationId,
    message: String,
}

/// Parses a text frame into a [`NotificationRecord`].
///
/// # Errors
///
/// Returns [`Error::MalformedPayload`] if the frame is not JSON, is not an
/// object, or lacks a valid `id` or `message`.
pub fn parse_notification(text: &str) -> Result<NotificationRecord> {
    let raw: Value =
        serde_json::from_str(text).map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;

    if !raw.is_object() {
        return Err(Error::malformed("payload is not a JSON object"));
    }

    let wire = WireNotification::deserialize(&raw)
        .map_err(|e| Error::malformed(format!("invalid notification: {e}")))?;

    Ok(NotificationRecord::new(wire.id, wire.message, raw))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_id() {
        let record = parse_notification(r#"{"id":"a","message":"hello"}"#).expect("valid frame");
        assert_eq!(record.id().as_str(), "a");
        assert_eq!(record.message(), "hello");
    }

    #[test]
    fn test_parse_integer_id() {
        let record = parse_notification(r#"{"id":17,"message":"new comment"}"#)
            .expect("integer ids are accepted");
        assert_eq!(record.id().as_str(), "17");
    }

    #[test]
    fn test_extra_fields_kept_in_raw() {
        let record = parse_notification(
            r#"{"id":"x","message":"m","is_read":false,"created_at":"2025-02-01T10:00:00"}"#,
        )
        .expect("extra fields are ignored");
        assert_eq!(record.raw()["is_read"], Value::Bool(false));
        assert_eq!(record.raw()["created_at"], "2025-02-01T10:00:00");
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = parse_notification("not json").unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = parse_notification(r#"["id","message"]"#).unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        assert!(parse_notification(r#"{"id":"a"}"#).is_err());
        assert!(parse_notification(r#"{"message":"m"}"#).is_err());
        assert!(parse_notification(r#"{"id":"a","message":5}"#).is_err());
        assert!(parse_notification(r#"{"id":"","message":"m"}"#).is_err());
    }
}
