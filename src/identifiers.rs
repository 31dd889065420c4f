//! Type-safe identifiers.
//!
//! Newtype wrappers keep connection, subscription and notification IDs
//! from being mixed up at compile time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// ConnectionId
// ============================================================================

/// Identifies one transport connection attempt within a channel.
///
/// Every transport event carries the ID of the handle that produced it, so
/// events from a superseded connection can be recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the ID that follows this one.
    #[inline]
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Process-wide counter so IDs are never reused across queues.
static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

impl SubscriptionId {
    /// Allocates a fresh subscription ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// NotificationId
// ============================================================================

/// Server-assigned notification identifier, used for de-duplication.
///
/// The server stores notification IDs as integers but the wire format allows
/// strings; both are normalised to a string so `7` and `"7"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(Arc<str>);

impl NotificationId {
    /// Creates a notification ID.
    #[inline]
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NotificationId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<u64> for NotificationId {
    fn from(id: u64) -> Self {
        Self(Arc::from(id.to_string()))
    }
}

impl Serialize for NotificationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NotificationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        let id = match WireId::deserialize(deserializer)? {
            WireId::Text(text) => Self::from(text),
            WireId::Unsigned(n) => Self::from(n),
            WireId::Signed(n) => Self::from(n.to_string()),
        };

        if id.as_str().is_empty() {
            return Err(serde::de::Error::custom("notification id is empty"));
        }

        Ok(id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_next() {
        let id = ConnectionId::new(4);
        assert_eq!(id.next().as_u64(), 5);
        assert_eq!(id.to_string(), "conn-4");
    }

    #[test]
    fn test_subscription_ids_unique() {
        let a = SubscriptionId::generate();
        let b = SubscriptionId::generate();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_notification_id_from_integer_matches_string() {
        let from_int: NotificationId = serde_json::from_str("42").expect("integer id");
        let from_str: NotificationId = serde_json::from_str("\"42\"").expect("string id");
        assert_eq!(from_int, from_str);
    }

    #[test]
    fn test_notification_id_rejects_empty() {
        assert!(serde_json::from_str::<NotificationId>("\"\"").is_err());
    }

    #[test]
    fn test_notification_id_rejects_other_types() {
        assert!(serde_json::from_str::<NotificationId>("true").is_err());
        assert!(serde_json::from_str::<NotificationId>("1.5").is_err());
    }
}
