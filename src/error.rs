//! Error types for the notification channel.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use notify_channel::{Channel, Error, Result};
//!
//! fn ping(channel: &Channel) -> Result<()> {
//!     match channel.send("ping") {
//!         Err(Error::SendWhileDisconnected { .. }) => Ok(()), // retry later
//!         other => other,
//!     }
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidEndpoint`] |
//! | Transport | [`Error::TransportOpenFailure`], [`Error::TransportAbnormalClose`] |
//! | Payload | [`Error::MalformedPayload`] |
//! | Send | [`Error::SendWhileDisconnected`], [`Error::SendBufferFull`] |
//! | Delivery | [`Error::SubscriberCallback`] |
//! | Lifecycle | [`Error::ChannelClosed`] |
//! | External | [`Error::Url`], [`Error::WebSocket`] |
//!
//! Transport failures are recovered by the reconnect policy and only reach
//! callers through [`ChannelNotice`](crate::ChannelNotice). Malformed payloads
//! and subscriber failures are logged and counted, never propagated.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::channel::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when [`ChannelOptions`](crate::ChannelOptions) are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Endpoint URL is not usable for a WebSocket connection.
    #[error("Invalid endpoint {url}: {message}")]
    InvalidEndpoint {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connection could not be established.
    #[error("Transport open failed: {message}")]
    TransportOpenFailure {
        /// Description of the failure.
        message: String,
    },

    /// Connection ended without a normal close handshake.
    #[error("Transport closed abnormally: {message}")]
    TransportAbnormalClose {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Payload Errors
    // ========================================================================
    /// Inbound frame is not a valid notification.
    #[error("Malformed payload: {reason}")]
    MalformedPayload {
        /// Why the payload was rejected.
        reason: String,
    },

    // ========================================================================
    // Send Errors
    // ========================================================================
    /// Send attempted while the channel is not open.
    #[error("Cannot send while {state}")]
    SendWhileDisconnected {
        /// State of the channel at the time of the call.
        state: ConnectionState,
    },

    /// Outbound buffer of the live connection is full.
    #[error("Send buffer full ({capacity} frames)")]
    SendBufferFull {
        /// Capacity of the outbound buffer.
        capacity: usize,
    },

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// A subscriber callback panicked.
    #[error("Subscriber {subscription} failed: {message}")]
    SubscriberCallback {
        /// Subscription whose callback failed.
        subscription: crate::identifiers::SubscriptionId,
        /// Panic message, if one could be extracted.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The channel driver is no longer running.
    #[error("Channel closed")]
    ChannelClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a transport open failure.
    #[inline]
    pub fn transport_open(message: impl Into<String>) -> Self {
        Self::TransportOpenFailure {
            message: message.into(),
        }
    }

    /// Creates an abnormal close error.
    #[inline]
    pub fn abnormal_close(message: impl Into<String>) -> Self {
        Self::TransportAbnormalClose {
            message: message.into(),
        }
    }

    /// Creates a malformed payload error.
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Creates a send-while-disconnected error.
    #[inline]
    pub fn send_while_disconnected(state: ConnectionState) -> Self {
        Self::SendWhileDisconnected { state }
    }

    /// Creates a send buffer full error.
    #[inline]
    pub fn send_buffer_full(capacity: usize) -> Self {
        Self::SendBufferFull { capacity }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a transport-level error.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::TransportOpenFailure { .. }
                | Self::TransportAbnormalClose { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error came from a send attempt.
    #[inline]
    #[must_use]
    pub fn is_send_error(&self) -> bool {
        matches!(
            self,
            Self::SendWhileDisconnected { .. } | Self::SendBufferFull { .. }
        )
    }

    /// Returns `true` if the same call may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TransportOpenFailure { .. }
                | Self::TransportAbnormalClose { .. }
                | Self::SendWhileDisconnected { .. }
                | Self::SendBufferFull { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::transport_open("connection refused");
        assert_eq!(
            err.to_string(),
            "Transport open failed: connection refused"
        );
    }

    #[test]
    fn test_send_while_disconnected_names_state() {
        let err = Error::send_while_disconnected(ConnectionState::Reconnecting);
        assert_eq!(err.to_string(), "Cannot send while reconnecting");
        assert!(err.is_send_error());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_is_transport_error() {
        assert!(Error::abnormal_close("reset").is_transport_error());
        assert!(Error::transport_open("refused").is_transport_error());
        assert!(!Error::malformed("x").is_transport_error());
    }

    #[test]
    fn test_config_not_recoverable() {
        assert!(!Error::config("bad").is_recoverable());
        assert!(!Error::ChannelClosed.is_recoverable());
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("::not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
