//! Channel configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use notify_channel::{ChannelOptions, ExponentialBackoff};
//!
//! let options = ChannelOptions::new()
//!     .with_reconnect_policy(ExponentialBackoff::default().with_jitter(0.2))
//!     .with_dedup_window_size(512)
//!     .with_stability_window(Duration::from_secs(10))
//!     .on_notice(|notice| tracing::info!(?notice, "channel notice"));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::delivery::{DEFAULT_DEDUP_WINDOW, MAX_DEDUP_WINDOW};
use crate::error::{Error, Result};
use crate::reconnect::{FixedDelay, ReconnectPolicy};
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_SEND_BUFFER};

use super::state::ChannelNotice;

// ============================================================================
// Constants
// ============================================================================

/// Default uptime after which a connection counts as stable.
pub const DEFAULT_STABILITY_WINDOW: Duration = Duration::from_secs(10);

/// Default consecutive failures before reporting unavailability.
pub const DEFAULT_UNAVAILABLE_AFTER: u32 = 5;

// ============================================================================
// Types
// ============================================================================

/// Observability callback.
pub type NoticeHandler = Arc<dyn Fn(&ChannelNotice) + Send + Sync>;

// ============================================================================
// ChannelOptions
// ============================================================================

/// Channel configuration.
#[derive(Clone)]
pub struct ChannelOptions {
    /// Delay policy between attempts. Default: fixed 5000ms.
    pub reconnect_policy: Arc<dyn ReconnectPolicy>,

    /// Notification IDs remembered for de-duplication. `0` disables it.
    /// At most [`MAX_DEDUP_WINDOW`].
    pub dedup_window_size: usize,

    /// Uptime after which the failure history is cleared.
    pub stability_window: Duration,

    /// Consecutive failures before [`ChannelNotice::Unavailable`].
    /// `0` never reports.
    pub unavailable_after: u32,

    /// Outbound frames buffered while open.
    pub send_buffer: usize,

    /// Maximum time to establish one connection.
    pub connect_timeout: Duration,

    /// Called for state changes and availability transitions.
    pub on_notice: Option<NoticeHandler>,
}

// ============================================================================
// Constructors
// ============================================================================

impl ChannelOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            reconnect_policy: Arc::new(FixedDelay::default()),
            dedup_window_size: DEFAULT_DEDUP_WINDOW,
            stability_window: DEFAULT_STABILITY_WINDOW,
            unavailable_after: DEFAULT_UNAVAILABLE_AFTER,
            send_buffer: DEFAULT_SEND_BUFFER,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            on_notice: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ChannelOptions {
    /// Sets the reconnect policy.
    #[inline]
    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: impl ReconnectPolicy) -> Self {
        self.reconnect_policy = Arc::new(policy);
        self
    }

    /// Sets the dedup window size.
    #[inline]
    #[must_use]
    pub fn with_dedup_window_size(mut self, size: usize) -> Self {
        self.dedup_window_size = size;
        self
    }

    /// Sets the stability window.
    #[inline]
    #[must_use]
    pub fn with_stability_window(mut self, window: Duration) -> Self {
        self.stability_window = window;
        self
    }

    /// Sets the failure ceiling for unavailability reporting.
    #[inline]
    #[must_use]
    pub fn with_unavailable_after(mut self, attempts: u32) -> Self {
        self.unavailable_after = attempts;
        self
    }

    /// Sets the outbound buffer size.
    #[inline]
    #[must_use]
    pub fn with_send_buffer(mut self, frames: usize) -> Self {
        self.send_buffer = frames;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the observability callback.
    #[inline]
    #[must_use]
    pub fn on_notice<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ChannelNotice) + Send + Sync + 'static,
    {
        self.on_notice = Some(Arc::new(handler));
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ChannelOptions {
    /// Checks the options for values the channel cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero stability window, zero send
    /// buffer, zero connect timeout or a dedup window above
    /// [`MAX_DEDUP_WINDOW`].
    pub fn validate(&self) -> Result<()> {
        if self.stability_window.is_zero() {
            return Err(Error::config(
                "stability_window must be greater than zero",
            ));
        }

        if self.send_buffer == 0 {
            return Err(Error::config("send_buffer must be at least 1 frame"));
        }

        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect_timeout must be greater than zero"));
        }

        if self.dedup_window_size > MAX_DEDUP_WINDOW {
            return Err(Error::config(format!(
                "dedup_window_size must be at most {MAX_DEDUP_WINDOW}, got {}",
                self.dedup_window_size
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for ChannelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelOptions")
            .field("reconnect_policy", &self.reconnect_policy)
            .field("dedup_window_size", &self.dedup_window_size)
            .field("stability_window", &self.stability_window)
            .field("unavailable_after", &self.unavailable_after)
            .field("send_buffer", &self.send_buffer)
            .field("connect_timeout", &self.connect_timeout)
            .field("on_notice", &self.on_notice.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::reconnect::{ExponentialBackoff, ReconnectState};

    #[test]
    fn test_defaults() {
        let options = ChannelOptions::default();
        assert_eq!(options.dedup_window_size, 256);
        assert_eq!(options.stability_window, Duration::from_secs(10));
        assert_eq!(options.unavailable_after, 5);
        assert_eq!(
            options.reconnect_policy.next_delay(&ReconnectState::new()),
            Duration::from_millis(5000)
        );
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let options = ChannelOptions::new()
            .with_reconnect_policy(ExponentialBackoff::default())
            .with_dedup_window_size(8)
            .with_stability_window(Duration::from_secs(2))
            .with_unavailable_after(0)
            .with_send_buffer(4)
            .with_connect_timeout(Duration::from_secs(1))
            .on_notice(|_| {});

        assert_eq!(options.dedup_window_size, 8);
        assert_eq!(options.unavailable_after, 0);
        assert_eq!(options.send_buffer, 4);
        assert!(options.on_notice.is_some());
        assert_eq!(
            options.reconnect_policy.next_delay(&ReconnectState::new()),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let err = ChannelOptions::new()
            .with_stability_window(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("stability_window"));

        assert!(ChannelOptions::new().with_send_buffer(0).validate().is_err());
        assert!(
            ChannelOptions::new()
                .with_connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_bounds_dedup_window() {
        assert!(
            ChannelOptions::new()
                .with_dedup_window_size(MAX_DEDUP_WINDOW)
                .validate()
                .is_ok()
        );

        let err = ChannelOptions::new()
            .with_dedup_window_size(usize::MAX)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("dedup_window_size"));
    }

    #[test]
    fn test_debug_hides_callback() {
        let debug = format!("{:?}", ChannelOptions::new().on_notice(|_| {}));
        assert!(debug.contains("on_notice: true"));
    }
}
