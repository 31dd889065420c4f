//! Channel state, observability notices and counters.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a channel.
///
/// Exactly one value per channel, mutated only by the channel's driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport. Initial state and state after shutdown.
    #[default]
    Idle,
    /// Endpoint being resolved or transport opening.
    Connecting,
    /// Transport live; notifications flow.
    Open,
    /// Shutdown requested; waiting for the transport to close.
    Closing,
    /// Transport ended unexpectedly; a retry is being scheduled.
    Closed,
    /// Waiting for the reconnect delay to elapse.
    Reconnecting,
}

impl ConnectionState {
    /// All states, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Connecting,
        Self::Open,
        Self::Closing,
        Self::Closed,
        Self::Reconnecting,
    ];

    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Reconnecting => "reconnecting",
        }
    }

    /// Returns `true` if a transport handle may exist in this state.
    #[inline]
    #[must_use]
    pub const fn has_transport(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Closing)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ChannelNotice
// ============================================================================

/// Observability notice passed to the `on_notice` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelNotice {
    /// The connection state changed.
    StateChanged {
        /// Previous state.
        from: ConnectionState,
        /// New state.
        to: ConnectionState,
    },
    /// Consecutive failures reached the configured ceiling.
    ///
    /// Emitted once per outage; retries continue in the background.
    Unavailable {
        /// Consecutive failed attempts so far.
        attempts: u32,
    },
    /// A connection stayed open for the stability window after
    /// [`ChannelNotice::Unavailable`].
    ///
    /// Connections that drop before the window elapses do not end the
    /// outage.
    Restored,
}

// ============================================================================
// ChannelStats
// ============================================================================

/// Snapshot of channel counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Consecutive failures since the last stable connection.
    pub attempt_count: u32,
    /// Delay chosen for the most recent reconnect.
    pub last_delay: Option<Duration>,
    /// Connections that reached `Open`.
    pub connections_opened: u64,
    /// Records delivered to subscribers.
    pub delivered: u64,
    /// Records dropped by the dedup window.
    pub duplicates_dropped: u64,
    /// Inbound frames dropped as malformed.
    pub malformed_dropped: u64,
    /// Subscriber callbacks that panicked.
    pub subscriber_panics: u64,
    /// Pending reconnect timers cancelled by shutdown.
    pub timers_cancelled: u64,
}

// ============================================================================
// Tests
// ============================================================================
