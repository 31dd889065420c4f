//! Consecutive-failure bookkeeping for the reconnect policy.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// ReconnectState
// ============================================================================

/// Failure history since the last stable connection.
///
/// Owned by the channel driver. `attempt_count` only grows while attempts
/// keep failing and returns to zero only through [`ReconnectState::reset`],
/// which the driver calls once a connection survives the stability window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconnectState {
    attempt_count: u32,
    next_delay: Option<Duration>,
    last_failure_at: Option<Instant>,
}

impl ReconnectState {
    /// Creates a state with no recorded failures.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of consecutive failed or unstable connections.
    #[inline]
    #[must_use]
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Delay scheduled after the most recent failure.
    #[inline]
    #[must_use]
    pub fn next_delay(&self) -> Option<Duration> {
        self.next_delay
    }

    /// When the most recent failure was recorded.
    #[inline]
    #[must_use]
    pub fn last_failure_at(&self) -> Option<Instant> {
        self.last_failure_at
    }

    /// Records a failure and the delay chosen for it.
    pub fn record_failure(&mut self, delay: Duration, now: Instant) {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.next_delay = Some(delay);
        self.last_failure_at = Some(now);
    }

    /// Clears the failure history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_counts() {
        let mut state = ReconnectState::new();
        let now = Instant::now();

        state.record_failure(Duration::from_secs(5), now);
        state.record_failure(Duration::from_secs(5), now);

        assert_eq!(state.attempt_count(), 2);
        assert_eq!(state.next_delay(), Some(Duration::from_secs(5)));
        assert_eq!(state.last_failure_at(), Some(now));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = ReconnectState::new();
        state.record_failure(Duration::from_secs(1), Instant::now());
        state.reset();
        assert_eq!(state, ReconnectState::new());
    }
}
