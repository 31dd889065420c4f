//! Cancellable one-shot timer owned by the channel driver.
//!
//! Cancelling drops the underlying sleep, so a cancelled timer can never
//! fire late.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep};

// ============================================================================
// Timer
// ============================================================================

/// One-shot timer that is either armed or idle.
#[derive(Debug, Default)]
pub struct Timer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Timer {
    /// Creates an idle timer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer, replacing any pending deadline.
    pub fn arm(&mut self, after: Duration) {
        self.sleep = Some(Box::pin(sleep(after)));
    }

    /// Disarms the timer. Returns `true` if it was armed.
    pub fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    /// Returns `true` while a deadline is pending.
    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Returns the pending deadline.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.sleep.as_ref().map(|sleep| sleep.deadline())
    }

    /// Resolves when the armed deadline passes, then disarms.
    ///
    /// Never resolves while idle. Cancel safe.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending().await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
