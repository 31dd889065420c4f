//! Reconnect policy and bookkeeping.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ReconnectPolicy`] | Pure delay function of the attempt count |
//! | [`FixedDelay`] | Constant delay (default 5000ms) |
//! | [`ExponentialBackoff`] | Capped doubling with optional jitter |
//! | [`ReconnectState`] | Consecutive failures since last stable connection |
//! | [`Timer`] | Cancellable timer for reconnect and stability waits |

// ============================================================================
// Submodules
// ============================================================================

/// Delay policies.
pub mod policy;

/// Failure bookkeeping.
pub mod state;

/// Cancellable timer.
pub mod timer;

// ============================================================================
// Re-exports
// ============================================================================

pub use policy::{
    DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX, DEFAULT_FIXED_DELAY, ExponentialBackoff,
    FixedDelay, ReconnectPolicy,
};
pub use state::ReconnectState;
pub use timer::Timer;
