//! Delivery of notification records to subscribers.
//!
//! The transport never calls subscribers directly: every record passes
//! through the [`DeliveryQueue`], which drops redelivered IDs and fans out in
//! arrival order.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dedup` | Bounded recent-ID window |
//! | `queue` | Subscriber registry and ordered fan-out |

// ============================================================================
// Submodules
// ============================================================================

/// Bounded recent-ID window.
pub mod dedup;

/// Subscriber registry and ordered fan-out.
pub mod queue;

// ============================================================================
// Re-exports
// ============================================================================

pub use dedup::{DEFAULT_DEDUP_WINDOW, DedupWindow, MAX_DEDUP_WINDOW};
pub use queue::{DeliveryQueue, DeliveryStats, PushOutcome, Subscriber, Subscribers};
