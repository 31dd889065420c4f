//! Inbound wire message types.
//!
//! The server pushes notifications as UTF-8 text frames, one JSON object
//! per frame.
//!
//! # Message Format
//!
//! | Field | Type | Required | Notes |
//! |-------|------|----------|-------|
//! | `id` | string or integer | yes | De-duplication key |
//! | `message` | string | yes | Human readable text |
//! | anything else | any | no | Kept in [`NotificationRecord::raw`] only |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `notification` | Notification record and frame parser |

// ============================================================================
// Submodules
// ============================================================================

/// Notification record and frame parser.
pub mod notification;

// ============================================================================
// Re-exports
// ============================================================================

pub use notification::{NotificationRecord, parse_notification};
