//! Notification channel.
//!
//! Ties the transport, reconnect policy and delivery queue together behind
//! one handle.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Channel`] | Public handle: start, shutdown, send, subscribe |
//! | [`ChannelOptions`] | Reconnect policy, dedup window, timeouts |
//! | [`ConnectionState`] | Lifecycle state |
//! | [`ChannelNotice`] | State and availability notices |
//! | [`ChannelStats`] | Counters |
//!
//! # Example
//!
//! ```no_run
//! use notify_channel::{ChannelOptions, ConnectionEndpoint, Result, create_channel};
//!
//! # async fn example() -> Result<()> {
//! let endpoint = ConnectionEndpoint::for_user("ws://127.0.0.1:8000", 7, "token")?;
//! let channel = create_channel(endpoint, ChannelOptions::default())?;
//!
//! channel.subscribe(|record| println!("{}: {}", record.id(), record.message()));
//! channel.start()?;
//!
//! tokio::signal::ctrl_c().await.ok();
//! channel.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Public channel handle.
pub mod core;

/// Driver task owning the channel state.
mod driver;

/// Transition table.
pub mod machine;

/// Channel configuration.
pub mod options;

/// State, notices and counters.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{Channel, create_channel};
pub use machine::{Action, EventKind, Transition, transition};
pub use options::{
    ChannelOptions, DEFAULT_STABILITY_WINDOW, DEFAULT_UNAVAILABLE_AFTER, NoticeHandler,
};
pub use state::{ChannelNotice, ChannelStats, ConnectionState};
