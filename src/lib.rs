//! Notify Channel - Resilient real-time notification channel.
//!
//! This library keeps a WebSocket connection to a notification endpoint
//! alive across network failures and delivers each notification to the
//! application exactly once per dedup window, in arrival order.
//!
//! # Architecture
//!
//! Each [`Channel`] owns one driver task that owns everything mutable:
//!
//! - **Transport**: one live WebSocket at a time, tagged with a [`ConnectionId`]
//! - **Reconnect**: failure history and a cancellable timer driven by a
//!   [`ReconnectPolicy`]
//! - **Delivery**: a [`DeliveryQueue`] that drops redelivered IDs before
//!   fanning out to subscribers
//!
//! Key design principles:
//!
//! - Every transition goes through one explicit table ([`channel::transition`])
//! - Events from superseded connections are ignored
//! - Sends fail fast unless the channel is open
//! - Subscribers survive reconnects and cannot break each other
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use notify_channel::{
//!     ChannelOptions, ConnectionEndpoint, ExponentialBackoff, Result, create_channel,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let endpoint = ConnectionEndpoint::for_user("wss://example.com", 42, "token")?;
//!     let options = ChannelOptions::new().with_reconnect_policy(ExponentialBackoff::new(
//!         Duration::from_secs(1),
//!         Duration::from_secs(30),
//!     ));
//!
//!     let channel = create_channel(endpoint, options)?;
//!     channel.subscribe(|record| println!("{}", record.message()));
//!     channel.start()?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     channel.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | [`Channel`] handle, state machine and options |
//! | [`delivery`] | Dedup window and subscriber fan-out |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Notification wire format |
//! | [`reconnect`] | Delay policies, failure history, timers |
//! | [`transport`] | WebSocket transport and endpoints |

// ============================================================================
// Modules
// ============================================================================

/// Notification channel.
///
/// Use [`create_channel`] or [`Channel::new`] to build one.
pub mod channel;

/// De-duplication and ordered fan-out to subscribers.
pub mod delivery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for connections, subscriptions and notifications.
pub mod identifiers;

/// Notification wire format.
pub mod protocol;

/// Reconnect delay policies and bookkeeping.
pub mod reconnect;

/// WebSocket transport layer.
///
/// Opens one connection per attempt and reports lifecycle events tagged
/// with the attempt's connection ID.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{
    Channel, ChannelNotice, ChannelOptions, ChannelStats, ConnectionState, NoticeHandler,
    create_channel,
};

// Delivery types
pub use delivery::{DeliveryQueue, PushOutcome};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, NotificationId, SubscriptionId};

// Protocol types
pub use protocol::{NotificationRecord, parse_notification};

// Reconnect types
pub use reconnect::{ExponentialBackoff, FixedDelay, ReconnectPolicy, ReconnectState};

// Transport types
pub use transport::{
    CloseReason, ConnectionEndpoint, EndpointFactory, FnEndpoint, Transport, TransportHandle,
    WebSocketTransport,
};
