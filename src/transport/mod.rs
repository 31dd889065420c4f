//! Transport layer.
//!
//! This module owns the single live connection to the notification
//! endpoint and knows nothing about reconnecting or delivery.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Channel driver  │                              │  Notification   │
//! │                  │         WebSocket            │  server         │
//! │  TransportHandle │◄────────────────────────────►│                 │
//! │  TransportEvent  │     /ws/{user}?token=...     │  /ws/{user_id}  │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `EndpointFactory::endpoint` - Resolve URL and fresh token
//! 2. `Transport::open` - Spawn connection task, get handle
//! 3. `Opened` / `Message` events - Connection live
//! 4. `TransportHandle::close` or remote close - `Closed` event, task ends
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `endpoint` | Endpoint URLs and per-attempt factories |
//! | `socket` | Transport trait and WebSocket implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Endpoint URLs and per-attempt factories.
pub mod endpoint;

/// Transport trait and WebSocket implementation.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use endpoint::{ConnectionEndpoint, EndpointFactory, FnEndpoint};
pub use socket::{
    CloseReason, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SEND_BUFFER, Transport, TransportCommand,
    TransportEvent, TransportEventKind, TransportEventSender, TransportHandle,
    WebSocketTransport,
};
