//! Public channel handle.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::NotificationRecord;
use crate::transport::{EndpointFactory, Transport, WebSocketTransport};

use super::driver::{Command, Driver, Shared};
use super::options::ChannelOptions;
use super::state::{ChannelStats, ConnectionState};

// ============================================================================
// Channel
// ============================================================================

/// Resilient real-time notification channel.
///
/// Keeps one connection to the notification endpoint alive across network
/// failures and delivers each notification to subscribers once, in arrival
/// order. Subscriptions survive reconnects.
///
/// Cloning yields another handle to the same channel. When the last handle
/// is dropped the channel shuts down.
///
/// # Example
///
/// ```ignore
/// use notify_channel::{Channel, ChannelOptions, ConnectionEndpoint};
///
/// let endpoint = ConnectionEndpoint::for_user("ws://127.0.0.1:8000", 7, token)?;
/// let channel = Channel::new(endpoint, ChannelOptions::default())?;
///
/// channel.subscribe(|record| println!("{}", record.message()));
/// channel.start()?;
/// // ...
/// channel.shutdown().await;
/// ```
#[derive(Clone)]
pub struct Channel {
    /// Commands to the driver task.
    commands: mpsc::UnboundedSender<Command>,
    /// State published by the driver.
    shared: Arc<Shared>,
}

// ============================================================================
// Channel - Constructors
// ============================================================================

impl Channel {
    /// Creates a channel over WebSocket. The channel starts `Idle`.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` fail validation.
    pub fn new(factory: impl EndpointFactory, options: ChannelOptions) -> Result<Self> {
        let transport = WebSocketTransport::new(options.connect_timeout, options.send_buffer);
        Self::with_transport(factory, transport, options)
    }

    /// Creates a channel over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` fail validation.
    pub fn with_transport(
        factory: impl EndpointFactory,
        transport: impl Transport,
        options: ChannelOptions,
    ) -> Result<Self> {
        options.validate()?;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new());

        let driver = Driver::new(
            Arc::new(factory),
            Arc::new(transport),
            &options,
            command_rx,
            Arc::clone(&shared),
        );
        tokio::spawn(driver.run());

        debug!(?options, "Channel created");

        Ok(Self { commands, shared })
    }
}

/// Creates a WebSocket channel. Same as [`Channel::new`].
///
/// # Errors
///
/// Returns [`Error::Config`] if `options` fail validation.
pub fn create_channel(factory: impl EndpointFactory, options: ChannelOptions) -> Result<Channel> {
    Channel::new(factory, options)
}

// ============================================================================
// Channel - Lifecycle
// ============================================================================

impl Channel {
    /// Starts connecting. No-op unless the channel is `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the driver task is gone.
    pub fn start(&self) -> Result<()> {
        self.commands
            .send(Command::Start)
            .map_err(|_| Error::ChannelClosed)
    }

    /// Shuts the channel down and waits until it is `Idle`.
    ///
    /// Cancels any pending reconnect and closes the transport. Calling it
    /// again, or concurrently, is a no-op that also resolves once idle.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();

        if self.commands.send(Command::Shutdown(ack)).is_err() {
            return;
        }

        let _ = done.await;
    }
}

// ============================================================================
// Channel - Messaging
// ============================================================================

impl Channel {
    /// Sends a text frame on the open connection.
    ///
    /// Never queues across disconnections.
    ///
    /// # Errors
    ///
    /// - [`Error::SendWhileDisconnected`] unless the channel is `Open`
    /// - [`Error::SendBufferFull`] if the outbound buffer is full
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        let live = self.shared.live.lock().clone();

        let Some(handle) = live else {
            return Err(Error::send_while_disconnected(self.state()));
        };

        handle.send_text(text).map_err(|e| match e {
            Error::ChannelClosed => Error::send_while_disconnected(self.state()),
            other => other,
        })
    }

    /// Registers a callback for every new notification.
    ///
    /// The callback runs on the channel's driver task and must not block.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NotificationRecord) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(callback)
    }

    /// Removes a callback. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unsubscribe(id)
    }
}

// ============================================================================
// Channel - Observation
// ============================================================================

impl Channel {
    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Returns a receiver that observes state changes.
    #[inline]
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Returns a snapshot of the counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        *self.shared.stats.lock()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("state", &self.state())
            .field("subscribers", &self.shared.subscribers.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
