//! Transport socket: one live connection to the notification endpoint.
//!
//! A transport is a pure wrapper around a single connection. It never
//! retries; retry decisions belong to the channel.
//!
//! # Event Contract
//!
//! For every handle returned by [`Transport::open`]:
//!
//! - `Opened` fires at most once, before any `Message`
//! - `Message` fires once per inbound text frame, in wire order
//! - `Errored` may fire before `Closed` to report a read/write error
//! - `Closed` fires exactly once, and always last
//!
//! Open failures are reported as `Closed(CloseReason::OpenFailed)`; `open`
//! itself never fails.
//!
//! # Event Loop
//!
//! [`WebSocketTransport`] spawns one tokio task per handle that handles:
//!
//! - Connecting (bounded by the connect timeout)
//! - Incoming frames from the server
//! - Outgoing frames and close requests from the handle

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

use super::endpoint::ConnectionEndpoint;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of outbound frames buffered per connection.
pub const DEFAULT_SEND_BUFFER: usize = 64;

// ============================================================================
// Types
// ============================================================================

/// Sender half for transport events.
pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;

/// WebSocket stream type produced by `connect_async`.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// TransportEvent
// ============================================================================

/// An event produced by one transport handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Handle that produced the event.
    pub connection: ConnectionId,
    /// What happened.
    pub kind: TransportEventKind,
}

impl TransportEvent {
    /// Creates an event for `connection`.
    #[inline]
    #[must_use]
    pub fn new(connection: ConnectionId, kind: TransportEventKind) -> Self {
        Self { connection, kind }
    }
}

/// Kinds of transport events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Connection established.
    Opened,
    /// Text frame received.
    Message(String),
    /// Read or write error; `Closed` follows.
    Errored(String),
    /// Connection ended. Always the last event of a handle.
    Closed(CloseReason),
}

// ============================================================================
// CloseReason
// ============================================================================

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Connection could not be established.
    OpenFailed(String),
    /// Server sent a close frame.
    Remote {
        /// Close code (1000 = normal).
        code: u16,
        /// Close reason text.
        reason: String,
    },
    /// Stream ended without a close frame.
    StreamEnded,
    /// Read or write error.
    Error(String),
    /// Closed by this side through [`TransportHandle::close`].
    Local,
}

impl CloseReason {
    /// Returns `true` if the close was requested locally.
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// Returns `true` if no connection was ever established.
    #[inline]
    #[must_use]
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::OpenFailed(_))
    }

    /// Converts a non-local close into the matching error.
    #[must_use]
    pub fn to_error(&self) -> Option<Error> {
        match self {
            Self::OpenFailed(message) => Some(Error::transport_open(message.clone())),
            Self::Remote { code: 1000, .. } | Self::Local => None,
            Self::Remote { code, reason } => {
                Some(Error::abnormal_close(format!("code {code}: {reason}")))
            }
            Self::StreamEnded => Some(Error::abnormal_close("stream ended")),
            Self::Error(message) => Some(Error::abnormal_close(message.clone())),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed(message) => write!(f, "open failed: {message}"),
            Self::Remote { code, reason } if reason.is_empty() => {
                write!(f, "closed by server ({code})")
            }
            Self::Remote { code, reason } => write!(f, "closed by server ({code}: {reason})"),
            Self::StreamEnded => f.write_str("stream ended"),
            Self::Error(message) => write!(f, "error: {message}"),
            Self::Local => f.write_str("closed locally"),
        }
    }
}

// ============================================================================
// TransportCommand
// ============================================================================

/// Commands from a handle to its connection task.
#[derive(Debug)]
pub enum TransportCommand {
    /// Send a frame.
    Send(Message),
    /// Close the connection.
    Close,
}

// ============================================================================
// TransportHandle
// ============================================================================

/// Handle to one connection.
///
/// Dropping every clone of the handle closes the connection.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    /// Connection this handle controls.
    id: ConnectionId,
    /// Channel to the connection task.
    command_tx: mpsc::Sender<TransportCommand>,
    /// Capacity of `command_tx`.
    capacity: usize,
}

impl TransportHandle {
    /// Creates a handle from its command channel.
    ///
    /// Transport implementations pair this with a task reading the
    /// receiver half.
    #[inline]
    #[must_use]
    pub fn new(id: ConnectionId, command_tx: mpsc::Sender<TransportCommand>) -> Self {
        let capacity = command_tx.max_capacity();
        Self {
            id,
            command_tx,
            capacity,
        }
    }

    /// Returns the connection ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::SendBufferFull`] if the outbound buffer is full
    /// - [`Error::ChannelClosed`] if the connection task has ended
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Message::text(text.into()))
    }

    /// Queues a binary frame.
    ///
    /// # Errors
    ///
    /// Same as [`TransportHandle::send_text`].
    pub fn send_binary(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        self.send(Message::binary(bytes.into()))
    }

    /// Requests a local close. `Closed(Local)` follows.
    pub fn close(&self) {
        // Close must not be refused by a full buffer.
        let tx = self.command_tx.clone();
        if let Err(mpsc::error::TrySendError::Full(command)) = tx.try_send(TransportCommand::Close)
        {
            tokio::spawn(async move {
                let _ = tx.send(command).await;
            });
        }
    }

    fn send(&self, message: Message) -> Result<()> {
        self.command_tx.try_send(TransportCommand::Send(message)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::send_buffer_full(self.capacity),
            mpsc::error::TrySendError::Closed(_) => Error::ChannelClosed,
        })
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Opens connections to an endpoint.
pub trait Transport: Send + Sync + 'static {
    /// Starts connecting to `endpoint`.
    ///
    /// Events for the returned handle are tagged with `id` and sent on
    /// `events`. Never fails synchronously.
    fn open(
        &self,
        endpoint: ConnectionEndpoint,
        id: ConnectionId,
        events: TransportEventSender,
    ) -> TransportHandle;
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// WebSocket transport backed by tokio-tungstenite.
///
/// `wss` endpoints use rustls with the webpki root certificates.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    /// Maximum time to wait for the handshake.
    connect_timeout: Duration,
    /// Outbound frame buffer per connection.
    send_buffer: usize,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_SEND_BUFFER)
    }
}

impl WebSocketTransport {
    /// Creates a transport.
    ///
    /// `send_buffer` is raised to 1 if zero.
    #[inline]
    #[must_use]
    pub fn new(connect_timeout: Duration, send_buffer: usize) -> Self {
        Self {
            connect_timeout,
            send_buffer: send_buffer.max(1),
        }
    }

    /// Connection task: connect, then pump frames until closed.
    async fn run(
        endpoint: ConnectionEndpoint,
        id: ConnectionId,
        connect_timeout: Duration,
        mut command_rx: mpsc::Receiver<TransportCommand>,
        events: TransportEventSender,
    ) {
        let emit = |kind: TransportEventKind| {
            let _ = events.send(TransportEvent::new(id, kind));
        };

        let ws_stream = tokio::select! {
            result = Self::connect(&endpoint, connect_timeout) => match result {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(connection = %id, error = %e, "Connect failed");
                    emit(TransportEventKind::Closed(CloseReason::OpenFailed(e.to_string())));
                    return;
                }
            },

            // Close requested (or handle dropped) before the handshake finished
            command = Self::wait_for_close(&mut command_rx) => {
                debug!(connection = %id, ?command, "Connect abandoned");
                emit(TransportEventKind::Closed(CloseReason::Local));
                return;
            }
        };

        info!(connection = %id, endpoint = %endpoint, "WebSocket connection established");
        emit(TransportEventKind::Opened);

        let reason = Self::pump(ws_stream, id, &mut command_rx, &emit).await;

        debug!(connection = %id, %reason, "Connection task terminated");
        emit(TransportEventKind::Closed(reason));
    }

    /// Connects with a timeout.
    async fn connect(endpoint: &ConnectionEndpoint, connect_timeout: Duration) -> Result<WsStream> {
        let url = endpoint.request_url();

        if url.scheme() == "wss" {
            install_crypto_provider();
        }

        let (stream, _response) = timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                Error::transport_open(format!(
                    "timed out after {}ms",
                    connect_timeout.as_millis()
                ))
            })??;

        Ok(stream)
    }

    /// Resolves once a close is requested or every handle is dropped.
    ///
    /// Frames queued before the connection exists are discarded.
    async fn wait_for_close(
        command_rx: &mut mpsc::Receiver<TransportCommand>,
    ) -> Option<TransportCommand> {
        loop {
            match command_rx.recv().await {
                Some(TransportCommand::Send(_)) => {
                    trace!("Discarding frame queued before open");
                }
                other => return other,
            }
        }
    }

    /// Frame pump for an open connection. Returns why it ended.
    async fn pump(
        ws_stream: WsStream,
        id: ConnectionId,
        command_rx: &mut mpsc::Receiver<TransportCommand>,
        emit: &impl Fn(TransportEventKind),
    ) -> CloseReason {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from server
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(connection = %id, len = text.len(), "Frame received");
                            emit(TransportEventKind::Message(text.as_str().to_owned()));
                        }

                        Some(Ok(Message::Binary(bytes))) => {
                            warn!(connection = %id, len = bytes.len(), "Dropping binary frame");
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(connection = %id, ?frame, "WebSocket closed by remote");
                            return Self::remote_reason(frame);
                        }

                        Some(Err(e)) => {
                            warn!(connection = %id, error = %e, "WebSocket error");
                            emit(TransportEventKind::Errored(e.to_string()));
                            return CloseReason::Error(e.to_string());
                        }

                        None => {
                            debug!(connection = %id, "WebSocket stream ended");
                            return CloseReason::StreamEnded;
                        }

                        // Ping/Pong are answered by tungstenite
                        _ => {}
                    }
                }

                // Commands from the handle
                command = command_rx.recv() => {
                    match command {
                        Some(TransportCommand::Send(message)) => {
                            if let Err(e) = ws_write.send(message).await {
                                warn!(connection = %id, error = %e, "Failed to send frame");
                                emit(TransportEventKind::Errored(e.to_string()));
                                return CloseReason::Error(e.to_string());
                            }
                            trace!(connection = %id, "Frame sent");
                        }

                        Some(TransportCommand::Close) | None => {
                            debug!(connection = %id, "Local close requested");
                            let _ = ws_write.close().await;
                            return CloseReason::Local;
                        }
                    }
                }
            }
        }
    }

    /// Maps a received close frame to a reason.
    fn remote_reason(frame: Option<CloseFrame>) -> CloseReason {
        match frame {
            Some(frame) => CloseReason::Remote {
                code: frame.code.into(),
                reason: frame.reason.as_str().to_owned(),
            },
            None => CloseReason::Remote {
                code: 1005,
                reason: String::new(),
            },
        }
    }
}

/// Installs the rustls crypto provider for `wss` unless the application
/// already installed one.
fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_some() {
        return;
    }

    // Another task may have installed one meanwhile
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_ok()
    {
        debug!("Installed rustls crypto provider");
    }
}

impl Transport for WebSocketTransport {
    fn open(
        &self,
        endpoint: ConnectionEndpoint,
        id: ConnectionId,
        events: TransportEventSender,
    ) -> TransportHandle {
        let (command_tx, command_rx) = mpsc::channel(self.send_buffer);

        tokio::spawn(Self::run(
            endpoint,
            id,
            self.connect_timeout,
            command_rx,
            events,
        ));

        TransportHandle::new(id, command_tx)
    }
}

// ============================================================================
// Tests
// ============================================================================
