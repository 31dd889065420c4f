//! Channel driver: the task that owns all channel state.
//!
//! # Event Loop
//!
//! One tokio task per channel processes, one at a time and to completion:
//!
//! - Commands from [`Channel`](super::Channel) handles (start, shutdown)
//! - Endpoint resolutions for the current attempt
//! - Transport events for the current connection
//! - Reconnect and stability timer fires
//!
//! Connection state, failure history, the delivery queue and both timers
//! live in the task and are never shared. Events tagged with a connection ID
//! other than the current one belong to a superseded attempt and are
//! dropped, so at most one transport is ever live.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::delivery::{DeliveryQueue, PushOutcome, Subscribers};
use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::protocol::parse_notification;
use crate::reconnect::{ReconnectPolicy, ReconnectState, Timer};
use crate::transport::{
    CloseReason, ConnectionEndpoint, EndpointFactory, Transport, TransportEvent,
    TransportEventKind, TransportHandle,
};

use super::machine::{Action, EventKind, transition};
use super::options::{ChannelOptions, NoticeHandler};
use super::state::{ChannelNotice, ChannelStats, ConnectionState};

// ============================================================================
// Shared
// ============================================================================

/// State shared between the driver and [`Channel`](super::Channel) handles.
///
/// Only the driver writes; handles read.
pub(crate) struct Shared {
    /// Current connection state.
    pub(crate) state_tx: watch::Sender<ConnectionState>,
    /// Handle of the open transport, `Some` only while `Open`.
    pub(crate) live: Mutex<Option<TransportHandle>>,
    /// Counters.
    pub(crate) stats: Mutex<ChannelStats>,
    /// Subscriber registry, shared with the delivery queue.
    pub(crate) subscribers: Subscribers,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            state_tx,
            live: Mutex::new(None),
            stats: Mutex::new(ChannelStats::default()),
            subscribers: Subscribers::new(),
        }
    }
}

// ============================================================================
// Command
// ============================================================================

/// Commands from channel handles.
#[derive(Debug)]
pub(crate) enum Command {
    /// Begin connecting if idle.
    Start,
    /// Shut down; the sender fires once the channel is idle.
    Shutdown(oneshot::Sender<()>),
}

/// Result of resolving the endpoint for one attempt.
type EndpointResult = (ConnectionId, Result<ConnectionEndpoint>);

/// One unit of work for the loop.
enum Step {
    Command(Option<Command>),
    Endpoint(EndpointResult),
    Transport(TransportEvent),
    ReconnectTimer,
    StabilityTimer,
}

// ============================================================================
// Driver
// ============================================================================

/// Owns and runs one channel.
pub(crate) struct Driver {
    /// Current lifecycle state.
    state: ConnectionState,
    /// Failure history.
    reconnect: ReconnectState,
    /// Delay policy.
    policy: Arc<dyn ReconnectPolicy>,
    /// Dedup and fan-out.
    queue: DeliveryQueue,
    /// Endpoint per attempt.
    factory: Arc<dyn EndpointFactory>,
    /// Connection opener.
    transport: Arc<dyn Transport>,

    /// Uptime that clears the failure history.
    stability_window: Duration,
    /// Failure ceiling for the unavailable notice (0 = never).
    unavailable_after: u32,
    /// Observability callback.
    on_notice: Option<NoticeHandler>,
    /// Whether `Unavailable` has been reported for the current outage.
    /// Cleared when the stability window elapses.
    unavailable: bool,

    /// Attempt or connection that events are currently accepted from.
    current: Option<ConnectionId>,
    /// Handle for `current`, once the transport was opened.
    handle: Option<TransportHandle>,
    /// ID for the next attempt.
    next_connection: ConnectionId,

    /// Pending reconnect delay.
    reconnect_timer: Timer,
    /// Pending stability window.
    stability_timer: Timer,

    /// Commands from handles.
    commands: mpsc::UnboundedReceiver<Command>,
    /// Transport events (sender cloned into every transport).
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    /// Endpoint resolutions (sender cloned into every resolver task).
    endpoint_tx: mpsc::UnboundedSender<EndpointResult>,
    endpoint_rx: mpsc::UnboundedReceiver<EndpointResult>,

    /// Callers waiting for shutdown to complete.
    shutdown_waiters: Vec<oneshot::Sender<()>>,
    /// State visible to handles.
    shared: Arc<Shared>,
}

// ============================================================================
// Driver - Constructor
// ============================================================================

impl Driver {
    pub(crate) fn new(
        factory: Arc<dyn EndpointFactory>,
        transport: Arc<dyn Transport>,
        options: &ChannelOptions,
        commands: mpsc::UnboundedReceiver<Command>,
        shared: Arc<Shared>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (endpoint_tx, endpoint_rx) = mpsc::unbounded_channel();

        Self {
            state: ConnectionState::Idle,
            reconnect: ReconnectState::new(),
            policy: Arc::clone(&options.reconnect_policy),
            queue: DeliveryQueue::with_subscribers(
                options.dedup_window_size,
                shared.subscribers.clone(),
            ),
            factory,
            transport,
            stability_window: options.stability_window,
            unavailable_after: options.unavailable_after,
            on_notice: options.on_notice.clone(),
            unavailable: false,
            current: None,
            handle: None,
            next_connection: ConnectionId::new(1),
            reconnect_timer: Timer::new(),
            stability_timer: Timer::new(),
            commands,
            events_tx,
            events_rx,
            endpoint_tx,
            endpoint_rx,
            shutdown_waiters: Vec::new(),
            shared,
        }
    }
}

// ============================================================================
// Driver - Event Loop
// ============================================================================

impl Driver {
    /// Runs until every channel handle is dropped.
    pub(crate) async fn run(mut self) {
        debug!("Channel driver started");

        loop {
            let step = tokio::select! {
                command = self.commands.recv() => Step::Command(command),
                Some(result) = self.endpoint_rx.recv() => Step::Endpoint(result),
                Some(event) = self.events_rx.recv() => Step::Transport(event),
                () = self.reconnect_timer.fired() => Step::ReconnectTimer,
                () = self.stability_timer.fired() => Step::StabilityTimer,
            };

            match step {
                Step::Command(Some(Command::Start)) => self.on_start(),
                Step::Command(Some(Command::Shutdown(ack))) => self.on_shutdown(ack),
                Step::Command(None) => {
                    debug!("All channel handles dropped");
                    self.abandon();
                    break;
                }
                Step::Endpoint((connection, result)) => self.on_endpoint(connection, result),
                Step::Transport(event) => self.on_transport_event(event),
                Step::ReconnectTimer => self.on_reconnect_timer(),
                Step::StabilityTimer => self.on_stability_elapsed(),
            }
        }

        debug!("Channel driver terminated");
    }

    /// Feeds `event` to the state machine and publishes the new state.
    fn apply(&mut self, event: EventKind) -> Action {
        let t = transition(self.state, event);

        if t.action == Action::Ignore {
            trace!(state = %self.state, ?event, "Event ignored");
            return t.action;
        }

        if t.next != self.state {
            self.set_state(t.next);
        }

        t.action
    }

    /// Publishes a state change.
    fn set_state(&mut self, next: ConnectionState) {
        let from = self.state;
        self.state = next;

        if from == ConnectionState::Open {
            self.shared.live.lock().take();
            self.stability_timer.cancel();
        }

        debug!(%from, to = %next, "Channel state changed");
        self.shared.state_tx.send_replace(next);
        self.notify(ChannelNotice::StateChanged { from, to: next });
    }

    /// Invokes the notice callback, isolating panics.
    fn notify(&self, notice: ChannelNotice) {
        if let Some(handler) = &self.on_notice
            && catch_unwind(AssertUnwindSafe(|| handler(&notice))).is_err()
        {
            warn!(?notice, "Notice handler panicked");
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut ChannelStats)) {
        f(&mut self.shared.stats.lock());
    }
}

// ============================================================================
// Driver - Commands
// ============================================================================

impl Driver {
    fn on_start(&mut self) {
        match self.apply(EventKind::Start) {
            Action::BeginConnect => self.begin_connect(),
            _ => debug!(state = %self.state, "Start ignored, channel already running"),
        }
    }

    fn on_shutdown(&mut self, ack: oneshot::Sender<()>) {
        self.shutdown_waiters.push(ack);

        match self.apply(EventKind::Shutdown) {
            Action::CloseTransport => self.close_transport(),
            Action::CancelReconnect => {
                if self.reconnect_timer.cancel() {
                    self.update_stats(|s| s.timers_cancelled += 1);
                    debug!("Pending reconnect cancelled");
                }
                self.finish_shutdown();
            }
            Action::Finish => self.finish_shutdown(),
            _ => {}
        }
    }

    /// Requests a local close of the current attempt.
    fn close_transport(&mut self) {
        match &self.handle {
            Some(handle) => handle.close(),

            // Endpoint still resolving: nothing to close
            None => {
                self.current = None;
                if self.apply(EventKind::Closed) == Action::Finish {
                    self.finish_shutdown();
                }
            }
        }
    }

    fn finish_shutdown(&mut self) {
        self.current = None;
        self.handle = None;

        let waiters = self.shutdown_waiters.len();
        for ack in self.shutdown_waiters.drain(..) {
            let _ = ack.send(());
        }

        info!(waiters, "Channel shut down");
    }

    /// Tears down without waiting; used when no handle can observe the result.
    fn abandon(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
        self.current = None;
        self.reconnect_timer.cancel();
        if self.state != ConnectionState::Idle {
            self.set_state(ConnectionState::Idle);
        }
    }
}

// ============================================================================
// Driver - Connecting
// ============================================================================

impl Driver {
    /// Allocates a connection ID and resolves its endpoint off-loop.
    fn begin_connect(&mut self) {
        let connection = self.next_connection;
        self.next_connection = connection.next();
        self.current = Some(connection);
        self.handle = None;

        let factory = Arc::clone(&self.factory);
        let tx = self.endpoint_tx.clone();
        let attempt = self.reconnect.attempt_count();

        debug!(%connection, attempt, "Resolving endpoint");

        tokio::spawn(async move {
            let result = factory.endpoint(attempt).await;
            let _ = tx.send((connection, result));
        });
    }

    fn on_endpoint(&mut self, connection: ConnectionId, result: Result<ConnectionEndpoint>) {
        if self.current != Some(connection) || self.state != ConnectionState::Connecting {
            trace!(%connection, "Stale endpoint resolution dropped");
            return;
        }

        match result {
            Ok(endpoint) => {
                debug!(%connection, %endpoint, "Opening transport");
                let handle = self
                    .transport
                    .open(endpoint, connection, self.events_tx.clone());
                self.handle = Some(handle);
            }
            Err(e) => {
                warn!(%connection, error = %e, "Endpoint factory failed");
                self.on_closed(CloseReason::OpenFailed(e.to_string()));
            }
        }
    }

    fn on_reconnect_timer(&mut self) {
        if self.apply(EventKind::TimerFired) == Action::BeginConnect {
            self.begin_connect();
        }
    }
}

// ============================================================================
// Driver - Transport Events
// ============================================================================

impl Driver {
    fn on_transport_event(&mut self, event: TransportEvent) {
        let TransportEvent { connection, kind } = event;

        if self.current != Some(connection) {
            trace!(%connection, ?kind, "Event from superseded connection dropped");
            return;
        }

        match kind {
            TransportEventKind::Opened => self.on_opened(connection),
            TransportEventKind::Message(text) => self.on_message(connection, &text),
            TransportEventKind::Errored(message) => {
                debug!(%connection, error = %message, "Transport error");
            }
            TransportEventKind::Closed(reason) => self.on_closed(reason),
        }
    }

    fn on_opened(&mut self, connection: ConnectionId) {
        match self.apply(EventKind::Opened) {
            Action::ArmStability => {
                *self.shared.live.lock() = self.handle.clone();
                self.stability_timer.arm(self.stability_window);
                self.update_stats(|s| s.connections_opened += 1);

                info!(%connection, "Notification channel open");
            }
            Action::CloseTransport => self.close_transport(),
            _ => {}
        }
    }

    fn on_message(&mut self, connection: ConnectionId, text: &str) {
        if self.apply(EventKind::Message) != Action::Deliver {
            return;
        }

        let record = match parse_notification(text) {
            Ok(record) => record,
            Err(e) => {
                warn!(%connection, error = %e, "Dropping malformed notification");
                self.update_stats(|s| s.malformed_dropped += 1);
                return;
            }
        };

        if let PushOutcome::Duplicate = self.queue.push(record) {
            debug!(%connection, "Redelivered notification dropped");
        }

        let delivery = self.queue.stats();
        self.update_stats(|s| {
            s.delivered = delivery.delivered;
            s.duplicates_dropped = delivery.duplicates_dropped;
            s.subscriber_panics = delivery.subscriber_panics;
        });
    }

    fn on_closed(&mut self, reason: CloseReason) {
        self.current = None;
        self.handle = None;

        match self.apply(EventKind::Closed) {
            Action::ScheduleReconnect => self.schedule_reconnect(&reason),
            Action::Finish => self.finish_shutdown(),
            _ => {}
        }
    }

    /// Records the failure and arms the reconnect timer.
    fn schedule_reconnect(&mut self, reason: &CloseReason) {
        let delay = self.policy.next_delay(&self.reconnect);
        self.reconnect.record_failure(delay, Instant::now());
        let attempts = self.reconnect.attempt_count();

        match reason.to_error() {
            Some(e) => info!(error = %e, attempts, delay_ms = delay.as_millis() as u64, "Connection lost, reconnecting"),
            None => info!(%reason, attempts, delay_ms = delay.as_millis() as u64, "Connection closed, reconnecting"),
        }

        self.update_stats(|s| {
            s.attempt_count = attempts;
            s.last_delay = Some(delay);
        });

        if !self.unavailable && self.unavailable_after > 0 && attempts >= self.unavailable_after {
            self.unavailable = true;
            warn!(attempts, "Real-time updates unavailable");
            self.notify(ChannelNotice::Unavailable { attempts });
        }

        self.reconnect_timer.arm(delay);
        self.apply(EventKind::ReconnectScheduled);
    }

    fn on_stability_elapsed(&mut self) {
        if self.apply(EventKind::StabilityElapsed) == Action::ResetBackoff {
            if self.reconnect.attempt_count() > 0 {
                debug!(
                    attempts = self.reconnect.attempt_count(),
                    "Connection stable, resetting backoff"
                );
            }
            self.reconnect.reset();
            self.update_stats(|s| s.attempt_count = 0);

            // Outage ends only once a connection proves stable
            if self.unavailable {
                self.unavailable = false;
                info!("Real-time updates restored");
                self.notify(ChannelNotice::Restored);
            }
        }
    }
}
