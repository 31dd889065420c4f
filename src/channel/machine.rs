//! Channel state machine.
//!
//! Every transition the channel can make is listed in [`transition`], keyed
//! by the current state and the kind of event. The driver applies the
//! returned [`Action`]; the table itself has no side effects.
//!
//! # Transition Table
//!
//! | State | Event | Next | Action |
//! |-------|-------|------|--------|
//! | Idle | Start | Connecting | BeginConnect |
//! | Idle | Shutdown | Idle | Finish |
//! | Connecting | Opened | Open | ArmStability |
//! | Connecting | Closed | Closed | ScheduleReconnect |
//! | Connecting | Shutdown | Closing | CloseTransport |
//! | Open | Message | Open | Deliver |
//! | Open | StabilityElapsed | Open | ResetBackoff |
//! | Open | Closed | Closed | ScheduleReconnect |
//! | Open | Shutdown | Closing | CloseTransport |
//! | Closed | ReconnectScheduled | Reconnecting | None |
//! | Closed | Shutdown | Idle | Finish |
//! | Reconnecting | TimerFired | Connecting | BeginConnect |
//! | Reconnecting | Shutdown | Idle | CancelReconnect |
//! | Closing | Opened | Closing | CloseTransport |
//! | Closing | Closed | Idle | Finish |
//! | Closing | Shutdown | Closing | None |
//!
//! Any other pair yields [`Action::Ignore`] with the state unchanged.

// ============================================================================
// Imports
// ============================================================================

use super::state::ConnectionState;

// ============================================================================
// EventKind
// ============================================================================

/// Kinds of events the driver feeds into the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Caller called `start`.
    Start,
    /// Caller called `shutdown`.
    Shutdown,
    /// Current transport opened.
    Opened,
    /// Current transport received a text frame.
    Message,
    /// Current transport closed, or the attempt failed before opening.
    Closed,
    /// Reconnect delay chosen and timer armed.
    ReconnectScheduled,
    /// Reconnect timer elapsed.
    TimerFired,
    /// Connection stayed open for the stability window.
    StabilityElapsed,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [Self; 8] = [
        Self::Start,
        Self::Shutdown,
        Self::Opened,
        Self::Message,
        Self::Closed,
        Self::ReconnectScheduled,
        Self::TimerFired,
        Self::StabilityElapsed,
    ];
}

// ============================================================================
// Action
// ============================================================================

/// Side effect the driver performs after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Event not valid in this state; nothing changes.
    Ignore,
    /// Valid transition without a side effect.
    None,
    /// Resolve the endpoint and open a transport.
    BeginConnect,
    /// Publish the live handle and start the stability timer.
    ArmStability,
    /// Parse the frame and push it to the delivery queue.
    Deliver,
    /// Clear the failure history.
    ResetBackoff,
    /// Record the failure, pick a delay, arm the reconnect timer.
    ScheduleReconnect,
    /// Ask the transport to close.
    CloseTransport,
    /// Drop the pending reconnect timer and finish shutdown.
    CancelReconnect,
    /// Shutdown complete; wake waiters.
    Finish,
}

// ============================================================================
// Transition
// ============================================================================

/// Result of feeding one event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State after the event.
    pub next: ConnectionState,
    /// Side effect to perform.
    pub action: Action,
}

impl Transition {
    const fn to(next: ConnectionState, action: Action) -> Self {
        Self { next, action }
    }

    const fn ignore(state: ConnectionState) -> Self {
        Self::to(state, Action::Ignore)
    }
}

/// Looks up the transition for `event` in `state`.
#[must_use]
pub const fn transition(state: ConnectionState, event: EventKind) -> Transition {
    use Action as A;
    use ConnectionState as S;
    use EventKind as E;

    match (state, event) {
        (S::Idle, E::Start) => Transition::to(S::Connecting, A::BeginConnect),
        (S::Idle, E::Shutdown) => Transition::to(S::Idle, A::Finish),

        (S::Connecting, E::Opened) => Transition::to(S::Open, A::ArmStability),
        (S::Connecting, E::Closed) => Transition::to(S::Closed, A::ScheduleReconnect),
        (S::Connecting, E::Shutdown) => Transition::to(S::Closing, A::CloseTransport),

        (S::Open, E::Message) => Transition::to(S::Open, A::Deliver),
        (S::Open, E::StabilityElapsed) => Transition::to(S::Open, A::ResetBackoff),
        (S::Open, E::Closed) => Transition::to(S::Closed, A::ScheduleReconnect),
        (S::Open, E::Shutdown) => Transition::to(S::Closing, A::CloseTransport),

        (S::Closed, E::ReconnectScheduled) => Transition::to(S::Reconnecting, A::None),
        (S::Closed, E::Shutdown) => Transition::to(S::Idle, A::Finish),

        (S::Reconnecting, E::TimerFired) => Transition::to(S::Connecting, A::BeginConnect),
        (S::Reconnecting, E::Shutdown) => Transition::to(S::Idle, A::CancelReconnect),

        // Open completed after shutdown was requested
        (S::Closing, E::Opened) => Transition::to(S::Closing, A::CloseTransport),
        (S::Closing, E::Closed) => Transition::to(S::Idle, A::Finish),
        (S::Closing, E::Shutdown) => Transition::to(S::Closing, A::None),

        (state, _) => Transition::ignore(state),
    }
}

// ============================================================================
// Tests
// ============================================================================
