//! Outbound link events.
//!
//! The link state machine emits these through the
//! [`EventSink`](super::ports::EventSink) port. The log adapter renders
//! them on the serial console; tests record them.

use crate::error::SocketError;
use crate::fsm::LinkState;
use crate::protocol::{ActuatorCommand, ReplyTag};

/// Structured events emitted by the link core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The service has started (carries initial state).
    Started(LinkState),

    /// The state machine moved between states.
    StateChanged { from: LinkState, to: LinkState },

    /// The network reported association; the link is about to listen.
    NetworkUp,

    /// The network dropped; all sockets were closed.
    TornDown { from: LinkState },

    /// A listening socket is bound.
    Listening { port: u16 },

    ListenFailed(SocketError),

    /// A controller connected.
    PeerAccepted,

    AcceptFailed(SocketError),

    /// The connected controller was lost mid-session.
    PeerLost { state: LinkState, error: SocketError },

    /// A command packet was decoded and forwarded to the actuators.
    CommandApplied(ActuatorCommand),

    /// A reply finished sending.
    ReplySent(ReplyTag),

    /// A command asked for nothing this firmware can send.
    CommandIgnored { mode: u8 },
}
