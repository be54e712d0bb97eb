//! Shared mutable context threaded through every link state handler.
//!
//! `LinkContext` owns everything the handlers touch: the listening and
//! peer sockets, the port adapters, the last decoded command, the retry
//! policy and the counters. Socket lifetime is expressed with `Option`:
//! taking a socket out of its slot and dropping it is what closes it.

use std::sync::Arc;
use std::time::Duration;

use burster::Limiter;

use crate::adapters::time::platform_now;
use crate::app::events::BridgeEvent;
use crate::app::ports::{BridgePorts, EventSink};
use crate::app::stats::{Counter, LinkStats};
use crate::config::BridgeConfig;
use crate::events::ConnectionFlags;
use crate::protocol::{ActuatorCommand, ReplyPlan};
use crate::transport::{RecvPolicy, SocketStack};

/// Listening socket type of a port bundle.
pub type ListenerOf<P> = <<P as BridgePorts>::Stack as SocketStack>::Listener;
/// Peer socket type of a port bundle.
pub type PeerOf<P> = <<P as BridgePorts>::Stack as SocketStack>::Peer;

/// The shared context passed to every state handler function.
pub struct LinkContext<P: BridgePorts> {
    // -- Configuration --
    pub config: BridgeConfig,
    pub policy: RecvPolicy,

    // -- Collaborators --
    pub flags: Arc<ConnectionFlags>,
    pub stats: Arc<LinkStats>,
    pub ports: P,

    // -- Connection --
    pub listener: Option<ListenerOf<P>>,
    pub peer: Option<PeerOf<P>>,

    // -- Current exchange --
    /// Last command received from the controller.
    pub last_command: Option<ActuatorCommand>,
    /// Reply chosen for `last_command`.
    pub plan: ReplyPlan,

    listen_limiter: burster::TokenBucket<fn() -> Duration>,
}

impl<P: BridgePorts> LinkContext<P> {
    pub fn new(
        config: BridgeConfig,
        flags: Arc<ConnectionFlags>,
        stats: Arc<LinkStats>,
        ports: P,
    ) -> Self {
        let policy = RecvPolicy::new(config.max_idle_reads);
        let rate = u64::from(config.listen_retries_per_sec.max(1));
        Self {
            policy,
            flags,
            stats,
            ports,
            listener: None,
            peer: None,
            last_command: None,
            plan: ReplyPlan::Empty,
            listen_limiter: burster::TokenBucket::new_with_time_provider(
                rate,
                rate,
                platform_now as fn() -> Duration,
            ),
            config,
        }
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    /// Close the peer socket, keeping the listener.
    pub fn drop_peer(&mut self) {
        self.peer = None;
        self.last_command = None;
    }

    /// Close the peer and the listener. Returns whether anything was open.
    pub fn teardown(&mut self) -> bool {
        let had_sockets = self.peer.is_some() || self.listener.is_some();
        self.drop_peer();
        self.listener = None;
        had_sockets
    }

    /// Consume one listen attempt from the retry budget.
    pub fn may_listen(&mut self) -> bool {
        self.listen_limiter.try_consume(1).is_ok()
    }

    pub fn emit(&mut self, event: BridgeEvent) {
        self.ports.events().emit(&event);
    }

    pub fn count(&self, counter: Counter) {
        self.stats.bump(counter);
    }
}
