//! Bridge service, the hexagonal core of the link task.
//!
//! [`BridgeService`] owns the link state machine and its context. One call
//! to [`BridgeService::step`] is one pass of the socket task loop: the
//! disconnect check first, then exactly one state dispatch.
//!
//! ```text
//!  ConnectionFlags ──▶ ┌──────────────────────┐ ──▶ EventSink
//!  SocketStack ⇄       │    BridgeService     │ ──▶ ActuatorSink
//!  FrameSource ×2 ──▶  │  disconnect · FSM    │ ──▶ LinkIndicator
//!                      └──────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::BridgeConfig;
use crate::events::ConnectionFlags;
use crate::fsm::context::LinkContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, LinkState};

use super::events::BridgeEvent;
use super::ports::BridgePorts;
use super::stats::{Counter, LinkStats};

// ───────────────────────────────────────────────────────────────
// BridgeService
// ───────────────────────────────────────────────────────────────

pub struct BridgeService<P: BridgePorts> {
    fsm: Fsm<P>,
    ctx: LinkContext<P>,
    loop_yield: Duration,
    steps: u64,
    /// Disconnect generation already acted on.
    seen_disconnects: u32,
}

impl<P: BridgePorts> BridgeService<P> {
    /// Construct the service. Does **not** start the machine; call
    /// [`start`](Self::start) or [`run`](Self::run).
    pub fn new(
        config: BridgeConfig,
        flags: Arc<ConnectionFlags>,
        stats: Arc<LinkStats>,
        ports: P,
    ) -> Self {
        let loop_yield = Duration::from_millis(u64::from(config.loop_yield_ms));
        let seen_disconnects = flags.disconnect_generation();
        Self {
            fsm: Fsm::new(build_state_table(), LinkState::WaitConnect),
            ctx: LinkContext::new(config, flags, stats, ports),
            loop_yield,
            steps: 0,
            seen_disconnects,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self) {
        self.fsm.start(&mut self.ctx);
        let state = self.fsm.current_state();
        self.ctx.emit(BridgeEvent::Started(state));
    }

    /// Start and loop forever, yielding between steps.
    pub fn run(mut self) -> ! {
        self.start();
        loop {
            self.step();
            std::thread::sleep(self.loop_yield);
        }
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// One loop pass.
    ///
    /// A network loss raised since the previous pass wins over whatever the
    /// current state would do: both sockets are closed and the machine
    /// returns to `WaitConnect`. That pass ends there, so the blocking wait
    /// for the next association happens on the following pass.
    ///
    /// Losses are detected through the disconnect generation rather than
    /// the `Disconnected` bit, so one that was cleared and followed by a
    /// reconnect before this pass still tears the link down exactly once.
    pub fn step(&mut self) {
        self.steps += 1;

        let generation = self.ctx.flags.disconnect_generation();
        if generation != self.seen_disconnects {
            self.seen_disconnects = generation;
            if self.tear_down_if_active() {
                return;
            }
        }

        let prev = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        let next = self.fsm.current_state();
        debug_assert_eq!(
            next.has_session(),
            self.ctx.has_peer(),
            "peer socket out of step with {:?}",
            next
        );
        if next != prev {
            self.ctx.emit(BridgeEvent::StateChanged { from: prev, to: next });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.fsm.current_state()
    }

    /// Loop passes executed since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn context(&self) -> &LinkContext<P> {
        &self.ctx
    }

    pub fn ports(&self) -> &P {
        &self.ctx.ports
    }

    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ctx.ports
    }

    pub fn stats(&self) -> &Arc<LinkStats> {
        &self.ctx.stats
    }

    // ── Internal ──────────────────────────────────────────────

    fn tear_down_if_active(&mut self) -> bool {
        let from = self.fsm.current_state();
        let had_sockets = self.ctx.teardown();
        if !had_sockets && from == LinkState::WaitConnect {
            return false;
        }

        self.ctx.count(Counter::Teardown);
        self.ctx.emit(BridgeEvent::TornDown { from });
        self.fsm.force_transition(LinkState::WaitConnect, &mut self.ctx);
        if from != LinkState::WaitConnect {
            self.ctx.emit(BridgeEvent::StateChanged {
                from,
                to: LinkState::WaitConnect,
            });
        }
        true
    }
}
