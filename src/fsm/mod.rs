//! Function-pointer finite state machine engine for the TCP link.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  StateTable                                               │
//! │  ┌─────────────┬───────────┬──────────┬─────────────────┐ │
//! │  │ LinkState   │ on_enter  │ on_exit  │ on_update       │ │
//! │  ├─────────────┼───────────┼──────────┼─────────────────┤ │
//! │  │ WaitConnect │ fn(ctx)   │          │ fn(ctx)->Option │ │
//! │  │ Listen      │           │          │ fn(ctx)->Option │ │
//! │  │ Accept      │ fn(ctx)   │          │ fn(ctx)->Option │ │
//! │  │ RecvCmd     │           │          │ fn(ctx)->Option │ │
//! │  │ SendImage   │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  │ SendSensors │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option │ │
//! │  │ SendEmpty   │           │          │ fn(ctx)->Option │ │
//! │  └─────────────┴───────────┴──────────┴─────────────────┘ │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer. All functions receive `&mut LinkContext<P>`, which
//! owns the sockets, the port adapters and the last decoded command.

pub mod context;
pub mod states;

use context::LinkContext;
use log::debug;

use crate::app::ports::BridgePorts;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every state of the link.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LinkState {
    WaitConnect = 0,
    Listen = 1,
    Accept = 2,
    RecvCmd = 3,
    SendImage = 4,
    SendSensors = 5,
    SendEmpty = 6,
}

impl LinkState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 7;

    /// Convert an index back to `LinkState`. Out-of-range indices fall back
    /// to `WaitConnect`, which is always a safe place to restart from.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::WaitConnect,
            1 => Self::Listen,
            2 => Self::Accept,
            3 => Self::RecvCmd,
            4 => Self::SendImage,
            5 => Self::SendSensors,
            6 => Self::SendEmpty,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::WaitConnect
            }
        }
    }

    /// States in which a peer socket is expected to be open.
    pub fn has_session(self) -> bool {
        matches!(
            self,
            Self::RecvCmd | Self::SendImage | Self::SendSensors | Self::SendEmpty
        )
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn<P> = fn(&mut LinkContext<P>);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn<P> = fn(&mut LinkContext<P>) -> Option<LinkState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single link state.
pub struct StateDescriptor<P: BridgePorts> {
    pub id: LinkState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<P>>,
    pub on_exit: Option<StateActionFn<P>>,
    pub on_update: StateUpdateFn<P>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The link state machine engine.
pub struct Fsm<P: BridgePorts> {
    /// Fixed-size table indexed by `LinkState as usize`.
    table: [StateDescriptor<P>; LinkState::COUNT],
    current: usize,
    tick_count: u64,
    state_entry_tick: u64,
}

impl<P: BridgePorts> Fsm<P> {
    pub fn new(table: [StateDescriptor<P>; LinkState::COUNT], initial: LinkState) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut LinkContext<P>) {
        debug!("link: starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the machine by one step.
    pub fn tick(&mut self, ctx: &mut LinkContext<P>) {
        self.tick_count += 1;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Jump to `next` regardless of what `on_update` would return. Used by
    /// the disconnect check at the top of every loop pass.
    pub fn force_transition(&mut self, next: LinkState, ctx: &mut LinkContext<P>) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> LinkState {
        LinkState::from_index(self.current)
    }

    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// How many ticks the machine has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: LinkState, ctx: &mut LinkContext<P>) {
        let next_idx = next_id as usize;

        debug!(
            "link: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
