//! Link counters.
//!
//! Updated by the link task, read (and reset) by the button task. Plain
//! relaxed atomics: the numbers are diagnostics, not synchronisation.

use core::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct LinkStats {
    commands: AtomicU32,
    image_replies: AtomicU32,
    sensor_replies: AtomicU32,
    empty_replies: AtomicU32,
    ignored_commands: AtomicU32,
    accepts: AtomicU32,
    peer_losses: AtomicU32,
    teardowns: AtomicU32,
    listen_failures: AtomicU32,
    accept_failures: AtomicU32,
}

/// Point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub commands: u32,
    pub image_replies: u32,
    pub sensor_replies: u32,
    pub empty_replies: u32,
    pub ignored_commands: u32,
    pub accepts: u32,
    pub peer_losses: u32,
    pub teardowns: u32,
    pub listen_failures: u32,
    pub accept_failures: u32,
}

/// Which counter to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Command,
    ImageReply,
    SensorReply,
    EmptyReply,
    IgnoredCommand,
    Accept,
    PeerLoss,
    Teardown,
    ListenFailure,
    AcceptFailure,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self, counter: Counter) {
        self.cell(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u32 {
        self.cell(counter).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commands: self.get(Counter::Command),
            image_replies: self.get(Counter::ImageReply),
            sensor_replies: self.get(Counter::SensorReply),
            empty_replies: self.get(Counter::EmptyReply),
            ignored_commands: self.get(Counter::IgnoredCommand),
            accepts: self.get(Counter::Accept),
            peer_losses: self.get(Counter::PeerLoss),
            teardowns: self.get(Counter::Teardown),
            listen_failures: self.get(Counter::ListenFailure),
            accept_failures: self.get(Counter::AcceptFailure),
        }
    }

    pub fn reset(&self) {
        for c in [
            Counter::Command,
            Counter::ImageReply,
            Counter::SensorReply,
            Counter::EmptyReply,
            Counter::IgnoredCommand,
            Counter::Accept,
            Counter::PeerLoss,
            Counter::Teardown,
            Counter::ListenFailure,
            Counter::AcceptFailure,
        ] {
            self.cell(c).store(0, Ordering::Relaxed);
        }
    }

    fn cell(&self, counter: Counter) -> &AtomicU32 {
        match counter {
            Counter::Command => &self.commands,
            Counter::ImageReply => &self.image_replies,
            Counter::SensorReply => &self.sensor_replies,
            Counter::EmptyReply => &self.empty_replies,
            Counter::IgnoredCommand => &self.ignored_commands,
            Counter::Accept => &self.accepts,
            Counter::PeerLoss => &self.peer_losses,
            Counter::Teardown => &self.teardowns,
            Counter::ListenFailure => &self.listen_failures,
            Counter::AcceptFailure => &self.accept_failures,
        }
    }
}
