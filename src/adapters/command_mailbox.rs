//! Actuator sink that parks the latest command for the main-MCU link.
//!
//! The link task decodes commands; a separate UART/SPI task forwards them
//! to the motor controller at its own pace. Only the newest command
//! matters, so the mailbox is a single overwrite slot rather than a queue.

use std::sync::{Arc, Mutex, PoisonError};

use crate::app::ports::ActuatorSink;
use crate::protocol::ActuatorCommand;

#[derive(Default)]
struct Slot {
    latest: Option<ActuatorCommand>,
    overwritten: u32,
}

/// Shared single-slot command mailbox. Clone to hand one end to each task.
#[derive(Clone, Default)]
pub struct CommandMailbox {
    slot: Arc<Mutex<Slot>>,
}

impl CommandMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the newest command, if one arrived since the last take.
    pub fn take(&self) -> Option<ActuatorCommand> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .latest
            .take()
    }

    /// Commands replaced before anyone took them.
    pub fn overwritten(&self) -> u32 {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .overwritten
    }
}

impl ActuatorSink for CommandMailbox {
    fn apply(&mut self, cmd: &ActuatorCommand) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.latest.replace(*cmd).is_some() {
            slot.overwritten = slot.overwritten.wrapping_add(1);
        }
    }
}
