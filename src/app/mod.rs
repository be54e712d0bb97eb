//! Application core: the link service and its ports.
//!
//! Everything here is hardware-agnostic: sockets, frame producers, the
//! actuator link and the status LED are reached through the **port traits**
//! in [`ports`], so the whole service runs against mocks on the host.

pub mod events;
pub mod ports;
pub mod service;
pub mod stats;
