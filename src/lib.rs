//! e-puck2 radio module bridge library.
//!
//! Exposes the link core and its adapters for the device binary and for
//! host integration testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod frames;
pub mod fsm;
pub mod pins;
pub mod protocol;
pub mod transport;
