//! Connection lifecycle flags.
//!
//! Sticky, level-triggered signals shared between the network layer (which
//! raises them) and the link state machine (which only reads them).
//!
//! ```text
//! ┌──────────────┐ raise_connected()    ┌─────────────────┐
//! │ WiFi monitor │────────────────────▶ │ ConnectionFlags │ ◀── is_set()
//! │ (owner)      │ raise_disconnected() │  AtomicU8 bits  │ ◀── wait_connected()
//! └──────────────┘                      │  + wake signal  │       (link task)
//!                                       └─────────────────┘
//! ```
//!
//! The three flags are independent: raising one never touches another, and
//! only the owner clears them. Every `raise_disconnected` also bumps a
//! generation counter, so a reader that compares generations notices a
//! network loss even when the owner cleared the bit and reassociated before
//! the reader looked.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// One lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flag {
    /// The station associated with an access point and has an address.
    Connected = 0b0000_0001,
    /// The station lost its association.
    Disconnected = 0b0000_0010,
    /// The sensor producer has a fresh frame.
    DataReady = 0b0000_0100,
}

impl Flag {
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Shared flag group. Hand it to producers and the link task behind an
/// `Arc`.
pub struct ConnectionFlags {
    bits: AtomicU8,
    disconnects: AtomicU32,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for ConnectionFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFlags {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
            disconnects: AtomicU32::new(0),
            changed: Signal::new(),
        }
    }

    // ── Producer side ─────────────────────────────────────────

    /// Mark the network as associated.
    pub fn raise_connected(&self) {
        self.raise(Flag::Connected);
    }

    /// Mark the network as lost and start a new disconnect generation.
    pub fn raise_disconnected(&self) {
        self.disconnects.fetch_add(1, Ordering::AcqRel);
        self.raise(Flag::Disconnected);
    }

    /// Mark a fresh sensor frame as available.
    pub fn raise_data_ready(&self) {
        self.raise(Flag::DataReady);
    }

    /// Owner-side reset of a single flag. The disconnect generation is
    /// never reset.
    pub fn clear(&self, flag: Flag) {
        self.bits.fetch_and(!flag.mask(), Ordering::AcqRel);
    }

    // ── Reader side ───────────────────────────────────────────

    pub fn is_set(&self, flag: Flag) -> bool {
        self.bits.load(Ordering::Acquire) & flag.mask() != 0
    }

    /// Raw bit pattern, for logging.
    pub fn snapshot(&self) -> u8 {
        self.bits.load(Ordering::Acquire)
    }

    /// Number of `raise_disconnected` calls so far (wrapping).
    pub fn disconnect_generation(&self) -> u32 {
        self.disconnects.load(Ordering::Acquire)
    }

    /// Block the calling thread until `Connected` is set.
    ///
    /// Returns immediately if it already is.
    pub fn wait_connected(&self) {
        while !self.is_set(Flag::Connected) {
            futures_lite::future::block_on(self.changed.wait());
        }
    }

    fn raise(&self, flag: Flag) {
        self.bits.fetch_or(flag.mask(), Ordering::AcqRel);
        self.changed.signal(());
    }
}
