//! Single-slot frame hand-off between a producer task and the link task.
//!
//! The camera and UART tasks publish complete frames into a
//! [`FrameExchange`]. The link task holds an [`ExchangeSource`] that copies
//! the latest frame into a buffer it owns before sending it, so a producer
//! overwriting the slot mid-transmission can never tear an outgoing frame.
//!
//! ```text
//!  producer ──publish()──▶ [ Mutex<Slot> ] ──acquire()──▶ ExchangeSource.buf ──▶ send
//! ```
//!
//! A source that finds no new frame re-sends its previous copy, which
//! matches the device behavior of replying with whatever is in the buffer.

use std::sync::{Arc, Mutex, PoisonError};

use crate::app::ports::FrameSource;
use crate::error::FrameError;

struct Slot {
    data: Box<[u8]>,
    seq: u64,
}

/// Locked single-slot exchange for fixed-size frames.
pub struct FrameExchange {
    frame_len: usize,
    slot: Mutex<Slot>,
}

impl FrameExchange {
    /// Create an exchange for frames of exactly `frame_len` bytes, initially
    /// zero-filled.
    pub fn new(frame_len: usize) -> Arc<Self> {
        Arc::new(Self {
            frame_len,
            slot: Mutex::new(Slot {
                data: vec![0u8; frame_len].into_boxed_slice(),
                seq: 0,
            }),
        })
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Replace the current frame.
    pub fn publish(&self, frame: &[u8]) -> Result<u64, FrameError> {
        if frame.len() != self.frame_len {
            return Err(FrameError::FrameLength {
                expected: self.frame_len,
                got: frame.len(),
            });
        }
        Ok(self.publish_with(|buf| buf.copy_from_slice(frame)))
    }

    /// Fill the slot in place. Useful when the producer reads straight from
    /// a peripheral into the frame.
    pub fn publish_with(&self, fill: impl FnOnce(&mut [u8])) -> u64 {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        fill(&mut slot.data);
        slot.seq = slot.seq.wrapping_add(1);
        slot.seq
    }

    /// Sequence number of the latest published frame (0 = never published).
    pub fn sequence(&self) -> u64 {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).seq
    }

    /// Create a consumer that reads from this exchange.
    pub fn source(self: &Arc<Self>) -> ExchangeSource {
        ExchangeSource {
            exchange: Arc::clone(self),
            buf: vec![0u8; self.frame_len].into_boxed_slice(),
            last_seq: 0,
            fresh_count: 0,
            stale_count: 0,
        }
    }

    fn copy_if_newer(&self, dst: &mut [u8], last_seq: u64) -> Option<u64> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.seq == last_seq {
            return None;
        }
        dst.copy_from_slice(&slot.data);
        Some(slot.seq)
    }
}

/// Consumer half of a [`FrameExchange`].
pub struct ExchangeSource {
    exchange: Arc<FrameExchange>,
    buf: Box<[u8]>,
    last_seq: u64,
    fresh_count: u64,
    stale_count: u64,
}

impl ExchangeSource {
    /// Frames acquired that had been newly published.
    pub fn fresh_count(&self) -> u64 {
        self.fresh_count
    }

    /// Frames acquired that repeated the previous copy.
    pub fn stale_count(&self) -> u64 {
        self.stale_count
    }
}

impl FrameSource for ExchangeSource {
    fn frame_len(&self) -> usize {
        self.buf.len()
    }

    fn acquire(&mut self) -> &[u8] {
        match self.exchange.copy_if_newer(&mut self.buf, self.last_seq) {
            Some(seq) => {
                self.last_seq = seq;
                self.fresh_count += 1;
            }
            None => self.stale_count += 1,
        }
        &self.buf
    }
}
