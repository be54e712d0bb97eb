//! Exact-length receive and full-buffer send over a [`Peer`].
//!
//! Both loops treat every transport call as possibly partial. A zero-byte
//! result is "no data yet" and is retried, but only `max_idle_reads` times
//! in a row; after that the peer is reported as stalled so a silent peer
//! cannot pin the link forever. Any error aborts the loop at once.

use log::debug;

use super::Peer;
use crate::error::SocketError;

/// Retry budget for partial transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvPolicy {
    /// Consecutive zero-byte transfers tolerated before giving up.
    pub max_idle_reads: u32,
}

impl RecvPolicy {
    pub const fn new(max_idle_reads: u32) -> Self {
        Self { max_idle_reads }
    }
}

impl Default for RecvPolicy {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Fill `buf` completely from `peer`.
pub fn recv_exact<P: Peer + ?Sized>(
    peer: &mut P,
    buf: &mut [u8],
    policy: RecvPolicy,
) -> Result<(), SocketError> {
    let mut filled = 0;
    let mut idle = 0u32;

    while filled < buf.len() {
        match peer.recv(&mut buf[filled..])? {
            0 => {
                idle += 1;
                if idle >= policy.max_idle_reads {
                    debug!("link: recv stalled after {} idle reads ({}/{} bytes)", idle, filled, buf.len());
                    return Err(SocketError::Stalled);
                }
            }
            n => {
                filled += n;
                idle = 0;
            }
        }
    }
    Ok(())
}

/// Write all of `data` to `peer`.
pub fn send_all<P: Peer + ?Sized>(
    peer: &mut P,
    data: &[u8],
    policy: RecvPolicy,
) -> Result<(), SocketError> {
    let mut sent = 0;
    let mut idle = 0u32;

    while sent < data.len() {
        match peer.send(&data[sent..])? {
            0 => {
                idle += 1;
                if idle >= policy.max_idle_reads {
                    debug!("link: send stalled after {} idle writes ({}/{} bytes)", idle, sent, data.len());
                    return Err(SocketError::Stalled);
                }
            }
            n => {
                sent += n;
                idle = 0;
            }
        }
    }
    Ok(())
}
