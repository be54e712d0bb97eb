//! Socket abstraction for the single-peer TCP link.
//!
//! ```text
//!   SocketStack ──listen()──▶ Listener ──accept()──▶ Peer ⇄ recv()/send()
//! ```
//!
//! Concrete implementations:
//! - raw lwIP sockets on the device (`adapters::lwip_socket`)
//! - `std::net` on the host (`adapters::std_socket`)
//!
//! Closing is `Drop`: dropping a `Peer` closes the accepted socket, dropping
//! a `Listener` closes the listening socket. The link state machine relies
//! on that to release exactly the socket it means to release.

pub mod io;

pub use io::{recv_exact, send_all, RecvPolicy};

use crate::error::SocketError;

/// Factory for listening sockets.
pub trait SocketStack {
    type Peer: Peer;
    type Listener: Listener<Peer = Self::Peer>;

    /// Create a socket, bind it to `0.0.0.0:<port>` and start listening.
    fn listen(&mut self, port: u16, backlog: u8) -> Result<Self::Listener, SocketError>;
}

/// A bound, listening socket.
pub trait Listener {
    type Peer: Peer;

    /// Block until one peer connects.
    fn accept(&mut self) -> Result<Self::Peer, SocketError>;
}

/// An accepted connection.
pub trait Peer {
    /// Read up to `buf.len()` bytes. `Ok(0)` means "nothing yet"; a closed
    /// peer is reported as [`SocketError::PeerClosed`] when the stack can
    /// tell the difference.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SocketError>;

    /// Write up to `data.len()` bytes, returning how many were taken.
    fn send(&mut self, data: &[u8]) -> Result<usize, SocketError>;
}
