//! `std::net` implementation of the socket ports.
//!
//! Used for host simulation and the loopback tests. `std` offers no way to
//! pass a listen backlog, so the backlog argument is ignored here; the
//! lwIP stack honours it on the device.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::debug;

use crate::error::SocketError;
use crate::transport::{Listener, Peer, SocketStack};

/// Shared view of the stack's listening socket, for whoever needs to
/// connect to it (tests, the simulator binary).
#[derive(Default)]
pub struct ListenProbe {
    addr: Mutex<Option<SocketAddr>>,
    binds: AtomicU32,
}

impl ListenProbe {
    /// Address of the currently open listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How many listeners have been opened so far.
    pub fn binds(&self) -> u32 {
        self.binds.load(Ordering::Acquire)
    }

    fn opened(&self, addr: SocketAddr) {
        *self.addr.lock().unwrap_or_else(PoisonError::into_inner) = Some(addr);
        self.binds.fetch_add(1, Ordering::AcqRel);
    }

    fn closed(&self) {
        *self.addr.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

pub struct StdSocketStack {
    bind_ip: IpAddr,
    recv_timeout: Option<Duration>,
    probe: Arc<ListenProbe>,
}

impl StdSocketStack {
    /// Listen on all interfaces.
    pub fn new(recv_timeout: Option<Duration>) -> Self {
        Self::bound_to(IpAddr::V4(Ipv4Addr::UNSPECIFIED), recv_timeout)
    }

    /// Listen on one address only (`127.0.0.1` in tests).
    pub fn bound_to(bind_ip: IpAddr, recv_timeout: Option<Duration>) -> Self {
        Self {
            bind_ip,
            recv_timeout,
            probe: Arc::new(ListenProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<ListenProbe> {
        Arc::clone(&self.probe)
    }
}

impl SocketStack for StdSocketStack {
    type Peer = StdPeer;
    type Listener = StdListener;

    fn listen(&mut self, port: u16, _backlog: u8) -> Result<StdListener, SocketError> {
        let inner = TcpListener::bind((self.bind_ip, port)).map_err(|e| SocketError::Bind(os_code(&e)))?;
        let addr = inner.local_addr().map_err(|e| SocketError::Listen(os_code(&e)))?;
        self.probe.opened(addr);
        debug!("link: std listener on {}", addr);
        Ok(StdListener {
            inner,
            recv_timeout: self.recv_timeout,
            probe: Arc::clone(&self.probe),
        })
    }
}

pub struct StdListener {
    inner: TcpListener,
    recv_timeout: Option<Duration>,
    probe: Arc<ListenProbe>,
}

impl Listener for StdListener {
    type Peer = StdPeer;

    fn accept(&mut self) -> Result<StdPeer, SocketError> {
        let (stream, from) = self
            .inner
            .accept()
            .map_err(|e| SocketError::Accept(os_code(&e)))?;
        stream
            .set_read_timeout(self.recv_timeout)
            .map_err(|e| SocketError::Accept(os_code(&e)))?;
        // Tag and payload go out as separate writes.
        let _ = stream.set_nodelay(true);
        debug!("link: accepted {}", from);
        Ok(StdPeer { stream })
    }
}

impl Drop for StdListener {
    fn drop(&mut self) {
        self.probe.closed();
    }
}

pub struct StdPeer {
    stream: TcpStream,
}

impl Peer for StdPeer {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        match self.stream.read(buf) {
            Ok(0) if !buf.is_empty() => Err(SocketError::PeerClosed),
            Ok(n) => Ok(n),
            Err(e) if is_idle(&e) => Ok(0),
            Err(e) if is_reset(&e) => Err(SocketError::PeerClosed),
            Err(e) => Err(SocketError::Recv(os_code(&e))),
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<usize, SocketError> {
        match self.stream.write(data) {
            Ok(n) => Ok(n),
            Err(e) if is_idle(&e) => Ok(0),
            Err(e) if is_reset(&e) => Err(SocketError::PeerClosed),
            Err(e) => Err(SocketError::Send(os_code(&e))),
        }
    }
}

fn os_code(e: &io::Error) -> i32 {
    e.raw_os_error().unwrap_or(-1)
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

fn is_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}
