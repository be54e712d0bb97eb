//! Raw lwIP implementation of the socket ports (device only).
//!
//! `std::net` on ESP-IDF always listens with the default backlog; the
//! controller protocol wants exactly one pending peer, so the listener is
//! built from the lwIP BSD calls directly. After any failed call the
//! socket's `SO_ERROR` is read and logged, which is usually the only
//! useful diagnostic lwIP gives.

use core::ffi::c_void;
use core::mem::size_of;
use core::ptr::{addr_of, addr_of_mut};
use core::time::Duration;

use esp_idf_svc::sys;
use log::{error, warn};

use crate::error::SocketError;
use crate::transport::{Listener, Peer, SocketStack};

/// Owned lwIP socket descriptor. Closed on drop.
struct Fd(i32);

impl Fd {
    fn raw(&self) -> i32 {
        self.0
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        // SAFETY: the descriptor is owned and closed exactly once.
        unsafe {
            sys::lwip_close(self.0);
        }
    }
}

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}

/// Pending error on `fd` (`SO_ERROR`), or `None` if it cannot be read.
fn socket_error_code(fd: i32) -> Option<i32> {
    let mut result: i32 = 0;
    let mut optlen = size_of::<i32>() as sys::socklen_t;
    // SAFETY: `result` and `optlen` outlive the call and are sized for
    // SO_ERROR.
    let rc = unsafe {
        sys::lwip_getsockopt(
            fd,
            sys::SOL_SOCKET as i32,
            sys::SO_ERROR as i32,
            addr_of_mut!(result).cast::<c_void>(),
            &mut optlen,
        )
    };
    if rc == -1 {
        error!("link: getsockopt failed (errno={})", errno());
        return None;
    }
    Some(result)
}

/// Log the socket's pending error for the failed `op`. Returns the code to
/// report: `SO_ERROR` when set, otherwise `errno`.
fn report(op: &str, fd: i32) -> i32 {
    match socket_error_code(fd) {
        Some(0) | None => {
            let code = errno();
            warn!("link: {} failed (errno={})", op, code);
            code
        }
        Some(code) => {
            warn!("link: {} socket error {}", op, code);
            code
        }
    }
}

fn is_timeout(code: i32) -> bool {
    code == sys::EAGAIN as i32 || code == sys::EWOULDBLOCK as i32
}

// ───────────────────────────────────────────────────────────────
// Stack
// ───────────────────────────────────────────────────────────────

pub struct LwipSocketStack {
    recv_timeout: Option<Duration>,
}

impl LwipSocketStack {
    pub fn new(recv_timeout: Option<Duration>) -> Self {
        Self { recv_timeout }
    }
}

impl SocketStack for LwipSocketStack {
    type Peer = LwipPeer;
    type Listener = LwipListener;

    fn listen(&mut self, port: u16, backlog: u8) -> Result<LwipListener, SocketError> {
        // SAFETY: plain lwIP socket creation.
        let raw = unsafe {
            sys::lwip_socket(
                sys::AF_INET as i32,
                sys::SOCK_STREAM as i32,
                sys::IPPROTO_TCP as i32,
            )
        };
        if raw < 0 {
            let code = errno();
            warn!("link: create_server failed (errno={})", code);
            return Err(SocketError::Create(code));
        }
        let fd = Fd(raw);

        let addr = sys::sockaddr_in {
            sin_len: 0,
            sin_family: sys::AF_INET as _,
            // SAFETY: lwip_htons takes a u16 and returns the network-byte-order value.
            sin_port: unsafe { sys::lwip_htons(port) },
            sin_addr: sys::in_addr { s_addr: 0 }, // INADDR_ANY
            sin_zero: [0; 8],
        };

        // SAFETY: `addr` is valid for the bind() call; errors are checked.
        let rc = unsafe {
            sys::lwip_bind(
                fd.raw(),
                addr_of!(addr).cast(),
                size_of::<sys::sockaddr_in>() as _,
            )
        };
        if rc < 0 {
            return Err(SocketError::Bind(report("bind_server", fd.raw())));
        }

        // SAFETY: `fd` is a bound TCP socket.
        if unsafe { sys::lwip_listen(fd.raw(), i32::from(backlog)) } < 0 {
            return Err(SocketError::Listen(report("listen_server", fd.raw())));
        }

        Ok(LwipListener {
            fd,
            recv_timeout: self.recv_timeout,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Listener
// ───────────────────────────────────────────────────────────────

pub struct LwipListener {
    fd: Fd,
    recv_timeout: Option<Duration>,
}

impl Listener for LwipListener {
    type Peer = LwipPeer;

    fn accept(&mut self) -> Result<LwipPeer, SocketError> {
        // SAFETY: null address arguments are allowed; the peer address is
        // not needed.
        let raw = unsafe {
            sys::lwip_accept(self.fd.raw(), core::ptr::null_mut(), core::ptr::null_mut())
        };
        if raw < 0 {
            return Err(SocketError::Accept(report("accept_server", self.fd.raw())));
        }
        let peer = LwipPeer { fd: Fd(raw) };
        if let Some(timeout) = self.recv_timeout {
            peer.set_recv_timeout(timeout)?;
        }
        Ok(peer)
    }
}

// ───────────────────────────────────────────────────────────────
// Peer
// ───────────────────────────────────────────────────────────────

pub struct LwipPeer {
    fd: Fd,
}

impl LwipPeer {
    fn set_recv_timeout(&self, timeout: Duration) -> Result<(), SocketError> {
        let tv = sys::timeval {
            tv_sec: timeout.as_secs() as _,
            tv_usec: timeout.subsec_micros() as _,
        };
        // SAFETY: `tv` is a valid timeval for SO_RCVTIMEO.
        let rc = unsafe {
            sys::lwip_setsockopt(
                self.fd.raw(),
                sys::SOL_SOCKET as i32,
                sys::SO_RCVTIMEO as i32,
                addr_of!(tv).cast::<c_void>(),
                size_of::<sys::timeval>() as _,
            )
        };
        if rc < 0 {
            return Err(SocketError::Accept(report("set_rcvtimeo", self.fd.raw())));
        }
        Ok(())
    }
}

impl Peer for LwipPeer {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
        let n = unsafe {
            sys::lwip_recv(
                self.fd.raw(),
                buf.as_mut_ptr().cast::<c_void>(),
                buf.len(),
                0,
            )
        };
        match n {
            n if n > 0 => Ok(n as usize),
            0 if !buf.is_empty() => Err(SocketError::PeerClosed),
            0 => Ok(0),
            _ => {
                let code = errno();
                if is_timeout(code) {
                    return Ok(0);
                }
                Err(SocketError::Recv(report("recv_cmd", self.fd.raw())))
            }
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<usize, SocketError> {
        // SAFETY: `data` is valid for reads of `data.len()` bytes.
        let n = unsafe {
            sys::lwip_send(
                self.fd.raw(),
                data.as_ptr().cast::<c_void>(),
                data.len(),
                0,
            )
        };
        if n < 0 {
            let code = errno();
            if is_timeout(code) {
                return Ok(0);
            }
            return Err(SocketError::Send(report("send_data", self.fd.raw())));
        }
        Ok(n as usize)
    }
}
