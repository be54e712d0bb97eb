//! Unified error types for the bridge firmware.
//!
//! A single `Error` enum that every subsystem converts into. All variants
//! are `Copy` so they can travel through the link state machine and the
//! event sink without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A socket operation failed.
    Socket(SocketError),
    /// A frame or command had the wrong shape.
    Frame(FrameError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(e) => write!(f, "socket: {e}"),
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Socket errors
// ---------------------------------------------------------------------------

/// Failures of the TCP link. The `i32` payload is the stack's error code
/// (lwIP `SO_ERROR` on the device, raw OS error on the host, `-1` if none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketError {
    /// Socket creation failed.
    Create(i32),
    /// Binding to the service port failed.
    Bind(i32),
    /// `listen()` failed.
    Listen(i32),
    /// `accept()` failed.
    Accept(i32),
    /// A receive returned an error.
    Recv(i32),
    /// A send returned an error.
    Send(i32),
    /// The peer closed the connection.
    PeerClosed,
    /// Too many consecutive zero-byte transfers.
    Stalled,
    /// No peer connected.
    NotConnected,
}

impl SocketError {
    /// Whether this error ends the current peer session (as opposed to the
    /// listening socket).
    pub fn is_peer_loss(self) -> bool {
        matches!(
            self,
            Self::Recv(_) | Self::Send(_) | Self::PeerClosed | Self::Stalled | Self::NotConnected
        )
    }
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(rc) => write!(f, "socket create failed (err={rc})"),
            Self::Bind(rc) => write!(f, "bind failed (err={rc})"),
            Self::Listen(rc) => write!(f, "listen failed (err={rc})"),
            Self::Accept(rc) => write!(f, "accept failed (err={rc})"),
            Self::Recv(rc) => write!(f, "recv failed (err={rc})"),
            Self::Send(rc) => write!(f, "send failed (err={rc})"),
            Self::PeerClosed => write!(f, "peer closed connection"),
            Self::Stalled => write!(f, "peer stalled"),
            Self::NotConnected => write!(f, "no peer connected"),
        }
    }
}

impl From<SocketError> for Error {
    fn from(e: SocketError) -> Self {
        Self::Socket(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// A command buffer was not exactly the command length.
    CommandLength { got: usize },
    /// A published frame did not match the exchange's fixed size.
    FrameLength { expected: usize, got: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandLength { got } => write!(f, "command must be 9 bytes, got {got}"),
            Self::FrameLength { expected, got } => {
                write!(f, "frame must be {expected} bytes, got {got}")
            }
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON override could not be parsed.
    Malformed,
    /// A field failed range validation; the string names it.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config JSON"),
            Self::Invalid(field) => write!(f, "invalid value for {field}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
