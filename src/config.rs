//! Bridge configuration parameters.
//!
//! Every tunable of the link lives here. Defaults reproduce the wire
//! contract the remote controller expects (port 1000, 38400-byte image in
//! 4092-byte chunks, 104-byte sensor frame). A partial JSON document can
//! override any field; missing fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::protocol;

/// Core bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    // --- Socket ---
    /// TCP service port the controller connects to.
    pub tcp_port: u16,
    /// Listen backlog. The protocol serves exactly one peer.
    pub listen_backlog: u8,

    // --- Frames ---
    /// Size of one camera image in bytes.
    pub image_frame_size: usize,
    /// Maximum bytes handed to the transport per image write.
    pub image_chunk_size: usize,
    /// Size of one sensor telemetry frame in bytes.
    pub sensor_frame_size: usize,

    // --- Retry policy ---
    /// Socket receive timeout in milliseconds. 0 blocks indefinitely.
    pub recv_timeout_ms: u32,
    /// Consecutive zero-byte transfers tolerated before the peer is
    /// considered stalled.
    pub max_idle_reads: u32,
    /// Listen/bind attempts allowed per second while the stack is failing.
    pub listen_retries_per_sec: u32,

    // --- Timing ---
    /// Voluntary yield after each state-machine step (milliseconds, > 0).
    pub loop_yield_ms: u32,
    /// WiFi association poll interval of the main loop (milliseconds).
    pub link_poll_ms: u32,
    /// Hold time that turns a button press into a long press (milliseconds).
    pub button_long_press_ms: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // Socket
            tcp_port: protocol::SERVICE_PORT,
            listen_backlog: 1,

            // Frames
            image_frame_size: protocol::IMAGE_FRAME_SIZE,
            image_chunk_size: protocol::IMAGE_CHUNK_SIZE,
            sensor_frame_size: protocol::SENSOR_FRAME_SIZE,

            // Retry policy
            recv_timeout_ms: 0,
            max_idle_reads: 1000,
            listen_retries_per_sec: 5,

            // Timing
            loop_yield_ms: 10,
            link_poll_ms: 100,
            button_long_press_ms: 3000,
        }
    }
}

impl BridgeConfig {
    /// Parse a (possibly partial) JSON override and validate the result.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the link cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_backlog == 0 {
            return Err(ConfigError::Invalid("listen_backlog"));
        }
        if self.image_frame_size == 0 {
            return Err(ConfigError::Invalid("image_frame_size"));
        }
        if self.image_chunk_size == 0 {
            return Err(ConfigError::Invalid("image_chunk_size"));
        }
        if self.sensor_frame_size == 0 {
            return Err(ConfigError::Invalid("sensor_frame_size"));
        }
        if self.max_idle_reads == 0 {
            return Err(ConfigError::Invalid("max_idle_reads"));
        }
        if self.listen_retries_per_sec == 0 {
            return Err(ConfigError::Invalid("listen_retries_per_sec"));
        }
        if self.loop_yield_ms == 0 {
            return Err(ConfigError::Invalid("loop_yield_ms"));
        }
        Ok(())
    }

    /// Receive timeout as a `Duration`, `None` when reads block forever.
    pub fn recv_timeout(&self) -> Option<core::time::Duration> {
        (self.recv_timeout_ms > 0)
            .then(|| core::time::Duration::from_millis(u64::from(self.recv_timeout_ms)))
    }
}
