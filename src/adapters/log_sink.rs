//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing link events to the ESP-IDF logger
//! (UART console in production). The link core does not log its own
//! lifecycle, so this sink is the one place those lines come from.
//! Per-command events go to `debug` so a 10 Hz controller does not flood
//! the console.

use log::{debug, info, warn};

use crate::app::events::BridgeEvent;
use crate::app::ports::EventSink;
use crate::app::stats::StatsSnapshot;
use crate::error::SocketError;

/// Adapter that logs every [`BridgeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BridgeEvent) {
        match event {
            BridgeEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            BridgeEvent::StateChanged { from, to } => {
                debug!("STATE | {:?} -> {:?}", from, to);
            }
            BridgeEvent::NetworkUp => {
                info!("NET   | up");
            }
            BridgeEvent::TornDown { from } => {
                info!("NET   | down, link torn down from {:?}", from);
            }
            BridgeEvent::Listening { port } => {
                info!("LINK  | listening on :{}", port);
            }
            BridgeEvent::ListenFailed(e) => {
                warn!("LINK  | listen failed: {}", e);
            }
            BridgeEvent::PeerAccepted => {
                info!("LINK  | controller connected");
            }
            BridgeEvent::AcceptFailed(e) => {
                warn!("LINK  | accept failed: {}", e);
            }
            BridgeEvent::PeerLost {
                state,
                error: SocketError::PeerClosed,
            } => {
                info!("LINK  | controller hung up in {:?}", state);
            }
            BridgeEvent::PeerLost { state, error } => {
                warn!("LINK  | transport error in {:?}: {}", state, error);
            }
            BridgeEvent::CommandApplied(cmd) => {
                debug!(
                    "CMD   | id={} mode=0x{:02x} L={:02x?} R={:02x?} leds={}/{}/{}",
                    cmd.id,
                    cmd.mode.0,
                    cmd.speed_left,
                    cmd.speed_right,
                    cmd.led0,
                    cmd.led2,
                    cmd.led4
                );
            }
            BridgeEvent::ReplySent(tag) => {
                debug!("REPLY | {:?}", tag);
            }
            BridgeEvent::CommandIgnored { mode } => {
                debug!("CMD   | mode=0x{:02x} requests nothing", mode);
            }
        }
    }
}

/// Render a counter snapshot as one JSON log line.
pub fn log_stats(snapshot: &StatsSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(json) => info!("STATS | {}", json),
        Err(e) => warn!("STATS | encode failed: {}", e),
    }
}
