//! Concrete link state handlers and table builder.
//!
//! ```text
//!  WAIT_CONNECT ──[Connected]──▶ LISTEN ──[bound]──▶ ACCEPT ──[peer]──▶ RECV_CMD
//!                                 ▲  │                  │
//!                                 │  └─[bind failed]─▶ (retry)
//!                                 └──[accept failed]────┘
//!
//!  RECV_CMD ──[mode==0]──▶ SEND_EMPTY ─────────────────────────────▶ RECV_CMD
//!           ──[bit0]─────▶ SEND_IMAGE ──[bit1]──▶ SEND_SENSORS ─────▶ RECV_CMD
//!           ──[bit1]─────▶ SEND_SENSORS ───────────────────────────▶ RECV_CMD
//!
//!  RECV_CMD / SEND_* ──[socket error]──▶ ACCEPT      (listener kept)
//!  Any state ──[Disconnected]──▶ WAIT_CONNECT        (checked by the service)
//! ```
//!
//! Peer loss anywhere in a session drops only the peer socket: the
//! listener survives and the next step accepts a new controller.

use log::info;

use super::context::{LinkContext, PeerOf};
use super::{LinkState, StateDescriptor};
use crate::app::events::BridgeEvent;
use crate::app::ports::{ActuatorSink, BridgePorts, FrameSource, LinkCue, LinkIndicator};
use crate::app::stats::Counter;
use crate::error::SocketError;
use crate::protocol::{chunk_ranges, ActuatorCommand, ReplyPlan, ReplyTag, COMMAND_LEN};
use crate::transport::{recv_exact, send_all, Listener, RecvPolicy, SocketStack};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table. Called once at startup.
pub fn build_state_table<P: BridgePorts>() -> [StateDescriptor<P>; LinkState::COUNT] {
    [
        StateDescriptor {
            id: LinkState::WaitConnect,
            name: "WaitConnect",
            on_enter: Some(wait_connect_enter::<P>),
            on_exit: None,
            on_update: wait_connect_update::<P>,
        },
        StateDescriptor {
            id: LinkState::Listen,
            name: "Listen",
            on_enter: None,
            on_exit: None,
            on_update: listen_update::<P>,
        },
        StateDescriptor {
            id: LinkState::Accept,
            name: "Accept",
            on_enter: Some(accept_enter::<P>),
            on_exit: None,
            on_update: accept_update::<P>,
        },
        StateDescriptor {
            id: LinkState::RecvCmd,
            name: "RecvCmd",
            on_enter: None,
            on_exit: None,
            on_update: recv_cmd_update::<P>,
        },
        StateDescriptor {
            id: LinkState::SendImage,
            name: "SendImage",
            on_enter: Some(send_image_enter::<P>),
            on_exit: Some(indicator_off::<P>),
            on_update: send_image_update::<P>,
        },
        StateDescriptor {
            id: LinkState::SendSensors,
            name: "SendSensors",
            on_enter: Some(send_sensors_enter::<P>),
            on_exit: None,
            on_update: send_sensors_update::<P>,
        },
        StateDescriptor {
            id: LinkState::SendEmpty,
            name: "SendEmpty",
            on_enter: None,
            on_exit: None,
            on_update: send_empty_update::<P>,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAIT_CONNECT
// ═══════════════════════════════════════════════════════════════════════════

fn wait_connect_enter<P: BridgePorts>(ctx: &mut LinkContext<P>) {
    ctx.ports.indicator().show(LinkCue::AwaitingPeer);
    info!("link: waiting for network");
}

fn wait_connect_update<P: BridgePorts>(ctx: &mut LinkContext<P>) -> Option<LinkState> {
    ctx.flags.wait_connected();
    ctx.emit(BridgeEvent::NetworkUp);
    Some(LinkState::Listen)
}

// ═══════════════════════════════════════════════════════════════════════════
//  LISTEN
// ═══════════════════════════════════════════════════════════════════════════

fn listen_update<P: BridgePorts>(ctx: &mut LinkContext<P>) -> Option<LinkState> {
    if !ctx.may_listen() {
        return None;
    }

    let port = ctx.config.tcp_port;
    let backlog = ctx.config.listen_backlog;
    match ctx.ports.stack().listen(port, backlog) {
        Ok(listener) => {
            ctx.listener = Some(listener);
            ctx.emit(BridgeEvent::Listening { port });
            Some(LinkState::Accept)
        }
        Err(e) => {
            ctx.count(Counter::ListenFailure);
            ctx.emit(BridgeEvent::ListenFailed(e));
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACCEPT
// ═══════════════════════════════════════════════════════════════════════════

fn accept_enter<P: BridgePorts>(ctx: &mut LinkContext<P>) {
    ctx.ports.indicator().show(LinkCue::AwaitingPeer);
}

fn accept_update<P: BridgePorts>(ctx: &mut LinkContext<P>) -> Option<LinkState> {
    let Some(listener) = ctx.listener.as_mut() else {
        return Some(LinkState::Listen);
    };

    match listener.accept() {
        Ok(peer) => {
            ctx.peer = Some(peer);
            ctx.count(Counter::Accept);
            ctx.emit(BridgeEvent::PeerAccepted);
            Some(LinkState::RecvCmd)
        }
        Err(e) => {
            ctx.listener = None;
            ctx.count(Counter::AcceptFailure);
            ctx.emit(BridgeEvent::AcceptFailed(e));
            Some(LinkState::Listen)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RECV_CMD
// ═══════════════════════════════════════════════════════════════════════════

fn recv_cmd_update<P: BridgePorts>(ctx: &mut LinkContext<P>) -> Option<LinkState> {
    let Some(peer) = ctx.peer.as_mut() else {
        return Some(LinkState::Accept);
    };

    let mut raw = [0u8; COMMAND_LEN];
    if let Err(e) = recv_exact(peer, &mut raw, ctx.policy) {
        return Some(peer_lost(ctx, LinkState::RecvCmd, e));
    }

    let cmd = ActuatorCommand::from_bytes(&raw);
    ctx.ports.actuators().apply(&cmd);
    ctx.last_command = Some(cmd);
    ctx.plan = ReplyPlan::for_mode(cmd.mode);
    ctx.count(Counter::Command);
    ctx.emit(BridgeEvent::CommandApplied(cmd));

    match ctx.plan {
        ReplyPlan::Empty => Some(LinkState::SendEmpty),
        ReplyPlan::Image { .. } => Some(LinkState::SendImage),
        ReplyPlan::Sensors => Some(LinkState::SendSensors),
        ReplyPlan::Silent => {
            ctx.count(Counter::IgnoredCommand);
            ctx.emit(BridgeEvent::CommandIgnored { mode: cmd.mode.0 });
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  SEND_IMAGE
// ═══════════════════════════════════════════════════════════════════════════

fn send_image_enter<P: BridgePorts>(ctx: &mut LinkContext<P>) {
    ctx.ports.indicator().show(LinkCue::CapturingImage);
}

fn send_image_update<P: BridgePorts>(ctx: &mut LinkContext<P>) -> Option<LinkState> {
    let chunk = ctx.config.image_chunk_size;
    let policy = ctx.policy;
    let Some(peer) = ctx.peer.as_mut() else {
        return Some(LinkState::Accept);
    };

    let (image, _, led) = ctx.ports.frames_and_indicator();
    let frame = image.acquire();
    led.show(LinkCue::SendingImage);
    if let Err(e) = write_image::<P>(peer, frame, chunk, policy) {
        return Some(peer_lost(ctx, LinkState::SendImage, e));
    }

    ctx.count(Counter::ImageReply);
    ctx.emit(BridgeEvent::ReplySent(ReplyTag::Image));

    if let ReplyPlan::Image { then_sensors: true } = ctx.plan {
        Some(LinkState::SendSensors)
    } else {
        advance_sensors(ctx);
        Some(LinkState::RecvCmd)
    }
}

fn write_image<P: BridgePorts>(
    peer: &mut PeerOf<P>,
    frame: &[u8],
    chunk: usize,
    policy: RecvPolicy,
) -> Result<(), SocketError> {
    send_all(peer, &[ReplyTag::Image.byte()], policy)?;
    for range in chunk_ranges(frame.len(), chunk) {
        send_all(peer, &frame[range], policy)?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  SEND_SENSORS
// ═══════════════════════════════════════════════════════════════════════════

fn send_sensors_enter<P: BridgePorts>(ctx: &mut LinkContext<P>) {
    ctx.ports.indicator().show(LinkCue::ReadingSensors);
}

fn send_sensors_update<P: BridgePorts>(ctx: &mut LinkContext<P>) -> Option<LinkState> {
    let policy = ctx.policy;
    let Some(peer) = ctx.peer.as_mut() else {
        return Some(LinkState::Accept);
    };

    let (_, sensors, led) = ctx.ports.frames_and_indicator();
    let frame = sensors.acquire();
    led.show(LinkCue::Off);
    let sent = send_all(peer, &[ReplyTag::Sensors.byte()], policy)
        .and_then(|()| send_all(peer, frame, policy));
    if let Err(e) = sent {
        return Some(peer_lost(ctx, LinkState::SendSensors, e));
    }

    ctx.count(Counter::SensorReply);
    ctx.emit(BridgeEvent::ReplySent(ReplyTag::Sensors));
    Some(LinkState::RecvCmd)
}

// ═══════════════════════════════════════════════════════════════════════════
//  SEND_EMPTY
// ═══════════════════════════════════════════════════════════════════════════

fn send_empty_update<P: BridgePorts>(ctx: &mut LinkContext<P>) -> Option<LinkState> {
    let policy = ctx.policy;
    let Some(peer) = ctx.peer.as_mut() else {
        return Some(LinkState::Accept);
    };

    if let Err(e) = send_all(peer, &[ReplyTag::Empty.byte()], policy) {
        return Some(peer_lost(ctx, LinkState::SendEmpty, e));
    }

    advance_sensors(ctx);
    ctx.count(Counter::EmptyReply);
    ctx.emit(BridgeEvent::ReplySent(ReplyTag::Empty));
    Some(LinkState::RecvCmd)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared helpers
// ═══════════════════════════════════════════════════════════════════════════

fn indicator_off<P: BridgePorts>(ctx: &mut LinkContext<P>) {
    ctx.ports.indicator().show(LinkCue::Off);
}

/// Step the telemetry producer without sending its frame.
fn advance_sensors<P: BridgePorts>(ctx: &mut LinkContext<P>) {
    let _ = ctx.ports.sensors().acquire();
}

/// Abandon the current peer, keep the listener, and go back to accepting.
fn peer_lost<P: BridgePorts>(
    ctx: &mut LinkContext<P>,
    state: LinkState,
    error: SocketError,
) -> LinkState {
    ctx.drop_peer();
    ctx.count(Counter::PeerLoss);
    ctx.emit(BridgeEvent::PeerLost { state, error });
    LinkState::Accept
}
