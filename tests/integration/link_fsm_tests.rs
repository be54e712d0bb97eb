//! Link state machine flows against the scripted socket stack.

use epuck2_bridge::app::events::BridgeEvent;
use epuck2_bridge::app::ports::LinkCue;
use epuck2_bridge::config::BridgeConfig;
use epuck2_bridge::error::SocketError;
use epuck2_bridge::events::Flag;
use epuck2_bridge::fsm::LinkState;
use epuck2_bridge::protocol::{ActuatorCommand, ReplyTag};

use crate::mock_link::{
    command, pattern, Harness, PeerScript, Step, IMAGE_SEED, SENSOR_SEED,
};

const IMAGE_LEN: usize = 38_400;
const SENSOR_LEN: usize = 104;

fn image_reply() -> Vec<u8> {
    let mut out = vec![0x01];
    out.extend(pattern(IMAGE_LEN, IMAGE_SEED));
    out
}

fn sensor_reply() -> Vec<u8> {
    let mut out = vec![0x02];
    out.extend(pattern(SENSOR_LEN, SENSOR_SEED));
    out
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_shows_awaiting_peer_and_reports_initial_state() {
    let h = Harness::new();
    assert_eq!(h.state(), LinkState::WaitConnect);
    assert_eq!(*h.led.0.borrow(), vec![LinkCue::AwaitingPeer]);
    assert_eq!(
        h.events.0.borrow().first(),
        Some(&BridgeEvent::Started(LinkState::WaitConnect))
    );
}

#[test]
fn listens_on_service_port_with_backlog_of_one() {
    let mut h = Harness::new();
    h.open_session(PeerScript::default());
    assert_eq!(h.net.0.borrow().listens, vec![(1000, 1)]);
    assert!(h.events.contains(&BridgeEvent::Listening { port: 1000 }));
    assert!(h.events.contains(&BridgeEvent::PeerAccepted));
}

// ── Replies ───────────────────────────────────────────────────

#[test]
fn idle_mode_sends_lone_empty_tag_and_advances_sensors_once() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(1, 0x00)]));

    assert_eq!(h.step(), LinkState::SendEmpty);
    assert_eq!(h.step(), LinkState::RecvCmd);

    assert_eq!(h.net.sent(0), vec![0x04]);
    assert_eq!(h.sensor_acquires.get(), 1);
    assert_eq!(h.image_acquires.get(), 0);
    assert_eq!(
        *h.commands.0.borrow(),
        vec![ActuatorCommand::from_bytes(&command(1, 0x00))]
    );
}

#[test]
fn image_request_sends_tag_then_chunked_frame() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(2, 0x01)]));

    assert_eq!(h.step(), LinkState::SendImage);
    assert_eq!(h.step(), LinkState::RecvCmd);

    assert_eq!(h.net.sent(0), image_reply());
    let mut expected_writes = vec![1];
    expected_writes.extend([4092; 9]);
    expected_writes.push(1572);
    assert_eq!(h.net.peer(0).borrow().writes, expected_writes);

    assert_eq!(h.image_acquires.get(), 1);
    // Image without sensors still steps the telemetry producer.
    assert_eq!(h.sensor_acquires.get(), 1);
}

#[test]
fn image_send_drives_status_led() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(2, 0x01)]));
    h.led.0.borrow_mut().clear();

    h.steps(2);
    assert_eq!(
        *h.led.0.borrow(),
        vec![LinkCue::CapturingImage, LinkCue::SendingImage, LinkCue::Off]
    );
}

#[test]
fn sensor_led_is_lit_only_while_fetching_the_frame() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(4, 0x02)]));
    h.led.0.borrow_mut().clear();

    h.steps(2);
    assert_eq!(
        *h.led.0.borrow(),
        vec![LinkCue::ReadingSensors, LinkCue::Off]
    );
    assert_eq!(h.net.sent(0), sensor_reply());
}

#[test]
fn image_and_sensor_request_sends_image_first() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(3, 0x03)]));

    assert_eq!(h.step(), LinkState::SendImage);
    assert_eq!(h.step(), LinkState::SendSensors);
    assert_eq!(h.step(), LinkState::RecvCmd);

    let mut expected = image_reply();
    expected.extend(sensor_reply());
    assert_eq!(h.net.sent(0), expected);
    assert_eq!(h.sensor_acquires.get(), 1);
    assert_eq!(h.image_acquires.get(), 1);
}

#[test]
fn sensor_request_sends_exactly_one_sensor_reply() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(4, 0x02)]));

    assert_eq!(h.step(), LinkState::SendSensors);
    assert_eq!(h.step(), LinkState::RecvCmd);

    let sent = h.net.sent(0);
    assert_eq!(sent, sensor_reply());
    assert_eq!(sent.len(), 1 + SENSOR_LEN);
    assert_eq!(h.image_acquires.get(), 0);
    assert!(h.events.contains(&BridgeEvent::ReplySent(ReplyTag::Sensors)));
}

#[test]
fn mode_without_request_bits_sends_nothing() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(5, 0x80), command(6, 0x00)]));

    assert_eq!(h.step(), LinkState::RecvCmd);
    assert!(h.net.sent(0).is_empty());
    assert!(h.events.contains(&BridgeEvent::CommandIgnored { mode: 0x80 }));
    assert_eq!(h.stats.snapshot().ignored_commands, 1);

    // The actuator part of the command was still applied.
    assert_eq!(h.commands.0.borrow().len(), 1);

    assert_eq!(h.step(), LinkState::SendEmpty);
    assert_eq!(h.step(), LinkState::RecvCmd);
    assert_eq!(h.net.sent(0), vec![0x04]);
}

#[test]
fn back_to_back_commands_on_one_session() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[
        command(1, 0x00),
        command(2, 0x02),
        command(3, 0x00),
    ]));

    h.steps(6);
    assert_eq!(h.state(), LinkState::RecvCmd);

    let mut expected = vec![0x04];
    expected.extend(sensor_reply());
    expected.push(0x04);
    assert_eq!(h.net.sent(0), expected);
    // Two empty acks advance, the sensor reply consumes one frame.
    assert_eq!(h.sensor_acquires.get(), 3);
    assert_eq!(h.net.listen_count(), 1);
}

// ── Partial transfers ─────────────────────────────────────────

#[test]
fn command_split_across_reads_is_reassembled() {
    let raw = command(9, 0x00);
    let mut h = Harness::new();
    h.open_session(PeerScript {
        inbound: vec![
            Step::Data(raw[..1].to_vec()),
            Step::Idle,
            Step::Data(raw[1..4].to_vec()),
            Step::Idle,
            Step::Idle,
            Step::Data(raw[4..].to_vec()),
        ],
        ..PeerScript::default()
    });

    assert_eq!(h.step(), LinkState::SendEmpty);
    assert_eq!(
        *h.commands.0.borrow(),
        vec![ActuatorCommand::from_bytes(&raw)]
    );
    assert_eq!(h.net.peer(0).borrow().recv_calls, 6);
}

#[test]
fn short_writes_still_deliver_whole_image() {
    let mut h = Harness::new();
    h.open_session(PeerScript {
        send_limit: Some(1000),
        ..PeerScript::commands(&[command(2, 0x01)])
    });

    h.steps(2);
    assert_eq!(h.state(), LinkState::RecvCmd);
    assert_eq!(h.net.sent(0), image_reply());
    assert!(h.net.peer(0).borrow().writes.iter().all(|&n| n <= 1000));
}

// ── Peer loss ─────────────────────────────────────────────────

#[test]
fn recv_error_reaccepts_without_reopening_listener() {
    let mut h = Harness::new();
    h.open_session(PeerScript {
        inbound: vec![Step::Fail(SocketError::Recv(104))],
        ..PeerScript::default()
    });

    assert_eq!(h.step(), LinkState::Accept);
    assert!(h.net.peer(0).borrow().closed);
    assert_eq!(h.net.open_listeners(), 1);
    assert!(h.events.contains(&BridgeEvent::PeerLost {
        state: LinkState::RecvCmd,
        error: SocketError::Recv(104),
    }));

    h.net.connect(PeerScript::commands(&[command(1, 0x00)]));
    assert_eq!(h.step(), LinkState::RecvCmd);
    assert_eq!(h.step(), LinkState::SendEmpty);
    assert_eq!(h.step(), LinkState::RecvCmd);
    assert_eq!(h.net.sent(1), vec![0x04]);

    assert_eq!(h.net.listen_count(), 1);
    assert_eq!(h.stats.snapshot().accepts, 2);
    assert_eq!(h.stats.snapshot().peer_losses, 1);
}

#[test]
fn controller_hangup_is_peer_loss() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(1, 0x00)]));
    h.steps(2);

    // Script exhausted: the controller closed its end.
    assert_eq!(h.step(), LinkState::Accept);
    assert!(h.events.contains(&BridgeEvent::PeerLost {
        state: LinkState::RecvCmd,
        error: SocketError::PeerClosed,
    }));
    assert!(h.service.context().last_command.is_none());
}

#[test]
fn send_failure_mid_image_reaccepts() {
    let mut h = Harness::new();
    h.open_session(PeerScript {
        fail_after: Some(5000),
        ..PeerScript::commands(&[command(2, 0x01)])
    });

    assert_eq!(h.step(), LinkState::SendImage);
    assert_eq!(h.step(), LinkState::Accept);
    assert_eq!(h.net.sent(0).len(), 5000);
    assert_eq!(h.sensor_acquires.get(), 0);
    assert_eq!(h.stats.snapshot().image_replies, 0);
    assert!(h.events.contains(&BridgeEvent::PeerLost {
        state: LinkState::SendImage,
        error: SocketError::Send(32),
    }));
    assert_eq!(h.net.open_listeners(), 1);
}

#[test]
fn send_failure_in_sensor_reply_reaccepts() {
    let mut h = Harness::new();
    h.open_session(PeerScript {
        fail_after: Some(40),
        ..PeerScript::commands(&[command(4, 0x02)])
    });

    assert_eq!(h.step(), LinkState::SendSensors);
    assert_eq!(h.step(), LinkState::Accept);
    assert_eq!(h.net.sent(0).len(), 40);
    assert!(h.net.peer(0).borrow().closed);
    assert_eq!(h.net.open_listeners(), 1);
    assert_eq!(h.stats.snapshot().sensor_replies, 0);
    assert!(h.events.contains(&BridgeEvent::PeerLost {
        state: LinkState::SendSensors,
        error: SocketError::Send(32),
    }));
}

#[test]
fn send_failure_in_empty_ack_reaccepts() {
    let mut h = Harness::new();
    h.open_session(PeerScript {
        fail_after: Some(0),
        ..PeerScript::commands(&[command(1, 0x00)])
    });

    assert_eq!(h.step(), LinkState::SendEmpty);
    assert_eq!(h.step(), LinkState::Accept);
    assert!(h.net.sent(0).is_empty());
    assert_eq!(h.net.open_listeners(), 1);
    // The ack never went out, so the telemetry producer was not advanced.
    assert_eq!(h.sensor_acquires.get(), 0);
    assert_eq!(h.stats.snapshot().empty_replies, 0);
    assert!(h.events.contains(&BridgeEvent::PeerLost {
        state: LinkState::SendEmpty,
        error: SocketError::Send(32),
    }));

    h.net.connect(PeerScript::commands(&[command(2, 0x00)]));
    assert_eq!(h.step(), LinkState::RecvCmd);
    assert_eq!(h.net.listen_count(), 1);
}

#[test]
fn silent_peer_is_abandoned_after_idle_budget() {
    let config = BridgeConfig {
        max_idle_reads: 3,
        ..BridgeConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.open_session(PeerScript {
        inbound: vec![Step::Idle, Step::Idle, Step::Idle, Step::Data(command(1, 0).to_vec())],
        ..PeerScript::default()
    });

    assert_eq!(h.step(), LinkState::Accept);
    assert!(h.events.contains(&BridgeEvent::PeerLost {
        state: LinkState::RecvCmd,
        error: SocketError::Stalled,
    }));
    assert!(h.commands.0.borrow().is_empty());
}

// ── Listener failures ─────────────────────────────────────────

#[test]
fn accept_failure_reopens_listener() {
    let mut h = Harness::new();
    h.net.fail_next_accept(SocketError::Accept(23));

    assert_eq!(h.step(), LinkState::Listen);
    assert_eq!(h.step(), LinkState::Accept);
    assert_eq!(h.step(), LinkState::Listen);
    assert_eq!(h.net.open_listeners(), 0);
    assert!(h.events.contains(&BridgeEvent::AcceptFailed(SocketError::Accept(23))));

    h.net.connect(PeerScript::default());
    assert_eq!(h.step(), LinkState::Accept);
    assert_eq!(h.step(), LinkState::RecvCmd);
    assert_eq!(h.net.listen_count(), 2);
    assert_eq!(h.stats.snapshot().accept_failures, 1);
}

#[test]
fn listen_failure_retries_in_place() {
    let mut h = Harness::new();
    h.net.fail_next_listen(SocketError::Bind(112));

    assert_eq!(h.step(), LinkState::Listen);
    assert_eq!(h.step(), LinkState::Listen);
    assert!(h.events.contains(&BridgeEvent::ListenFailed(SocketError::Bind(112))));
    assert_eq!(h.stats.snapshot().listen_failures, 1);

    assert_eq!(h.step(), LinkState::Accept);
    assert_eq!(h.net.listen_count(), 2);
}

#[test]
fn listen_retries_are_rate_limited() {
    let config = BridgeConfig {
        listen_retries_per_sec: 1,
        ..BridgeConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.net.fail_next_listen(SocketError::Bind(112));
    h.net.fail_next_listen(SocketError::Bind(112));

    h.steps(4);
    assert_eq!(h.state(), LinkState::Listen);
    assert_eq!(h.net.listen_count(), 1);
}

// ── Network loss ──────────────────────────────────────────────

#[test]
fn disconnect_in_session_closes_everything() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(1, 0x00)]));

    h.flags.raise_disconnected();
    assert_eq!(h.step(), LinkState::WaitConnect);

    assert!(h.net.peer(0).borrow().closed);
    assert_eq!(h.net.open_listeners(), 0);
    assert!(h.commands.0.borrow().is_empty());
    assert!(h.events.contains(&BridgeEvent::TornDown {
        from: LinkState::RecvCmd
    }));
    assert_eq!(h.stats.snapshot().teardowns, 1);
}

#[test]
fn disconnect_wins_over_pending_reply() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(2, 0x01)]));
    assert_eq!(h.step(), LinkState::SendImage);

    h.flags.raise_disconnected();
    assert_eq!(h.step(), LinkState::WaitConnect);
    assert!(h.net.sent(0).is_empty());
    assert_eq!(h.image_acquires.get(), 0);
    // Leaving SendImage turns the LED off.
    assert!(h.led.0.borrow().contains(&LinkCue::Off));
}

#[test]
fn disconnect_before_bind_still_returns_to_wait_connect() {
    let mut h = Harness::new();
    assert_eq!(h.step(), LinkState::Listen);

    h.flags.raise_disconnected();
    assert_eq!(h.step(), LinkState::WaitConnect);
    assert_eq!(h.net.listen_count(), 0);
    assert!(h.events.contains(&BridgeEvent::TornDown {
        from: LinkState::Listen
    }));
}

#[test]
fn reconnect_after_disconnect_listens_again() {
    let mut h = Harness::new();
    h.open_session(PeerScript::default());

    h.flags.raise_disconnected();
    assert_eq!(h.step(), LinkState::WaitConnect);

    h.flags.raise_connected();
    h.net.connect(PeerScript::commands(&[command(7, 0x02)]));
    assert_eq!(h.step(), LinkState::Listen);
    assert_eq!(h.step(), LinkState::Accept);
    assert_eq!(h.step(), LinkState::RecvCmd);
    assert_eq!(h.step(), LinkState::SendSensors);
    assert_eq!(h.step(), LinkState::RecvCmd);

    assert_eq!(h.net.listen_count(), 2);
    assert_eq!(h.net.open_listeners(), 1);
    assert_eq!(h.net.sent(1), sensor_reply());
}

#[test]
fn disconnect_while_accepting_closes_listener() {
    let mut h = Harness::new();
    assert_eq!(h.step(), LinkState::Listen);
    assert_eq!(h.step(), LinkState::Accept);
    h.net.connect(PeerScript::default());

    h.flags.raise_disconnected();
    assert_eq!(h.step(), LinkState::WaitConnect);
    assert_eq!(h.net.open_listeners(), 0);
    // The queued controller was never accepted.
    assert!(h.net.0.borrow().peers.is_empty());
    assert!(h.events.contains(&BridgeEvent::TornDown {
        from: LinkState::Accept
    }));
}

#[test]
fn loss_and_reassociation_between_passes_still_tears_down() {
    let mut h = Harness::new();
    h.open_session(PeerScript::commands(&[command(1, 0x00)]));

    // The owner sees the station drop and come back before the link task
    // runs again.
    h.flags.clear(Flag::Connected);
    h.flags.raise_disconnected();
    h.flags.clear(Flag::Disconnected);
    h.flags.raise_connected();

    assert_eq!(h.step(), LinkState::WaitConnect);
    assert!(h.net.peer(0).borrow().closed);
    assert_eq!(h.net.open_listeners(), 0);
    assert_eq!(h.stats.snapshot().teardowns, 1);

    h.net.connect(PeerScript::default());
    assert_eq!(h.step(), LinkState::Listen);
    assert_eq!(h.step(), LinkState::Accept);
    assert_eq!(h.step(), LinkState::RecvCmd);
    assert_eq!(h.net.listen_count(), 2);
}

#[test]
fn one_loss_tears_down_once_while_flag_stays_raised() {
    let mut h = Harness::new();
    h.open_session(PeerScript::default());

    h.flags.raise_disconnected();
    assert_eq!(h.step(), LinkState::WaitConnect);

    // Connected was never cleared, so the link rebinds even though the
    // Disconnected bit is still up.
    h.net.connect(PeerScript::commands(&[command(3, 0x00)]));
    assert_eq!(h.step(), LinkState::Listen);
    assert_eq!(h.step(), LinkState::Accept);
    assert_eq!(h.step(), LinkState::RecvCmd);
    assert_eq!(h.step(), LinkState::SendEmpty);
    assert!(h.flags.is_set(Flag::Disconnected));
    assert_eq!(h.stats.snapshot().teardowns, 1);
    assert_eq!(h.net.open_listeners(), 1);
}
