//! Scripted socket stack and recording adapters for link tests.
//!
//! Every mock shares its state through `Rc<RefCell<..>>` handles so a test
//! can keep inspecting sockets and recordings after the adapters have been
//! moved into the service.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use epuck2_bridge::app::events::BridgeEvent;
use epuck2_bridge::app::ports::{
    ActuatorSink, EventSink, FrameSource, LinkCue, LinkIndicator, Wiring,
};
use epuck2_bridge::app::service::BridgeService;
use epuck2_bridge::app::stats::LinkStats;
use epuck2_bridge::config::BridgeConfig;
use epuck2_bridge::error::SocketError;
use epuck2_bridge::events::ConnectionFlags;
use epuck2_bridge::fsm::LinkState;
use epuck2_bridge::protocol::ActuatorCommand;
use epuck2_bridge::transport::{Listener, Peer, SocketStack};

// ── Peer scripts ──────────────────────────────────────────────

/// One inbound event on a scripted peer.
#[derive(Debug, Clone)]
pub enum Step {
    /// Bytes the controller sends. Delivered across as many `recv` calls as
    /// the caller's buffer size requires.
    Data(Vec<u8>),
    /// A zero-byte read (timeout).
    Idle,
    /// The next `recv` fails.
    Fail(SocketError),
}

/// What a scripted peer does, inbound and outbound.
#[derive(Debug, Clone, Default)]
pub struct PeerScript {
    pub inbound: Vec<Step>,
    /// Cap on bytes taken per `send` call.
    pub send_limit: Option<usize>,
    /// Total bytes accepted before `send` starts failing.
    pub fail_after: Option<usize>,
}

impl PeerScript {
    pub fn commands(cmds: &[[u8; 9]]) -> Self {
        Self {
            inbound: cmds.iter().map(|c| Step::Data(c.to_vec())).collect(),
            ..Self::default()
        }
    }
}

/// Everything the bridge did to one peer socket.
#[derive(Debug, Default)]
pub struct PeerLog {
    pub sent: Vec<u8>,
    /// Size of every successful `send` call, in order.
    pub writes: Vec<usize>,
    pub recv_calls: usize,
    pub closed: bool,
}

pub struct MockPeer {
    inbound: VecDeque<Step>,
    send_limit: Option<usize>,
    fail_after: Option<usize>,
    log: Rc<RefCell<PeerLog>>,
}

impl Peer for MockPeer {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        self.log.borrow_mut().recv_calls += 1;
        match self.inbound.pop_front() {
            None => Err(SocketError::PeerClosed),
            Some(Step::Idle) => Ok(0),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    let rest = bytes.split_off(n);
                    self.inbound.push_front(Step::Data(rest));
                }
                Ok(n)
            }
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<usize, SocketError> {
        let mut log = self.log.borrow_mut();
        let mut n = self.send_limit.map_or(data.len(), |cap| data.len().min(cap));
        if let Some(limit) = self.fail_after {
            let room = limit.saturating_sub(log.sent.len());
            if room == 0 {
                return Err(SocketError::Send(32));
            }
            n = n.min(room);
        }
        log.sent.extend_from_slice(&data[..n]);
        log.writes.push(n);
        Ok(n)
    }
}

impl Drop for MockPeer {
    fn drop(&mut self) {
        self.log.borrow_mut().closed = true;
    }
}

// ── Stack ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct NetState {
    /// Queued `listen` outcomes; empty means success.
    pub listen_results: VecDeque<Result<(), SocketError>>,
    /// Queued `accept` outcomes; empty means `Accept(11)`.
    pub pending: VecDeque<Result<PeerScript, SocketError>>,
    pub listens: Vec<(u16, u8)>,
    pub open_listeners: usize,
    pub peers: Vec<Rc<RefCell<PeerLog>>>,
}

/// Handle to the shared network state.
#[derive(Clone, Default)]
pub struct MockNet(pub Rc<RefCell<NetState>>);

impl MockNet {
    pub fn connect(&self, script: PeerScript) {
        self.0.borrow_mut().pending.push_back(Ok(script));
    }

    pub fn fail_next_accept(&self, e: SocketError) {
        self.0.borrow_mut().pending.push_back(Err(e));
    }

    pub fn fail_next_listen(&self, e: SocketError) {
        self.0.borrow_mut().listen_results.push_back(Err(e));
    }

    pub fn listen_count(&self) -> usize {
        self.0.borrow().listens.len()
    }

    pub fn open_listeners(&self) -> usize {
        self.0.borrow().open_listeners
    }

    pub fn peer(&self, idx: usize) -> Rc<RefCell<PeerLog>> {
        Rc::clone(&self.0.borrow().peers[idx])
    }

    pub fn sent(&self, idx: usize) -> Vec<u8> {
        self.peer(idx).borrow().sent.clone()
    }
}

pub struct MockStack {
    net: MockNet,
}

pub struct MockListener {
    net: MockNet,
}

impl SocketStack for MockStack {
    type Peer = MockPeer;
    type Listener = MockListener;

    fn listen(&mut self, port: u16, backlog: u8) -> Result<MockListener, SocketError> {
        let mut state = self.net.0.borrow_mut();
        state.listens.push((port, backlog));
        state.listen_results.pop_front().unwrap_or(Ok(()))?;
        state.open_listeners += 1;
        Ok(MockListener {
            net: self.net.clone(),
        })
    }
}

impl Listener for MockListener {
    type Peer = MockPeer;

    fn accept(&mut self) -> Result<MockPeer, SocketError> {
        let mut state = self.net.0.borrow_mut();
        let script = state
            .pending
            .pop_front()
            .unwrap_or(Err(SocketError::Accept(11)))?;
        let log = Rc::new(RefCell::new(PeerLog::default()));
        state.peers.push(Rc::clone(&log));
        Ok(MockPeer {
            inbound: script.inbound.into(),
            send_limit: script.send_limit,
            fail_after: script.fail_after,
            log,
        })
    }
}

impl Drop for MockListener {
    fn drop(&mut self) {
        self.net.0.borrow_mut().open_listeners -= 1;
    }
}

// ── Frames, actuators, LED, events ───────────────────────────

/// Frame source that counts every acquisition ("advance").
pub struct PatternFrames {
    data: Vec<u8>,
    pub acquires: Rc<Cell<u32>>,
}

impl PatternFrames {
    pub fn new(len: usize, seed: u8) -> Self {
        Self {
            data: pattern(len, seed),
            acquires: Rc::new(Cell::new(0)),
        }
    }
}

impl FrameSource for PatternFrames {
    fn frame_len(&self) -> usize {
        self.data.len()
    }

    fn acquire(&mut self) -> &[u8] {
        self.acquires.set(self.acquires.get() + 1);
        &self.data
    }
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i % 251) as u8 ^ seed)
        .collect()
}

#[derive(Clone, Default)]
pub struct RecordingActuators(pub Rc<RefCell<Vec<ActuatorCommand>>>);

impl ActuatorSink for RecordingActuators {
    fn apply(&mut self, cmd: &ActuatorCommand) {
        self.0.borrow_mut().push(*cmd);
    }
}

#[derive(Clone, Default)]
pub struct RecordingLed(pub Rc<RefCell<Vec<LinkCue>>>);

impl LinkIndicator for RecordingLed {
    fn show(&mut self, cue: LinkCue) {
        self.0.borrow_mut().push(cue);
    }
}

#[derive(Clone, Default)]
pub struct RecordingEvents(pub Rc<RefCell<Vec<BridgeEvent>>>);

impl RecordingEvents {
    pub fn contains(&self, event: &BridgeEvent) -> bool {
        self.0.borrow().contains(event)
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl EventSink for RecordingEvents {
    fn emit(&mut self, event: &BridgeEvent) {
        self.0.borrow_mut().push(*event);
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type MockPorts = Wiring<
    MockStack,
    PatternFrames,
    PatternFrames,
    RecordingActuators,
    RecordingLed,
    RecordingEvents,
>;

pub const IMAGE_SEED: u8 = 0x5A;
pub const SENSOR_SEED: u8 = 0xC3;

/// A started service plus handles to everything it touches.
pub struct Harness {
    pub service: BridgeService<MockPorts>,
    pub flags: Arc<ConnectionFlags>,
    pub stats: Arc<LinkStats>,
    pub net: MockNet,
    pub image_acquires: Rc<Cell<u32>>,
    pub sensor_acquires: Rc<Cell<u32>>,
    pub commands: RecordingActuators,
    pub led: RecordingLed,
    pub events: RecordingEvents,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// Build and start the service. The network starts out associated so the
    /// first step does not block.
    pub fn with_config(config: BridgeConfig) -> Self {
        let flags = Arc::new(ConnectionFlags::new());
        flags.raise_connected();
        let stats = Arc::new(LinkStats::new());
        let net = MockNet::default();
        let image = PatternFrames::new(config.image_frame_size, IMAGE_SEED);
        let sensors = PatternFrames::new(config.sensor_frame_size, SENSOR_SEED);
        let image_acquires = Rc::clone(&image.acquires);
        let sensor_acquires = Rc::clone(&sensors.acquires);
        let commands = RecordingActuators::default();
        let led = RecordingLed::default();
        let events = RecordingEvents::default();

        let wiring = Wiring {
            stack: MockStack { net: net.clone() },
            image,
            sensors,
            actuators: commands.clone(),
            indicator: led.clone(),
            events: events.clone(),
        };
        let mut service =
            BridgeService::new(config, Arc::clone(&flags), Arc::clone(&stats), wiring);
        service.start();

        Self {
            service,
            flags,
            stats,
            net,
            image_acquires,
            sensor_acquires,
            commands,
            led,
            events,
        }
    }

    pub fn state(&self) -> LinkState {
        self.service.state()
    }

    pub fn step(&mut self) -> LinkState {
        self.service.step();
        self.service.state()
    }

    pub fn steps(&mut self, n: usize) -> LinkState {
        for _ in 0..n {
            self.service.step();
        }
        self.service.state()
    }

    /// Queue `script` as the next controller and drive the machine until it
    /// is waiting for that controller's first command.
    pub fn open_session(&mut self, script: PeerScript) {
        self.net.connect(script);
        assert_eq!(self.step(), LinkState::Listen);
        assert_eq!(self.step(), LinkState::Accept);
        assert_eq!(self.step(), LinkState::RecvCmd);
    }
}

/// A 9-byte command with the given id and mode and recognisable payload.
pub fn command(id: u8, mode: u8) -> [u8; 9] {
    [id, mode, 0x10, 0x01, 0xF0, 0xFF, 1, 0, 1]
}
