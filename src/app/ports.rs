//! Port traits: the hexagonal boundary between the link core and the robot.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BridgeService (link state machine)
//! ```
//!
//! Camera and UART producers sit behind [`FrameSource`], the main MCU link
//! behind [`ActuatorSink`], the RGB LED behind [`LinkIndicator`] and
//! structured logging behind [`EventSink`]. [`BridgePorts`] bundles one
//! concrete choice of each so the state machine stays generic without
//! six type parameters on every handler.

use crate::protocol::ActuatorCommand;
use crate::transport::SocketStack;

use super::events::BridgeEvent;

// ───────────────────────────────────────────────────────────────
// Frame providers (driven adapter: peripherals → link)
// ───────────────────────────────────────────────────────────────

/// A fixed-size frame producer.
///
/// `acquire` returns a read-only view of the latest frame. The borrow ends
/// before the next call, so the view lives at most as long as one send.
/// Each call also counts as "advancing" the producer.
pub trait FrameSource {
    /// Size of every frame this source yields.
    fn frame_len(&self) -> usize;

    fn acquire(&mut self) -> &[u8];
}

// ───────────────────────────────────────────────────────────────
// Actuator sink (driven adapter: link → main MCU)
// ───────────────────────────────────────────────────────────────

/// Consumes a decoded command (wheel speeds, LEDs). Called once per packet.
pub trait ActuatorSink {
    fn apply(&mut self, cmd: &ActuatorCommand);
}

// ───────────────────────────────────────────────────────────────
// Link indicator (driven adapter: link → status LED)
// ───────────────────────────────────────────────────────────────

/// What the link is doing right now, as shown on the status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCue {
    Off,
    /// Green: waiting for the network or a peer.
    AwaitingPeer,
    /// Green: fetching the camera image.
    CapturingImage,
    /// Blue: image bytes on the wire.
    SendingImage,
    /// Red: fetching the sensor frame.
    ReadingSensors,
}

pub trait LinkIndicator {
    fn show(&mut self, cue: LinkCue);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: link → logging)
// ───────────────────────────────────────────────────────────────

/// The link emits structured [`BridgeEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &BridgeEvent);
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// One concrete adapter for every port the link state machine touches.
pub trait BridgePorts {
    type Stack: SocketStack;
    type Image: FrameSource;
    type Sensors: FrameSource;
    type Actuators: ActuatorSink;
    type Indicator: LinkIndicator;
    type Events: EventSink;

    fn stack(&mut self) -> &mut Self::Stack;
    fn image(&mut self) -> &mut Self::Image;
    fn sensors(&mut self) -> &mut Self::Sensors;
    fn actuators(&mut self) -> &mut Self::Actuators;
    fn indicator(&mut self) -> &mut Self::Indicator;
    fn events(&mut self) -> &mut Self::Events;

    /// Borrow both frame sources and the indicator at once, so a frame view
    /// can stay alive while the LED is updated.
    fn frames_and_indicator(
        &mut self,
    ) -> (&mut Self::Image, &mut Self::Sensors, &mut Self::Indicator);
}

/// Plain struct implementation of [`BridgePorts`].
pub struct Wiring<S, I, N, A, L, E> {
    pub stack: S,
    pub image: I,
    pub sensors: N,
    pub actuators: A,
    pub indicator: L,
    pub events: E,
}

impl<S, I, N, A, L, E> BridgePorts for Wiring<S, I, N, A, L, E>
where
    S: SocketStack,
    I: FrameSource,
    N: FrameSource,
    A: ActuatorSink,
    L: LinkIndicator,
    E: EventSink,
{
    type Stack = S;
    type Image = I;
    type Sensors = N;
    type Actuators = A;
    type Indicator = L;
    type Events = E;

    fn stack(&mut self) -> &mut S {
        &mut self.stack
    }

    fn image(&mut self) -> &mut I {
        &mut self.image
    }

    fn sensors(&mut self) -> &mut N {
        &mut self.sensors
    }

    fn actuators(&mut self) -> &mut A {
        &mut self.actuators
    }

    fn indicator(&mut self) -> &mut L {
        &mut self.indicator
    }

    fn events(&mut self) -> &mut E {
        &mut self.events
    }

    fn frames_and_indicator(&mut self) -> (&mut I, &mut N, &mut L) {
        (&mut self.image, &mut self.sensors, &mut self.indicator)
    }
}

// ───────────────────────────────────────────────────────────────
// No-op adapters
// ───────────────────────────────────────────────────────────────

/// Indicator for boards without a status LED.
pub struct NoIndicator;

impl LinkIndicator for NoIndicator {
    fn show(&mut self, _cue: LinkCue) {}
}
