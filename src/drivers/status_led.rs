//! RGB status LED (LED2 on the radio module).
//!
//! Three GPIOs drive the colour channels of a common-anode LED, so every
//! channel is active-low: driving a pin low lights that colour. The driver
//! implements [`LinkIndicator`], turning link cues into colours.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{LinkCue, LinkIndicator};

/// Which channels are lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Colour {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Colour {
    pub const OFF: Self = Self::rgb(false, false, false);
    pub const RED: Self = Self::rgb(true, false, false);
    pub const GREEN: Self = Self::rgb(false, true, false);
    pub const BLUE: Self = Self::rgb(false, false, true);

    pub const fn rgb(red: bool, green: bool, blue: bool) -> Self {
        Self { red, green, blue }
    }

    pub fn for_cue(cue: LinkCue) -> Self {
        match cue {
            LinkCue::Off => Self::OFF,
            LinkCue::AwaitingPeer | LinkCue::CapturingImage => Self::GREEN,
            LinkCue::SendingImage => Self::BLUE,
            LinkCue::ReadingSensors => Self::RED,
        }
    }
}

pub struct StatusLed<R: OutputPin, G: OutputPin, B: OutputPin> {
    red: R,
    green: G,
    blue: B,
    current: Colour,
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> StatusLed<R, G, B> {
    /// Take the three pins and switch the LED off.
    pub fn new(red: R, green: G, blue: B) -> Self {
        let mut led = Self {
            red,
            green,
            blue,
            current: Colour::OFF,
        };
        led.set(Colour::OFF);
        led
    }

    pub fn set(&mut self, colour: Colour) {
        drive(&mut self.red, colour.red);
        drive(&mut self.green, colour.green);
        drive(&mut self.blue, colour.blue);
        self.current = colour;
    }

    pub fn off(&mut self) {
        self.set(Colour::OFF);
    }

    pub fn current(&self) -> Colour {
        self.current
    }
}

fn drive(pin: &mut impl OutputPin, lit: bool) {
    // GPIO writes on this board cannot fail; the LED is cosmetic anyway.
    let _ = if lit { pin.set_low() } else { pin.set_high() };
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> LinkIndicator for StatusLed<R, G, B> {
    fn show(&mut self, cue: LinkCue) {
        self.set(Colour::for_cue(cue));
    }
}
