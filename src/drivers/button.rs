//! ISR-debounced push button with short and long press detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up. The GPIO fires on the falling
//! edge; the ISR calls [`PressLatch::on_edge`], which drops edges that land
//! inside the debounce window of the previous accepted edge (contact
//! bounce fires the interrupt several times per press). The main loop then
//! calls [`ButtonDriver::tick`], which reads the pin level to classify the
//! press.
//!
//! | Gesture     | Condition                          | Event        |
//! |-------------|------------------------------------|--------------|
//! | Short press | released before `long_press_ms`    | `ShortPress` |
//! | Long press  | still held after `long_press_ms`   | `LongPress`  |

use core::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::digital::InputPin;

/// Edges closer together than this are treated as bounce.
pub const DEBOUNCE_MS: u32 = 50;

/// Button events emitted after gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
}

/// ISR-side half of the button: accepted edge count and timestamp.
///
/// Lives in a `static` so the interrupt callback can reach it.
pub struct PressLatch {
    presses: AtomicU32,
    last_edge_ms: AtomicU32,
    quiet_until_ms: AtomicU32,
}

impl Default for PressLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl PressLatch {
    pub const fn new() -> Self {
        Self {
            presses: AtomicU32::new(0),
            last_edge_ms: AtomicU32::new(0),
            quiet_until_ms: AtomicU32::new(0),
        }
    }

    /// Record a falling edge. Safe from interrupt context.
    /// Returns `false` if the edge was discarded as bounce.
    pub fn on_edge(&self, now_ms: u32) -> bool {
        let presses = self.presses.load(Ordering::Acquire);
        let quiet_until = self.quiet_until_ms.load(Ordering::Relaxed);
        if presses != 0 && (now_ms.wrapping_sub(quiet_until) as i32) < 0 {
            return false;
        }
        self.quiet_until_ms
            .store(now_ms.wrapping_add(DEBOUNCE_MS), Ordering::Relaxed);
        self.last_edge_ms.store(now_ms, Ordering::Relaxed);
        self.presses.fetch_add(1, Ordering::Release);
        true
    }

    pub fn presses(&self) -> u32 {
        self.presses.load(Ordering::Acquire)
    }

    fn last_edge_ms(&self) -> u32 {
        self.last_edge_ms.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Idle,
    Held { since_ms: u32 },
    /// Long press already reported; waiting for release.
    Latched,
}

/// Main-loop half of the button.
pub struct ButtonDriver<'a, P: InputPin> {
    pin: P,
    latch: &'a PressLatch,
    state: PressState,
    seen_presses: u32,
    long_press_ms: u32,
}

impl<'a, P: InputPin> ButtonDriver<'a, P> {
    pub fn new(pin: P, latch: &'a PressLatch, long_press_ms: u32) -> Self {
        Self {
            pin,
            latch,
            state: PressState::Idle,
            seen_presses: latch.presses(),
            long_press_ms,
        }
    }

    /// Level read of the switch (active-low). A read error counts as
    /// released.
    pub fn is_pressed(&mut self) -> bool {
        self.pin.is_low().unwrap_or(false)
    }

    /// Access to the pin, e.g. to re-arm its interrupt.
    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }

    /// Call periodically from the main loop with a monotonic millisecond
    /// clock. Returns a classified gesture, if one completed.
    pub fn tick(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        let presses = self.latch.presses();
        let new_press = presses != self.seen_presses;
        self.seen_presses = presses;

        match self.state {
            PressState::Idle => {
                if !new_press {
                    return None;
                }
                if self.is_pressed() {
                    self.state = PressState::Held {
                        since_ms: self.latch.last_edge_ms(),
                    };
                    None
                } else {
                    Some(ButtonEvent::ShortPress)
                }
            }

            PressState::Held { since_ms } => {
                if !self.is_pressed() {
                    self.state = PressState::Idle;
                    return Some(ButtonEvent::ShortPress);
                }
                if now_ms.wrapping_sub(since_ms) >= self.long_press_ms {
                    self.state = PressState::Latched;
                    return Some(ButtonEvent::LongPress);
                }
                None
            }

            PressState::Latched => {
                if !self.is_pressed() {
                    self.state = PressState::Idle;
                }
                None
            }
        }
    }
}
