//! GPIO assignments of the e-puck2 radio module (ESP32-WROOM-32).
//!
//! Single source of truth; drivers take pins from here rather than
//! hard-coding numbers.

// ---------------------------------------------------------------------------
// RGB LED2 (common anode, active LOW)
// ---------------------------------------------------------------------------

pub const LED2_RED_GPIO: i32 = 32;
pub const LED2_GREEN_GPIO: i32 = 33;
pub const LED2_BLUE_GPIO: i32 = 25;

// ---------------------------------------------------------------------------
// User button (active-low with external pull-up, input-only pad)
// ---------------------------------------------------------------------------

pub const BUTTON_GPIO: i32 = 35;
