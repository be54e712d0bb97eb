//! Board peripherals: button, status LED, and task placement.

pub mod button;
pub mod status_led;
pub mod task_pin;
