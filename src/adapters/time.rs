//! Monotonic time.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` (microseconds since
//!   boot).
//! - **other targets**: `std::time::Instant` anchored at first use.

use core::time::Duration;

/// Time since boot. Also the time provider of the listen rate limiter.
#[cfg(target_os = "espidf")]
pub fn platform_now() -> Duration {
    // SAFETY: reads the high-resolution timer; no preconditions.
    let us = unsafe { esp_idf_sys::esp_timer_get_time() };
    Duration::from_micros(us as u64)
}

/// Time since first call (host simulation).
#[cfg(not(target_os = "espidf"))]
pub fn platform_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}

/// Milliseconds since boot, truncated to `u32` (wraps after ~49 days).
/// Button timing uses wrapping arithmetic on this value.
pub fn uptime_ms() -> u32 {
    platform_now().as_millis() as u32
}
