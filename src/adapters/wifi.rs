//! WiFi station adapter.
//!
//! Turns station association changes into [`ConnectionFlags`] signals, the
//! only way the link task learns about the network.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`EspStation`] drives the ESP-IDF WiFi
//!   driver through `esp_idf_svc::wifi`.
//! - **all targets**: credential validation, [`LinkMonitor`] edge
//!   detection and the reconnect backoff are plain logic, tested on host.
//!
//! ## Reconnection policy
//!
//! While the station is down, reconnects are attempted with exponential
//! backoff (2 s → 4 s → 8 s … capped at 60 s).

use core::fmt;
use std::sync::Arc;

use log::{info, warn};

use crate::events::{ConnectionFlags, Flag};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    /// ESP-IDF driver call failed (`esp_err_t`).
    Driver(i32),
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::Driver(code) => write!(f, "WiFi driver error {}", code),
        }
    }
}

impl std::error::Error for WifiError {}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), WifiError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(WifiError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), WifiError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(WifiError::InvalidPassword);
    }
    Ok(())
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, WifiError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds
            .ssid
            .push_str(ssid)
            .map_err(|()| WifiError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|()| WifiError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials baked in at build time (`EPUCK2_WIFI_SSID`,
    /// `EPUCK2_WIFI_PASSWORD`).
    pub fn from_build_env() -> Result<Self, WifiError> {
        let ssid = option_env!("EPUCK2_WIFI_SSID").ok_or(WifiError::NoCredentials)?;
        Self::new(ssid, option_env!("EPUCK2_WIFI_PASSWORD").unwrap_or(""))
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Reconnect backoff
// ───────────────────────────────────────────────────────────────

const MIN_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    delay_ms: u32,
    next_attempt_ms: Option<u32>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Backoff {
    pub const fn new() -> Self {
        Self {
            delay_ms: MIN_BACKOFF_MS,
            next_attempt_ms: None,
        }
    }

    /// Whether a reconnect attempt is due at `now_ms`.
    pub fn due(&self, now_ms: u32) -> bool {
        match self.next_attempt_ms {
            None => true,
            Some(at) => now_ms.wrapping_sub(at) as i32 >= 0,
        }
    }

    /// Schedule the next attempt and double the delay.
    pub fn record_failure(&mut self, now_ms: u32) {
        self.next_attempt_ms = Some(now_ms.wrapping_add(self.delay_ms));
        self.delay_ms = (self.delay_ms * 2).min(MAX_BACKOFF_MS);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }
}

// ───────────────────────────────────────────────────────────────
// Link monitor
// ───────────────────────────────────────────────────────────────

/// Association change reported by [`LinkMonitor::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    Up,
    Down,
}

/// Edge detector between the station state and the link flags.
///
/// As the flags' owner it keeps `Connected` and `Disconnected` consistent
/// with the latest association state.
///
/// The first observation always produces an edge so the flags start in a
/// defined state.
pub struct LinkMonitor {
    flags: Arc<ConnectionFlags>,
    last: Option<bool>,
}

impl LinkMonitor {
    pub fn new(flags: Arc<ConnectionFlags>) -> Self {
        Self { flags, last: None }
    }

    /// Feed the current association state.
    pub fn observe(&mut self, associated: bool) -> Option<LinkChange> {
        if self.last == Some(associated) {
            return None;
        }
        self.last = Some(associated);
        if associated {
            info!("wifi: associated");
            self.flags.clear(Flag::Disconnected);
            self.flags.raise_connected();
            Some(LinkChange::Up)
        } else {
            warn!("wifi: not associated");
            self.flags.clear(Flag::Connected);
            self.flags.raise_disconnected();
            Some(LinkChange::Down)
        }
    }

    pub fn is_up(&self) -> bool {
        self.last == Some(true)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspStation;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{info, warn};

    use super::{WifiCredentials, WifiError};

    /// Station-mode WiFi driver.
    pub struct EspStation {
        wifi: BlockingWifi<EspWifi<'static>>,
    }

    impl EspStation {
        /// Configure and start the station. Does not wait for association.
        pub fn start(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: Option<EspDefaultNvsPartition>,
            creds: &WifiCredentials,
        ) -> Result<Self, WifiError> {
            let driver = EspWifi::new(modem, sysloop.clone(), nvs).map_err(driver_err)?;
            let mut wifi = BlockingWifi::wrap(driver, sysloop).map_err(driver_err)?;

            let auth_method = if creds.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            let config = Configuration::Client(ClientConfiguration {
                ssid: creds.ssid().try_into().map_err(|_| WifiError::InvalidSsid)?,
                password: creds
                    .password()
                    .try_into()
                    .map_err(|_| WifiError::InvalidPassword)?,
                auth_method,
                ..Default::default()
            });
            wifi.set_configuration(&config).map_err(driver_err)?;
            wifi.start().map_err(driver_err)?;
            info!("wifi: station started for '{}'", creds.ssid());
            Ok(Self { wifi })
        }

        /// Associated and holding an IP address.
        pub fn is_up(&self) -> bool {
            self.wifi.is_up().unwrap_or(false)
        }

        /// One blocking association attempt.
        pub fn connect(&mut self) -> Result<(), WifiError> {
            self.wifi.connect().map_err(driver_err)?;
            self.wifi.wait_netif_up().map_err(driver_err)?;
            match self.wifi.wifi().sta_netif().get_ip_info() {
                Ok(ip) => info!("wifi: got address {}", ip.ip),
                Err(e) => warn!("wifi: address query failed: {}", e),
            }
            Ok(())
        }
    }

    fn driver_err(e: esp_idf_svc::sys::EspError) -> WifiError {
        WifiError::Driver(e.code())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
