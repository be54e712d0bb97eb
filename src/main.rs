//! e-puck2 radio module firmware main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  LwipSocketStack  ExchangeSource ×2  CommandMailbox          │
//! │  (SocketStack)    (FrameSource)      (ActuatorSink)          │
//! │  StatusLed        LogEventSink       EspStation+LinkMonitor  │
//! │  (LinkIndicator)  (EventSink)        (ConnectionFlags)       │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ──────────────────     │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │       BridgeService (socket task, pinned to APP)     │    │
//! │  │       link FSM · disconnect teardown · stats         │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! │                                                              │
//! │  main loop: WiFi monitor + reconnect backoff · button        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyInputPin, AnyOutputPin, InterruptType, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use epuck2_bridge::adapters::command_mailbox::CommandMailbox;
use epuck2_bridge::adapters::log_sink::{log_stats, LogEventSink};
use epuck2_bridge::adapters::lwip_socket::LwipSocketStack;
use epuck2_bridge::adapters::time::uptime_ms;
use epuck2_bridge::adapters::wifi::{Backoff, EspStation, LinkChange, LinkMonitor, WifiCredentials};
use epuck2_bridge::app::ports::Wiring;
use epuck2_bridge::app::service::BridgeService;
use epuck2_bridge::app::stats::LinkStats;
use epuck2_bridge::config::BridgeConfig;
use epuck2_bridge::drivers::button::{ButtonDriver, ButtonEvent, PressLatch};
use epuck2_bridge::drivers::status_led::StatusLed;
use epuck2_bridge::drivers::task_pin::{self, SOCKET_TASK};
use epuck2_bridge::events::ConnectionFlags;
use epuck2_bridge::frames::FrameExchange;
use epuck2_bridge::pins;

/// Written by the button ISR, read by the main loop.
static BUTTON_LATCH: PressLatch = PressLatch::new();

/// Defaults, or the JSON override embedded at build time.
fn load_config() -> epuck2_bridge::error::Result<BridgeConfig> {
    match option_env!("EPUCK2_CONFIG_JSON") {
        None => Ok(BridgeConfig::default()),
        Some(json) => Ok(BridgeConfig::from_json(json)?),
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  e-puck2 bridge v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config().unwrap_or_else(|e| {
        warn!("Embedded config rejected ({}), using defaults", e);
        BridgeConfig::default()
    });
    info!(
        "Config: port={} image={}B/{}B chunks sensors={}B",
        config.tcp_port, config.image_frame_size, config.image_chunk_size, config.sensor_frame_size
    );

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = match EspDefaultNvsPartition::take() {
        Ok(p) => Some(p),
        Err(e) => {
            warn!("NVS unavailable ({}), WiFi calibration will not persist", e);
            None
        }
    };

    // ── 2. Shared state ───────────────────────────────────────
    let flags = Arc::new(ConnectionFlags::new());
    let stats = Arc::new(LinkStats::new());
    // Frame producers plug in here: the camera task publishes into `image`,
    // and the main-MCU UART task publishes into `sensors` and then calls
    // `flags.raise_data_ready()`. Neither is part of this binary yet, so the
    // link serves zero-filled frames of the configured sizes. The main loop
    // below stands in for the UART side of `mailbox`.
    let image = FrameExchange::new(config.image_frame_size);
    let sensors = FrameExchange::new(config.sensor_frame_size);
    let mailbox = CommandMailbox::new();

    // ── 3. Board peripherals ──────────────────────────────────
    // SAFETY: each GPIO number is claimed exactly once, here.
    let (red, green, blue, button_pin) = unsafe {
        (
            AnyOutputPin::new(pins::LED2_RED_GPIO),
            AnyOutputPin::new(pins::LED2_GREEN_GPIO),
            AnyOutputPin::new(pins::LED2_BLUE_GPIO),
            AnyInputPin::new(pins::BUTTON_GPIO),
        )
    };
    let led = StatusLed::new(
        PinDriver::output(red)?,
        PinDriver::output(green)?,
        PinDriver::output(blue)?,
    );

    let mut button_driver = PinDriver::input(button_pin)?;
    button_driver.set_interrupt_type(InterruptType::NegEdge)?;
    // SAFETY: the callback only touches a static of atomics and the
    // ISR-safe system timer.
    unsafe {
        button_driver.subscribe(|| {
            BUTTON_LATCH.on_edge(uptime_ms());
        })?;
    }
    button_driver.enable_interrupt()?;
    let mut button = ButtonDriver::new(button_driver, &BUTTON_LATCH, config.button_long_press_ms);
    let mut armed_presses = BUTTON_LATCH.presses();

    // ── 4. Link task ──────────────────────────────────────────
    let wiring = Wiring {
        stack: LwipSocketStack::new(config.recv_timeout()),
        image: image.source(),
        sensors: sensors.source(),
        actuators: mailbox.clone(),
        indicator: led,
        events: LogEventSink::new(),
    };
    let service = BridgeService::new(config.clone(), Arc::clone(&flags), Arc::clone(&stats), wiring);
    let _link_task = task_pin::spawn(SOCKET_TASK, move || service.run())?;
    info!(
        "Link task '{}' started on {:?}",
        SOCKET_TASK.display_name(),
        SOCKET_TASK.core
    );

    // ── 5. WiFi station ───────────────────────────────────────
    let creds = WifiCredentials::from_build_env()?;
    let mut station = EspStation::start(peripherals.modem, sysloop, nvs, &creds)?;
    let mut monitor = LinkMonitor::new(Arc::clone(&flags));
    let mut backoff = Backoff::new();

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        let now_ms = uptime_ms();

        // WiFi association → link flags, reconnect with backoff.
        let up = station.is_up();
        if monitor.observe(up) == Some(LinkChange::Up) {
            backoff.reset();
        }
        if !up && backoff.due(now_ms) {
            match station.connect() {
                Ok(()) => backoff.reset(),
                Err(e) => {
                    backoff.record_failure(now_ms);
                    warn!("wifi: connect failed ({}), retry in {} ms", e, backoff.delay_ms());
                }
            }
        }

        // Button gestures.
        match button.tick(now_ms) {
            Some(ButtonEvent::ShortPress) => {
                info!("button: short press, link statistics follow");
                log_stats(&stats.snapshot());
                info!(
                    "button: image seq={} sensor seq={} commands overwritten={}",
                    image.sequence(),
                    sensors.sequence(),
                    mailbox.overwritten()
                );
            }
            Some(ButtonEvent::LongPress) => {
                info!("button: long press, link statistics reset");
                stats.reset();
            }
            None => {}
        }

        // The GPIO driver disarms the interrupt after every edge.
        let presses = BUTTON_LATCH.presses();
        if presses != armed_presses {
            armed_presses = presses;
            if let Err(e) = button.pin_mut().enable_interrupt() {
                warn!("button: re-arm failed: {}", e);
            }
        }

        // The main-MCU link drains the mailbox; log what it would forward.
        if let Some(cmd) = mailbox.take() {
            debug!(
                "uart: command id={} mode=0x{:02x} L={} R={}",
                cmd.id,
                cmd.mode.0,
                cmd.speed_left_le(),
                cmd.speed_right_le()
            );
        }

        FreeRtos::delay_ms(config.link_poll_ms);
    }
}
