//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter           | Implements               | Connects to                 |
//! |-------------------|--------------------------|-----------------------------|
//! | `command_mailbox` | ActuatorSink             | main-MCU link task          |
//! | `log_sink`        | EventSink                | Serial log output           |
//! | `lwip_socket`     | SocketStack/Listener/Peer| lwIP BSD sockets (device)   |
//! | `std_socket`      | SocketStack/Listener/Peer| `std::net` (host)           |
//! | `time`            | rate-limiter clock       | ESP32 system timer          |
//! | `wifi`            | ConnectionFlags producer | ESP-IDF WiFi STA            |

pub mod command_mailbox;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod lwip_socket;
pub mod std_socket;
pub mod time;
pub mod wifi;
