//! Wire protocol between the robot and the remote controller.
//!
//! ```text
//!  controller ──▶ robot   [id][mode][speed L ×2][speed R ×2][led0][led2][led4]   (9 bytes)
//!
//!  robot ──▶ controller   [0x01][image: 38400 bytes, written in 4092-byte chunks]
//!                         [0x02][sensors: 104 bytes]
//!                         [0x04]                                  (empty ack)
//! ```
//!
//! Inbound commands are fixed-length, so no length prefix is needed. Every
//! reply starts with a single type tag so the controller can demultiplex
//! without length negotiation.

pub mod command;
pub mod reply;

pub use command::{ActuatorCommand, RequestMode, COMMAND_LEN};
pub use reply::{chunk_ranges, ReplyPlan, ReplyTag};

/// TCP port the controller connects to.
pub const SERVICE_PORT: u16 = 1000;

/// Size of one QQVGA RGB565 camera image.
pub const IMAGE_FRAME_SIZE: usize = 38_400;

/// Largest single transport write for image data (SPI packet size).
pub const IMAGE_CHUNK_SIZE: usize = 4092;

/// Size of one sensor telemetry frame received from the main MCU over UART.
pub const SENSOR_FRAME_SIZE: usize = 104;
