//! Actuator command packet.
//!
//! Byte layout (9 bytes, no padding):
//!
//! | Offset | Field        | Notes                                  |
//! |--------|--------------|----------------------------------------|
//! | 0      | `id`         | packet id, forwarded as-is             |
//! | 1      | `mode`       | bit0 = image, bit1 = sensors, 0 = idle |
//! | 2..4   | `speed_left` | raw bytes, byte order owned by the MCU |
//! | 4..6   | `speed_right`| raw bytes, byte order owned by the MCU |
//! | 6      | `led0`       |                                        |
//! | 7      | `led2`       |                                        |
//! | 8      | `led4`       |                                        |
//!
//! No validation beyond length happens here; the actuator sink owns any
//! range checks.

use crate::error::FrameError;

/// Length of an inbound command packet.
pub const COMMAND_LEN: usize = 9;

/// The `mode` byte: which telemetry the controller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestMode(pub u8);

impl RequestMode {
    /// Image requested.
    pub const IMAGE: u8 = 0b0000_0001;
    /// Sensor frame requested.
    pub const SENSORS: u8 = 0b0000_0010;

    /// `mode == 0`: stop/idle, answered with an empty ack.
    pub fn is_idle(self) -> bool {
        self.0 == 0
    }

    pub fn wants_image(self) -> bool {
        self.0 & Self::IMAGE != 0
    }

    pub fn wants_sensors(self) -> bool {
        self.0 & Self::SENSORS != 0
    }
}

/// A decoded actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorCommand {
    pub id: u8,
    pub mode: RequestMode,
    pub speed_left: [u8; 2],
    pub speed_right: [u8; 2],
    pub led0: u8,
    pub led2: u8,
    pub led4: u8,
}

impl ActuatorCommand {
    /// Decode exactly [`COMMAND_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let raw: &[u8; COMMAND_LEN] = bytes
            .try_into()
            .map_err(|_| FrameError::CommandLength { got: bytes.len() })?;
        Ok(Self::from_bytes(raw))
    }

    pub fn from_bytes(raw: &[u8; COMMAND_LEN]) -> Self {
        Self {
            id: raw[0],
            mode: RequestMode(raw[1]),
            speed_left: [raw[2], raw[3]],
            speed_right: [raw[4], raw[5]],
            led0: raw[6],
            led2: raw[7],
            led4: raw[8],
        }
    }

    /// Re-encode into the exact wire layout the command was decoded from.
    pub fn to_bytes(&self) -> [u8; COMMAND_LEN] {
        [
            self.id,
            self.mode.0,
            self.speed_left[0],
            self.speed_left[1],
            self.speed_right[0],
            self.speed_right[1],
            self.led0,
            self.led2,
            self.led4,
        ]
    }

    /// Left wheel speed assuming the controller sent little-endian.
    pub fn speed_left_le(&self) -> i16 {
        i16::from_le_bytes(self.speed_left)
    }

    /// Right wheel speed assuming the controller sent little-endian.
    pub fn speed_right_le(&self) -> i16 {
        i16::from_le_bytes(self.speed_right)
    }
}

impl TryFrom<&[u8]> for ActuatorCommand {
    type Error = FrameError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::decode(bytes)
    }
}
