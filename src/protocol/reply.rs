//! Outbound reply framing: type tags, reply planning, and image chunking.

use core::ops::Range;

use super::command::RequestMode;

/// Leading byte of every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyTag {
    Image = 0x01,
    Sensors = 0x02,
    Empty = 0x04,
}

impl ReplyTag {
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ReplyTag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Image),
            0x02 => Ok(Self::Sensors),
            0x04 => Ok(Self::Empty),
            other => Err(other),
        }
    }
}

/// What the robot sends back for a given `mode` byte.
///
/// Image wins over sensors when both bits are set: the image goes out first
/// and the sensor frame follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPlan {
    /// `mode == 0`: a lone `0x04` tag.
    Empty,
    /// Image, optionally followed by a sensor frame.
    Image { then_sensors: bool },
    /// Sensor frame only.
    Sensors,
    /// Non-zero mode with neither request bit: nothing is sent and the link
    /// waits for the next command.
    Silent,
}

impl ReplyPlan {
    pub fn for_mode(mode: RequestMode) -> Self {
        if mode.is_idle() {
            Self::Empty
        } else if mode.wants_image() {
            Self::Image {
                then_sensors: mode.wants_sensors(),
            }
        } else if mode.wants_sensors() {
            Self::Sensors
        } else {
            Self::Silent
        }
    }
}

/// Split `len` bytes into consecutive ranges of at most `chunk` bytes:
/// `len / chunk` full ranges, then one remainder range if `len % chunk != 0`.
///
/// A `chunk` of zero yields the whole length as a single range.
pub fn chunk_ranges(len: usize, chunk: usize) -> impl Iterator<Item = Range<usize>> {
    let step = if chunk == 0 { len.max(1) } else { chunk };
    (0..len)
        .step_by(step)
        .map(move |start| start..(start + step).min(len))
}
