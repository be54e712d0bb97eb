//! Fuzz target: command decoding and reply planning.
//!
//! Feeds arbitrary byte strings to `ActuatorCommand::decode` and checks
//! that only 9-byte inputs decode, that decoding is lossless, and that the
//! resulting reply plan honours the request bits.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use epuck2_bridge::protocol::{chunk_ranges, ActuatorCommand, ReplyPlan, COMMAND_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match ActuatorCommand::decode(data) {
        Ok(cmd) => {
            assert_eq!(data.len(), COMMAND_LEN);
            assert_eq!(&cmd.to_bytes()[..], data);

            match ReplyPlan::for_mode(cmd.mode) {
                ReplyPlan::Empty => assert_eq!(cmd.mode.0, 0),
                ReplyPlan::Image { then_sensors } => {
                    assert!(cmd.mode.wants_image());
                    assert_eq!(then_sensors, cmd.mode.wants_sensors());
                }
                ReplyPlan::Sensors => {
                    assert!(!cmd.mode.wants_image() && cmd.mode.wants_sensors());
                }
                ReplyPlan::Silent => {
                    assert!(cmd.mode.0 != 0 && cmd.mode.0 & 0x03 == 0);
                }
            }
        }
        Err(_) => assert_ne!(data.len(), COMMAND_LEN),
    }

    // The first four bytes double as an arbitrary (len, chunk) pair.
    if data.len() >= 4 {
        let len = usize::from(u16::from_le_bytes([data[0], data[1]]));
        let chunk = usize::from(u16::from_le_bytes([data[2], data[3]]));
        let total: usize = chunk_ranges(len, chunk).map(|r| r.len()).sum();
        assert_eq!(total, len);
    }
});
