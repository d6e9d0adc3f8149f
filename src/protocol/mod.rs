// Radio frames exchanged between the control software and the robot
//
// Provides:
// - An explicit bit table per frame (see `layout` for the canonical bit/byte order)
// - ControlFrame (software -> robot) and StatusFrame (robot -> software)
// - CommandFrame for wake-up / power-down, and the bench diagnostic frames
// - Fixed-point helpers shared by both

pub mod command;
pub mod control;
pub mod diagnostics;
pub mod layout;
pub mod status;

use serde::{Deserialize, Serialize};

pub use command::{COMMAND_FRAME_LEN, CommandFrame, CommandKind};
pub use control::{CONTROL_FRAME_LAYOUT, CONTROL_FRAME_LEN, ControlFrame, VELOCITY_SCALE_FACTOR};
pub use diagnostics::{
    ControlTestFrame, ImuTestFrame, KickerProgramFrame, KickerTestFrame, RadioReceiveBenchmark,
    RadioSendBenchmark,
};
pub use layout::BitField;
pub use status::{
    BATTERY_SCALE_FACTOR, ENCODER_DELTA_COUNT, MOTOR_COUNT, STATUS_FRAME_LEN, StatusFrame,
    status_frame_layout,
};

/// Revision of the wire layout implemented here
///
/// Older layouts (4-bit robot id, 3-byte status without encoder deltas) are
/// not interoperable with this one and are not implemented.
pub const SCHEMA_REVISION: u8 = 1;

/// Error types for frame encoding and decoding
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("{frame} must be exactly {expected} bytes, got {actual}")]
    WrongLength {
        frame: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field} value {value} is outside the fixed-point wire range")]
    OutOfRange { field: &'static str, value: f32 },

    #[error("{field} value {value} does not fit in {width} bits")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        width: usize,
    },

    #[error("{field} carries reserved value {value}")]
    InvalidValue { field: &'static str, value: u64 },
}

/// A fixed-length frame with a bit-exact layout
pub trait Frame: Sized {
    const NAME: &'static str;
    const LEN: usize;

    /// Encode into a buffer of exactly `LEN` bytes
    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError>;

    /// Decode from exactly `LEN` bytes; any other length is rejected
    fn decode(bytes: &[u8]) -> Result<Self, FrameError>;

    fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let mut buf = vec![0u8; Self::LEN];
        self.encode_into(&mut buf)?;
        Ok(buf)
    }
}

pub(crate) fn check_len(
    frame: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), FrameError> {
    if actual != expected {
        return Err(FrameError::WrongLength {
            frame,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Scale a physical value into a signed 16-bit wire value, rounding to nearest
pub(crate) fn to_fixed(field: &'static str, value: f32, scale: f32) -> Result<i16, FrameError> {
    let scaled = (value * scale).round();
    if !scaled.is_finite() || scaled < i16::MIN as f32 || scaled > i16::MAX as f32 {
        return Err(FrameError::OutOfRange { field, value });
    }
    Ok(scaled as i16)
}

pub(crate) fn from_fixed(wire: i16, scale: f32) -> f32 {
    wire as f32 / scale
}

/// Team the robots are on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Blue = 0,
    Yellow = 1,
}

impl Team {
    fn from_bit(bit: u64) -> Self {
        if bit == 0 { Team::Blue } else { Team::Yellow }
    }
}

/// How the robot should shoot the ball
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShootMode {
    #[default]
    Kick = 0,
    Chip = 1,
}

impl ShootMode {
    fn from_bit(bit: u64) -> Self {
        if bit == 0 {
            ShootMode::Kick
        } else {
            ShootMode::Chip
        }
    }
}

/// When the kicker should fire
///
/// The 2-bit wire value 3 is unassigned. It decodes as `StandDown`, so a
/// frame carrying it still moves the robot and leaves the kicker safe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriggerMode {
    /// Slowly expel the charge in the kicker
    #[default]
    StandDown = 0,
    /// Fire immediately
    Immediate = 1,
    /// Fire on the next break beam trip
    OnBreakBeam = 2,
}

impl TriggerMode {
    fn from_bits(bits: u64) -> Self {
        match bits {
            1 => TriggerMode::Immediate,
            2 => TriggerMode::OnBreakBeam,
            _ => TriggerMode::StandDown,
        }
    }
}
