// Status frame: robot -> software, sent back for every control frame received

use super::layout::BitField;
use super::{Frame, FrameError, Team, check_len};

/// Converts the raw ADC battery reading to volts
pub const BATTERY_SCALE_FACTOR: f32 = 0.09884;

/// Number of motors covered by the error bitmap (4 drive wheels + dribbler)
pub const MOTOR_COUNT: usize = 5;

pub const ENCODER_DELTA_COUNT: usize = 18;

pub const STATUS_FRAME_LEN: usize = 40;

const ROBOT_ID: BitField = BitField::new("robot_id", 0, 5);
const TEAM: BitField = BitField::new("team", 5, 1);
const BALL_SENSE: BitField = BitField::new("ball_sense_status", 6, 1);
const KICK_STATUS: BitField = BitField::new("kick_status", 7, 1);
const KICK_HEALTHY: BitField = BitField::new("kick_healthy", 8, 1);
const BATTERY_VOLTAGE: BitField = BitField::new("battery_voltage", 16, 8);
const MOTOR_ERRORS: BitField = BitField::new("motor_errors", 24, 5);
const FPGA_STATUS: BitField = BitField::new("fpga_status", 29, 1);

const ENCODER_DELTAS_OFFSET: usize = 32;
const ENCODER_DELTA_WIDTH: usize = 16;

const fn encoder_delta(index: usize) -> BitField {
    BitField::new(
        "encoder_delta",
        ENCODER_DELTAS_OFFSET + index * ENCODER_DELTA_WIDTH,
        ENCODER_DELTA_WIDTH,
    )
}

/// Bit layout of a [`StatusFrame`]
///
/// ```text
/// byte 0     | k_status | b_sense | team | robot_id (5)       |
/// byte 1     | reserved (7)                      | k_healthy  |
/// byte 2     | battery_voltage (u8)                           |
/// byte 3     | reserved (2) | fpga | motor_errors (5)         |
/// byte 4-39  | encoder_deltas[0..18] (i16, little-endian)     |
/// ```
pub fn status_frame_layout() -> Vec<BitField> {
    let mut layout = vec![
        ROBOT_ID,
        TEAM,
        BALL_SENSE,
        KICK_STATUS,
        KICK_HEALTHY,
        BitField::reserved(9, 7),
        BATTERY_VOLTAGE,
        MOTOR_ERRORS,
        FPGA_STATUS,
        BitField::reserved(30, 2),
    ];
    layout.extend((0..ENCODER_DELTA_COUNT).map(encoder_delta));
    layout
}

/// Telemetry sent from a robot to the control software
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFrame {
    /// Id of the robot (5 bits)
    pub robot_id: u8,
    pub team: Team,
    /// True if the robot currently senses the ball
    pub ball_sense_status: bool,
    /// True while the kicker is firing
    pub kick_status: bool,
    pub kick_healthy: bool,
    /// Raw ADC reading, see [`StatusFrame::battery_volts`]
    pub battery_voltage: u8,
    /// One bit per motor, bit `i` set if motor `i` reports an error
    pub motor_errors: u8,
    pub fpga_status: bool,
    /// Encoder tick deltas since the previous status frame
    pub encoder_deltas: [i16; ENCODER_DELTA_COUNT],
}

impl StatusFrame {
    pub fn battery_volts(&self) -> f32 {
        self.battery_voltage as f32 * BATTERY_SCALE_FACTOR
    }

    /// Set the battery field from a voltage, rounding to the nearest ADC step
    pub fn with_battery_volts(mut self, volts: f32) -> Result<Self, FrameError> {
        let raw = (volts / BATTERY_SCALE_FACTOR).round();
        if !raw.is_finite() || raw < 0.0 || raw > u8::MAX as f32 {
            return Err(FrameError::OutOfRange {
                field: BATTERY_VOLTAGE.name,
                value: volts,
            });
        }
        self.battery_voltage = raw as u8;
        Ok(self)
    }

    /// Error bit of one motor; indices past the bitmap report no error
    pub fn motor_error(&self, motor: usize) -> bool {
        motor < MOTOR_COUNT && self.motor_errors & (1 << motor) != 0
    }
}

impl Frame for StatusFrame {
    const NAME: &'static str = "StatusFrame";
    const LEN: usize = STATUS_FRAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;

        let robot_id = ROBOT_ID.check(self.robot_id.into())?;
        let motor_errors = MOTOR_ERRORS.check(self.motor_errors.into())?;

        buf.fill(0);
        ROBOT_ID.write(buf, robot_id);
        TEAM.write(buf, self.team as u64);
        BALL_SENSE.write(buf, self.ball_sense_status.into());
        KICK_STATUS.write(buf, self.kick_status.into());
        KICK_HEALTHY.write(buf, self.kick_healthy.into());
        BATTERY_VOLTAGE.write(buf, self.battery_voltage.into());
        MOTOR_ERRORS.write(buf, motor_errors);
        FPGA_STATUS.write(buf, self.fpga_status.into());
        for (i, &delta) in self.encoder_deltas.iter().enumerate() {
            encoder_delta(i).write_signed(buf, delta.into());
        }
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;

        let mut encoder_deltas = [0i16; ENCODER_DELTA_COUNT];
        for (i, delta) in encoder_deltas.iter_mut().enumerate() {
            *delta = encoder_delta(i).read_signed(bytes) as i16;
        }

        Ok(Self {
            robot_id: ROBOT_ID.read(bytes) as u8,
            team: Team::from_bit(TEAM.read(bytes)),
            ball_sense_status: BALL_SENSE.read(bytes) != 0,
            kick_status: KICK_STATUS.read(bytes) != 0,
            kick_healthy: KICK_HEALTHY.read(bytes) != 0,
            battery_voltage: BATTERY_VOLTAGE.read(bytes) as u8,
            motor_errors: MOTOR_ERRORS.read(bytes) as u8,
            fpga_status: FPGA_STATUS.read(bytes) != 0,
            encoder_deltas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::layout::assert_tiles;

    fn sample_status() -> StatusFrame {
        let mut encoder_deltas = [0i16; ENCODER_DELTA_COUNT];
        encoder_deltas[0] = 1;
        encoder_deltas[1] = -2;
        encoder_deltas[2] = 300;
        encoder_deltas[3] = i16::MIN;
        encoder_deltas[17] = i16::MAX;

        StatusFrame {
            robot_id: 3,
            team: Team::Blue,
            ball_sense_status: true,
            kick_status: false,
            kick_healthy: true,
            battery_voltage: 150,
            motor_errors: 0b10010,
            fpga_status: true,
            encoder_deltas,
        }
    }

    #[test]
    fn test_layout_fills_frame() {
        let layout = status_frame_layout();
        assert_eq!(layout.len(), 10 + ENCODER_DELTA_COUNT);
        assert_tiles(&layout, STATUS_FRAME_LEN);
    }

    /// byte 0 = 0_1_0_00011 (kick_status, ball_sense, team, robot_id=3)
    /// byte 1 = 0000000_1   (reserved, kick_healthy)
    /// byte 2 = 150
    /// byte 3 = 00_1_10010  (reserved, fpga, motor_errors)
    /// then each encoder delta as a little-endian i16
    #[test]
    fn test_encode_exact_bytes() {
        let bytes = sample_status().encode().unwrap();
        assert_eq!(bytes.len(), STATUS_FRAME_LEN);
        assert_eq!(&bytes[..4], &[0x43, 0x01, 0x96, 0x32]);
        assert_eq!(
            &bytes[4..12],
            &[0x01, 0x00, 0xFE, 0xFF, 0x2C, 0x01, 0x00, 0x80]
        );
        assert!(bytes[12..38].iter().all(|&b| b == 0));
        assert_eq!(&bytes[38..], &[0xFF, 0x7F]);
    }

    #[test]
    fn test_decode_round_trip() {
        let status = sample_status();
        let decoded = StatusFrame::decode(&status.encode().unwrap()).unwrap();
        assert_eq!(decoded, status);
    }

    #[test]
    fn test_decode_rejects_short_input() {
        let bytes = sample_status().encode().unwrap();
        for len in [0, 3, STATUS_FRAME_LEN - 1] {
            assert_eq!(
                StatusFrame::decode(&bytes[..len]),
                Err(FrameError::WrongLength {
                    frame: "StatusFrame",
                    expected: STATUS_FRAME_LEN,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn test_decode_rejects_long_input() {
        let mut bytes = sample_status().encode().unwrap();
        bytes.extend_from_slice(&[0, 0]);
        assert!(matches!(
            StatusFrame::decode(&bytes),
            Err(FrameError::WrongLength { actual: 42, .. })
        ));
    }

    #[test]
    fn test_motor_errors_overflow() {
        let status = StatusFrame {
            motor_errors: 0b100000,
            ..Default::default()
        };
        assert!(matches!(
            status.encode(),
            Err(FrameError::FieldOverflow { field: "motor_errors", .. })
        ));
    }

    #[test]
    fn test_battery_scaling() {
        let status = sample_status();
        assert!((status.battery_volts() - 14.826).abs() < 1e-3);

        let status = StatusFrame::default().with_battery_volts(16.0).unwrap();
        assert_eq!(status.battery_voltage, 162);
        assert!(StatusFrame::default().with_battery_volts(30.0).is_err());
        assert!(StatusFrame::default().with_battery_volts(-1.0).is_err());
    }

    #[test]
    fn test_motor_error_bits() {
        let status = sample_status();
        let errors: Vec<bool> = (0..MOTOR_COUNT).map(|m| status.motor_error(m)).collect();
        assert_eq!(errors, vec![false, true, false, false, true]);
        assert!(!status.motor_error(7));
    }
}
