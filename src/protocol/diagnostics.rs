// Diagnostic frames: robot -> software, sent only while a bench test is running
//
// Each test mode replaces the regular StatusFrame with one of these. Floats
// are raw IEEE 754 words, integers are unsigned little-endian.

use super::layout::BitField;
use super::{Frame, FrameError, check_len};
use crate::motor::WHEEL_COUNT;

pub const KICKER_PROGRAM_FRAME_LEN: usize = 5;
pub const KICKER_TEST_FRAME_LEN: usize = 2;
pub const IMU_TEST_FRAME_LEN: usize = 13;
pub const CONTROL_TEST_FRAME_LEN: usize = 32;
pub const RADIO_RECEIVE_BENCHMARK_LEN: usize = 8;
pub const RADIO_SEND_BENCHMARK_LEN: usize = 8;

// Kicker programming progress

const PROGRAM_FINISHED: BitField = BitField::new("finished", 0, 1);
const PROGRAM_KICK_ON_BREAKBEAM: BitField = BitField::new("kick_on_breakbeam", 4, 1);
const PROGRAM_PAGE: BitField = BitField::new("page", 8, 32);

/// ```text
/// byte 0    | reserved (3) | kick_on_bb | reserved (3) | finished |
/// byte 1-4  | page (u32)                                          |
/// ```
pub const KICKER_PROGRAM_LAYOUT: [BitField; 5] = [
    PROGRAM_FINISHED,
    BitField::reserved(1, 3),
    PROGRAM_KICK_ON_BREAKBEAM,
    BitField::reserved(5, 3),
    PROGRAM_PAGE,
];

/// Progress report while the kicker firmware is being flashed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KickerProgramFrame {
    pub kick_on_breakbeam: bool,
    pub finished: bool,
    /// Page currently being written
    pub page: u32,
}

impl Frame for KickerProgramFrame {
    const NAME: &'static str = "KickerProgramFrame";
    const LEN: usize = KICKER_PROGRAM_FRAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;
        buf.fill(0);
        PROGRAM_FINISHED.write(buf, self.finished.into());
        PROGRAM_KICK_ON_BREAKBEAM.write(buf, self.kick_on_breakbeam.into());
        PROGRAM_PAGE.write(buf, self.page.into());
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;
        Ok(Self {
            kick_on_breakbeam: PROGRAM_KICK_ON_BREAKBEAM.read(bytes) == 1,
            finished: PROGRAM_FINISHED.read(bytes) == 1,
            page: PROGRAM_PAGE.read(bytes) as u32,
        })
    }
}

// Kicker test mode

const KICKER_HEALTHY: BitField = BitField::new("healthy", 0, 1);
const KICKER_BALL_SENSE: BitField = BitField::new("ball_sense", 1, 1);
const KICKER_KICKING: BitField = BitField::new("kicking", 2, 1);
const KICKER_ON_BALL_SENSE: BitField = BitField::new("kick_on_ball_sense", 3, 1);
const KICKER_IMMEDIATELY: BitField = BitField::new("kick_immediately", 4, 1);
const KICKER_VOLTAGE: BitField = BitField::new("voltage", 8, 8);

/// ```text
/// byte 0    | reserved (3) | now | on_bs | kicking | b_sense | healthy |
/// byte 1    | voltage (u8)                                             |
/// ```
pub const KICKER_TEST_LAYOUT: [BitField; 7] = [
    KICKER_HEALTHY,
    KICKER_BALL_SENSE,
    KICKER_KICKING,
    KICKER_ON_BALL_SENSE,
    KICKER_IMMEDIATELY,
    BitField::reserved(5, 3),
    KICKER_VOLTAGE,
];

/// Kicker state reported while the kicker is under test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KickerTestFrame {
    pub healthy: bool,
    pub ball_sense: bool,
    /// Kicking, otherwise chipping
    pub kicking: bool,
    pub kick_on_ball_sense: bool,
    pub kick_immediately: bool,
    /// Raw kicker capacitor voltage
    pub voltage: u8,
}

impl Frame for KickerTestFrame {
    const NAME: &'static str = "KickerTestFrame";
    const LEN: usize = KICKER_TEST_FRAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;
        buf.fill(0);
        KICKER_HEALTHY.write(buf, self.healthy.into());
        KICKER_BALL_SENSE.write(buf, self.ball_sense.into());
        KICKER_KICKING.write(buf, self.kicking.into());
        KICKER_ON_BALL_SENSE.write(buf, self.kick_on_ball_sense.into());
        KICKER_IMMEDIATELY.write(buf, self.kick_immediately.into());
        KICKER_VOLTAGE.write(buf, self.voltage.into());
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;
        Ok(Self {
            healthy: KICKER_HEALTHY.read(bytes) == 1,
            ball_sense: KICKER_BALL_SENSE.read(bytes) == 1,
            kicking: KICKER_KICKING.read(bytes) == 1,
            kick_on_ball_sense: KICKER_ON_BALL_SENSE.read(bytes) == 1,
            kick_immediately: KICKER_IMMEDIATELY.read(bytes) == 1,
            voltage: KICKER_VOLTAGE.read(bytes) as u8,
        })
    }
}

// IMU test mode

const IMU_LAST: BitField = BitField::new("last_message", 0, 1);
const IMU_FIRST: BitField = BitField::new("first_message", 4, 1);
const IMU_GYRO_Z: BitField = BitField::new("gyro_z", 8, 32);
const IMU_ACCEL_X: BitField = BitField::new("accel_x", 40, 32);
const IMU_ACCEL_Y: BitField = BitField::new("accel_y", 72, 32);

/// ```text
/// byte 0     | reserved (3) | first | reserved (3) | last |
/// byte 1-4   | gyro_z (f32)                               |
/// byte 5-8   | accel_x (f32)                              |
/// byte 9-12  | accel_y (f32)                              |
/// ```
pub const IMU_TEST_LAYOUT: [BitField; 7] = [
    IMU_LAST,
    BitField::reserved(1, 3),
    IMU_FIRST,
    BitField::reserved(5, 3),
    IMU_GYRO_Z,
    IMU_ACCEL_X,
    IMU_ACCEL_Y,
];

/// One IMU sample streamed during the IMU test
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuTestFrame {
    pub first_message: bool,
    pub last_message: bool,
    /// rad/s
    pub gyro_z: f32,
    /// m/s^2
    pub accel_x: f32,
    pub accel_y: f32,
}

impl Frame for ImuTestFrame {
    const NAME: &'static str = "ImuTestFrame";
    const LEN: usize = IMU_TEST_FRAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;
        buf.fill(0);
        IMU_LAST.write(buf, self.last_message.into());
        IMU_FIRST.write(buf, self.first_message.into());
        IMU_GYRO_Z.write_f32(buf, self.gyro_z);
        IMU_ACCEL_X.write_f32(buf, self.accel_x);
        IMU_ACCEL_Y.write_f32(buf, self.accel_y);
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;
        Ok(Self {
            first_message: IMU_FIRST.read(bytes) == 1,
            last_message: IMU_LAST.read(bytes) == 1,
            gyro_z: IMU_GYRO_Z.read_f32(bytes),
            accel_x: IMU_ACCEL_X.read_f32(bytes),
            accel_y: IMU_ACCEL_Y.read_f32(bytes),
        })
    }
}

// Control loop test mode

const CONTROL_GYRO_Z: BitField = BitField::new("gyro_z", 0, 32);
const CONTROL_ACCEL_X: BitField = BitField::new("accel_x", 32, 32);
const CONTROL_ACCEL_Y: BitField = BitField::new("accel_y", 64, 32);
const CONTROL_DELTA_US: BitField = BitField::new("delta_us", 224, 32);

const fn wheel_speed(index: usize) -> BitField {
    BitField::new("wheel_speed", 96 + index * 32, 32)
}

/// ```text
/// byte 0-3    | gyro_z (f32)                       |
/// byte 4-7    | accel_x (f32)                      |
/// byte 8-11   | accel_y (f32)                      |
/// byte 12-27  | wheel_speeds[0..4] (f32, rad/s)    |
/// byte 28-31  | delta_us (u32)                     |
/// ```
pub const CONTROL_TEST_LAYOUT: [BitField; 8] = [
    CONTROL_GYRO_Z,
    CONTROL_ACCEL_X,
    CONTROL_ACCEL_Y,
    wheel_speed(0),
    wheel_speed(1),
    wheel_speed(2),
    wheel_speed(3),
    CONTROL_DELTA_US,
];

/// Raw sensor inputs of one control step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlTestFrame {
    pub gyro_z: f32,
    pub accel_x: f32,
    pub accel_y: f32,
    /// Measured wheel speeds (rad/s) in wheel order
    pub wheel_speeds: [f32; WHEEL_COUNT],
    /// Time since the previous control test frame (us)
    pub delta_us: u32,
}

impl Frame for ControlTestFrame {
    const NAME: &'static str = "ControlTestFrame";
    const LEN: usize = CONTROL_TEST_FRAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;
        CONTROL_GYRO_Z.write_f32(buf, self.gyro_z);
        CONTROL_ACCEL_X.write_f32(buf, self.accel_x);
        CONTROL_ACCEL_Y.write_f32(buf, self.accel_y);
        for (i, speed) in self.wheel_speeds.iter().enumerate() {
            wheel_speed(i).write_f32(buf, *speed);
        }
        CONTROL_DELTA_US.write(buf, self.delta_us.into());
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;
        Ok(Self {
            gyro_z: CONTROL_GYRO_Z.read_f32(bytes),
            accel_x: CONTROL_ACCEL_X.read_f32(bytes),
            accel_y: CONTROL_ACCEL_Y.read_f32(bytes),
            wheel_speeds: std::array::from_fn(|i| wheel_speed(i).read_f32(bytes)),
            delta_us: CONTROL_DELTA_US.read(bytes) as u32,
        })
    }
}

// Radio benchmarks

const RECEIVE_TIME_MS: BitField = BitField::new("receive_time_ms", 0, 32);
const RECEIVED_PACKETS: BitField = BitField::new("received_packets", 32, 32);

/// ```text
/// byte 0-3  | receive_time_ms (u32)  |
/// byte 4-7  | received_packets (u32) |
/// ```
pub const RADIO_RECEIVE_BENCHMARK_LAYOUT: [BitField; 2] = [RECEIVE_TIME_MS, RECEIVED_PACKETS];

/// Result of a radio receive benchmark
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioReceiveBenchmark {
    /// How long the radio listened (ms)
    pub receive_time_ms: u32,
    pub received_packets: u32,
}

impl RadioReceiveBenchmark {
    /// Packets received per second, if the radio listened at all
    pub fn packets_per_second(&self) -> Option<f64> {
        if self.receive_time_ms == 0 {
            return None;
        }
        Some(f64::from(self.received_packets) * 1000.0 / f64::from(self.receive_time_ms))
    }
}

impl Frame for RadioReceiveBenchmark {
    const NAME: &'static str = "RadioReceiveBenchmark";
    const LEN: usize = RADIO_RECEIVE_BENCHMARK_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;
        RECEIVE_TIME_MS.write(buf, self.receive_time_ms.into());
        RECEIVED_PACKETS.write(buf, self.received_packets.into());
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;
        Ok(Self {
            receive_time_ms: RECEIVE_TIME_MS.read(bytes) as u32,
            received_packets: RECEIVED_PACKETS.read(bytes) as u32,
        })
    }
}

const ACKNOWLEDGED_PACKETS: BitField = BitField::new("acknowledged_packets", 0, 32);
const SENT_PACKETS: BitField = BitField::new("sent_packets", 32, 32);

/// ```text
/// byte 0-3  | acknowledged_packets (u32) |
/// byte 4-7  | sent_packets (u32)         |
/// ```
pub const RADIO_SEND_BENCHMARK_LAYOUT: [BitField; 2] = [ACKNOWLEDGED_PACKETS, SENT_PACKETS];

/// Result of a radio send benchmark
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioSendBenchmark {
    pub acknowledged_packets: u32,
    pub sent_packets: u32,
}

impl RadioSendBenchmark {
    /// Fraction of sent packets that were acknowledged
    pub fn delivery_ratio(&self) -> Option<f64> {
        if self.sent_packets == 0 {
            return None;
        }
        Some(f64::from(self.acknowledged_packets) / f64::from(self.sent_packets))
    }
}

impl Frame for RadioSendBenchmark {
    const NAME: &'static str = "RadioSendBenchmark";
    const LEN: usize = RADIO_SEND_BENCHMARK_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;
        ACKNOWLEDGED_PACKETS.write(buf, self.acknowledged_packets.into());
        SENT_PACKETS.write(buf, self.sent_packets.into());
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;
        Ok(Self {
            acknowledged_packets: ACKNOWLEDGED_PACKETS.read(bytes) as u32,
            sent_packets: SENT_PACKETS.read(bytes) as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::layout::assert_tiles;

    #[test]
    fn test_layouts_fill_frames() {
        assert_tiles(&KICKER_PROGRAM_LAYOUT, KICKER_PROGRAM_FRAME_LEN);
        assert_tiles(&KICKER_TEST_LAYOUT, KICKER_TEST_FRAME_LEN);
        assert_tiles(&IMU_TEST_LAYOUT, IMU_TEST_FRAME_LEN);
        assert_tiles(&CONTROL_TEST_LAYOUT, CONTROL_TEST_FRAME_LEN);
        assert_tiles(&RADIO_RECEIVE_BENCHMARK_LAYOUT, RADIO_RECEIVE_BENCHMARK_LEN);
        assert_tiles(&RADIO_SEND_BENCHMARK_LAYOUT, RADIO_SEND_BENCHMARK_LEN);
    }

    #[test]
    fn test_kicker_program_exact_bytes() {
        let frame = KickerProgramFrame {
            kick_on_breakbeam: true,
            finished: false,
            page: 0x0102_0304,
        };
        let bytes = [0x10, 0x04, 0x03, 0x02, 0x01];
        assert_eq!(frame.encode().unwrap(), bytes);
        assert_eq!(KickerProgramFrame::decode(&bytes).unwrap(), frame);

        let done = KickerProgramFrame {
            kick_on_breakbeam: true,
            finished: true,
            page: 3,
        };
        assert_eq!(done.encode().unwrap(), [0x11, 0x03, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_kicker_test_exact_bytes() {
        let all = KickerTestFrame {
            healthy: true,
            ball_sense: true,
            kicking: true,
            kick_on_ball_sense: true,
            kick_immediately: true,
            voltage: 123,
        };
        assert_eq!(all.encode().unwrap(), [0x1F, 123]);

        // Each flag decodes from its own bit
        let frame = KickerTestFrame::decode(&[0b0000_0010, 200]).unwrap();
        assert_eq!(
            frame,
            KickerTestFrame {
                ball_sense: true,
                voltage: 200,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_imu_test_exact_bytes() {
        let frame = ImuTestFrame {
            first_message: true,
            last_message: true,
            gyro_z: -1.5,
            accel_x: 1.25,
            accel_y: 2.0,
        };
        let bytes = [
            0x11, // first, last
            0x00, 0x00, 0xC0, 0xBF, // -1.5
            0x00, 0x00, 0xA0, 0x3F, // 1.25
            0x00, 0x00, 0x00, 0x40, // 2.0
        ];
        assert_eq!(frame.encode().unwrap(), bytes);
        assert_eq!(ImuTestFrame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_control_test_exact_bytes() {
        let frame = ControlTestFrame {
            gyro_z: 2.0,
            accel_x: -1.5,
            accel_y: 0.0,
            wheel_speeds: [1.0, 0.5, -2.0, 0.0],
            delta_us: 100,
        };
        let bytes = [
            0x00, 0x00, 0x00, 0x40, // gyro_z
            0x00, 0x00, 0xC0, 0xBF, // accel_x
            0x00, 0x00, 0x00, 0x00, // accel_y
            0x00, 0x00, 0x80, 0x3F, // wheel 0
            0x00, 0x00, 0x00, 0x3F, // wheel 1
            0x00, 0x00, 0x00, 0xC0, // wheel 2
            0x00, 0x00, 0x00, 0x00, // wheel 3
            0x64, 0x00, 0x00, 0x00, // delta_us
        ];
        assert_eq!(frame.encode().unwrap(), bytes);
        assert_eq!(ControlTestFrame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_radio_benchmark_exact_bytes() {
        let receive = RadioReceiveBenchmark {
            receive_time_ms: 5000,
            received_packets: 100,
        };
        let bytes = [0x88, 0x13, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00];
        assert_eq!(receive.encode().unwrap(), bytes);
        assert_eq!(RadioReceiveBenchmark::decode(&bytes).unwrap(), receive);
        assert_eq!(receive.packets_per_second(), Some(20.0));

        let send = RadioSendBenchmark {
            acknowledged_packets: 98,
            sent_packets: 100,
        };
        let bytes = [0x62, 0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00];
        assert_eq!(send.encode().unwrap(), bytes);
        assert_eq!(RadioSendBenchmark::decode(&bytes).unwrap(), send);
        assert_eq!(send.delivery_ratio(), Some(0.98));
        assert_eq!(RadioSendBenchmark::default().delivery_ratio(), None);
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        let long = [0u8; 40];
        assert!(matches!(
            KickerProgramFrame::decode(&long[..4]),
            Err(FrameError::WrongLength { expected: 5, actual: 4, .. })
        ));
        assert!(matches!(
            KickerTestFrame::decode(&long[..3]),
            Err(FrameError::WrongLength { expected: 2, .. })
        ));
        assert!(matches!(
            ImuTestFrame::decode(&long[..12]),
            Err(FrameError::WrongLength { expected: 13, .. })
        ));
        assert!(matches!(
            ControlTestFrame::decode(&long[..33]),
            Err(FrameError::WrongLength { expected: 32, .. })
        ));
        assert!(matches!(
            RadioReceiveBenchmark::decode(&long[..7]),
            Err(FrameError::WrongLength { expected: 8, .. })
        ));
        assert!(matches!(
            RadioSendBenchmark::decode(&long[..9]),
            Err(FrameError::WrongLength { frame: "RadioSendBenchmark", .. })
        ));

        let mut buf = [0u8; 31];
        assert!(ControlTestFrame::default().encode_into(&mut buf).is_err());
    }

    #[test]
    fn test_decode_ignores_reserved_bits() {
        let frame = KickerTestFrame::decode(&[0xE0, 7]).unwrap();
        assert_eq!(
            frame,
            KickerTestFrame {
                voltage: 7,
                ..Default::default()
            }
        );
        let frame = ImuTestFrame::decode(&[0xEE; IMU_TEST_FRAME_LEN]).unwrap();
        assert!(!frame.first_message && !frame.last_message);
    }
}
