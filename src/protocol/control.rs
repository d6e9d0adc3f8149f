// Control frame: software -> robot, one per control tick

use super::layout::BitField;
use super::{Frame, FrameError, ShootMode, Team, TriggerMode, check_len, from_fixed, to_fixed};
use crate::messages::BodyVelocity;

/// Body velocities are multiplied by this on send and divided on receive,
/// keeping three decimals of precision
pub const VELOCITY_SCALE_FACTOR: f32 = 1000.0;

pub const CONTROL_FRAME_LEN: usize = 11;

const ROBOT_ID: BitField = BitField::new("robot_id", 0, 5);
const TEAM: BitField = BitField::new("team", 5, 1);
const SHOOT_MODE: BitField = BitField::new("shoot_mode", 6, 1);
const TRIGGER_MODE: BitField = BitField::new("trigger_mode", 7, 2);
const BODY_X: BitField = BitField::new("body_x", 16, 16);
const BODY_Y: BitField = BitField::new("body_y", 32, 16);
const BODY_W: BitField = BitField::new("body_w", 48, 16);
const DRIBBLER_SPEED: BitField = BitField::new("dribbler_speed", 64, 8);
const KICK_STRENGTH: BitField = BitField::new("kick_strength", 72, 8);
const ROLE: BitField = BitField::new("role", 80, 2);

/// Bit layout of a [`ControlFrame`]
///
/// ```text
/// byte 0    | trig[0] | shoot | team | robot_id (5)        |
/// byte 1    | reserved (7)                       | trig[1] |
/// byte 2-3  | body_x  (i16, little-endian)                  |
/// byte 4-5  | body_y  (i16, little-endian)                  |
/// byte 6-7  | body_w  (i16, little-endian)                  |
/// byte 8    | dribbler_speed (i8)                           |
/// byte 9    | kick_strength (u8)                            |
/// byte 10   | reserved (6)                       | role (2) |
/// ```
pub const CONTROL_FRAME_LAYOUT: [BitField; 12] = [
    ROBOT_ID,
    TEAM,
    SHOOT_MODE,
    TRIGGER_MODE,
    BitField::reserved(9, 7),
    BODY_X,
    BODY_Y,
    BODY_W,
    DRIBBLER_SPEED,
    KICK_STRENGTH,
    ROLE,
    BitField::reserved(82, 6),
];

/// Command sent from the control software to one robot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlFrame {
    /// Id of the robot (5 bits)
    pub robot_id: u8,
    pub team: Team,
    pub shoot_mode: ShootMode,
    pub trigger_mode: TriggerMode,
    /// Body-frame x velocity (m/s)
    pub body_x: f32,
    /// Body-frame y velocity (m/s)
    pub body_y: f32,
    /// Body-frame angular velocity (rad/s)
    pub body_w: f32,
    pub dribbler_speed: i8,
    pub kick_strength: u8,
    /// Role of the robot (2 bits)
    pub role: u8,
}

impl ControlFrame {
    pub fn velocity(&self) -> BodyVelocity {
        BodyVelocity::new(self.body_x.into(), self.body_y.into(), self.body_w.into())
    }

    pub fn with_velocity(mut self, velocity: &BodyVelocity) -> Self {
        self.body_x = velocity.x as f32;
        self.body_y = velocity.y as f32;
        self.body_w = velocity.w as f32;
        self
    }
}

impl Frame for ControlFrame {
    const NAME: &'static str = "ControlFrame";
    const LEN: usize = CONTROL_FRAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;

        // Validate everything before touching the buffer
        let robot_id = ROBOT_ID.check(self.robot_id.into())?;
        let role = ROLE.check(self.role.into())?;
        let body_x = to_fixed(BODY_X.name, self.body_x, VELOCITY_SCALE_FACTOR)?;
        let body_y = to_fixed(BODY_Y.name, self.body_y, VELOCITY_SCALE_FACTOR)?;
        let body_w = to_fixed(BODY_W.name, self.body_w, VELOCITY_SCALE_FACTOR)?;

        buf.fill(0);
        ROBOT_ID.write(buf, robot_id);
        TEAM.write(buf, self.team as u64);
        SHOOT_MODE.write(buf, self.shoot_mode as u64);
        TRIGGER_MODE.write(buf, self.trigger_mode as u64);
        BODY_X.write_signed(buf, body_x.into());
        BODY_Y.write_signed(buf, body_y.into());
        BODY_W.write_signed(buf, body_w.into());
        DRIBBLER_SPEED.write_signed(buf, self.dribbler_speed.into());
        KICK_STRENGTH.write(buf, self.kick_strength.into());
        ROLE.write(buf, role);
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;

        Ok(Self {
            robot_id: ROBOT_ID.read(bytes) as u8,
            team: Team::from_bit(TEAM.read(bytes)),
            shoot_mode: ShootMode::from_bit(SHOOT_MODE.read(bytes)),
            trigger_mode: TriggerMode::from_bits(TRIGGER_MODE.read(bytes)),
            body_x: from_fixed(BODY_X.read_signed(bytes) as i16, VELOCITY_SCALE_FACTOR),
            body_y: from_fixed(BODY_Y.read_signed(bytes) as i16, VELOCITY_SCALE_FACTOR),
            body_w: from_fixed(BODY_W.read_signed(bytes) as i16, VELOCITY_SCALE_FACTOR),
            dribbler_speed: DRIBBLER_SPEED.read_signed(bytes) as i8,
            kick_strength: KICK_STRENGTH.read(bytes) as u8,
            role: ROLE.read(bytes) as u8,
        })
    }
}
