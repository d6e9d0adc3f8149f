// Command frame: software -> robot, wake-up and power-down requests

use super::layout::BitField;
use super::{Frame, FrameError, Team, check_len};

pub const COMMAND_FRAME_LEN: usize = 1;

const TEAM: BitField = BitField::new("team", 0, 1);
const ROBOT_ID: BitField = BitField::new("robot_id", 1, 4);
const KIND: BitField = BitField::new("command", 5, 3);

/// Bit layout of a [`CommandFrame`]
///
/// ```text
/// byte 0    | command (3)      | robot_id (4)       | team |
/// ```
pub const COMMAND_FRAME_LAYOUT: [BitField; 3] = [TEAM, ROBOT_ID, KIND];

/// Requests that change the power state of a robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    PowerDown = 0,
    WakeUp = 7,
}

impl TryFrom<u64> for CommandKind {
    type Error = FrameError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CommandKind::PowerDown),
            7 => Ok(CommandKind::WakeUp),
            _ => Err(FrameError::InvalidValue {
                field: KIND.name,
                value,
            }),
        }
    }
}

/// Power-state command addressed to one robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    pub team: Team,
    /// Id of the robot (4 bits)
    pub robot_id: u8,
    pub kind: CommandKind,
}

impl CommandFrame {
    pub fn wake_up(team: Team, robot_id: u8) -> Self {
        Self {
            team,
            robot_id,
            kind: CommandKind::WakeUp,
        }
    }

    pub fn power_down(team: Team, robot_id: u8) -> Self {
        Self {
            team,
            robot_id,
            kind: CommandKind::PowerDown,
        }
    }
}

impl Frame for CommandFrame {
    const NAME: &'static str = "CommandFrame";
    const LEN: usize = COMMAND_FRAME_LEN;

    fn encode_into(&self, buf: &mut [u8]) -> Result<(), FrameError> {
        check_len(Self::NAME, Self::LEN, buf.len())?;
        let robot_id = ROBOT_ID.check(self.robot_id.into())?;

        buf.fill(0);
        TEAM.write(buf, self.team as u64);
        ROBOT_ID.write(buf, robot_id);
        KIND.write(buf, self.kind as u64);
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        check_len(Self::NAME, Self::LEN, bytes.len())?;

        Ok(Self {
            team: Team::from_bit(TEAM.read(bytes)),
            robot_id: ROBOT_ID.read(bytes) as u8,
            kind: CommandKind::try_from(KIND.read(bytes))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::layout::assert_tiles;

    #[test]
    fn test_layout_fills_frame() {
        assert_tiles(&COMMAND_FRAME_LAYOUT, COMMAND_FRAME_LEN);
    }

    /// team=1, robot_id=3, command=7: 111_0011_1
    #[test]
    fn test_wake_up_exact_bytes() {
        let frame = CommandFrame::wake_up(Team::Yellow, 3);
        assert_eq!(frame.encode().unwrap(), vec![0xE7]);
        assert_eq!(CommandFrame::decode(&[0xE7]).unwrap(), frame);
    }

    /// team=0, robot_id=5, command=0: 000_0101_0
    #[test]
    fn test_power_down_exact_bytes() {
        let frame = CommandFrame::power_down(Team::Blue, 5);
        assert_eq!(frame.encode().unwrap(), vec![0x0A]);
        assert_eq!(CommandFrame::decode(&[0x0A]).unwrap(), frame);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(
            CommandFrame::decode(&[0xE7, 0x00]),
            Err(FrameError::WrongLength {
                frame: "CommandFrame",
                expected: 1,
                actual: 2
            })
        );
        assert!(CommandFrame::decode(&[]).is_err());
    }

    #[test]
    fn test_unknown_command_rejected() {
        // command bits = 0b011
        assert_eq!(
            CommandFrame::decode(&[0x60]),
            Err(FrameError::InvalidValue {
                field: "command",
                value: 3
            })
        );
    }

    #[test]
    fn test_robot_id_limited_to_four_bits() {
        assert!(matches!(
            CommandFrame::wake_up(Team::Blue, 16).encode(),
            Err(FrameError::FieldOverflow { field: "robot_id", width: 4, .. })
        ));
    }
}
