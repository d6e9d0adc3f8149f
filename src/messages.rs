// Value types passed between the control task, kinematics and the frame codec

use serde::{Deserialize, Serialize};

use crate::protocol::ControlFrame;

/// Body-frame velocity: x/y in m/s, w in rad/s (positive = counter-clockwise)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct BodyVelocity {
    pub x: f64,
    pub y: f64,
    pub w: f64,
}

impl BodyVelocity {
    pub fn new(x: f64, y: f64, w: f64) -> Self {
        Self { x, y, w }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

// A received command carries its velocity in fixed point; decode already scaled it back
impl From<&ControlFrame> for BodyVelocity {
    fn from(frame: &ControlFrame) -> Self {
        frame.velocity()
    }
}

/// Health status reported by the robot-side runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
