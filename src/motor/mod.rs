// Motor control module for the four-wheel omni base
//
// Provides:
// - Omniwheel kinematics (body velocity <-> wheel speeds)
// - Wheel speed <-> duty cycle and encoder tick conversion

mod driver;
pub mod kinematics;

pub use driver::{DutyCommand, WheelDriver};
pub use kinematics::{
    DutyCycleScale, GeometryError, KinematicModel, KinematicTransform, RobotGeometry, WHEEL_COUNT,
    WheelSpeeds,
};
