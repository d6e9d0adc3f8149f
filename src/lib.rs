// Numeric and wire-format core shared by the robot firmware and the control software
//
// - motor: omni-wheel kinematics and wheel/duty/encoder conversion
// - pid: per-axis feedback controller with bounded-window anti-windup
// - protocol: bit-exact control and status frames for the radio link
// - runtime: robot-side tick loop tying the three together

pub mod config;
pub mod messages;
pub mod motor;
pub mod pid;
pub mod protocol;
pub mod runtime;
pub mod sim;
