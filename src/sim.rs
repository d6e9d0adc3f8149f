// Simulated drive base for bench runs without hardware
//
// Each wheel follows its commanded speed with a first-order lag, and only
// reaches `efficiency` of it to stand in for drivetrain losses.

use std::time::Duration;

use crate::motor::{WHEEL_COUNT, WheelDriver, WheelSpeeds};

pub const DEFAULT_TIME_CONSTANT: Duration = Duration::from_millis(50);
pub const DEFAULT_EFFICIENCY: f64 = 0.9;

pub struct SimulatedBase {
    speeds: WheelSpeeds,
    time_constant: Duration,
    efficiency: f64,
}

impl SimulatedBase {
    pub fn new() -> Self {
        Self::with_response(DEFAULT_TIME_CONSTANT, DEFAULT_EFFICIENCY)
    }

    pub fn with_response(time_constant: Duration, efficiency: f64) -> Self {
        Self {
            speeds: WheelSpeeds::zero(),
            time_constant,
            efficiency,
        }
    }

    pub fn speeds(&self) -> WheelSpeeds {
        self.speeds
    }

    /// Advance the wheels by `dt` under the given duty cycles
    pub fn step(
        &mut self,
        driver: &WheelDriver,
        duty: &[f64; WHEEL_COUNT],
        dt: Duration,
    ) -> WheelSpeeds {
        let target = driver.duty_to_wheel_speeds(duty);
        let alpha = if self.time_constant.is_zero() {
            1.0
        } else {
            (dt.as_secs_f64() / self.time_constant.as_secs_f64()).min(1.0)
        };

        for (speed, goal) in self.speeds.0.iter_mut().zip(target.0) {
            *speed += (goal * self.efficiency - *speed) * alpha;
        }
        self.speeds
    }
}

impl Default for SimulatedBase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{duty_cycle_scale, robot_geometry};
    use crate::motor::KinematicModel;
    use std::sync::Arc;

    fn driver() -> WheelDriver {
        WheelDriver::new(
            Arc::new(KinematicModel::new(robot_geometry()).unwrap()),
            duty_cycle_scale(),
        )
    }

    #[test]
    fn test_settles_at_efficiency() {
        let driver = driver();
        let mut base = SimulatedBase::new();
        let duty = [0.5, -0.5, 0.25, 0.0];
        for _ in 0..500 {
            base.step(&driver, &duty, Duration::from_millis(5));
        }

        let expected = driver.duty_to_wheel_speeds(&duty);
        for (got, want) in base.speeds().0.iter().zip(expected.0) {
            assert!((got - want * DEFAULT_EFFICIENCY).abs() < 1e-6);
        }
    }

    #[test]
    fn test_first_order_lag() {
        let driver = driver();
        let mut base = SimulatedBase::with_response(Duration::from_millis(100), 1.0);
        let speeds = base.step(&driver, &[1.0; WHEEL_COUNT], Duration::from_millis(10));
        let full = driver.duty_to_wheel_speeds(&[1.0; WHEEL_COUNT]);
        assert!((speeds.0[0] - 0.1 * full.0[0]).abs() < 1e-9);
    }
}
