// Wheel-level driver for the omni base
//
// Combines the kinematic model with the duty-cycle scale and encoder
// resolution, turning body velocities into motor duty cycles and encoder
// deltas back into body velocity estimates.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::kinematics::{DutyCycleScale, KinematicModel, WHEEL_COUNT, WheelSpeeds};
use crate::config::{ENCODER_TICKS_PER_REV, MAX_DUTY};
use crate::messages::BodyVelocity;

/// Duty cycles for the four drive motors
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DutyCommand {
    pub duty: [f64; WHEEL_COUNT],
    /// True if the request exceeded `MAX_DUTY` and was scaled down
    pub saturated: bool,
}

pub struct WheelDriver {
    model: Arc<KinematicModel>,
    duty_scale: DutyCycleScale,
    ticks_per_rev: f64,
}

impl WheelDriver {
    pub fn new(model: Arc<KinematicModel>, duty_scale: DutyCycleScale) -> Self {
        Self::with_encoder_resolution(model, duty_scale, ENCODER_TICKS_PER_REV)
    }

    pub fn with_encoder_resolution(
        model: Arc<KinematicModel>,
        duty_scale: DutyCycleScale,
        ticks_per_rev: f64,
    ) -> Self {
        Self {
            model,
            duty_scale,
            ticks_per_rev,
        }
    }

    pub fn model(&self) -> &KinematicModel {
        &self.model
    }

    /// Convert a body velocity to duty cycles
    ///
    /// If any wheel would exceed `MAX_DUTY`, all four are scaled down by the
    /// same factor so the direction of travel is kept.
    pub fn body_to_duty(&self, velocity: &BodyVelocity) -> DutyCommand {
        let speeds = self.model.body_to_wheel(velocity);
        let mut duty = speeds.0.map(|s| self.duty_scale.speed_to_duty(s));

        let peak = duty.iter().fold(0.0f64, |acc, d| acc.max(d.abs()));
        let saturated = peak > MAX_DUTY;
        if saturated {
            let scale = MAX_DUTY / peak;
            for d in &mut duty {
                *d *= scale;
            }
            debug!("Duty saturated (peak {:.3}), scaled by {:.3}", peak, scale);
        }

        DutyCommand { duty, saturated }
    }

    pub fn duty_to_wheel_speeds(&self, duty: &[f64; WHEEL_COUNT]) -> WheelSpeeds {
        WheelSpeeds(duty.map(|d| self.duty_scale.duty_to_speed(d)))
    }

    /// Wheel speeds from encoder tick deltas accumulated over `dt`
    pub fn encoder_deltas_to_wheel_speeds(
        &self,
        deltas: &[i16; WHEEL_COUNT],
        dt: Duration,
    ) -> WheelSpeeds {
        let secs = dt.as_secs_f64();
        if secs <= 0.0 {
            return WheelSpeeds::zero();
        }
        WheelSpeeds(deltas.map(|ticks| ticks as f64 * TAU / self.ticks_per_rev / secs))
    }

    /// Encoder tick deltas a wheel would produce at `speeds` over `dt`
    pub fn wheel_speeds_to_encoder_deltas(
        &self,
        speeds: &WheelSpeeds,
        dt: Duration,
    ) -> [i16; WHEEL_COUNT] {
        let secs = dt.as_secs_f64();
        speeds.0.map(|s| ticks_to_raw(s * secs * self.ticks_per_rev / TAU))
    }

    /// Least-squares body velocity estimate from encoder deltas
    pub fn estimate_body_velocity(
        &self,
        deltas: &[i16; WHEEL_COUNT],
        dt: Duration,
    ) -> BodyVelocity {
        let speeds = self.encoder_deltas_to_wheel_speeds(deltas, dt);
        self.model.wheel_to_body(&speeds)
    }
}

/// Round to whole ticks, clamped to the signed 16-bit range
fn ticks_to_raw(ticks: f64) -> i16 {
    let rounded = ticks.round();
    if rounded.is_nan() {
        return 0;
    }
    rounded.clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
