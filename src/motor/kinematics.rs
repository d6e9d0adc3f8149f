// Omniwheel kinematics for the four-wheel holonomic base
// Maps body-frame velocities (x, y, w) to wheel angular speeds and back.

use nalgebra::{Matrix3x4, Matrix4x3, Vector3, Vector4};

use crate::messages::BodyVelocity;

/// Number of driven omni-wheels
pub const WHEEL_COUNT: usize = 4;

/// Relative determinant below which MᵗM is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Errors raised while deriving the kinematic transform from a geometry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Wheel radius must be finite and positive, got {0}")]
    InvalidRadius(f64),

    #[error("Wheel distance must be finite, got {0}")]
    InvalidDistance(f64),

    #[error("Wheel angle {index} is not finite")]
    NonFiniteAngle { index: usize },

    #[error("Wheel configuration is degenerate (MᵗM is singular)")]
    Singular,
}

/// Physical wheel layout of the robot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotGeometry {
    /// Radius of omni-wheel (meters)
    pub wheel_radius: f64,
    /// Distance from robot center to wheel contact (meters)
    pub wheel_dist: f64,
    /// Wheel angles (radians) measured between body +x axis and wheel axle
    pub wheel_angles: [f64; WHEEL_COUNT],
}

impl RobotGeometry {
    pub fn new(wheel_radius: f64, wheel_dist: f64, wheel_angles: [f64; WHEEL_COUNT]) -> Self {
        Self {
            wheel_radius,
            wheel_dist,
            wheel_angles,
        }
    }

    /// Build a geometry from mounting angles given in degrees
    pub fn from_degrees(
        wheel_radius: f64,
        wheel_dist: f64,
        wheel_angles_deg: [f64; WHEEL_COUNT],
    ) -> Self {
        Self::new(wheel_radius, wheel_dist, wheel_angles_deg.map(f64::to_radians))
    }

    /// Front and rear wheel pairs are measured separately; the model uses their mean
    pub fn average_distance(front: f64, rear: f64) -> f64 {
        (front + rear) / 2.0
    }

    fn validate(&self) -> Result<(), GeometryError> {
        if !self.wheel_radius.is_finite() || self.wheel_radius <= 0.0 {
            return Err(GeometryError::InvalidRadius(self.wheel_radius));
        }
        if !self.wheel_dist.is_finite() {
            return Err(GeometryError::InvalidDistance(self.wheel_dist));
        }
        if let Some(index) = self.wheel_angles.iter().position(|a| !a.is_finite()) {
            return Err(GeometryError::NonFiniteAngle { index });
        }
        Ok(())
    }
}

/// Linear maps derived from a [`RobotGeometry`]
///
/// `wheel_speeds = bot_to_wheel * v_bot` and the least-squares estimate
/// `v_bot = wheel_to_bot * wheel_speeds`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicTransform {
    bot_to_wheel: Matrix4x3<f64>,
    wheel_to_bot: Matrix3x4<f64>,
}

impl KinematicTransform {
    /// Derive both matrices from a geometry
    ///
    /// Each row of the body-to-wheel matrix is `[-sin(a), cos(a), d]`, negated
    /// and divided by the wheel radius. The wheel-to-body matrix is the left
    /// pseudo-inverse `(MᵗM)⁻¹Mᵗ`.
    pub fn derive(geometry: &RobotGeometry) -> Result<Self, GeometryError> {
        geometry.validate()?;

        let angles = geometry.wheel_angles;
        let dist = geometry.wheel_dist;
        let rows = Matrix4x3::from_fn(|i, j| match j {
            0 => -angles[i].sin(),
            1 => angles[i].cos(),
            _ => dist,
        });

        // Invert because our wheels spin opposite to the reference derivation
        let bot_to_wheel = -rows / geometry.wheel_radius;

        let gram = bot_to_wheel.transpose() * bot_to_wheel;
        let det = gram.determinant();
        if !det.is_finite() || det.abs() <= SINGULAR_TOLERANCE * gram.norm().powi(3) {
            return Err(GeometryError::Singular);
        }
        let gram_inv = gram.try_inverse().ok_or(GeometryError::Singular)?;

        Ok(Self {
            bot_to_wheel,
            wheel_to_bot: gram_inv * bot_to_wheel.transpose(),
        })
    }

    /// 4x3 body-to-wheel matrix
    pub fn bot_to_wheel(&self) -> &Matrix4x3<f64> {
        &self.bot_to_wheel
    }

    /// 3x4 wheel-to-body matrix
    pub fn wheel_to_bot(&self) -> &Matrix3x4<f64> {
        &self.wheel_to_bot
    }
}

/// Angular wheel speeds in rad/s, indexed like `RobotGeometry::wheel_angles`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelSpeeds(pub [f64; WHEEL_COUNT]);

impl WheelSpeeds {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn as_array(&self) -> [f64; WHEEL_COUNT] {
        self.0
    }
}

/// Geometry paired with the transform derived from it
///
/// The two only change together through [`KinematicModel::set_geometry`], so
/// a consumer can never read matrices derived from an older geometry.
#[derive(Debug, Clone)]
pub struct KinematicModel {
    geometry: RobotGeometry,
    transform: KinematicTransform,
}

impl KinematicModel {
    pub fn new(geometry: RobotGeometry) -> Result<Self, GeometryError> {
        let transform = KinematicTransform::derive(&geometry)?;
        Ok(Self {
            geometry,
            transform,
        })
    }

    pub fn geometry(&self) -> &RobotGeometry {
        &self.geometry
    }

    pub fn transform(&self) -> &KinematicTransform {
        &self.transform
    }

    /// Replace the geometry and recompute both matrices
    ///
    /// On error the previous geometry and transform are kept.
    pub fn set_geometry(&mut self, geometry: RobotGeometry) -> Result<(), GeometryError> {
        self.transform = KinematicTransform::derive(&geometry)?;
        self.geometry = geometry;
        Ok(())
    }

    /// Convert a body velocity to wheel angular speeds
    pub fn body_to_wheel(&self, velocity: &BodyVelocity) -> WheelSpeeds {
        let v = Vector3::new(velocity.x, velocity.y, velocity.w);
        let wheels = self.transform.bot_to_wheel * v;
        WheelSpeeds([wheels[0], wheels[1], wheels[2], wheels[3]])
    }

    /// Least-squares body velocity estimate from four wheel speeds
    pub fn wheel_to_body(&self, speeds: &WheelSpeeds) -> BodyVelocity {
        let w = Vector4::from_column_slice(&speeds.0);
        let v = self.transform.wheel_to_bot * w;
        BodyVelocity::new(v[0], v[1], v[2])
    }
}

/// Empirical linear scale between wheel angular speed and actuator duty cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutyCycleScale(pub f64);

impl DutyCycleScale {
    pub fn speed_to_duty(&self, speed: f64) -> f64 {
        speed / self.0
    }

    pub fn duty_to_speed(&self, duty: f64) -> f64 {
        duty * self.0
    }
}
