// Calibration constants, loop timing and opaque link configuration
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::motor::{DutyCycleScale, RobotGeometry};
use crate::pid::PidGains;
use crate::protocol::Team;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 60;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Accepted range for a configured loop rate
pub const MAX_LOOP_HZ: u64 = 1000;

// Longest integral window a config file may ask for
pub const MAX_WINDUP: usize = 4096;

// Robot geometry (meters / degrees, measured from body +x)
pub const WHEEL_RADIUS: f64 = 0.02786;
pub const WHEEL_DIST_FRONT: f64 = 0.0779815;
pub const WHEEL_DIST_REAR: f64 = 0.0779815;
pub const WHEEL_ANGLES_DEG: [f64; 4] = [
    180.0 - 30.0, // M1
    180.0 + 39.0, // M2
    360.0 - 39.0, // M3
    0.0 + 30.0,   // M4
];

// Wheel speed (rad/s) per unit of duty cycle, calibrated on the bench
pub const DUTY_CYCLE_MULTIPLIER: f64 = 125.0;

// Largest duty cycle magnitude the motor drivers accept
pub const MAX_DUTY: f64 = 1.0;

// Drive encoder resolution
pub const ENCODER_TICKS_PER_REV: f64 = 2048.0;

/// Calibrated geometry of the drive base
pub fn robot_geometry() -> RobotGeometry {
    RobotGeometry::from_degrees(
        WHEEL_RADIUS,
        RobotGeometry::average_distance(WHEEL_DIST_FRONT, WHEEL_DIST_REAR),
        WHEEL_ANGLES_DEG,
    )
}

pub fn duty_cycle_scale() -> DutyCycleScale {
    DutyCycleScale(DUTY_CYCLE_MULTIPLIER)
}

// nRF24L01+ pipe addresses, per team
pub const BLUE_BASE_STATION_ADDRESS: [u8; 5] = [0xE7, 0xE7, 0xE7, 0xE7, 0xE7];
pub const BLUE_ROBOT_ADDRESSES: [[u8; 5]; 6] = [
    [0xC3, 0xC3, 0xC3, 0xC3, 0xC1],
    [0xC3, 0xC3, 0xC3, 0xC3, 0xC2],
    [0xC3, 0xC3, 0xC3, 0xC3, 0xC3],
    [0xC3, 0xC3, 0xC3, 0xC3, 0xC4],
    [0xC3, 0xC3, 0xC3, 0xC3, 0xC5],
    [0xC3, 0xC3, 0xC3, 0xC3, 0xC6],
];
pub const YELLOW_BASE_STATION_ADDRESS: [u8; 5] = [0xA4, 0xA4, 0xA4, 0xA4, 0xA4];
pub const YELLOW_ROBOT_ADDRESSES: [[u8; 5]; 6] = [
    [0xD5, 0xD5, 0xD5, 0xD5, 0xD1],
    [0xD5, 0xD5, 0xD5, 0xD5, 0xD2],
    [0xD5, 0xD5, 0xD5, 0xD5, 0xD3],
    [0xD5, 0xD5, 0xD5, 0xD5, 0xD4],
    [0xD5, 0xD5, 0xD5, 0xD5, 0xD5],
    [0xD5, 0xD5, 0xD5, 0xD5, 0xD6],
];

pub fn base_station_address(team: Team) -> [u8; 5] {
    match team {
        Team::Blue => BLUE_BASE_STATION_ADDRESS,
        Team::Yellow => YELLOW_BASE_STATION_ADDRESS,
    }
}

/// Radio address of a robot, if the team has one allocated for that id
pub fn robot_radio_address(team: Team, robot_id: u8) -> Option<[u8; 5]> {
    let addresses = match team {
        Team::Blue => &BLUE_ROBOT_ADDRESSES,
        Team::Yellow => &YELLOW_ROBOT_ADDRESSES,
    };
    addresses.get(robot_id as usize).copied()
}

/// Error types for loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Network settings handed unchanged to the transport layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub ssid: String,
    pub password: String,
    pub router_ip: String,
    pub base_station_ip: String,
    /// Robot-side receive port
    pub local_port: u16,
    /// Base-station-side port the robot sends to
    pub base_station_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ssid: "rj-rc-field".to_string(),
            password: "robojackets".to_string(),
            router_ip: "172.16.1.1".to_string(),
            base_station_ip: "172.16.1.36".to_string(),
            local_port: 25566,
            base_station_port: 25565,
        }
    }
}

/// Per-axis velocity loop settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    pub loop_hz: u64,
    pub cmd_timeout_ms: u64,
    pub body_x: PidGains,
    pub body_y: PidGains,
    pub body_w: PidGains,
}

impl ControlConfig {
    pub fn cmd_timeout(&self) -> Duration {
        Duration::from_millis(self.cmd_timeout_ms)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.loop_hz.clamp(1, MAX_LOOP_HZ))
    }

    /// Reject values the control loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_LOOP_HZ).contains(&self.loop_hz) {
            return Err(ConfigError::Invalid {
                field: "control.loop_hz",
                reason: format!("{} is outside 1..={}", self.loop_hz, MAX_LOOP_HZ),
            });
        }

        let axes = [
            ("control.body_x.windup", &self.body_x),
            ("control.body_y.windup", &self.body_y),
            ("control.body_w.windup", &self.body_w),
        ];
        for (field, gains) in axes {
            if gains.windup > MAX_WINDUP {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} exceeds {}", gains.windup, MAX_WINDUP),
                });
            }
        }
        Ok(())
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        let translation = PidGains {
            kp: 0.6,
            ki: 0.05,
            kd: 0.0,
            windup: 30,
            deriv_alpha: 0.3,
        };
        Self {
            loop_hz: LOOP_HZ,
            cmd_timeout_ms: CMD_TIMEOUT.as_millis() as u64,
            body_x: translation,
            body_y: translation,
            body_w: PidGains {
                kp: 0.4,
                ki: 0.03,
                kd: 0.0,
                windup: 30,
                deriv_alpha: 0.3,
            },
        }
    }
}

/// Robot identity on the field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RobotConfig {
    pub robot_id: u8,
    pub team: Team,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            robot_id: 0,
            team: Team::Blue,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub robot: RobotConfig,
    pub network: NetworkConfig,
    pub control: ControlConfig,
}

impl Config {
    /// Load a JSON config; missing fields fall back to defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibrated_geometry_is_valid() {
        let geometry = robot_geometry();
        assert!(crate::motor::KinematicModel::new(geometry).is_ok());
        assert!((geometry.wheel_angles[0] - 150f64.to_radians()).abs() < 1e-12);
        assert!((geometry.wheel_dist - 0.0779815).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json(
            r#"{
                "robot": { "robot_id": 4, "team": "yellow" },
                "network": { "base_station_ip": "10.0.0.2" },
                "control": { "body_w": { "kp": 1.0, "ki": 0.0, "kd": 0.1, "windup": 0, "deriv_alpha": 0.5 } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.robot.robot_id, 4);
        assert_eq!(config.robot.team, Team::Yellow);
        assert_eq!(config.network.base_station_ip, "10.0.0.2");
        assert_eq!(config.network.local_port, 25566);
        assert_eq!(config.control.body_w.kd, 0.1);
        assert_eq!(config.control.body_x, ControlConfig::default().body_x);
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Config::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_reported() {
        let result = Config::load(Path::new("/nonexistent/omnidrive.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_radio_addresses() {
        assert_eq!(
            robot_radio_address(Team::Yellow, 2),
            Some([0xD5, 0xD5, 0xD5, 0xD5, 0xD3])
        );
        assert_eq!(robot_radio_address(Team::Blue, 6), None);
        assert_eq!(base_station_address(Team::Blue), [0xE7; 5]);
    }

    #[test]
    fn test_loop_rate_bounds() {
        for bad in [0, MAX_LOOP_HZ + 1, 2_000_000] {
            let text = format!(r#"{{ "control": {{ "loop_hz": {} }} }}"#, bad);
            assert!(matches!(
                Config::from_json(&text),
                Err(ConfigError::Invalid {
                    field: "control.loop_hz",
                    ..
                })
            ));
        }

        let config = Config::from_json(r#"{ "control": { "loop_hz": 1000 } }"#).unwrap();
        assert_eq!(config.control.tick_period(), Duration::from_millis(1));
    }

    #[test]
    fn test_windup_bound() {
        let config = Config::from_json(
            r#"{ "control": { "body_y": { "kp": 0.5, "ki": 0.1, "kd": 0.0, "windup": 18446744073709551615, "deriv_alpha": 0.3 } } }"#,
        );
        assert!(matches!(
            config,
            Err(ConfigError::Invalid {
                field: "control.body_y.windup",
                ..
            })
        ));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_tick_period() {
        let control = ControlConfig {
            loop_hz: 50,
            ..Default::default()
        };
        assert_eq!(control.tick_period(), Duration::from_millis(20));
    }
}
