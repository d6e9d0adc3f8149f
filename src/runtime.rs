// Robot-side control tick with command watchdog
//
// Each tick: take the latest ControlFrame addressed to this robot, estimate
// body velocity from encoder deltas, correct it per axis with a PID, convert
// to duty cycles and report saturation back to the controllers.
// If no frame arrives within the command timeout the robot stops.
// A power-down command holds the wheels at zero until a wake-up arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{
    Config, ConfigError, ControlConfig, RobotConfig, duty_cycle_scale, robot_geometry,
};
use crate::messages::{BodyVelocity, RuntimeHealth};
use crate::motor::{DutyCommand, GeometryError, KinematicModel, WHEEL_COUNT, WheelDriver};
use crate::pid::Pid;
use crate::protocol::{CommandFrame, CommandKind, ControlFrame, Frame, FrameError, StatusFrame};
use crate::sim::SimulatedBase;

/// Errors that stop the runtime loop
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Invalid robot geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// One controller per body axis
pub struct AxisControllers {
    pub x: Pid,
    pub y: Pid,
    pub w: Pid,
}

impl AxisControllers {
    pub fn from_config(control: &ControlConfig) -> Self {
        Self {
            x: Pid::from(control.body_x),
            y: Pid::from(control.body_y),
            w: Pid::from(control.body_w),
        }
    }

    fn run(&mut self, error: &BodyVelocity) -> BodyVelocity {
        BodyVelocity::new(
            self.x.run(error.x as f32).into(),
            self.y.run(error.y as f32).into(),
            self.w.run(error.w as f32).into(),
        )
    }

    fn set_saturated(&mut self, saturated: bool) {
        self.x.set_saturated(saturated);
        self.y.set_saturated(saturated);
        self.w.set_saturated(saturated);
    }

    fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.w.reset();
    }
}

/// Board readings reported alongside encoder deltas
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoardHealth {
    pub battery_volts: f32,
    pub ball_sense: bool,
    pub kick_status: bool,
    pub kick_healthy: bool,
    pub motor_errors: u8,
    pub fpga_ok: bool,
}

pub struct Runtime {
    robot: RobotConfig,
    driver: WheelDriver,
    controllers: AxisControllers,
    cmd_timeout: Duration,
    latest_cmd: Option<ControlFrame>,
    cmd_received_at: Option<Instant>,
    last_deltas: [i16; WHEEL_COUNT],
    health: RuntimeHealth,
    powered_down: bool,
}

impl Runtime {
    pub fn new(robot: RobotConfig, control: &ControlConfig, driver: WheelDriver) -> Self {
        Self {
            robot,
            driver,
            controllers: AxisControllers::from_config(control),
            cmd_timeout: control.cmd_timeout(),
            latest_cmd: None,
            cmd_received_at: None,
            last_deltas: [0; WHEEL_COUNT],
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
            powered_down: false,
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn driver(&self) -> &WheelDriver {
        &self.driver
    }

    pub fn controllers(&self) -> &AxisControllers {
        &self.controllers
    }

    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Apply a wake-up or power-down command addressed to this robot
    pub fn on_command(&mut self, bytes: &[u8]) -> Result<Option<CommandKind>, FrameError> {
        let command = CommandFrame::decode(bytes).inspect_err(|e| {
            warn!("Dropping command frame: {}", e);
        })?;

        if command.robot_id != self.robot.robot_id || command.team != self.robot.team {
            debug!("Ignoring command for robot {}", command.robot_id);
            return Ok(None);
        }

        match command.kind {
            CommandKind::PowerDown => {
                info!("Power-down received, holding wheels");
                self.powered_down = true;
                self.latest_cmd = None;
                self.cmd_received_at = None;
                self.controllers.reset();
            }
            CommandKind::WakeUp => {
                info!("Wake-up received");
                self.powered_down = false;
            }
        }
        Ok(Some(command.kind))
    }

    /// Decode an incoming frame; returns whether it was addressed to this robot
    pub fn on_frame(&mut self, bytes: &[u8], now: Instant) -> Result<bool, FrameError> {
        let frame = ControlFrame::decode(bytes).inspect_err(|e| {
            warn!("Dropping control frame: {}", e);
        })?;

        if self.powered_down {
            debug!("Powered down, ignoring control frame");
            return Ok(false);
        }

        if frame.robot_id != self.robot.robot_id || frame.team != self.robot.team {
            debug!(
                "Ignoring frame for robot {} ({:?})",
                frame.robot_id, frame.team
            );
            return Ok(false);
        }

        debug!("Received command: {:?}", frame);
        self.latest_cmd = Some(frame);
        self.cmd_received_at = Some(now);
        Ok(true)
    }

    /// Target velocity after the watchdog check
    fn target_velocity(&mut self, now: Instant) -> Option<BodyVelocity> {
        let fresh = match (self.latest_cmd.as_ref(), self.cmd_received_at) {
            (Some(cmd), Some(at)) => {
                let cmd_age = now.saturating_duration_since(at);
                if cmd_age > self.cmd_timeout {
                    if self.health != RuntimeHealth::CmdStale {
                        warn!("Command stale ({:?} old), stopping robot", cmd_age);
                    }
                    None
                } else {
                    Some(cmd.velocity())
                }
            }
            _ => None,
        };

        self.health = if fresh.is_some() {
            RuntimeHealth::Ok
        } else {
            RuntimeHealth::CmdStale
        };
        fresh
    }

    /// Run one control tick with the encoder deltas measured over `dt`
    pub fn tick(
        &mut self,
        encoder_deltas: &[i16; WHEEL_COUNT],
        dt: Duration,
        now: Instant,
    ) -> DutyCommand {
        self.last_deltas = *encoder_deltas;
        let was_ok = self.health == RuntimeHealth::Ok;

        let Some(target) = self.target_velocity(now) else {
            if was_ok {
                self.controllers.reset();
            }
            return DutyCommand::default();
        };

        let measured = self.driver.estimate_body_velocity(encoder_deltas, dt);
        let error = BodyVelocity::new(
            target.x - measured.x,
            target.y - measured.y,
            target.w - measured.w,
        );
        let correction = self.controllers.run(&error);
        let commanded = BodyVelocity::new(
            target.x + correction.x,
            target.y + correction.y,
            target.w + correction.w,
        );

        let cmd = self.driver.body_to_duty(&commanded);
        self.controllers.set_saturated(cmd.saturated);
        cmd
    }

    /// Status frame for the most recent tick
    pub fn status(&self, board: &BoardHealth) -> Result<StatusFrame, FrameError> {
        let mut status = StatusFrame {
            robot_id: self.robot.robot_id,
            team: self.robot.team,
            ball_sense_status: board.ball_sense,
            kick_status: board.kick_status,
            kick_healthy: board.kick_healthy,
            motor_errors: board.motor_errors,
            fpga_status: board.fpga_ok,
            ..Default::default()
        }
        .with_battery_volts(board.battery_volts)?;

        // Drive wheels occupy the first encoder slots, in wheel order
        status.encoder_deltas[..WHEEL_COUNT].copy_from_slice(&self.last_deltas);
        Ok(status)
    }
}

/// Bench simulation: the control software and the robot exchange real frames
/// in-process while the robot drives a simulated base
///
/// Returns the last body velocity the software side estimated from telemetry.
pub async fn run(
    config: Config,
    target: BodyVelocity,
    ticks: u64,
) -> Result<BodyVelocity, RuntimeError> {
    config.validate()?;
    let model = Arc::new(KinematicModel::new(robot_geometry())?);
    let observer = WheelDriver::new(model.clone(), duty_cycle_scale());
    let driver = WheelDriver::new(model, duty_cycle_scale());

    let mut runtime = Runtime::new(config.robot, &config.control, driver);
    let mut base = SimulatedBase::new();
    let board = BoardHealth {
        battery_volts: 16.0,
        kick_healthy: true,
        fpga_ok: true,
        ..Default::default()
    };

    let period = config.control.tick_period();
    let mut tick = interval(period);
    let log_every = config.control.loop_hz.max(1);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        config.control.loop_hz, config.control.cmd_timeout_ms
    );
    info!(
        "Robot {} ({:?}), base station {}:{}",
        config.robot.robot_id,
        config.robot.team,
        config.network.base_station_ip,
        config.network.base_station_port
    );

    let command = ControlFrame {
        robot_id: config.robot.robot_id,
        team: config.robot.team,
        ..Default::default()
    }
    .with_velocity(&target);

    let mut deltas = [0i16; WHEEL_COUNT];
    let mut estimate = BodyVelocity::zero();

    for n in 0..ticks {
        tick.tick().await;
        let now = Instant::now();

        // 1. Software -> robot
        let bytes = command.encode()?;
        runtime.on_frame(&bytes, now)?;

        // 2. Robot control tick against the simulated wheels
        let duty = runtime.tick(&deltas, period, now);
        let speeds = base.step(runtime.driver(), &duty.duty, period);
        deltas = runtime.driver().wheel_speeds_to_encoder_deltas(&speeds, period);

        // 3. Robot -> software
        let status_bytes = runtime.status(&board)?.encode()?;
        let status = StatusFrame::decode(&status_bytes)?;
        let mut wheel_deltas = [0i16; WHEEL_COUNT];
        wheel_deltas.copy_from_slice(&status.encoder_deltas[..WHEEL_COUNT]);
        estimate = observer.estimate_body_velocity(&wheel_deltas, period);

        if n % log_every == 0 {
            info!(
                "tick {}: estimate x={:.3} y={:.3} w={:.3}, battery {:.2}V, saturated={}",
                n,
                estimate.x,
                estimate.y,
                estimate.w,
                status.battery_volts(),
                duty.saturated
            );
        }
    }

    info!("Simulation finished after {} ticks", ticks);
    Ok(estimate)
}
