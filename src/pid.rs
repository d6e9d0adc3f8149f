// Discrete PID controller with bounded-window anti-windup
//
// The integral term is the sum of the last `windup` errors rather than an
// unbounded accumulator. The derivative is smoothed with a first-order
// exponential filter.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Gains and filter settings for one axis (loadable from config)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Number of recent errors summed into the integral term
    pub windup: usize,
    /// Weight of the newest raw derivative, 0..=1
    pub deriv_alpha: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            windup: 0,
            deriv_alpha: 0.0,
        }
    }
}

impl From<PidGains> for Pid {
    fn from(gains: PidGains) -> Self {
        Pid::new(gains.kp, gains.ki, gains.kd, gains.windup, gains.deriv_alpha)
    }
}

#[derive(Debug, Clone)]
pub struct Pid {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub deriv_alpha: f32,

    windup: usize,
    history: VecDeque<f32>,
    err_sum: f64,
    last_error: f32,
    last_deriv: f32,
    saturated: bool,
}

impl Pid {
    pub fn new(kp: f32, ki: f32, kd: f32, windup: usize, deriv_alpha: f32) -> Self {
        let pid = Self {
            kp,
            ki,
            kd,
            deriv_alpha,
            windup,
            history: VecDeque::new(),
            err_sum: 0.0,
            last_error: 0.0,
            last_deriv: 0.0,
            saturated: false,
        };
        pid.warn_if_integral_disabled();
        pid
    }

    /// Feed one error sample and return the control correction
    pub fn run(&mut self, err: f32) -> f32 {
        if !self.saturated && self.windup > 0 {
            if self.history.len() >= self.windup {
                self.history.pop_front();
                self.history.push_back(err);
                self.resum();
            } else {
                self.history.push_back(err);
                self.err_sum += f64::from(err);
            }
        }

        let raw_deriv = err - self.last_error;
        let deriv = self.deriv_alpha * raw_deriv + (1.0 - self.deriv_alpha) * self.last_deriv;
        self.last_error = err;
        self.last_deriv = deriv;

        self.kp * err + self.ki * self.integral() + self.kd * deriv
    }

    /// Reset all internal state except for `last_error`
    ///
    /// Keeping `last_error` means the first derivative after a reset is taken
    /// against the real previous sample instead of zero.
    pub fn reset(&mut self) {
        self.clear_windup();
        self.last_deriv = 0.0;
        self.saturated = false;
    }

    /// Clear the integral history only
    pub fn clear_windup(&mut self) {
        self.history.clear();
        self.err_sum = 0.0;
    }

    pub fn windup(&self) -> usize {
        self.windup
    }

    /// Resize the integral window, dropping the oldest samples when shrinking
    ///
    /// A window of zero disables the integral term entirely.
    pub fn set_windup(&mut self, windup: usize) {
        if self.history.len() > windup {
            let excess = self.history.len() - windup;
            self.history.drain(..excess);
            self.resum();
        }
        self.windup = windup;
        self.warn_if_integral_disabled();
    }

    /// False when the window is zero and the controller acts as a PD filter
    pub fn integral_enabled(&self) -> bool {
        self.windup > 0
    }

    /// Tell the controller whether the actuator it drives is saturated
    ///
    /// While saturated, new errors are not added to the integral window.
    pub fn set_saturated(&mut self, saturated: bool) {
        self.saturated = saturated;
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Current integral term (sum of the error window)
    pub fn integral(&self) -> f32 {
        self.err_sum as f32
    }

    /// Last smoothed derivative
    pub fn derivative(&self) -> f32 {
        self.last_deriv
    }

    pub fn last_error(&self) -> f32 {
        self.last_error
    }

    // Evicting by subtraction would leave rounding from large samples behind
    fn resum(&mut self) {
        self.err_sum = self.history.iter().map(|&e| f64::from(e)).sum();
    }

    fn warn_if_integral_disabled(&self) {
        if self.windup == 0 && self.ki != 0.0 {
            warn!(
                "PID windup is 0 with ki={}: integral term disabled, running as PD",
                self.ki
            );
        }
    }
}
