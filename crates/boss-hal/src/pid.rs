//! Discrete-time PID controllers.
//!
//! Two flavours are provided because the control loops on the robot were
//! tuned against two different formulations:
//!
//! * [`SimplePid`] – *timed*.  Integral is `Σ error·dt`, derivative is the
//!   rate of change of the error, and the output is `P + I + D`.  Used by
//!   the drive compensation loops, the shoulder, the kicker and the elbow.
//! * [`BandedPid`] – *untimed*.  Integral is a capped per-cycle error sum
//!   that is cleared inside an epsilon band and whenever the error changes
//!   side; derivative is the velocity of the measured value; the output is
//!   `P + I - D`.  Also reports when the loop has settled.  Used by the
//!   steering motors, which negate its output before applying it.
//!
//! # Example
//!
//! ```rust
//! use boss_hal::pid::SimplePid;
//!
//! let mut pid = SimplePid::new(1.0, 0.0, 0.0);
//! pid.set_target(90.0);
//! pid.set_limits(-1.0, 1.0);
//!
//! let output = pid.update(0.0, 0.01);
//! assert_eq!(output, 1.0);
//! ```

use std::sync::Arc;

use boss_types::Clock;

use crate::math::{bound, wrap_angle_error};
use crate::timer::Timer;

/// Step used when a timed update is asked to integrate over no time.
pub const MIN_DT: f32 = 0.001;

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidGains {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl PidGains {
    pub const fn new(p: f32, i: f32, d: f32) -> Self {
        Self { p, i, d }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Timed controller
// ────────────────────────────────────────────────────────────────────────────

/// Timed PID controller with optional output clamping.
///
/// Call [`SimplePid::update`] with an explicit `dt`, or attach a clock with
/// [`SimplePid::with_clock`], call [`SimplePid::start`] and use
/// [`SimplePid::update_timed`] to measure `dt` between calls.
#[derive(Debug, Clone)]
pub struct SimplePid {
    gains: PidGains,
    target: f32,
    previous_error: f32,
    integral: f32,
    output: f32,
    first_cycle: bool,
    min: Option<f32>,
    max: Option<f32>,
    timer: Option<Timer>,
}

impl SimplePid {
    /// Create an unclamped controller.
    pub fn new(p: f32, i: f32, d: f32) -> Self {
        Self {
            gains: PidGains::new(p, i, d),
            target: 0.0,
            previous_error: 0.0,
            integral: 0.0,
            output: 0.0,
            first_cycle: true,
            min: None,
            max: None,
            timer: None,
        }
    }

    /// Create a controller that measures its own time step from `clock`.
    pub fn with_clock(p: f32, i: f32, d: f32, clock: Arc<dyn Clock>) -> Self {
        let mut pid = Self::new(p, i, d);
        pid.timer = Some(Timer::new(clock));
        pid
    }

    pub fn set_gains(&mut self, p: f32, i: f32, d: f32) {
        self.gains = PidGains::new(p, i, d);
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Output of the most recent update.
    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.min = Some(min);
        self.max = Some(max);
    }

    pub fn set_min(&mut self, min: f32) {
        self.min = Some(min);
    }

    pub fn set_max(&mut self, max: f32) {
        self.max = Some(max);
    }

    pub fn clear_limits(&mut self) {
        self.min = None;
        self.max = None;
    }

    /// Start (and zero) the internal timer.  No-op without a clock.
    pub fn start(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.start();
            timer.reset();
        }
    }

    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.stop();
        }
    }

    /// Zero the accumulated state.  Gains, limits and target are kept; the
    /// internal timer is stopped and must be restarted.
    pub fn reset(&mut self) {
        self.previous_error = 0.0;
        self.integral = 0.0;
        self.output = 0.0;
        self.first_cycle = true;
        if let Some(timer) = self.timer.as_mut() {
            timer.stop();
            timer.reset();
        }
    }

    /// Advance the loop by `dt` seconds.  Non-positive `dt` is replaced by
    /// [`MIN_DT`].
    pub fn update(&mut self, actual: f32, dt: f32) -> f32 {
        let dt = if dt > 0.0 { dt } else { MIN_DT };
        let error = self.target - actual;
        self.integral += error * dt;
        let derivative = if self.first_cycle {
            0.0
        } else {
            (error - self.previous_error) / dt
        };
        self.first_cycle = false;
        self.previous_error = error;

        let raw = self.gains.p * error + self.gains.i * self.integral + self.gains.d * derivative;
        self.output = bound(raw, self.min, self.max);
        self.output
    }

    /// Advance the loop by the time elapsed since the previous timed update
    /// (or since [`SimplePid::start`]).
    pub fn update_timed(&mut self, actual: f32) -> f32 {
        let dt = match self.timer.as_mut() {
            Some(timer) => {
                let elapsed = timer.get() as f32;
                timer.reset();
                elapsed
            }
            None => 0.0,
        };
        self.update(actual, dt)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Banded controller
// ────────────────────────────────────────────────────────────────────────────

/// Default number of consecutive in-band samples before a loop counts as
/// settled.
pub const DEFAULT_MIN_DONE_CYCLES: u32 = 10;

/// Untimed PID controller with an epsilon band and settle detection.
#[derive(Debug, Clone)]
pub struct BandedPid {
    gains: PidGains,
    target: f32,
    previous_value: f32,
    error_sum: f32,
    error_increment: f32,
    epsilon: f32,
    angle_wrap: bool,
    first_cycle: bool,
    min_output: f32,
    max_output: f32,
    min_done_cycles: u32,
    in_band_cycles: u32,
}

impl BandedPid {
    pub fn new(gains: PidGains, epsilon: f32, angle_wrap: bool) -> Self {
        Self {
            gains,
            target: 0.0,
            previous_value: 0.0,
            error_sum: 0.0,
            error_increment: 1.0,
            epsilon,
            angle_wrap,
            first_cycle: true,
            min_output: -1.0,
            max_output: 1.0,
            min_done_cycles: DEFAULT_MIN_DONE_CYCLES,
            in_band_cycles: 0,
        }
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon;
    }

    /// Largest amount a single cycle may add to the error sum.
    pub fn set_error_increment(&mut self, increment: f32) {
        self.error_increment = increment;
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Symmetric output ceiling.  Values outside `[0, 1]` are ignored.
    pub fn set_max_output(&mut self, max: f32) {
        if (0.0..=1.0).contains(&max) {
            self.min_output = -max;
            self.max_output = max;
        }
    }

    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.min_output = min;
        self.max_output = max;
    }

    pub fn set_min_done_cycles(&mut self, cycles: u32) {
        self.min_done_cycles = cycles;
    }

    pub fn error_sum(&self) -> f32 {
        self.error_sum
    }

    pub fn reset_error_sum(&mut self) {
        self.error_sum = 0.0;
    }

    /// Forget all history; the next sample is treated as the first.
    pub fn reset(&mut self) {
        self.error_sum = 0.0;
        self.previous_value = 0.0;
        self.first_cycle = true;
        self.in_band_cycles = 0;
    }

    /// `target - actual`, folded into `[-180, 180]` when angle wrap is on.
    pub fn error(&self, actual: f32) -> f32 {
        let error = self.target - actual;
        if self.angle_wrap {
            wrap_angle_error(error)
        } else {
            error
        }
    }

    pub fn calculate(&mut self, current: f32) -> f32 {
        if self.first_cycle {
            self.previous_value = current;
            self.first_cycle = false;
        }

        let error = self.error(current);
        let p = self.gains.p * error;

        if error >= self.epsilon {
            if self.error_sum < 0.0 {
                self.error_sum = 0.0;
            }
            self.error_sum += error.min(self.error_increment);
        } else if error <= -self.epsilon {
            if self.error_sum > 0.0 {
                self.error_sum = 0.0;
            }
            self.error_sum += error.max(-self.error_increment);
        } else {
            self.error_sum = 0.0;
        }
        let i = self.gains.i * self.error_sum;

        let velocity = current - self.previous_value;
        let d = self.gains.d * velocity;
        self.previous_value = current;

        if error.abs() <= self.epsilon.abs() {
            self.in_band_cycles = self.in_band_cycles.saturating_add(1);
        } else {
            self.in_band_cycles = 0;
        }

        bound(p + i - d, Some(self.min_output), Some(self.max_output))
    }

    /// `true` once the last `min_done_cycles` samples were all in band.
    pub fn is_settled(&self) -> bool {
        !self.first_cycle && self.in_band_cycles >= self.min_done_cycles
    }
}
