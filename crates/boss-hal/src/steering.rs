//! Potentiometer-fed position actuators and the swerve drive built on them.
//!
//! A [`SteeringMotor`] closes a [`BandedPid`] loop around a pot reading to
//! hold a commanded angle.  A [`DriveSide`] pairs one steering motor with a
//! drive motor and its encoder, and [`SwerveDrive`] steers two sides
//! together from a polar drive vector.

use std::sync::Arc;

use boss_types::Clock;
use tracing::trace;

use crate::math::sign_square;
use crate::pid::{BandedPid, PidGains};
use crate::registry::HardwareRegistry;

/// Pot voltage at the mechanical centre of travel.
pub const DEFAULT_CENTER_VOLTAGE: f32 = 2.5;
/// A 5 V single-turn pot.
pub const DEFAULT_VOLTS_PER_DEGREE: f32 = 5.0 / 360.0;
/// Drive encoder resolution.
pub const PULSES_PER_REVOLUTION: f32 = 250.0;

// ────────────────────────────────────────────────────────────────────────────
// SteeringMotor
// ────────────────────────────────────────────────────────────────────────────

/// Holds a motor at a commanded angle read from an analog pot.
#[derive(Debug, Clone)]
pub struct SteeringMotor {
    motor_id: String,
    pot_channel: usize,
    goal_angle: f32,
    center_voltage: f32,
    volts_per_degree: f32,
    neg_limit: f32,
    pos_limit: f32,
    pid: BandedPid,
    last_output: f32,
    rate_sample: Option<(f32, f64)>,
    last_rate: f32,
}

impl SteeringMotor {
    /// `max_speed` caps the motor command symmetrically; `wrap_around`
    /// treats the error as an angle in `[-180, 180]`.
    pub fn new(
        motor_id: impl Into<String>,
        pot_channel: usize,
        max_speed: f32,
        wrap_around: bool,
        neg_limit: f32,
        pos_limit: f32,
    ) -> Self {
        let mut pid = BandedPid::new(PidGains::default(), 1.0, wrap_around);
        pid.set_max_output(max_speed);
        Self {
            motor_id: motor_id.into(),
            pot_channel,
            goal_angle: 0.0,
            center_voltage: DEFAULT_CENTER_VOLTAGE,
            volts_per_degree: DEFAULT_VOLTS_PER_DEGREE,
            neg_limit,
            pos_limit,
            pid,
            last_output: 0.0,
            rate_sample: None,
            last_rate: 0.0,
        }
    }

    pub fn set_control_constants(&mut self, volts_per_degree: f32, center_voltage: f32, gains: PidGains) {
        self.volts_per_degree = volts_per_degree;
        self.center_voltage = center_voltage;
        self.pid.set_gains(gains);
    }

    pub fn motor_id(&self) -> &str {
        &self.motor_id
    }

    fn clamp_goal(&self, angle: f32) -> f32 {
        if angle < self.neg_limit {
            self.neg_limit
        } else if angle > self.pos_limit {
            self.pos_limit
        } else {
            angle
        }
    }

    /// Set the goal and immediately drive toward it.
    pub fn go_to_angle(&mut self, angle: f32, io: &mut HardwareRegistry) {
        self.go_to_angle_without_updating(angle);
        self.update(io);
    }

    /// Set the goal only.  Lets several axes take new goals before any of
    /// them moves.
    pub fn go_to_angle_without_updating(&mut self, angle: f32) {
        self.goal_angle = self.clamp_goal(angle);
    }

    /// Move by `delta` degrees from where the pot says we are now.
    pub fn go_to_relative_angle(&mut self, delta: f32, io: &mut HardwareRegistry) {
        let current = self.current_angle(io);
        self.go_to_angle(current + delta, io);
    }

    pub fn goal_angle(&self) -> f32 {
        self.goal_angle
    }

    /// `(center - voltage) / volts_per_degree`, with negative voltages read
    /// as zero.  Not filtered.
    pub fn current_angle(&self, io: &HardwareRegistry) -> f32 {
        if self.volts_per_degree == 0.0 {
            return 0.0;
        }
        let voltage = io.voltage(self.pot_channel).max(0.0);
        (self.center_voltage - voltage) / self.volts_per_degree
    }

    /// Run one step of the position loop and command the motor.
    ///
    /// The pot reads opposite to the motor's positive direction, so the
    /// controller output is negated before it is applied.
    pub fn update(&mut self, io: &mut HardwareRegistry) {
        self.pid.set_target(self.goal_angle);
        let angle = self.current_angle(io);
        let output = -self.pid.calculate(angle);
        self.last_output = output;
        io.apply_motor(&self.motor_id, output);
        if self.pid.is_settled() {
            self.pid.reset_error_sum();
        }
        trace!(motor = %self.motor_id, angle, goal = self.goal_angle, output, "steering update");
    }

    /// Bypass the loop and drive the motor directly.
    pub fn set_speed(&mut self, speed: f32, io: &mut HardwareRegistry) {
        self.last_output = speed;
        io.apply_motor(&self.motor_id, speed);
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    pub fn is_settled(&self) -> bool {
        self.pid.is_settled()
    }

    /// Angular rate since the previous call, from successive pot samples.
    /// The first call, or a call with no elapsed time, returns the previous
    /// estimate.
    pub fn degrees_per_second(&mut self, io: &HardwareRegistry, now_secs: f64) -> f32 {
        let angle = self.current_angle(io);
        if let Some((last_angle, last_time)) = self.rate_sample {
            let dt = (now_secs - last_time) as f32;
            if dt > 0.0 {
                self.last_rate = (angle - last_angle) / dt;
            }
        }
        self.rate_sample = Some((angle, now_secs));
        self.last_rate
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DriveSide
// ────────────────────────────────────────────────────────────────────────────

/// One steerable wheel: drive motor, drive encoder and steering motor.
pub struct DriveSide {
    drive_motor_id: String,
    encoder_id: String,
    steering: SteeringMotor,
    clock: Arc<dyn Clock>,
    last_speed: f32,
    prev_ticks: i32,
    prev_stamp: f64,
    velocity: f32,
}

impl DriveSide {
    pub fn new(
        drive_motor_id: impl Into<String>,
        encoder_id: impl Into<String>,
        steering: SteeringMotor,
        clock: Arc<dyn Clock>,
        io: &HardwareRegistry,
    ) -> Self {
        let encoder_id = encoder_id.into();
        let prev_ticks = io.encoder_count(&encoder_id).unwrap_or(0);
        let prev_stamp = clock.now_secs();
        Self {
            drive_motor_id: drive_motor_id.into(),
            encoder_id,
            steering,
            clock,
            last_speed: 0.0,
            prev_ticks,
            prev_stamp,
            velocity: 0.0,
        }
    }

    /// Command the drive motor.  A command that reverses the sign of the
    /// previous one is replaced by zero for this call.
    pub fn set(&mut self, speed: f32, io: &mut HardwareRegistry) {
        let reversing = (speed < 0.0 && self.last_speed > 0.0) || (speed > 0.0 && self.last_speed < 0.0);
        let speed = if reversing { 0.0 } else { speed };
        self.last_speed = speed;
        io.apply_motor(&self.drive_motor_id, speed);
    }

    /// Command currently held by the drive motor.
    pub fn get(&self, io: &HardwareRegistry) -> f32 {
        io.motor_output(&self.drive_motor_id).unwrap_or(0.0)
    }

    pub fn turn_to(&mut self, angle: f32, io: &mut HardwareRegistry) {
        self.steering.go_to_angle(angle, io);
    }

    /// Run the steering loop and refresh the wheel speed estimate.
    pub fn update(&mut self, io: &mut HardwareRegistry) {
        self.steering.update(io);
        self.refresh_speed(io);
    }

    /// Wheel speed in revolutions per minute as of the last update.
    pub fn speed(&self) -> f32 {
        self.velocity
    }

    pub fn steering(&self) -> &SteeringMotor {
        &self.steering
    }

    pub fn steering_mut(&mut self) -> &mut SteeringMotor {
        &mut self.steering
    }

    fn refresh_speed(&mut self, io: &HardwareRegistry) {
        let ticks = io.encoder_count(&self.encoder_id).unwrap_or(self.prev_ticks);
        let now = self.clock.now_secs();
        let revolutions = ticks.wrapping_sub(self.prev_ticks) as f32 / PULSES_PER_REVOLUTION;
        let period = (now - self.prev_stamp) as f32;
        self.prev_ticks = ticks;
        self.prev_stamp = now;
        if period > 0.0 {
            self.velocity = 60.0 * revolutions / period;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SwerveDrive
// ────────────────────────────────────────────────────────────────────────────

/// Two [`DriveSide`]s steered in unison.
pub struct SwerveDrive {
    left: DriveSide,
    right: DriveSide,
}

impl SwerveDrive {
    pub fn new(left: DriveSide, right: DriveSide) -> Self {
        Self { left, right }
    }

    /// Drive along heading `theta` (degrees) at magnitude `r`, with `skid`
    /// (sign-squared) biasing the sides against each other to rotate.
    pub fn drive_vector(&mut self, r: f32, theta: f32, skid: f32, io: &mut HardwareRegistry) {
        let skid = sign_square(skid);
        self.left.turn_to(theta, io);
        self.right.turn_to(theta, io);
        self.left.set(r - skid, io);
        self.right.set(r + skid, io);
    }

    pub fn update(&mut self, io: &mut HardwareRegistry) {
        self.left.update(io);
        self.right.update(io);
    }

    pub fn left(&self) -> &DriveSide {
        &self.left
    }

    pub fn right(&self) -> &DriveSide {
        &self.right
    }
}
