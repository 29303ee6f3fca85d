//! In-process simulated drivers for running the robot without hardware.
//!
//! Every simulated driver keeps its state behind a shared [`Probe`] so that
//! tests (and the [`SimPlant`] model) can observe outputs and inject sensor
//! readings while the [`HardwareRegistry`] owns the driver itself.
//!
//! # Example
//!
//! ```rust
//! use boss_hal::ports;
//! use boss_hal::sim::SimRobot;
//!
//! let mut hw = SimRobot::new().with_drive_base().build();
//! hw.registry.apply_motor(ports::LEFT_FRONT_DRIVE, 0.5);
//! assert_eq!(hw.probes.motor(ports::LEFT_FRONT_DRIVE), 0.5);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use boss_types::{BossError, RelayDirection};
use parking_lot::Mutex;

use crate::analog::{AnalogBank, sample_once};
use crate::motor::SpeedController;
use crate::ports;
use crate::registry::HardwareRegistry;
use crate::relay::{Relay, Solenoid};
use crate::sensor::{AnalogSource, DigitalInput, Gyro, QuadEncoder};

/// Shared view into a simulated driver's state.
pub type Probe<T> = Arc<Mutex<T>>;

fn probe<T>(value: T) -> Probe<T> {
    Arc::new(Mutex::new(value))
}

// ────────────────────────────────────────────────────────────────────────────
// Outputs
// ────────────────────────────────────────────────────────────────────────────

/// Simulated speed controller.  Clips commands to `[-1, 1]`.
pub struct SimMotor {
    id: String,
    value: Probe<f32>,
}

impl SimMotor {
    pub fn new(id: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            value: probe(0.0),
        })
    }

    pub fn probe(&self) -> Probe<f32> {
        self.value.clone()
    }
}

impl SpeedController for SimMotor {
    fn id(&self) -> &str {
        &self.id
    }

    fn set(&mut self, speed: f32) -> Result<(), BossError> {
        if !speed.is_finite() {
            return Err(BossError::HardwareFault {
                component: self.id.clone(),
                details: format!("non-finite command {speed}"),
            });
        }
        *self.value.lock() = speed.clamp(-1.0, 1.0);
        Ok(())
    }

    fn get(&self) -> f32 {
        *self.value.lock()
    }
}

pub struct SimSolenoid {
    id: String,
    on: Probe<bool>,
}

impl SimSolenoid {
    pub fn new(id: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            on: probe(false),
        })
    }

    pub fn probe(&self) -> Probe<bool> {
        self.on.clone()
    }
}

impl Solenoid for SimSolenoid {
    fn id(&self) -> &str {
        &self.id
    }

    fn set(&mut self, on: bool) -> Result<(), BossError> {
        *self.on.lock() = on;
        Ok(())
    }

    fn get(&self) -> bool {
        *self.on.lock()
    }
}

pub struct SimRelay {
    id: String,
    direction: Probe<RelayDirection>,
}

impl SimRelay {
    pub fn new(id: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            direction: probe(RelayDirection::Off),
        })
    }

    pub fn probe(&self) -> Probe<RelayDirection> {
        self.direction.clone()
    }
}

impl Relay for SimRelay {
    fn id(&self) -> &str {
        &self.id
    }

    fn set(&mut self, direction: RelayDirection) -> Result<(), BossError> {
        *self.direction.lock() = direction;
        Ok(())
    }

    fn get(&self) -> RelayDirection {
        *self.direction.lock()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

pub struct SimEncoder {
    id: String,
    count: Probe<i32>,
    distance_per_pulse: f64,
}

impl SimEncoder {
    pub fn new(id: impl Into<String>, distance_per_pulse: f64) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            count: probe(0),
            distance_per_pulse,
        })
    }

    pub fn probe(&self) -> Probe<i32> {
        self.count.clone()
    }
}

impl QuadEncoder for SimEncoder {
    fn id(&self) -> &str {
        &self.id
    }

    fn count(&self) -> i32 {
        *self.count.lock()
    }

    fn distance(&self) -> f64 {
        f64::from(self.count()) * self.distance_per_pulse
    }

    fn reset(&mut self) {
        *self.count.lock() = 0;
    }
}

pub struct SimGyro {
    angle: Probe<f32>,
}

impl SimGyro {
    pub fn new() -> Box<Self> {
        Box::new(Self { angle: probe(0.0) })
    }

    pub fn probe(&self) -> Probe<f32> {
        self.angle.clone()
    }
}

impl Gyro for SimGyro {
    fn angle(&self) -> f32 {
        *self.angle.lock()
    }

    fn reset(&mut self) {
        *self.angle.lock() = 0.0;
    }
}

pub struct SimDigital {
    id: String,
    value: Probe<bool>,
}

impl SimDigital {
    pub fn new(id: impl Into<String>, initial: bool) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            value: probe(initial),
        })
    }

    pub fn probe(&self) -> Probe<bool> {
        self.value.clone()
    }
}

impl DigitalInput for SimDigital {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self) -> bool {
        *self.value.lock()
    }
}

/// Simulated analog channel.  `None` models a failed read.
pub struct SimAnalog {
    channel: usize,
    voltage: Probe<Option<f32>>,
}

impl SimAnalog {
    pub fn new(channel: usize, initial: f32) -> Box<Self> {
        Box::new(Self {
            channel,
            voltage: probe(Some(initial)),
        })
    }

    pub fn probe(&self) -> Probe<Option<f32>> {
        self.voltage.clone()
    }
}

impl AnalogSource for SimAnalog {
    fn channel(&self) -> usize {
        self.channel
    }

    fn sample(&mut self) -> Option<f32> {
        *self.voltage.lock()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Probes
// ────────────────────────────────────────────────────────────────────────────

/// Handles to every simulated driver built by [`SimRobot`], keyed by id.
#[derive(Clone, Default)]
pub struct SimProbes {
    motors: HashMap<String, Probe<f32>>,
    solenoids: HashMap<String, Probe<bool>>,
    relays: HashMap<String, Probe<RelayDirection>>,
    encoders: HashMap<String, Probe<i32>>,
    digital: HashMap<String, Probe<bool>>,
    gyro: Option<Probe<f32>>,
    analog: HashMap<usize, Probe<Option<f32>>>,
    bank: AnalogBank,
}

impl SimProbes {
    /// Last command on a motor; `0.0` if unknown.
    pub fn motor(&self, id: &str) -> f32 {
        self.motors.get(id).map(|p| *p.lock()).unwrap_or(0.0)
    }

    pub fn solenoid(&self, id: &str) -> Option<bool> {
        self.solenoids.get(id).map(|p| *p.lock())
    }

    pub fn relay(&self, id: &str) -> Option<RelayDirection> {
        self.relays.get(id).map(|p| *p.lock())
    }

    pub fn encoder(&self, id: &str) -> i32 {
        self.encoders.get(id).map(|p| *p.lock()).unwrap_or(0)
    }

    pub fn set_encoder(&self, id: &str, count: i32) {
        if let Some(p) = self.encoders.get(id) {
            *p.lock() = count;
        }
    }

    pub fn add_encoder_ticks(&self, id: &str, delta: i32) {
        if let Some(p) = self.encoders.get(id) {
            let mut count = p.lock();
            *count = count.wrapping_add(delta);
        }
    }

    pub fn gyro(&self) -> f32 {
        self.gyro.as_ref().map(|p| *p.lock()).unwrap_or(0.0)
    }

    pub fn set_gyro(&self, angle: f32) {
        if let Some(p) = self.gyro.as_ref() {
            *p.lock() = angle;
        }
    }

    pub fn set_digital(&self, id: &str, value: bool) {
        if let Some(p) = self.digital.get(id) {
            *p.lock() = value;
        }
    }

    /// Current simulated voltage on a channel, if the channel exists and
    /// is not failing.
    pub fn voltage(&self, channel: usize) -> Option<f32> {
        self.analog.get(&channel).and_then(|p| *p.lock())
    }

    /// Set a channel's voltage.  The value is published to the analog bank
    /// at once as well as on the sampler's next pass.
    pub fn set_voltage(&self, channel: usize, voltage: f32) {
        if let Some(p) = self.analog.get(&channel) {
            *p.lock() = Some(voltage);
        }
        self.bank.store(channel, voltage);
    }

    /// Make a channel's reads fail until the next `set_voltage`.
    pub fn fail_analog(&self, channel: usize) {
        if let Some(p) = self.analog.get(&channel) {
            *p.lock() = None;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// Distance per drive encoder pulse: a 4.25 in wheel and 300 pulses/rev.
pub const DRIVE_DISTANCE_PER_PULSE: f64 = 4.25 * 2.0 * std::f64::consts::PI / 300.0;
/// Degrees of intake roller per encoder pulse.
pub const INTAKE_DEGREES_PER_PULSE: f64 = 360.0 / 100.0;

/// A simulated robot: populated registry, probes and analog sources.
pub struct SimHardware {
    pub registry: HardwareRegistry,
    pub probes: SimProbes,
    pub sources: Vec<Box<dyn AnalogSource>>,
}

impl SimHardware {
    /// Run one synchronous sampler pass.  Tests use this in place of a
    /// background [`AnalogSampler`][crate::analog::AnalogSampler].
    pub fn pump_analog(&mut self) -> usize {
        sample_once(&mut self.sources, self.registry.analog())
    }
}

/// Builder for a [`SimHardware`] with the robot's standard layout.
pub struct SimRobot {
    registry: HardwareRegistry,
    probes: SimProbes,
    sources: Vec<Box<dyn AnalogSource>>,
}

impl SimRobot {
    pub fn new() -> Self {
        let registry = HardwareRegistry::new();
        let probes = SimProbes {
            bank: registry.analog().clone(),
            ..SimProbes::default()
        };
        Self {
            registry,
            probes,
            sources: Vec::new(),
        }
    }

    /// Every subsystem the robot carries.
    pub fn full() -> Self {
        Self::new()
            .with_drive_base()
            .with_pneumatics()
            .with_arm()
            .with_kicker()
            .with_auto_switches()
    }

    /// Four drive motors, the gear shifter, both drive encoders and the gyro.
    pub fn with_drive_base(mut self) -> Self {
        for id in ports::LEFT_DRIVE_MOTORS.iter().chain(ports::RIGHT_DRIVE_MOTORS.iter()) {
            self = self.with_motor(id);
        }
        self = self.with_solenoid(ports::GEAR_SWITCH);
        self = self.with_encoder(ports::LEFT_DRIVE_ENCODER, DRIVE_DISTANCE_PER_PULSE);
        self = self.with_encoder(ports::RIGHT_DRIVE_ENCODER, DRIVE_DISTANCE_PER_PULSE);
        let gyro = SimGyro::new();
        self.probes.gyro = Some(gyro.probe());
        self.registry.register_gyro(gyro);
        self
    }

    /// Compressor relay and pressure switch (reads "not full").
    pub fn with_pneumatics(self) -> Self {
        self.with_relay(ports::COMPRESSOR)
            .with_digital(ports::PRESSURE_SWITCH, false)
    }

    /// Shoulder motors, brake, elbow valve and the two arm pots.
    pub fn with_arm(self) -> Self {
        self.with_motor(ports::SHOULDER_MOTOR_1)
            .with_motor(ports::SHOULDER_MOTOR_2)
            .with_solenoid(ports::SHOULDER_BRAKE)
            .with_solenoid(ports::ELBOW_SWITCH)
            .with_analog(ports::SHOULDER_SENSOR_CHANNEL, 0.1)
            .with_analog(ports::ELBOW_SENSOR_CHANNEL, 4.5)
    }

    /// Kicker motor, winch relays, intake and their sensors.
    pub fn with_kicker(self) -> Self {
        self.with_motor(ports::KICKER_MOTOR)
            .with_relay(ports::KICKER_WINCH_1)
            .with_relay(ports::KICKER_WINCH_2)
            .with_motor(ports::INTAKE_MOTOR)
            .with_encoder(ports::INTAKE_ENCODER, INTAKE_DEGREES_PER_PULSE)
            .with_analog(ports::KICKER_ENCODER_CHANNEL, 4.5)
            .with_analog(ports::KICKER_WINCH_SENSOR_CHANNEL, 0.0)
    }

    /// Autonomous selector switches.  They are active-low, so `true`
    /// (open) everywhere selects zero.
    pub fn with_auto_switches(mut self) -> Self {
        for id in ports::AUTO_SWITCH_A.iter().chain(ports::AUTO_SWITCH_B.iter()) {
            self = self.with_digital(id, true);
        }
        self
    }

    pub fn with_motor(mut self, id: &str) -> Self {
        let motor = SimMotor::new(id);
        self.probes.motors.insert(id.to_string(), motor.probe());
        self.registry.register_motor(motor);
        self
    }

    pub fn with_solenoid(mut self, id: &str) -> Self {
        let solenoid = SimSolenoid::new(id);
        self.probes.solenoids.insert(id.to_string(), solenoid.probe());
        self.registry.register_solenoid(solenoid);
        self
    }

    pub fn with_relay(mut self, id: &str) -> Self {
        let relay = SimRelay::new(id);
        self.probes.relays.insert(id.to_string(), relay.probe());
        self.registry.register_relay(relay);
        self
    }

    pub fn with_encoder(mut self, id: &str, distance_per_pulse: f64) -> Self {
        let encoder = SimEncoder::new(id, distance_per_pulse);
        self.probes.encoders.insert(id.to_string(), encoder.probe());
        self.registry.register_encoder(encoder);
        self
    }

    pub fn with_digital(mut self, id: &str, initial: bool) -> Self {
        let input = SimDigital::new(id, initial);
        self.probes.digital.insert(id.to_string(), input.probe());
        self.registry.register_digital(input);
        self
    }

    pub fn with_analog(mut self, channel: usize, initial: f32) -> Self {
        let source = SimAnalog::new(channel, initial);
        self.probes.analog.insert(channel, source.probe());
        self.registry.analog().store(channel, initial);
        self.sources.push(source);
        self
    }

    pub fn build(self) -> SimHardware {
        SimHardware {
            registry: self.registry,
            probes: self.probes,
            sources: self.sources,
        }
    }
}

impl Default for SimRobot {
    fn default() -> Self {
        Self::new()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Plant model
// ────────────────────────────────────────────────────────────────────────────

/// Drive encoder ticks per second at full command.
pub const DRIVE_TICKS_PER_SEC: f64 = 1_500.0;
/// Heading change per second with the sides at full opposite command.
pub const TURN_DEG_PER_SEC: f64 = 180.0;
/// Pot travel per second at full command.
pub const SHOULDER_VOLTS_PER_SEC: f32 = 2.0;
pub const ELBOW_VOLTS_PER_SEC: f32 = 2.0;
pub const KICKER_VOLTS_PER_SEC: f32 = 10.0;
pub const WINCH_VOLTS_PER_SEC: f32 = 1.0;
/// Intake encoder ticks per second at full command, free and loaded.
pub const INTAKE_FREE_TICKS_PER_SEC: f64 = 500.0;
pub const INTAKE_LOADED_TICKS_PER_SEC: f64 = 20.0;

/// Crude kinematic model that turns motor commands into sensor motion.
///
/// Good enough to close every loop on the robot in simulation; not a
/// dynamics model.
pub struct SimPlant {
    probes: SimProbes,
    left_carry: f64,
    right_carry: f64,
    intake_carry: f64,
    ball_loaded: bool,
}

impl SimPlant {
    pub fn new(probes: SimProbes) -> Self {
        Self {
            probes,
            left_carry: 0.0,
            right_carry: 0.0,
            intake_carry: 0.0,
            ball_loaded: false,
        }
    }

    /// Whether a ball is jammed against the intake roller.
    pub fn set_ball_loaded(&mut self, loaded: bool) {
        self.ball_loaded = loaded;
    }

    pub fn probes(&self) -> &SimProbes {
        &self.probes
    }

    /// Advance the model by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        let p = &self.probes;

        // Right-side motors are mounted mirrored and receive negated commands.
        let left = f64::from(p.motor(ports::LEFT_FRONT_DRIVE));
        let right = -f64::from(p.motor(ports::RIGHT_FRONT_DRIVE));
        self.left_carry += left * DRIVE_TICKS_PER_SEC * dt;
        self.right_carry += right * DRIVE_TICKS_PER_SEC * dt;
        let (l, r) = (self.left_carry.trunc(), self.right_carry.trunc());
        self.left_carry -= l;
        self.right_carry -= r;
        p.add_encoder_ticks(ports::LEFT_DRIVE_ENCODER, l as i32);
        p.add_encoder_ticks(ports::RIGHT_DRIVE_ENCODER, r as i32);
        p.set_gyro(p.gyro() + ((left - right) * 0.5 * TURN_DEG_PER_SEC * dt) as f32);

        let dt32 = dt as f32;

        if let Some(v) = p.voltage(ports::SHOULDER_SENSOR_CHANNEL) {
            let motor = p.motor(ports::SHOULDER_MOTOR_1);
            p.set_voltage(
                ports::SHOULDER_SENSOR_CHANNEL,
                (v - motor * SHOULDER_VOLTS_PER_SEC * dt32).clamp(0.0, 5.0),
            );
        }

        // The drive motors wind the lifting winch while raising.
        if let Some(v) = p.voltage(ports::ELBOW_SENSOR_CHANNEL) {
            let pull = left.max(0.0) as f32;
            p.set_voltage(
                ports::ELBOW_SENSOR_CHANNEL,
                (v - pull * ELBOW_VOLTS_PER_SEC * dt32).clamp(0.0, 5.0),
            );
        }

        if let Some(v) = p.voltage(ports::KICKER_ENCODER_CHANNEL) {
            let motor = p.motor(ports::KICKER_MOTOR);
            p.set_voltage(
                ports::KICKER_ENCODER_CHANNEL,
                (v + motor * KICKER_VOLTS_PER_SEC * dt32).rem_euclid(5.0),
            );
        }

        if let Some(v) = p.voltage(ports::KICKER_WINCH_SENSOR_CHANNEL) {
            let direction = match p.relay(ports::KICKER_WINCH_1) {
                Some(RelayDirection::Forward) => 1.0,
                Some(RelayDirection::Reverse) => -1.0,
                _ => 0.0,
            };
            p.set_voltage(
                ports::KICKER_WINCH_SENSOR_CHANNEL,
                (v + direction * WINCH_VOLTS_PER_SEC * dt32).clamp(0.0, 5.0),
            );
        }

        let rate = if self.ball_loaded {
            INTAKE_LOADED_TICKS_PER_SEC
        } else {
            INTAKE_FREE_TICKS_PER_SEC
        };
        self.intake_carry += f64::from(p.motor(ports::INTAKE_MOTOR)) * rate * dt;
        let ticks = self.intake_carry.trunc();
        self.intake_carry -= ticks;
        p.add_encoder_ticks(ports::INTAKE_ENCODER, ticks as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_motor_clips_and_rejects_nan() {
        let mut motor = SimMotor::new("m");
        motor.set(2.0).unwrap();
        assert_eq!(motor.get(), 1.0);
        assert!(motor.set(f32::NAN).is_err());
        assert_eq!(motor.get(), 1.0);
    }

    #[test]
    fn full_robot_registers_every_port() {
        let hw = SimRobot::full().build();
        for id in ports::LEFT_DRIVE_MOTORS
            .iter()
            .chain(ports::RIGHT_DRIVE_MOTORS.iter())
            .chain(ports::SHOULDER_MOTORS.iter())
            .chain([ports::KICKER_MOTOR, ports::INTAKE_MOTOR].iter())
        {
            assert_eq!(hw.registry.motor_output(id), Some(0.0), "{id}");
        }
        assert_eq!(hw.registry.relay(ports::COMPRESSOR), Some(RelayDirection::Off));
        assert_eq!(hw.registry.digital(ports::PRESSURE_SWITCH), Some(false));
        assert_eq!(hw.registry.gyro_angle(), Some(0.0));
        assert_eq!(hw.registry.voltage(ports::ELBOW_SENSOR_CHANNEL), 4.5);
        assert_eq!(hw.sources.len(), 4);
    }

    #[test]
    fn failed_analog_read_keeps_bank_value() {
        let mut hw = SimRobot::new().with_arm().build();
        hw.probes.set_voltage(ports::SHOULDER_SENSOR_CHANNEL, 1.5);
        hw.probes.fail_analog(ports::SHOULDER_SENSOR_CHANNEL);
        hw.pump_analog();
        assert_eq!(hw.registry.voltage(ports::SHOULDER_SENSOR_CHANNEL), 1.5);
    }

    #[test]
    fn plant_moves_encoders_and_heading() {
        let mut hw = SimRobot::new().with_drive_base().build();
        let mut plant = SimPlant::new(hw.probes.clone());
        for id in ports::LEFT_DRIVE_MOTORS {
            hw.registry.apply_motor(id, 1.0);
        }
        for id in ports::RIGHT_DRIVE_MOTORS {
            hw.registry.apply_motor(id, -1.0);
        }
        for _ in 0..4 {
            plant.step(0.25);
        }
        assert_eq!(hw.registry.encoder_count(ports::LEFT_DRIVE_ENCODER), Some(1_500));
        assert_eq!(hw.registry.encoder_count(ports::RIGHT_DRIVE_ENCODER), Some(1_500));
        assert!(hw.registry.gyro_angle().unwrap().abs() < 1e-3, "straight line");
    }

    #[test]
    fn plant_respects_encoder_reset() {
        let mut hw = SimRobot::new().with_drive_base().build();
        let mut plant = SimPlant::new(hw.probes.clone());
        hw.registry.apply_motor(ports::LEFT_FRONT_DRIVE, 1.0);
        plant.step(0.25);
        hw.registry.reset_encoder(ports::LEFT_DRIVE_ENCODER);
        plant.step(0.25);
        assert_eq!(hw.registry.encoder_count(ports::LEFT_DRIVE_ENCODER), Some(375));
    }

    #[test]
    fn loaded_intake_turns_slowly() {
        let hw = SimRobot::new().with_kicker().build();
        let mut plant = SimPlant::new(hw.probes.clone());
        let mut registry = hw.registry;
        registry.apply_motor(ports::INTAKE_MOTOR, 1.0);
        plant.set_ball_loaded(true);
        plant.step(1.0);
        assert_eq!(registry.encoder_count(ports::INTAKE_ENCODER), Some(20));
    }
}
