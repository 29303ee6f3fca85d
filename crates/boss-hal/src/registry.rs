//! [`HardwareRegistry`] – central driver registry for the control core.
//!
//! The registry owns every registered driver, keyed by its identifier, plus
//! a handle to the shared [`AnalogBank`].  Subsystems never hold drivers
//! directly; they address outputs by id (see [`crate::ports`]).
//!
//! Two flavours of output call exist:
//!
//! * `set_*` returns [`BossError::NotRegistered`] or the driver's own error.
//! * `apply_*` logs the failure at `debug` and carries on.  Control ticks use
//!   these so a missing or faulty device only loses that one output.

use std::collections::HashMap;

use boss_types::{BossError, RelayDirection};
use tracing::{debug, trace};

use crate::analog::AnalogBank;
use crate::motor::SpeedController;
use crate::relay::{Relay, Solenoid};
use crate::sensor::{DigitalInput, Gyro, QuadEncoder};

/// Central hardware driver registry.
///
/// Construct with [`HardwareRegistry::new`], register drivers, then hand the
/// registry to the robot.
#[derive(Default)]
pub struct HardwareRegistry {
    motors: HashMap<String, Box<dyn SpeedController>>,
    solenoids: HashMap<String, Box<dyn Solenoid>>,
    relays: HashMap<String, Box<dyn Relay>>,
    encoders: HashMap<String, Box<dyn QuadEncoder>>,
    digital: HashMap<String, Box<dyn DigitalInput>>,
    gyro: Option<Box<dyn Gyro>>,
    analog: AnalogBank,
}

impl HardwareRegistry {
    /// Create an empty registry with its own analog bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry reading from an existing analog bank.
    pub fn with_analog(analog: AnalogBank) -> Self {
        Self {
            analog,
            ..Self::default()
        }
    }

    // ── registration ────────────────────────────────────────────────────────
    //
    // Registering a driver under an id already in use replaces the old one.

    pub fn register_motor(&mut self, motor: Box<dyn SpeedController>) {
        self.motors.insert(motor.id().to_string(), motor);
    }

    pub fn register_solenoid(&mut self, solenoid: Box<dyn Solenoid>) {
        self.solenoids.insert(solenoid.id().to_string(), solenoid);
    }

    pub fn register_relay(&mut self, relay: Box<dyn Relay>) {
        self.relays.insert(relay.id().to_string(), relay);
    }

    pub fn register_encoder(&mut self, encoder: Box<dyn QuadEncoder>) {
        self.encoders.insert(encoder.id().to_string(), encoder);
    }

    pub fn register_digital(&mut self, input: Box<dyn DigitalInput>) {
        self.digital.insert(input.id().to_string(), input);
    }

    pub fn register_gyro(&mut self, gyro: Box<dyn Gyro>) {
        self.gyro = Some(gyro);
    }

    // ── speed controllers ───────────────────────────────────────────────────

    /// Command a motor.
    ///
    /// # Errors
    ///
    /// [`BossError::NotRegistered`] if no motor has this id, or whatever the
    /// driver reports.
    pub fn set_motor(&mut self, id: &str, speed: f32) -> Result<(), BossError> {
        match self.motors.get_mut(id) {
            Some(motor) => motor.set(speed),
            None => Err(not_registered("motor", id)),
        }
    }

    /// Command a motor, logging and skipping on failure.
    pub fn apply_motor(&mut self, id: &str, speed: f32) {
        if let Err(err) = self.set_motor(id, speed) {
            debug!(motor = id, error = %err, "motor output skipped");
        }
    }

    /// Last command sent to a motor.
    pub fn motor_output(&self, id: &str) -> Option<f32> {
        self.motors.get(id).map(|m| m.get())
    }

    // ── solenoids ───────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`BossError::NotRegistered`] if no solenoid has this id.
    pub fn set_solenoid(&mut self, id: &str, on: bool) -> Result<(), BossError> {
        match self.solenoids.get_mut(id) {
            Some(solenoid) => solenoid.set(on),
            None => Err(not_registered("solenoid", id)),
        }
    }

    pub fn apply_solenoid(&mut self, id: &str, on: bool) {
        if let Err(err) = self.set_solenoid(id, on) {
            debug!(solenoid = id, error = %err, "solenoid output skipped");
        }
    }

    pub fn solenoid(&self, id: &str) -> Option<bool> {
        self.solenoids.get(id).map(|s| s.get())
    }

    // ── relays ──────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`BossError::NotRegistered`] if no relay has this id.
    pub fn set_relay(&mut self, id: &str, direction: RelayDirection) -> Result<(), BossError> {
        match self.relays.get_mut(id) {
            Some(relay) => relay.set(direction),
            None => Err(not_registered("relay", id)),
        }
    }

    pub fn apply_relay(&mut self, id: &str, direction: RelayDirection) {
        if let Err(err) = self.set_relay(id, direction) {
            debug!(relay = id, error = %err, "relay output skipped");
        }
    }

    pub fn relay(&self, id: &str) -> Option<RelayDirection> {
        self.relays.get(id).map(|r| r.get())
    }

    // ── sensors ─────────────────────────────────────────────────────────────

    pub fn encoder_count(&self, id: &str) -> Option<i32> {
        self.encoders.get(id).map(|e| e.count())
    }

    pub fn encoder_distance(&self, id: &str) -> Option<f64> {
        self.encoders.get(id).map(|e| e.distance())
    }

    pub fn reset_encoder(&mut self, id: &str) {
        match self.encoders.get_mut(id) {
            Some(encoder) => encoder.reset(),
            None => debug!(encoder = id, "reset skipped: not registered"),
        }
    }

    pub fn digital(&self, id: &str) -> Option<bool> {
        self.digital.get(id).map(|d| d.get())
    }

    /// Gyro heading in degrees, or `None` without a gyro or when the
    /// reading is not finite.
    pub fn gyro_angle(&self) -> Option<f32> {
        let angle = self.gyro.as_ref()?.angle();
        if angle.is_finite() {
            Some(angle)
        } else {
            trace!(angle, "gyro reading discarded");
            None
        }
    }

    pub fn reset_gyro(&mut self) {
        if let Some(gyro) = self.gyro.as_mut() {
            gyro.reset();
        }
    }

    /// Last good voltage on an analog channel.
    pub fn voltage(&self, channel: usize) -> f32 {
        self.analog.voltage(channel)
    }

    pub fn analog(&self) -> &AnalogBank {
        &self.analog
    }

    // ── bulk ────────────────────────────────────────────────────────────────

    /// Zero every speed controller and turn every relay off.
    ///
    /// Solenoids keep their state so the gear and brakes do not flip.
    /// Individual failures are logged; the remaining outputs are still
    /// stopped.
    pub fn soft_stop(&mut self) {
        for (id, motor) in self.motors.iter_mut() {
            if let Err(err) = motor.set(0.0) {
                debug!(motor = %id, error = %err, "soft stop failed for motor");
            }
        }
        for (id, relay) in self.relays.iter_mut() {
            if let Err(err) = relay.set(RelayDirection::Off) {
                debug!(relay = %id, error = %err, "soft stop failed for relay");
            }
        }
    }

    pub fn motor_ids(&self) -> impl Iterator<Item = &str> {
        self.motors.keys().map(String::as_str)
    }
}

fn not_registered(kind: &str, id: &str) -> BossError {
    BossError::NotRegistered {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}
