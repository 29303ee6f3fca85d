//! Shoulder position control.
//!
//! The shoulder pot voltage is driven toward the voltage stored for the
//! current [`ArmPreset`].  Preset voltages are re-read from the tuning store
//! on every update so calibration takes effect immediately.

use std::sync::Arc;

use boss_hal::{HardwareRegistry, SimplePid, ports};
use boss_kernel::config_store::{ConfigStore, keys};
use boss_types::{ArmPreset, Clock};

#[derive(Debug)]
pub struct ArmSystem {
    pid: SimplePid,
    preset: ArmPreset,
    braked: bool,
}

impl ArmSystem {
    pub fn new(config: &mut ConfigStore, clock: Arc<dyn Clock>) -> Self {
        let p = config.param(keys::SHOULDER_P, 5.0);
        let i = config.param(keys::SHOULDER_I, 0.0);
        let d = config.param(keys::SHOULDER_D, 0.0);
        let mut pid = SimplePid::with_clock(p, i, d, clock);
        pid.set_limits(-1.0, 1.0);
        pid.start();
        Self {
            pid,
            preset: ArmPreset::Stowed,
            braked: false,
        }
    }

    pub fn preset(&self) -> ArmPreset {
        self.preset
    }

    pub fn set_preset(&mut self, preset: ArmPreset) {
        self.preset = preset;
    }

    pub fn brake(&mut self) {
        self.braked = true;
    }

    pub fn unbrake(&mut self) {
        self.braked = false;
    }

    pub fn is_braked(&self) -> bool {
        self.braked
    }

    /// Target voltage of the current preset.
    pub fn target(&self, config: &mut ConfigStore) -> f32 {
        match self.preset {
            ArmPreset::Stowed => config.param(keys::SHOULDER_STOWED_POS, 0.1),
            ArmPreset::Raised => config.param(keys::SHOULDER_RAISED_POS, 1.6),
            ArmPreset::Gtfu => config.param(keys::SHOULDER_GTFU_POS, 2.0),
        }
    }

    /// Last shoulder PID output, before negation.
    pub fn output(&self) -> f32 {
        self.pid.output()
    }

    /// Run one shoulder loop iteration and write the brake.
    ///
    /// The motors stay at zero while the pot reads outside
    /// `(shoulderMinPos, shoulderMaxPos)` or the output is inside the
    /// deadband.
    pub fn update(&mut self, io: &mut HardwareRegistry, config: &mut ConfigStore) {
        let voltage = io.voltage(ports::SHOULDER_SENSOR_CHANNEL);
        let target = self.target(config);
        let (min, max) = bounds(config);
        let deadband = config.param(keys::SHOULDER_DEADBAND, 0.1);

        self.pid.set_target(target);
        let output = self.pid.update_timed(voltage);

        let command = if voltage > min && voltage < max && output.abs() > deadband {
            -output
        } else {
            0.0
        };
        for id in ports::SHOULDER_MOTORS {
            io.apply_motor(id, command);
        }
        io.apply_solenoid(ports::SHOULDER_BRAKE, !self.braked);
    }

    /// `true` when the shoulder is in its travel and away from the target.
    pub fn needs_move(&self, io: &HardwareRegistry, config: &mut ConfigStore) -> bool {
        let voltage = io.voltage(ports::SHOULDER_SENSOR_CHANNEL);
        let target = self.target(config);
        let (min, max) = bounds(config);
        let deadband = config.param(keys::SHOULDER_DEADBAND, 0.1);
        voltage > min && voltage < max && (voltage - target).abs() > deadband
    }
}

fn bounds(config: &mut ConfigStore) -> (f32, f32) {
    (
        config.param(keys::SHOULDER_MIN_POS, 0.1),
        config.param(keys::SHOULDER_MAX_POS, 4.9),
    )
}
