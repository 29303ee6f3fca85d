//! [`KickerSystem`] – winch, kicker arm and intake.
//!
//! The kicker arm spins one way only; its position comes from an
//! [`AbsoluteEncoder`] so targets past one revolution can be expressed by
//! adding the sensor's wrap period.  A kick runs the arm a full turn back to
//! rest, cocking pulls it to the cocked angle and holds it there.
//!
//! The winch pair is bang-bang driven toward the voltage stored for the
//! selected [`KickStrength`].  Possession is inferred from the intake roller
//! slowing down.

use std::sync::Arc;

use boss_hal::input::ControlSnapshot;
use boss_hal::{AbsoluteEncoder, Flag, HardwareRegistry, SimplePid, Timer, ports};
use boss_kernel::config_store::{ConfigStore, keys};
use boss_types::{Clock, KickStrength, RelayDirection};
use tracing::debug;

/// Intake roller rate (degrees per second) below which a ball is held.
pub const POSSESSION_RATE: f64 = 180.0;
/// Window over which the intake rate is measured.
pub const POSSESSION_WINDOW_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeMode {
    Reverse,
    #[default]
    Off,
    Forward,
}

impl IntakeMode {
    fn motor_speed(self) -> f32 {
        match self {
            IntakeMode::Reverse => -1.0,
            IntakeMode::Off => 0.0,
            IntakeMode::Forward => 1.0,
        }
    }
}

#[derive(Debug)]
pub struct KickerSystem {
    strength: KickStrength,
    intake: IntakeMode,
    kicking: bool,
    started_kicking: bool,
    manual_run: bool,
    cocking: bool,
    cocking_began: bool,
    cocking_ended: bool,
    pid: SimplePid,
    encoder: AbsoluteEncoder,
    kick_trigger: Flag,
    manual_mode: Flag,
    intake_flag: Flag,
    reset_flag: Flag,
    possession: bool,
    intake_rate: f64,
    intake_timer: Timer,
}

impl KickerSystem {
    pub fn new(io: &HardwareRegistry, config: &mut ConfigStore, clock: Arc<dyn Clock>) -> Self {
        let max_voltage = config.param(keys::KICKER_ENCODER_VOLTAGE, 5.0);
        let mut pid = SimplePid::with_clock(0.0, 0.0, 0.0, clock.clone());
        pid.start();
        let mut intake_timer = Timer::new(clock);
        intake_timer.start();

        let mut kicker = Self {
            strength: KickStrength::Low,
            intake: IntakeMode::Off,
            kicking: false,
            started_kicking: false,
            manual_run: false,
            cocking: false,
            cocking_began: false,
            cocking_ended: false,
            pid,
            encoder: AbsoluteEncoder::new(ports::KICKER_ENCODER_CHANNEL, max_voltage),
            kick_trigger: Flag::default(),
            manual_mode: Flag::default(),
            intake_flag: Flag::default(),
            reset_flag: Flag::default(),
            possession: false,
            intake_rate: 0.0,
            intake_timer,
        };
        kicker.reset(io, config);
        kicker
    }

    /// Reset the kick sequence, select low strength and stop the intake.
    pub fn reset(&mut self, io: &HardwareRegistry, config: &mut ConfigStore) {
        self.reset_kicker(io, config);
        self.strength = KickStrength::Low;
        self.intake = IntakeMode::Off;
    }

    /// Abandon any kick or cock in progress and hold the arm at rest.
    pub fn reset_kicker(&mut self, io: &HardwareRegistry, config: &mut ConfigStore) {
        let rest = config.param(keys::KICKER_REST_ANGLE, 4.5);
        self.kicking = false;
        self.started_kicking = false;
        self.manual_run = false;
        self.cocking = false;
        self.cocking_began = false;
        self.cocking_ended = false;

        self.pid.set_gains(
            config.param(keys::KICKER_P, 0.8),
            config.param(keys::KICKER_I, 0.0),
            config.param(keys::KICKER_D, 0.0),
        );
        self.pid.set_limits(0.0, 1.0);

        self.encoder.reset_accumulator();
        let position = self.encoder.poll(io.analog());
        let target = if position >= rest {
            rest
        } else {
            rest - self.encoder.max_voltage()
        };
        self.pid.set_target(target);
        debug!(target, "kicker reset");
    }

    // ── commands ────────────────────────────────────────────────────────────

    /// Start a kick.  Ignored while one is already running.
    pub fn kick(&mut self) {
        if !self.kicking {
            self.kicking = true;
            self.encoder.reset_accumulator();
        }
    }

    pub fn cock(&mut self) {
        self.cocking = true;
    }

    pub fn run_intake(&mut self) {
        self.intake = IntakeMode::Forward;
    }

    pub fn stop_intake(&mut self) {
        self.intake = IntakeMode::Off;
    }

    pub fn set_strength(&mut self, strength: KickStrength) {
        self.strength = strength;
    }

    // ── queries ─────────────────────────────────────────────────────────────

    pub fn strength(&self) -> KickStrength {
        self.strength
    }

    pub fn intake(&self) -> IntakeMode {
        self.intake
    }

    pub fn is_kicking(&self) -> bool {
        self.kicking
    }

    pub fn is_cocked(&self) -> bool {
        self.cocking_ended
    }

    pub fn has_possession(&self) -> bool {
        self.possession
    }

    /// Intake roller rate from the last completed measurement window.
    pub fn intake_rate(&self) -> f64 {
        self.intake_rate
    }

    /// Raw kicker sensor voltage.
    pub fn encoder_voltage(&self) -> f32 {
        self.encoder.absolute()
    }

    pub fn encoder(&self) -> &AbsoluteEncoder {
        &self.encoder
    }

    pub fn reset_encoder_accumulator(&mut self) {
        self.encoder.reset_accumulator();
    }

    pub fn winch_target(&self, config: &mut ConfigStore) -> f32 {
        config.param(self.strength.config_key(), 0.0)
    }

    /// `true` when the winch is well outside its tolerance.
    pub fn needs_winch_update(&self, io: &HardwareRegistry, config: &mut ConfigStore) -> bool {
        let actual = io.voltage(ports::KICKER_WINCH_SENSOR_CHANNEL);
        let tolerance = config.param(keys::WINCH_POS_TOLERANCE, 0.02);
        (actual - self.winch_target(config)).abs() > tolerance * 2.0
    }

    // ── operator input ──────────────────────────────────────────────────────

    pub fn read_controls(
        &mut self,
        controls: &ControlSnapshot,
        io: &HardwareRegistry,
        config: &mut ConfigStore,
    ) {
        if controls.panel(15) {
            self.strength = KickStrength::Low;
        } else if controls.panel(11) {
            self.strength = KickStrength::Medium;
        } else if controls.panel(7) {
            self.strength = KickStrength::High;
        }

        self.reset_flag.set(controls.button(3, 10));
        if self.reset_flag.take_triggered_on() {
            self.reset_kicker(io, config);
        }

        self.kick_trigger.set(controls.trigger(3));
        if self.kick_trigger.take_triggered_on() {
            self.kick();
        }

        self.manual_mode
            .set(controls.button(3, 6) && controls.button(3, 7));
        self.manual_run = self.manual_mode.get() && self.kick_trigger.get();

        self.intake = if (2..=5).any(|b| controls.button(3, b)) {
            IntakeMode::Forward
        } else if controls.button(3, 8) {
            IntakeMode::Reverse
        } else {
            IntakeMode::Off
        };
        self.intake_flag.set(self.intake != IntakeMode::Off);
        if self.intake_flag.take_triggered_on() {
            self.cock();
        }
    }

    // ── outputs ─────────────────────────────────────────────────────────────

    /// Drive the intake, winch and kicker, then refresh possession.
    pub fn update(&mut self, io: &mut HardwareRegistry, config: &mut ConfigStore) {
        io.apply_motor(ports::INTAKE_MOTOR, self.intake.motor_speed());
        self.update_winch(io, config);
        self.update_kicker(io, config);
        self.update_possession(io);
    }

    fn update_winch(&mut self, io: &mut HardwareRegistry, config: &mut ConfigStore) {
        let direction = if self.started_kicking {
            RelayDirection::Off
        } else {
            let target = self.winch_target(config);
            let actual = io.voltage(ports::KICKER_WINCH_SENSOR_CHANNEL);
            let tolerance = config.param(keys::WINCH_POS_TOLERANCE, 0.02);
            if actual < target - tolerance {
                RelayDirection::Forward
            } else if actual > target + tolerance {
                RelayDirection::Reverse
            } else {
                RelayDirection::Off
            }
        };
        for id in ports::KICKER_WINCHES {
            io.apply_relay(id, direction);
        }
    }

    fn update_kicker(&mut self, io: &mut HardwareRegistry, config: &mut ConfigStore) {
        if self.manual_mode.get() {
            let speed = if self.manual_run { 1.0 } else { 0.0 };
            io.apply_motor(ports::KICKER_MOTOR, speed);
            return;
        } else if self.manual_mode.check_triggered_off() {
            self.reset_kicker(io, config);
        }

        let mut position = self.encoder.poll(io.analog());
        let max_voltage = self.encoder.max_voltage();
        let rest = config.param(keys::KICKER_REST_ANGLE, 4.5);
        let cocked = config.param(keys::KICKER_COCKED_ANGLE, 4.71);
        let tolerance = config.param(keys::KICKER_POS_TOLERANCE, 0.05);
        self.pid.set_gains(
            config.get_f64(keys::KICKER_P) as f32,
            config.get_f64(keys::KICKER_I) as f32,
            config.get_f64(keys::KICKER_D) as f32,
        );

        // The cocked angle sits past rest, so targets only ever move forward.
        if self.kicking {
            if !self.started_kicking {
                self.encoder.reset_accumulator();
                position = self.encoder.poll(io.analog());
                let target = if position < rest - tolerance {
                    rest
                } else {
                    rest + max_voltage
                };
                self.pid.set_target(target);
                debug!(target, "kick started");
            }
            self.started_kicking = true;
            if position > self.pid.target() - tolerance {
                debug!("kick finished");
                self.reset_kicker(io, config);
            }
        } else if self.cocking && !self.cocking_began {
            self.encoder.reset_accumulator();
            position = self.encoder.poll(io.analog());
            let target = if cocked >= rest {
                cocked
            } else {
                cocked + max_voltage
            };
            self.pid.set_target(target);
            self.cocking_began = true;
        } else if self.cocking_began && position > self.pid.target() - tolerance {
            self.encoder.reset_accumulator();
            position = self.encoder.poll(io.analog());
            let target = if position >= cocked {
                cocked
            } else {
                cocked - max_voltage
            };
            self.pid.set_target(target);
            self.cocking_ended = true;
        }

        let output = self.pid.update_timed(position);
        io.apply_motor(ports::KICKER_MOTOR, output);
    }

    fn update_possession(&mut self, io: &mut HardwareRegistry) {
        if self.intake != IntakeMode::Forward {
            self.possession = false;
            self.intake_timer.reset();
            self.intake_timer.stop();
            return;
        }

        self.intake_timer.start();
        let mut elapsed = self.intake_timer.get();
        if elapsed <= 0.0 {
            elapsed = 0.002;
        }
        if elapsed > POSSESSION_WINDOW_SECS {
            if let Some(distance) = io.encoder_distance(ports::INTAKE_ENCODER) {
                self.intake_rate = distance / elapsed;
                self.possession = self.intake_rate < POSSESSION_RATE;
            }
            self.intake_timer.reset();
            io.reset_encoder(ports::INTAKE_ENCODER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boss_hal::sim::{INTAKE_DEGREES_PER_PULSE, SimHardware, SimRobot};
    use boss_types::ManualClock;
    use std::time::Duration;

    fn kicker() -> (KickerSystem, SimHardware, Arc<ManualClock>, ConfigStore) {
        let hw = SimRobot::new().with_kicker().build();
        let clock = Arc::new(ManualClock::new());
        let mut config = ConfigStore::new();
        let kicker = KickerSystem::new(&hw.registry, &mut config, clock.clone());
        (kicker, hw, clock, config)
    }

    #[test]
    fn reset_targets_rest_and_stores_defaults() {
        let (kicker, _, _, config) = kicker();
        assert_eq!(kicker.strength(), KickStrength::Low);
        assert_eq!(kicker.intake(), IntakeMode::Off);
        assert!(config.has(keys::KICKER_P));
        assert!(config.has(keys::KICKER_REST_ANGLE));
        assert!(!kicker.is_kicking());
    }

    #[test]
    fn winch_seeks_the_strength_voltage() {
        let (mut kicker, mut hw, _, mut config) = kicker();
        config.set_f64(KickStrength::High.config_key(), 2.0);
        kicker.set_strength(KickStrength::High);
        kicker.update(&mut hw.registry, &mut config);
        assert_eq!(hw.probes.relay(ports::KICKER_WINCH_1), Some(RelayDirection::Forward));
        assert_eq!(hw.probes.relay(ports::KICKER_WINCH_2), Some(RelayDirection::Forward));
        assert!(kicker.needs_winch_update(&hw.registry, &mut config));

        hw.probes.set_voltage(ports::KICKER_WINCH_SENSOR_CHANNEL, 3.0);
        kicker.update(&mut hw.registry, &mut config);
        assert_eq!(hw.probes.relay(ports::KICKER_WINCH_1), Some(RelayDirection::Reverse));

        hw.probes.set_voltage(ports::KICKER_WINCH_SENSOR_CHANNEL, 2.01);
        kicker.update(&mut hw.registry, &mut config);
        assert_eq!(hw.probes.relay(ports::KICKER_WINCH_1), Some(RelayDirection::Off));
        assert!(!kicker.needs_winch_update(&hw.registry, &mut config));
    }

    #[test]
    fn kick_runs_a_full_turn_then_resets() {
        let (mut kicker, mut hw, clock, mut config) = kicker();
        kicker.kick();
        clock.advance(Duration::from_millis(20));
        kicker.update(&mut hw.registry, &mut config);
        assert!(kicker.is_kicking());
        // At rest already, so the target is one revolution ahead.
        assert!(hw.probes.motor(ports::KICKER_MOTOR) > 0.0);
        assert_eq!(hw.probes.relay(ports::KICKER_WINCH_1), Some(RelayDirection::Off));

        // Walk the arm around through the wrap and back to rest.
        for v in [0.5, 1.5, 2.5, 3.5, 4.5] {
            hw.probes.set_voltage(ports::KICKER_ENCODER_CHANNEL, v);
            clock.advance(Duration::from_millis(20));
            kicker.update(&mut hw.registry, &mut config);
        }
        assert!(!kicker.is_kicking());
    }

    #[test]
    fn intake_edge_cocks_the_kicker() {
        let (mut kicker, mut hw, clock, mut config) = kicker();
        let mut controls = ControlSnapshot::default();
        controls.set_button(3, 2, true);
        kicker.read_controls(&controls, &hw.registry, &mut config);
        assert_eq!(kicker.intake(), IntakeMode::Forward);

        clock.advance(Duration::from_millis(20));
        kicker.update(&mut hw.registry, &mut config);
        assert_eq!(hw.probes.motor(ports::INTAKE_MOTOR), 1.0);
        assert!(hw.probes.motor(ports::KICKER_MOTOR) > 0.0);

        hw.probes.set_voltage(ports::KICKER_ENCODER_CHANNEL, 4.7);
        clock.advance(Duration::from_millis(20));
        kicker.update(&mut hw.registry, &mut config);
        assert!(kicker.is_cocked());
    }

    #[test]
    fn manual_mode_runs_motor_from_trigger() {
        let (mut kicker, mut hw, _, mut config) = kicker();
        let mut controls = ControlSnapshot::default();
        controls.set_button(3, 6, true);
        controls.set_button(3, 7, true);
        controls.set_button(3, 1, true);
        kicker.read_controls(&controls, &hw.registry, &mut config);
        kicker.update(&mut hw.registry, &mut config);
        assert_eq!(hw.probes.motor(ports::KICKER_MOTOR), 1.0);

        controls.set_button(3, 1, false);
        kicker.read_controls(&controls, &hw.registry, &mut config);
        kicker.update(&mut hw.registry, &mut config);
        assert_eq!(hw.probes.motor(ports::KICKER_MOTOR), 0.0);

        // Leaving manual mode abandons the kick the trigger started.
        controls.set_button(3, 6, false);
        kicker.read_controls(&controls, &hw.registry, &mut config);
        kicker.update(&mut hw.registry, &mut config);
        assert!(!kicker.is_kicking());
    }

    #[test]
    fn panel_selects_strength_and_reverse_button_backs_intake() {
        let (mut kicker, hw, _, mut config) = kicker();
        let mut controls = ControlSnapshot::default();
        controls.set_panel(11, true);
        controls.set_button(3, 8, true);
        kicker.read_controls(&controls, &hw.registry, &mut config);
        assert_eq!(kicker.strength(), KickStrength::Medium);
        assert_eq!(kicker.intake(), IntakeMode::Reverse);
    }

    #[test]
    fn slow_roller_means_possession() {
        let (mut kicker, mut hw, clock, mut config) = kicker();
        kicker.run_intake();
        kicker.update(&mut hw.registry, &mut config);

        // 10 pulses in 0.125 s is 288 deg/s: free spinning.
        hw.probes.add_encoder_ticks(ports::INTAKE_ENCODER, 10);
        clock.advance(Duration::from_millis(125));
        kicker.update(&mut hw.registry, &mut config);
        assert!(!kicker.has_possession());
        assert_eq!(kicker.intake_rate(), 10.0 * INTAKE_DEGREES_PER_PULSE / 0.125);

        hw.probes.add_encoder_ticks(ports::INTAKE_ENCODER, 2);
        clock.advance(Duration::from_millis(125));
        kicker.update(&mut hw.registry, &mut config);
        assert!(kicker.has_possession());

        kicker.stop_intake();
        kicker.update(&mut hw.registry, &mut config);
        assert!(!kicker.has_possession());
    }
}
