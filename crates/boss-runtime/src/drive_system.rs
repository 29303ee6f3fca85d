//! [`DriveSystem`] – differential drive with stabilisation.
//!
//! One drive system exists per robot.  Its [`DriveScheme`] decides how the
//! operator's controls map onto it; every human-driven scheme ends in the
//! same mixing law ([`arcade_mix`] for throttle/turn schemes, squared
//! per-side inputs for tank).  The autonomous scheme ignores the controls
//! and is commanded with [`DriveSystem::turn`] and
//! [`DriveSystem::set_speeds`].
//!
//! # Compensation
//!
//! [`DriveSystem::compensate`] runs exactly one of two loops per tick:
//!
//! * **inert** (not moving): after `inertDelay` seconds of zero output the
//!   drive encoders are zeroed and a position-hold PID per side replaces the
//!   commanded speed;
//! * **moving**: the gyro heading captured on entry is held by adding a
//!   small symmetric correction, unless the robot is deliberately turning.

use std::sync::Arc;

use boss_hal::input::ControlSnapshot;
use boss_hal::math::{limit, sign_square};
use boss_hal::{Flag, HardwareRegistry, SimplePid, Timer, ports};
use boss_kernel::config_store::{ConfigStore, keys};
use boss_types::{Clock, CompensationMode, DriveScheme, Gear};
use tracing::debug;

/// Commanded speed magnitude above which a side counts as moving.
pub const MOTION_THRESHOLD: f32 = 0.05;
/// Left/right speed difference above which the robot counts as turning.
pub const TURN_THRESHOLD: f32 = 0.15;
/// Heading correction ceiling while moving.
pub const DEADHEAD_LIMIT: f32 = 0.25;

// ─────────────────────────────────────────────────────────────────────────────
// Mixing laws
// ─────────────────────────────────────────────────────────────────────────────

/// Blend a throttle and a turn rate into left/right speeds.
///
/// Both inputs are clipped to [-1, 1] and sign-squared first.  Positive
/// `turn` rotates clockwise (left side forward), so `arcade_mix(0.0, 1.0)`
/// is `(1.0, -1.0)`.
pub fn arcade_mix(move_value: f32, turn: f32) -> (f32, f32) {
    let m = sign_square(limit(move_value));
    let rotate = sign_square(limit(-turn));
    mix_squared(m, rotate)
}

fn mix_squared(m: f32, rotate: f32) -> (f32, f32) {
    if m > 0.0 {
        if rotate > 0.0 {
            (m - rotate, m.max(rotate))
        } else {
            (m.max(-rotate), m + rotate)
        }
    } else if rotate > 0.0 {
        (-(-m).max(rotate), m + rotate)
    } else {
        (m - rotate, -(-m).max(-rotate))
    }
}

/// Speeds for a curved path.  `curve == 0` drives straight; otherwise the
/// ratio `(ln|curve| - 0.5) / (ln|curve| + 0.5)` divides the speed of the
/// left side (negative curve) or the right side (positive curve).
pub fn curve_speeds(speed: f32, curve: f32) -> (f32, f32) {
    if curve == 0.0 {
        return (speed, speed);
    }
    let value = curve.abs().ln();
    let mut ratio = (value - 0.5) / (value + 0.5);
    if ratio == 0.0 {
        ratio = 1.0e-10;
    }
    if curve < 0.0 {
        (speed / ratio, speed)
    } else {
        (speed, speed / ratio)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DriveSystem
// ─────────────────────────────────────────────────────────────────────────────

pub struct DriveSystem {
    scheme: DriveScheme,
    left_speed: f32,
    right_speed: f32,
    /// Sign-squared throttle and rotation from the last control read.
    move_value: f32,
    rotate_value: f32,
    gear: Gear,
    left_pid: SimplePid,
    right_pid: SimplePid,
    deadhead_pid: SimplePid,
    moving: Flag,
    inert: Flag,
    inert_timer: Timer,
    inert_settled: bool,
    mode: CompensationMode,
}

impl DriveSystem {
    /// Build a drive system, reading (and defaulting) its gains from
    /// `config`.
    pub fn new(scheme: DriveScheme, config: &mut ConfigStore, clock: Arc<dyn Clock>) -> Self {
        let inert_p = config.param(keys::INERT_P, 0.01);
        let inert_i = config.param(keys::INERT_I, 0.0);
        let inert_d = config.param(keys::INERT_D, 0.0);
        let moving_p = config.param(keys::MOVING_P, 0.005);
        let moving_i = config.param(keys::MOVING_I, 0.0);
        let moving_d = config.param(keys::MOVING_D, 0.0);

        let mut left_pid = SimplePid::with_clock(inert_p, inert_i, inert_d, clock.clone());
        left_pid.set_limits(-1.0, 1.0);
        let mut right_pid = SimplePid::with_clock(inert_p, inert_i, inert_d, clock.clone());
        right_pid.set_limits(-1.0, 1.0);
        let mut deadhead_pid = SimplePid::with_clock(moving_p, moving_i, moving_d, clock.clone());
        deadhead_pid.set_limits(-DEADHEAD_LIMIT, DEADHEAD_LIMIT);

        debug!(%scheme, "drive system created");
        Self {
            scheme,
            left_speed: 0.0,
            right_speed: 0.0,
            move_value: 0.0,
            rotate_value: 0.0,
            gear: Gear::Low,
            left_pid,
            right_pid,
            deadhead_pid,
            moving: Flag::default(),
            inert: Flag::default(),
            inert_timer: Timer::new(clock),
            inert_settled: false,
            mode: CompensationMode::Settling,
        }
    }

    pub fn scheme(&self) -> DriveScheme {
        self.scheme
    }

    pub fn is_teleoperated(&self) -> bool {
        self.scheme.is_teleoperated()
    }

    pub fn left_speed(&self) -> f32 {
        self.left_speed
    }

    pub fn right_speed(&self) -> f32 {
        self.right_speed
    }

    pub fn gear(&self) -> Gear {
        self.gear
    }

    pub fn set_gear(&mut self, gear: Gear) {
        self.gear = gear;
    }

    pub fn compensation_mode(&self) -> CompensationMode {
        self.mode
    }

    // ── input mapping ───────────────────────────────────────────────────────

    /// Map this tick's controls onto speeds and gear for the active scheme.
    pub fn read_controls(&mut self, controls: &ControlSnapshot) {
        match self.scheme {
            DriveScheme::Autonomous => return,
            DriveScheme::Arcade => {
                self.move_value = -controls.y(1);
                self.rotate_value = -controls.x(2);
                if controls.trigger(1) {
                    self.gear = Gear::Low;
                } else if controls.trigger(2) {
                    self.gear = Gear::High;
                }
            }
            DriveScheme::Tank => {
                self.left_speed = -controls.y(1);
                self.right_speed = -controls.y(2);
                if controls.button(1, 2) {
                    self.gear = Gear::Low;
                } else if controls.button(1, 3) {
                    self.gear = Gear::High;
                }
            }
            DriveScheme::Xbox => {
                self.move_value = -controls.y(1);
                self.rotate_value = -controls.axis(1, 4);
                if controls.button(1, 5) {
                    self.gear = Gear::Low;
                } else if controls.button(1, 6) {
                    self.gear = Gear::High;
                }
            }
        }
        self.interpret_controls();
    }

    fn interpret_controls(&mut self) {
        match self.scheme {
            DriveScheme::Autonomous => {}
            DriveScheme::Tank => {
                self.left_speed = sign_square(limit(self.left_speed));
                self.right_speed = sign_square(limit(self.right_speed));
            }
            DriveScheme::Arcade | DriveScheme::Xbox => {
                self.move_value = sign_square(limit(self.move_value));
                self.rotate_value = sign_square(limit(self.rotate_value));
                let (left, right) = mix_squared(self.move_value, self.rotate_value);
                self.left_speed = left;
                self.right_speed = right;
            }
        }
    }

    // ── programmatic commands ───────────────────────────────────────────────

    pub fn set_speeds(&mut self, left: f32, right: f32) {
        self.left_speed = left;
        self.right_speed = right;
    }

    /// Command a curved path; see [`curve_speeds`].
    pub fn turn(&mut self, speed: f32, curve: f32) {
        let (left, right) = curve_speeds(speed, curve);
        self.left_speed = left;
        self.right_speed = right;
    }

    pub fn stop(&mut self) {
        self.left_speed = 0.0;
        self.right_speed = 0.0;
    }

    pub fn is_moving(&self) -> bool {
        match self.scheme {
            DriveScheme::Arcade | DriveScheme::Xbox => {
                self.move_value.abs() > MOTION_THRESHOLD || self.is_turning()
            }
            DriveScheme::Autonomous | DriveScheme::Tank => {
                self.left_speed.abs() > MOTION_THRESHOLD
                    || self.right_speed.abs() > MOTION_THRESHOLD
            }
        }
    }

    pub fn is_turning(&self) -> bool {
        match self.scheme {
            DriveScheme::Arcade | DriveScheme::Xbox => self.rotate_value.abs() > MOTION_THRESHOLD,
            DriveScheme::Autonomous | DriveScheme::Tank => {
                (self.left_speed - self.right_speed).abs() > TURN_THRESHOLD
            }
        }
    }

    // ── output ──────────────────────────────────────────────────────────────

    /// Clip the speeds and write them to the drive motors and gear shifter.
    /// The right side is mounted mirrored and receives the negated speed.
    pub fn drive(&mut self, io: &mut HardwareRegistry) {
        self.left_speed = limit(self.left_speed);
        self.right_speed = limit(self.right_speed);
        for id in ports::LEFT_DRIVE_MOTORS {
            io.apply_motor(id, self.left_speed);
        }
        for id in ports::RIGHT_DRIVE_MOTORS {
            io.apply_motor(id, -self.right_speed);
        }
        io.apply_solenoid(ports::GEAR_SWITCH, self.gear == Gear::Low);
    }

    // ── compensation ────────────────────────────────────────────────────────

    /// Run the inert or moving stabilisation loop for this tick.
    pub fn compensate(&mut self, io: &mut HardwareRegistry, config: &mut ConfigStore) {
        let moving = self.is_moving();
        self.moving.set(moving);
        self.inert.set(!moving);

        if self.inert.get() {
            if self.inert.check_triggered() {
                self.init_inert();
            }
            self.inert_compensate(io, config);
        } else {
            if self.moving.check_triggered() {
                self.init_moving(io);
            }
            self.moving_compensate(io);
        }

        self.moving.clear_trigger();
        self.inert.clear_trigger();
    }

    fn set_mode(&mut self, mode: CompensationMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "compensation mode changed");
            self.mode = mode;
        }
    }

    fn init_inert(&mut self) {
        self.inert_settled = false;
        self.inert_timer.reset();
        self.inert_timer.start();
    }

    fn inert_compensate(&mut self, io: &mut HardwareRegistry, config: &mut ConfigStore) {
        let ticks_per_rev = config.param(keys::DRIVE_TICKS_PER_REV, 300.0);
        let delay = config.set_default_f64(keys::INERT_DELAY, 0.5);

        if !self.inert_settled {
            if self.inert_timer.get() < delay {
                self.set_mode(CompensationMode::Settling);
                self.stop();
                return;
            }
            io.reset_encoder(ports::LEFT_DRIVE_ENCODER);
            io.reset_encoder(ports::RIGHT_DRIVE_ENCODER);
            for pid in [&mut self.left_pid, &mut self.right_pid] {
                pid.reset();
                pid.set_target(0.0);
                pid.start();
            }
            self.inert_settled = true;
        }
        self.set_mode(CompensationMode::InertHold);

        let left = io.encoder_count(ports::LEFT_DRIVE_ENCODER).unwrap_or(0);
        let right = io.encoder_count(ports::RIGHT_DRIVE_ENCODER).unwrap_or(0);
        let per_tick = if ticks_per_rev != 0.0 {
            360.0 / ticks_per_rev
        } else {
            0.0
        };

        self.left_speed = self.left_pid.update_timed(left as f32 * per_tick);
        self.right_speed = self.right_pid.update_timed(right as f32 * per_tick);
    }

    fn init_moving(&mut self, io: &HardwareRegistry) {
        let heading = io.gyro_angle().unwrap_or(0.0);
        self.deadhead_pid.reset();
        self.deadhead_pid.set_target(heading);
        self.deadhead_pid.start();
    }

    fn moving_compensate(&mut self, io: &HardwareRegistry) {
        if self.is_turning() {
            self.set_mode(CompensationMode::Suspended);
            return;
        }
        self.set_mode(CompensationMode::HeadingHold);
        let heading = io.gyro_angle().unwrap_or(0.0);
        let correction = self.deadhead_pid.update_timed(heading);
        self.left_speed = limit(self.left_speed + correction);
        self.right_speed = limit(self.right_speed - correction);
    }

    /// Output of the heading-hold loop from its last update.
    pub fn heading_correction(&self) -> f32 {
        self.deadhead_pid.output()
    }
}

impl std::fmt::Debug for DriveSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveSystem")
            .field("scheme", &self.scheme)
            .field("left_speed", &self.left_speed)
            .field("right_speed", &self.right_speed)
            .field("gear", &self.gear)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boss_hal::sim::SimRobot;
    use boss_types::ManualClock;
    use std::time::Duration;

    fn drive(scheme: DriveScheme) -> (DriveSystem, Arc<ManualClock>, ConfigStore) {
        let clock = Arc::new(ManualClock::new());
        let mut config = ConfigStore::new();
        let system = DriveSystem::new(scheme, &mut config, clock.clone());
        (system, clock, config)
    }

    #[test]
    fn arcade_mix_pure_forward_and_pure_rotation() {
        assert_eq!(arcade_mix(1.0, 0.0), (1.0, 1.0));
        assert_eq!(arcade_mix(0.0, 1.0), (1.0, -1.0));
        assert_eq!(arcade_mix(0.0, -1.0), (-1.0, 1.0));
        assert_eq!(arcade_mix(-1.0, 0.0), (-1.0, -1.0));
    }

    #[test]
    fn arcade_mix_squares_inputs() {
        let (left, right) = arcade_mix(0.5, 0.0);
        assert_eq!((left, right), (0.25, 0.25));
        let (left, right) = arcade_mix(2.0, 0.0);
        assert_eq!((left, right), (1.0, 1.0));
    }

    #[test]
    fn straight_curve_gives_equal_sides() {
        assert_eq!(curve_speeds(0.5, 0.0), (0.5, 0.5));
    }

    #[test]
    fn curve_sign_picks_the_scaled_side() {
        let (left, right) = curve_speeds(0.5, 0.1);
        assert_eq!(left, 0.5);
        assert!(right.abs() < 0.5);
        let (left, right) = curve_speeds(0.5, -0.1);
        assert_eq!(right, 0.5);
        assert!(left.abs() < 0.5);
    }

    #[test]
    fn zero_ratio_does_not_divide_by_zero() {
        // ln(e^0.5) = 0.5 makes the ratio vanish.
        let (left, right) = curve_speeds(0.5, 0.5f32.exp());
        assert_eq!(left, 0.5);
        assert!(right.is_finite());
    }

    #[test]
    fn arcade_controls_map_and_pick_gear() {
        let (mut system, _, _) = drive(DriveScheme::Arcade);
        let mut controls = ControlSnapshot::default();
        controls.set_axis(1, 2, -1.0);
        controls.set_button(2, 1, true);
        system.read_controls(&controls);
        assert_eq!((system.left_speed(), system.right_speed()), (1.0, 1.0));
        assert_eq!(system.gear(), Gear::High);
        assert!(system.is_moving());
        assert!(!system.is_turning());
    }

    #[test]
    fn tank_controls_square_each_side() {
        let (mut system, _, _) = drive(DriveScheme::Tank);
        let mut controls = ControlSnapshot::default();
        controls.set_axis(1, 2, -0.5);
        controls.set_axis(2, 2, 0.5);
        system.read_controls(&controls);
        assert_eq!(system.left_speed(), 0.25);
        assert_eq!(system.right_speed(), -0.25);
        assert!(system.is_turning());
    }

    #[test]
    fn xbox_reads_the_right_stick_for_rotation() {
        let (mut system, _, _) = drive(DriveScheme::Xbox);
        let mut controls = ControlSnapshot::default();
        controls.set_axis(1, 4, 1.0);
        controls.set_button(1, 6, true);
        system.read_controls(&controls);
        assert_eq!((system.left_speed(), system.right_speed()), (1.0, -1.0));
        assert_eq!(system.gear(), Gear::High);
    }

    #[test]
    fn autonomous_ignores_controls() {
        let (mut system, _, _) = drive(DriveScheme::Autonomous);
        system.set_speeds(0.3, 0.3);
        let mut controls = ControlSnapshot::default();
        controls.set_axis(1, 2, -1.0);
        system.read_controls(&controls);
        assert_eq!(system.left_speed(), 0.3);
    }

    #[test]
    fn drive_negates_right_side_and_sets_gear() {
        let mut hw = SimRobot::new().with_drive_base().build();
        let (mut system, _, _) = drive(DriveScheme::Autonomous);
        system.set_speeds(2.0, 0.5);
        system.drive(&mut hw.registry);
        assert_eq!(hw.probes.motor(ports::LEFT_FRONT_DRIVE), 1.0);
        assert_eq!(hw.probes.motor(ports::LEFT_REAR_DRIVE), 1.0);
        assert_eq!(hw.probes.motor(ports::RIGHT_FRONT_DRIVE), -0.5);
        assert_eq!(hw.probes.solenoid(ports::GEAR_SWITCH), Some(true));
        system.set_gear(Gear::High);
        system.drive(&mut hw.registry);
        assert_eq!(hw.probes.solenoid(ports::GEAR_SWITCH), Some(false));
    }

    #[test]
    fn drive_without_hardware_is_harmless() {
        let mut io = HardwareRegistry::new();
        let (mut system, _, _) = drive(DriveScheme::Autonomous);
        system.set_speeds(0.5, 0.5);
        system.drive(&mut io);
    }

    #[test]
    fn inert_waits_out_the_delay_then_holds_position() {
        let mut hw = SimRobot::new().with_drive_base().build();
        let (mut system, clock, mut config) = drive(DriveScheme::Autonomous);

        system.stop();
        system.compensate(&mut hw.registry, &mut config);
        assert_eq!(system.compensation_mode(), CompensationMode::Settling);
        assert_eq!(system.left_speed(), 0.0);

        hw.probes.set_encoder(ports::LEFT_DRIVE_ENCODER, 40);
        clock.advance(Duration::from_millis(600));
        system.stop();
        system.compensate(&mut hw.registry, &mut config);
        assert_eq!(system.compensation_mode(), CompensationMode::InertHold);
        // Encoders were zeroed when the hold engaged.
        assert_eq!(hw.probes.encoder(ports::LEFT_DRIVE_ENCODER), 0);

        // A push of 30 ticks (36 degrees) is resisted.
        hw.probes.set_encoder(ports::LEFT_DRIVE_ENCODER, 30);
        clock.advance(Duration::from_millis(20));
        system.compensate(&mut hw.registry, &mut config);
        assert!(system.left_speed() < 0.0);
        assert_eq!(system.right_speed(), 0.0);
    }

    #[test]
    fn moving_holds_heading_unless_turning() {
        let mut hw = SimRobot::new().with_drive_base().build();
        let (mut system, clock, mut config) = drive(DriveScheme::Autonomous);

        system.set_speeds(0.5, 0.5);
        system.compensate(&mut hw.registry, &mut config);
        assert_eq!(system.compensation_mode(), CompensationMode::HeadingHold);

        // Drifted clockwise by 10 degrees: correction slows the left side.
        hw.probes.set_gyro(10.0);
        clock.advance(Duration::from_millis(20));
        system.set_speeds(0.5, 0.5);
        system.compensate(&mut hw.registry, &mut config);
        assert!(system.left_speed() < 0.5);
        assert!(system.right_speed() > 0.5);

        system.set_speeds(0.5, -0.5);
        system.compensate(&mut hw.registry, &mut config);
        assert_eq!(system.compensation_mode(), CompensationMode::Suspended);
        assert_eq!((system.left_speed(), system.right_speed()), (0.5, -0.5));
    }

    fn assert_sides_bounded(system: &DriveSystem) {
        for speed in [system.left_speed(), system.right_speed()] {
            assert!((-1.0..=1.0).contains(&speed), "side speed {speed}");
        }
    }

    #[test]
    fn heading_hold_without_a_gyro_leaves_speeds_alone() {
        let mut io = HardwareRegistry::new();
        let (mut system, clock, mut config) = drive(DriveScheme::Autonomous);
        for _ in 0..3 {
            system.set_speeds(0.4, 0.4);
            system.compensate(&mut io, &mut config);
            clock.advance(Duration::from_millis(20));
        }
        assert_eq!(system.compensation_mode(), CompensationMode::HeadingHold);
        assert_eq!((system.left_speed(), system.right_speed()), (0.4, 0.4));
    }

    #[test]
    fn non_finite_gyro_is_treated_as_absent() {
        for angle in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut hw = SimRobot::new().with_drive_base().build();
            let (mut system, clock, mut config) = drive(DriveScheme::Autonomous);
            system.set_speeds(0.5, 0.5);
            system.compensate(&mut hw.registry, &mut config);

            hw.probes.set_gyro(angle);
            clock.advance(Duration::from_millis(20));
            system.set_speeds(0.5, 0.5);
            system.compensate(&mut hw.registry, &mut config);
            assert_sides_bounded(&system);
            assert!(system.heading_correction().is_finite());

            system.drive(&mut hw.registry);
            assert_eq!(hw.probes.motor(ports::LEFT_FRONT_DRIVE), 0.5);
        }
    }

    #[test]
    fn inert_hold_with_a_missing_encoder_holds_still() {
        let mut hw = SimRobot::new()
            .with_motor(ports::LEFT_FRONT_DRIVE)
            .with_encoder(ports::LEFT_DRIVE_ENCODER, 1.0)
            .build();
        let (mut system, clock, mut config) = drive(DriveScheme::Autonomous);

        system.stop();
        system.compensate(&mut hw.registry, &mut config);
        clock.advance(Duration::from_millis(600));
        system.stop();
        system.compensate(&mut hw.registry, &mut config);
        assert_eq!(system.compensation_mode(), CompensationMode::InertHold);

        hw.probes.set_encoder(ports::LEFT_DRIVE_ENCODER, 30);
        clock.advance(Duration::from_millis(20));
        system.compensate(&mut hw.registry, &mut config);
        assert!(system.left_speed() < 0.0);
        assert_eq!(system.right_speed(), 0.0);
        assert_sides_bounded(&system);
    }

    #[test]
    fn defaults_land_in_the_config() {
        let (_, _, config) = drive(DriveScheme::Arcade);
        assert_eq!(config.get_f64(keys::INERT_P), 0.01f32 as f64);
        assert_eq!(config.get_f64(keys::MOVING_P), 0.005f32 as f64);
    }
}
