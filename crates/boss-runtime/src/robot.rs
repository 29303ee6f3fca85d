//! [`Robot`] – the run loop, and [`RobotContext`] – everything a state may
//! touch during a tick.
//!
//! # Tick anatomy
//!
//! ```text
//! operator_tick(board, disabled)
//!   enable watchdog, feed, capture control snapshot
//!   disabled → request "no state";  no state → request Normal
//!   run_iteration:
//!     pending transition?  exit old · feed · enter new · feed
//!     pre-step (compressor) · feed
//!     step                  · feed
//!     post-step (telemetry) · feed
//!   feed
//! ```
//!
//! Every feed first checks the [`Watchdog`].  A missed deadline stops all
//! outputs with [`HardwareRegistry::soft_stop`] and is counted in
//! [`RobotContext::watchdog_faults`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use boss_hal::input::{ControlBoard, ControlSnapshot};
use boss_hal::math::wrap_degrees;
use boss_hal::{HardwareRegistry, ports};
use boss_kernel::config_store::{ConfigStore, keys};
use boss_kernel::watchdog::{DEFAULT_EXPIRATION, Watchdog};
use boss_types::{Clock, DriveScheme, RelayDirection, TelemetrySnapshot};
use chrono::Utc;
use tracing::{debug, info, info_span, warn};

use crate::arm_system::ArmSystem;
use crate::autonomous::{AutoSelector, AutonomousRoutine};
use crate::drive_system::DriveSystem;
use crate::kicker_system::KickerSystem;
use crate::states::{DisabledState, NormalState, State, Transition};
use crate::telemetry::DriverDisplay;

/// Default tuning file name.
pub const DEFAULT_TUNING_FILE: &str = "boss.cfg";
/// Header written at the top of the tuning file.
pub const TUNING_FILE_DESCRIPTION: &str =
    "This is the main configuration file and was automatically generated.";

// ─────────────────────────────────────────────────────────────────────────────
// RobotContext
// ─────────────────────────────────────────────────────────────────────────────

/// Hardware, tuning, subsystems and per-tick inputs shared by the states.
pub struct RobotContext {
    pub io: HardwareRegistry,
    pub config: ConfigStore,
    pub drive: DriveSystem,
    pub arm: ArmSystem,
    pub kicker: KickerSystem,
    /// Controls sampled once at the top of the tick.
    pub controls: ControlSnapshot,
    pub display: DriverDisplay,
    watchdog: Watchdog,
    clock: Arc<dyn Clock>,
    tuning_path: Option<PathBuf>,
    pending: Option<Transition>,
    watchdog_faults: u32,
}

impl RobotContext {
    fn new(
        mut io: HardwareRegistry,
        mut config: ConfigStore,
        clock: Arc<dyn Clock>,
        options: &RobotOptions,
    ) -> Self {
        let drive = DriveSystem::new(DriveScheme::Autonomous, &mut config, clock.clone());
        let arm = ArmSystem::new(&mut config, clock.clone());
        let kicker = KickerSystem::new(&io, &mut config, clock.clone());
        io.apply_solenoid(ports::ELBOW_SWITCH, false);

        Self {
            io,
            config,
            drive,
            arm,
            kicker,
            controls: ControlSnapshot::default(),
            display: DriverDisplay::new(),
            watchdog: Watchdog::new(clock.clone(), options.watchdog_expiration),
            clock,
            tuning_path: options.tuning_path.clone(),
            pending: None,
            watchdog_faults: 0,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    // ── transitions ─────────────────────────────────────────────────────────

    /// Switch to `next` at the next iteration boundary.
    pub fn change_state(&mut self, next: Box<dyn State>) {
        self.request(Transition::To(next));
    }

    /// Soft-disable at the next iteration boundary, resuming the current
    /// state when the disable switch is released.
    pub fn suspend(&mut self) {
        self.request(Transition::Suspend);
    }

    /// Leave the current state at the next iteration boundary.
    pub fn clear_state(&mut self) {
        self.request(Transition::Clear);
    }

    fn request(&mut self, transition: Transition) {
        if let Some(replaced) = self.pending.replace(transition) {
            debug!(?replaced, "pending transition replaced");
        }
    }

    pub fn has_pending_transition(&self) -> bool {
        self.pending.is_some()
    }

    // ── safety ──────────────────────────────────────────────────────────────

    /// Check the deadline, then restart it.  A missed deadline stops every
    /// output first.
    pub fn feed_watchdog(&mut self) {
        if self.watchdog.is_expired() {
            self.watchdog_faults += 1;
            warn!(
                since_feed_ms = self.watchdog.since_feed().as_millis() as u64,
                faults = self.watchdog_faults,
                "watchdog expired, stopping all outputs"
            );
            self.io.soft_stop();
        }
        self.watchdog.feed();
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn watchdog_faults(&self) -> u32 {
        self.watchdog_faults
    }

    /// Zero every motor and relay.
    pub fn soft_stop(&mut self) {
        self.io.soft_stop();
    }

    /// Run the compressor until the pressure switch reports full.
    pub fn run_compressor(&mut self) {
        let full = self.io.digital(ports::PRESSURE_SWITCH).unwrap_or(false);
        let direction = if full {
            RelayDirection::Off
        } else {
            RelayDirection::Forward
        };
        self.io.apply_relay(ports::COMPRESSOR, direction);
    }

    // ── drive and tuning ────────────────────────────────────────────────────

    /// Replace the drive system with a fresh one using `scheme`.
    pub fn install_drive_scheme(&mut self, scheme: DriveScheme) {
        self.drive = DriveSystem::new(scheme, &mut self.config, self.clock.clone());
    }

    /// Read controls, compensate and drive, if the drive scheme is
    /// operator-driven.
    pub fn teleop_drive(&mut self) {
        if self.drive.is_teleoperated() {
            self.drive.read_controls(&self.controls);
            self.drive.compensate(&mut self.io, &mut self.config);
            self.feed_watchdog();
            self.drive.drive(&mut self.io);
        }
    }

    pub fn tuning_path(&self) -> Option<&Path> {
        self.tuning_path.as_deref()
    }

    /// Merge the tuning file into the store.  Failures are logged and the
    /// current values kept.
    pub fn reload_config(&mut self) {
        let Some(path) = self.tuning_path.as_deref() else {
            return;
        };
        match self.config.read(path) {
            Ok(count) => info!(path = %path.display(), count, "tuning file loaded"),
            Err(err) => warn!(path = %path.display(), error = %err, "tuning file not loaded"),
        }
    }

    /// Write the store back to the tuning file.  Failures are logged.
    pub fn save_config(&mut self) {
        let Some(path) = self.tuning_path.as_deref() else {
            return;
        };
        match self.config.write(path, TUNING_FILE_DESCRIPTION) {
            Ok(()) => info!(path = %path.display(), "tuning file saved"),
            Err(err) => warn!(path = %path.display(), error = %err, "tuning file not saved"),
        }
    }

    /// Both autonomous selector values.
    pub fn auto_selector(&self) -> AutoSelector {
        AutoSelector::read(&self.io)
    }

    /// Heading in degrees, normalised into [-180, 180).  An absent or
    /// faulty gyro reads as 0.
    pub fn heading(&self) -> f32 {
        wrap_degrees(self.io.gyro_angle().unwrap_or(0.0))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Robot
// ─────────────────────────────────────────────────────────────────────────────

/// Knobs for [`Robot::new`].
#[derive(Debug, Clone)]
pub struct RobotOptions {
    pub watchdog_expiration: Duration,
    /// Tuning file re-read and written by the config state.  `None` keeps
    /// tuning in memory only.
    pub tuning_path: Option<PathBuf>,
}

impl Default for RobotOptions {
    fn default() -> Self {
        Self {
            watchdog_expiration: DEFAULT_EXPIRATION,
            tuning_path: None,
        }
    }
}

pub struct Robot {
    ctx: RobotContext,
    state: Option<Box<dyn State>>,
    autonomous: Option<AutonomousRoutine>,
    telemetry: TelemetrySnapshot,
}

impl Robot {
    pub fn new(
        io: HardwareRegistry,
        config: ConfigStore,
        clock: Arc<dyn Clock>,
        options: RobotOptions,
    ) -> Self {
        let mut ctx = RobotContext::new(io, config, clock, &options);
        ctx.display.set_line(1, "Robot ready");
        let telemetry = snapshot(&ctx, None);
        info!(
            watchdog_ms = options.watchdog_expiration.as_millis() as u64,
            tuning = ?options.tuning_path,
            "robot ready"
        );
        Self {
            ctx,
            state: None,
            autonomous: None,
            telemetry,
        }
    }

    /// Load the tuning file at `path` (missing is fine) and build a robot
    /// that keeps its tuning there.
    pub fn with_tuning_file(
        io: HardwareRegistry,
        path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        watchdog_expiration: Duration,
    ) -> Result<Self, boss_types::BossError> {
        let path = path.into();
        let mut config = ConfigStore::new();
        config.read(&path)?;
        Ok(Self::new(
            io,
            config,
            clock,
            RobotOptions {
                watchdog_expiration,
                tuning_path: Some(path),
            },
        ))
    }

    pub fn context(&self) -> &RobotContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut RobotContext {
        &mut self.ctx
    }

    /// Name of the active state, or `None` between states.
    pub fn state_name(&self) -> Option<&'static str> {
        self.state.as_ref().map(|s| s.name())
    }

    /// Snapshot refreshed at the end of the last iteration.
    pub fn telemetry(&self) -> &TelemetrySnapshot {
        &self.telemetry
    }

    // ── operator control ────────────────────────────────────────────────────

    /// One teleop tick.
    pub fn operator_tick(&mut self, board: &dyn ControlBoard, disabled: bool) {
        if self.autonomous.take().is_some() {
            debug!("autonomous routine abandoned for operator control");
        }
        self.ctx.watchdog.set_enabled(true);
        self.ctx.feed_watchdog();
        self.ctx.controls = ControlSnapshot::capture(board);

        if disabled {
            if self.state.is_some() || self.ctx.pending.is_some() {
                self.ctx.clear_state();
            }
        } else if self.state.is_none() && self.ctx.pending.is_none() {
            self.ctx.change_state(Box::new(NormalState::new()));
        }

        self.run_iteration();
        self.ctx.feed_watchdog();
    }

    /// Apply any pending transition, then pre-step, step and post-step with
    /// a watchdog feed after each.
    pub fn run_iteration(&mut self) {
        self.apply_transition();

        self.ctx.run_compressor();
        self.ctx.feed_watchdog();

        if let Some(state) = self.state.as_mut() {
            state.step(&mut self.ctx);
        }
        self.ctx.feed_watchdog();

        self.telemetry = snapshot(&self.ctx, self.state_name());
        self.ctx.feed_watchdog();
    }

    fn apply_transition(&mut self) {
        let Some(transition) = self.ctx.pending.take() else {
            return;
        };

        let from = self.state_name().unwrap_or("none");
        let _span = info_span!("state_transition", from).entered();
        let mut previous = self.state.take();
        if let Some(old) = previous.as_mut() {
            old.exit(&mut self.ctx);
        }
        self.ctx.feed_watchdog();

        self.state = match transition {
            Transition::To(next) => Some(next),
            Transition::Suspend => Some(Box::new(DisabledState::new(previous.take()))),
            Transition::Clear => None,
        };
        info!(from, to = self.state_name().unwrap_or("none"), "state transition");

        if let Some(state) = self.state.as_mut() {
            state.enter(&mut self.ctx);
        }
        self.ctx.feed_watchdog();
    }

    /// Exit the active state immediately, dropping any pending request.
    fn leave_state(&mut self) {
        self.ctx.pending = None;
        if let Some(mut state) = self.state.take() {
            state.exit(&mut self.ctx);
            info!(from = state.name(), "state left");
        }
    }

    // ── autonomous ──────────────────────────────────────────────────────────

    /// Leave operator control and arm the autonomous routine from the
    /// selector switches.  The watchdog is switched off for the duration.
    pub fn begin_autonomous(&mut self) {
        self.leave_state();
        self.ctx.watchdog.set_enabled(false);
        let selector = self.ctx.auto_selector();
        let _span = info_span!("autonomous_begin", selector = selector.packed()).entered();
        self.ctx.display.clear();
        self.ctx
            .display
            .set_line(1, format!("Autonomous {:02x}", selector.packed()));
        self.autonomous = Some(AutonomousRoutine::begin(&mut self.ctx, selector));
    }

    /// Advance the autonomous routine by one tick.  Returns `true` once it
    /// has finished (or was never started).
    pub fn autonomous_tick(&mut self) -> bool {
        let finished = match self.autonomous.as_mut() {
            Some(routine) => routine.tick(&mut self.ctx),
            None => true,
        };
        self.telemetry = snapshot(&self.ctx, Some("autonomous"));
        finished
    }

    pub fn autonomous(&self) -> Option<&AutonomousRoutine> {
        self.autonomous.as_ref()
    }

    /// Stop every output and write the tuning file.
    pub fn shutdown(&mut self) {
        self.leave_state();
        self.ctx.soft_stop();
        self.ctx.save_config();
    }
}

fn snapshot(ctx: &RobotContext, mode: Option<&str>) -> TelemetrySnapshot {
    TelemetrySnapshot {
        timestamp: Utc::now(),
        mode: mode.unwrap_or("none").to_string(),
        drive_scheme: ctx.drive.scheme(),
        left_speed: ctx.drive.left_speed(),
        right_speed: ctx.drive.right_speed(),
        gear: ctx.drive.gear(),
        compensation: ctx.drive.compensation_mode(),
        heading_deg: ctx.heading(),
        display: ctx.display.lines().to_vec(),
        watchdog_faults: ctx.watchdog_faults,
    }
}

/// Name of the drive scheme the tuning store selects for teleop.
pub fn configured_scheme(config: &mut ConfigStore) -> DriveScheme {
    DriveScheme::from_name(&config.set_default_str(keys::DRIVE_SYSTEM, "arcade"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boss_hal::sim::SimRobot;
    use boss_types::{CompensationMode, ManualClock};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records its lifecycle calls and optionally requests transitions.
    struct Probe {
        name: &'static str,
        log: Log,
        on_step: Vec<&'static str>,
    }

    impl Probe {
        fn boxed(name: &'static str, log: &Log, on_step: Vec<&'static str>) -> Box<Self> {
            Box::new(Self {
                name,
                log: log.clone(),
                on_step,
            })
        }
    }

    impl State for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn enter(&mut self, _ctx: &mut RobotContext) {
            self.log.borrow_mut().push(format!("{}.enter", self.name));
        }

        fn exit(&mut self, _ctx: &mut RobotContext) {
            self.log.borrow_mut().push(format!("{}.exit", self.name));
        }

        fn step(&mut self, ctx: &mut RobotContext) {
            self.log.borrow_mut().push(format!("{}.step", self.name));
            for target in std::mem::take(&mut self.on_step) {
                ctx.change_state(Probe::boxed(target, &self.log, Vec::new()));
            }
        }
    }

    fn robot() -> (Robot, Arc<ManualClock>) {
        let hw = SimRobot::full().build();
        let clock = Arc::new(ManualClock::new());
        let robot = Robot::new(
            hw.registry,
            ConfigStore::new(),
            clock.clone(),
            RobotOptions::default(),
        );
        (robot, clock)
    }

    #[test]
    fn transition_waits_for_the_next_iteration() {
        let (mut robot, _) = robot();
        let log: Log = Rc::default();
        robot
            .context_mut()
            .change_state(Probe::boxed("a", &log, vec!["b"]));

        robot.run_iteration();
        assert_eq!(*log.borrow(), ["a.enter", "a.step"]);
        assert!(robot.context().has_pending_transition());

        robot.run_iteration();
        assert_eq!(*log.borrow(), ["a.enter", "a.step", "a.exit", "b.enter", "b.step"]);
    }

    #[test]
    fn last_request_in_a_step_wins() {
        let (mut robot, _) = robot();
        let log: Log = Rc::default();
        robot
            .context_mut()
            .change_state(Probe::boxed("a", &log, vec!["b", "c"]));
        robot.run_iteration();
        robot.run_iteration();
        assert_eq!(robot.state_name(), Some("c"));
        assert!(!log.borrow().iter().any(|e| e.starts_with("b.")));
    }

    #[test]
    fn suspend_resumes_the_same_state() {
        let (mut robot, _) = robot();
        let log: Log = Rc::default();
        robot.context_mut().change_state(Probe::boxed("a", &log, Vec::new()));
        robot.run_iteration();

        robot.context_mut().suspend();
        let mut board = ControlSnapshot::default();
        board.set_panel(2, true);
        robot.context_mut().controls = board;
        robot.run_iteration();
        assert_eq!(robot.state_name(), Some("disabled"));

        robot.context_mut().controls = ControlSnapshot::default();
        robot.run_iteration();
        robot.run_iteration();
        assert_eq!(robot.state_name(), Some("a"));
        assert_eq!(
            *log.borrow(),
            ["a.enter", "a.step", "a.exit", "a.enter", "a.step"]
        );
    }

    #[test]
    fn operator_tick_starts_normal_and_disable_clears_it() {
        let (mut robot, _) = robot();
        let board = ControlSnapshot::default();
        robot.operator_tick(&board, false);
        assert_eq!(robot.state_name(), Some("normal"));
        assert_eq!(robot.telemetry().mode, "normal");

        robot.operator_tick(&board, true);
        assert_eq!(robot.state_name(), None);
        robot.operator_tick(&board, true);
        assert!(!robot.context().has_pending_transition());
    }

    #[test]
    fn missed_deadline_stops_outputs_and_counts() {
        let (mut robot, clock) = robot();
        let board = ControlSnapshot::default();
        robot.operator_tick(&board, false);
        robot
            .context_mut()
            .io
            .apply_motor(ports::KICKER_MOTOR, 0.7);

        clock.advance(Duration::from_millis(400));
        robot.context_mut().feed_watchdog();
        assert_eq!(robot.context().watchdog_faults(), 1);
        assert_eq!(robot.context().io.motor_output(ports::KICKER_MOTOR), Some(0.0));

        robot.context_mut().feed_watchdog();
        assert_eq!(robot.context().watchdog_faults(), 1);
    }

    #[test]
    fn compressor_follows_pressure_switch() {
        let hw = SimRobot::full().build();
        let probes = hw.probes.clone();
        let mut robot = Robot::new(
            hw.registry,
            ConfigStore::new(),
            Arc::new(ManualClock::new()),
            RobotOptions::default(),
        );
        robot.run_iteration();
        assert_eq!(probes.relay(ports::COMPRESSOR), Some(RelayDirection::Forward));
        probes.set_digital(ports::PRESSURE_SWITCH, true);
        robot.run_iteration();
        assert_eq!(probes.relay(ports::COMPRESSOR), Some(RelayDirection::Off));
    }

    #[test]
    fn heading_is_normalised() {
        let hw = SimRobot::full().build();
        hw.probes.set_gyro(370.0);
        let robot = Robot::new(
            hw.registry,
            ConfigStore::new(),
            Arc::new(ManualClock::new()),
            RobotOptions::default(),
        );
        assert_eq!(robot.context().heading(), 10.0);
    }

    #[test]
    fn heading_tolerates_faulty_gyro_readings() {
        let hw = SimRobot::full().build();
        let probes = hw.probes.clone();
        let robot = Robot::new(
            hw.registry,
            ConfigStore::new(),
            Arc::new(ManualClock::new()),
            RobotOptions::default(),
        );
        probes.set_gyro(f32::INFINITY);
        assert_eq!(robot.context().heading(), 0.0);
        probes.set_gyro(f32::NAN);
        assert_eq!(robot.context().heading(), 0.0);
        probes.set_gyro(1e10);
        let heading = robot.context().heading();
        assert!((-180.0..=180.0).contains(&heading), "{heading}");
    }

    fn assert_drive_bounded(robot: &Robot, probes: &boss_hal::sim::SimProbes) {
        let t = robot.telemetry();
        assert!(t.heading_deg.is_finite());
        for speed in [t.left_speed, t.right_speed] {
            assert!((-1.0..=1.0).contains(&speed), "telemetry speed {speed}");
        }
        for id in ports::LEFT_DRIVE_MOTORS.iter().chain(ports::RIGHT_DRIVE_MOTORS.iter()) {
            let out = probes.motor(id);
            assert!((-1.0..=1.0).contains(&out), "{id} commanded {out}");
        }
    }

    #[test]
    fn faulty_gyro_never_stalls_or_poisons_the_tick() {
        for angle in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN, 1e10, -1e10] {
            let hw = SimRobot::full().build();
            let probes = hw.probes.clone();
            let clock = Arc::new(ManualClock::new());
            let mut robot = Robot::new(
                hw.registry,
                ConfigStore::new(),
                clock.clone(),
                RobotOptions::default(),
            );
            let mut board = ControlSnapshot::default();
            board.set_axis(1, 2, -1.0);
            robot.operator_tick(&board, false);
            clock.advance(Duration::from_millis(20));
            robot.operator_tick(&board, false);

            probes.set_gyro(angle);
            for _ in 0..3 {
                clock.advance(Duration::from_millis(20));
                robot.operator_tick(&board, false);
                assert_drive_bounded(&robot, &probes);
            }
            assert_eq!(robot.context().watchdog_faults(), 0, "gyro {angle}");
        }
    }

    #[test]
    fn drive_base_without_gyro_or_encoders_still_runs() {
        let mut sim = SimRobot::new();
        for id in ports::LEFT_DRIVE_MOTORS.iter().chain(ports::RIGHT_DRIVE_MOTORS.iter()) {
            sim = sim.with_motor(id);
        }
        let hw = sim.with_solenoid(ports::GEAR_SWITCH).build();
        let probes = hw.probes.clone();
        let clock = Arc::new(ManualClock::new());
        let mut robot = Robot::new(
            hw.registry,
            ConfigStore::new(),
            clock.clone(),
            RobotOptions::default(),
        );

        let mut board = ControlSnapshot::default();
        board.set_axis(1, 2, -1.0);
        for _ in 0..5 {
            robot.operator_tick(&board, false);
            clock.advance(Duration::from_millis(20));
        }
        assert_drive_bounded(&robot, &probes);
        assert_eq!(robot.telemetry().heading_deg, 0.0);

        // Stick released: settle, then hold position on absent encoders.
        board.set_axis(1, 2, 0.0);
        for _ in 0..40 {
            robot.operator_tick(&board, false);
            clock.advance(Duration::from_millis(20));
        }
        assert_eq!(robot.telemetry().compensation, CompensationMode::InertHold);
        assert_eq!(probes.motor(ports::LEFT_FRONT_DRIVE), 0.0);
        assert_drive_bounded(&robot, &probes);
    }

    #[test]
    fn shutdown_writes_the_tuning_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_TUNING_FILE);
        let hw = SimRobot::full().build();
        let mut robot = Robot::with_tuning_file(
            hw.registry,
            &path,
            Arc::new(ManualClock::new()),
            DEFAULT_EXPIRATION,
        )
        .unwrap();
        robot.shutdown();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&format!("# {TUNING_FILE_DESCRIPTION}")));
        assert!(text.contains("kickerP="));
    }
}
