//! Multi-tick operator-control scenarios on a fully simulated robot.

use std::sync::Arc;
use std::time::Duration;

use boss_hal::ControlSnapshot;
use boss_hal::ports;
use boss_hal::sim::{SimProbes, SimRobot};
use boss_kernel::ConfigStore;
use boss_kernel::config_store::keys;
use boss_runtime::robot::DEFAULT_TUNING_FILE;
use boss_runtime::states::panel;
use boss_runtime::{Robot, RobotOptions};
use boss_types::{ArmPreset, CompensationMode, DriveScheme, ManualClock};

const TICK: Duration = Duration::from_millis(20);

fn sim_robot() -> (Robot, SimProbes, Arc<ManualClock>) {
    let hw = SimRobot::full().build();
    let clock = Arc::new(ManualClock::new());
    let robot = Robot::new(
        hw.registry,
        ConfigStore::new(),
        clock.clone(),
        RobotOptions::default(),
    );
    (robot, hw.probes, clock)
}

fn tick(robot: &mut Robot, clock: &ManualClock, board: &ControlSnapshot) {
    clock.advance(TICK);
    robot.operator_tick(board, false);
}

#[test]
fn first_enabled_tick_enters_normal_with_arcade_drive() {
    let (mut robot, probes, clock) = sim_robot();
    let mut board = ControlSnapshot::default();
    // Stick pushed fully forward.
    board.set_axis(1, 2, -1.0);
    tick(&mut robot, &clock, &board);

    assert_eq!(robot.state_name(), Some("normal"));
    assert_eq!(robot.context().drive.scheme(), DriveScheme::Arcade);
    assert_eq!(robot.context().config.get(keys::DRIVE_SYSTEM), Some("arcade"));
    assert!(probes.motor(ports::LEFT_FRONT_DRIVE) > 0.9);
    assert!(probes.motor(ports::RIGHT_FRONT_DRIVE) < -0.9);
    assert_eq!(robot.context().display.line(1), "Normal operation");
    assert_eq!(robot.telemetry().compensation, CompensationMode::HeadingHold);
}

#[test]
fn inert_hold_engages_after_the_settle_delay() {
    let (mut robot, probes, clock) = sim_robot();
    let board = ControlSnapshot::default();
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.telemetry().compensation, CompensationMode::Settling);

    for _ in 0..30 {
        tick(&mut robot, &clock, &board);
    }
    assert_eq!(robot.telemetry().compensation, CompensationMode::InertHold);
    assert_eq!(probes.motor(ports::LEFT_FRONT_DRIVE), 0.0);

    // Pushed forward 30 ticks: 36 degrees of wheel at inertP 0.01.
    probes.add_encoder_ticks(ports::LEFT_DRIVE_ENCODER, 30);
    tick(&mut robot, &clock, &board);
    let left = probes.motor(ports::LEFT_FRONT_DRIVE);
    assert!((left + 0.36).abs() < 1e-4, "left = {left}");
}

#[test]
fn panel_buttons_switch_modes_on_the_following_tick() {
    let (mut robot, _, clock) = sim_robot();
    let mut board = ControlSnapshot::default();
    tick(&mut robot, &clock, &board);

    board.set_panel(panel::FINALE, true);
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("normal"));
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("finale"));
    assert_eq!(robot.context().arm.preset(), ArmPreset::Raised);
    assert_eq!(robot.context().display.line(1), "FINALE!!!!!");

    board.set_panel(panel::FINALE, false);
    tick(&mut robot, &clock, &board);
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("normal"));
    assert_eq!(robot.context().arm.preset(), ArmPreset::Stowed);
}

#[test]
fn disable_switch_suspends_and_resumes() {
    let (mut robot, probes, clock) = sim_robot();
    let mut board = ControlSnapshot::default();
    board.set_axis(1, 2, -1.0);
    tick(&mut robot, &clock, &board);
    assert!(probes.motor(ports::LEFT_FRONT_DRIVE) > 0.9);

    board.set_panel(panel::DISABLE, true);
    tick(&mut robot, &clock, &board);
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("disabled"));
    assert_eq!(probes.motor(ports::LEFT_FRONT_DRIVE), 0.0);
    assert_eq!(probes.solenoid(ports::SHOULDER_BRAKE), Some(false));
    assert_eq!(robot.context().display.line(3), "Flip disable switch");

    // Held: stays disabled.
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("disabled"));

    board.set_panel(panel::DISABLE, false);
    tick(&mut robot, &clock, &board);
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("normal"));
    assert!(probes.motor(ports::LEFT_FRONT_DRIVE) > 0.9);
}

#[test]
fn driver_station_disable_leaves_every_state() {
    let (mut robot, _, clock) = sim_robot();
    let board = ControlSnapshot::default();
    tick(&mut robot, &clock, &board);
    clock.advance(TICK);
    robot.operator_tick(&board, true);
    assert_eq!(robot.state_name(), None);
    assert_eq!(robot.telemetry().mode, "none");

    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("normal"));
}

#[test]
fn late_tick_soft_stops_and_counts_a_fault() {
    let (mut robot, probes, clock) = sim_robot();
    let mut board = ControlSnapshot::default();
    board.set_axis(1, 2, -1.0);
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.context().watchdog_faults(), 0);

    clock.advance(Duration::from_millis(300));
    robot.operator_tick(&board, false);
    assert_eq!(robot.context().watchdog_faults(), 1);
    assert_eq!(robot.telemetry().watchdog_faults, 1);
    // Normal drives again within the same tick after the stop.
    assert!(probes.motor(ports::LEFT_FRONT_DRIVE) > 0.9);

    tick(&mut robot, &clock, &board);
    assert_eq!(robot.context().watchdog_faults(), 1);
}

#[test]
fn telemetry_serialises_for_the_console() {
    let (mut robot, _, clock) = sim_robot();
    tick(&mut robot, &clock, &ControlSnapshot::default());
    let json = serde_json::to_value(robot.telemetry()).unwrap();
    assert_eq!(json["mode"], "normal");
    assert_eq!(json["drive_scheme"], "Arcade");
    assert_eq!(json["display"][0], "Normal operation");
}

#[test]
fn configuration_round_trips_through_the_tuning_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DEFAULT_TUNING_FILE);
    std::fs::write(&path, "elbowTarget=2.5\ndriveSystem=tank\n").unwrap();

    let hw = SimRobot::full().build();
    let probes = hw.probes.clone();
    let clock = Arc::new(ManualClock::new());
    let mut robot = Robot::with_tuning_file(
        hw.registry,
        &path,
        clock.clone(),
        Duration::from_millis(250),
    )
    .unwrap();
    assert_eq!(robot.context().config.get_f64(keys::ELBOW_TARGET), 2.5);

    let mut board = ControlSnapshot::default();
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.context().drive.scheme(), DriveScheme::Tank);

    board.set_panel(panel::CONFIG, true);
    tick(&mut robot, &clock, &board);
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("config"));

    probes.set_voltage(ports::SHOULDER_SENSOR_CHANNEL, 1.25);
    board.set_button(1, 3, true);
    tick(&mut robot, &clock, &board);
    board.set_button(1, 3, false);

    // An edit made while configuring is picked up by the reread button.
    let mut on_disk = ConfigStore::new();
    on_disk.read(&path).unwrap();
    on_disk.set_f64(keys::ELBOW_TOL, 0.05);
    on_disk.write(&path, "edited").unwrap();
    board.set_panel(panel::REREAD, true);
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.context().config.get_f64(keys::ELBOW_TOL), 0.05);
    // Keys missing from the file keep their in-memory values.
    assert_eq!(robot.context().config.get_f64(keys::SHOULDER_RAISED_POS), 1.25);

    board.set_panel(panel::CONFIG, false);
    tick(&mut robot, &clock, &board);
    tick(&mut robot, &clock, &board);
    assert_eq!(robot.state_name(), Some("normal"));

    let mut saved = ConfigStore::new();
    saved.read(&path).unwrap();
    assert_eq!(saved.get_f64(keys::SHOULDER_RAISED_POS), 1.25);
    assert_eq!(saved.get_f64(keys::ELBOW_TOL), 0.05);
    assert_eq!(saved.get(keys::DRIVE_SYSTEM), Some("tank"));
}
