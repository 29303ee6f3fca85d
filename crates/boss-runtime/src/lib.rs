//! `boss-runtime` – subsystems, operating modes and the run loop.
//!
//! # Modules
//!
//! - [`drive_system`] – [`DriveSystem`][drive_system::DriveSystem]: turns
//!   operator or programmatic intent into left/right motor commands through
//!   one of four [`DriveScheme`][boss_types::DriveScheme]s, with inertial-hold
//!   and heading-hold compensation.
//! - [`arm_system`] – [`ArmSystem`][arm_system::ArmSystem]: shoulder presets
//!   on a timed PID, plus the brake.
//! - [`kicker_system`] – [`KickerSystem`][kicker_system::KickerSystem]:
//!   winch strength presets, the kick/cock cycle and the intake with ball
//!   possession detection.
//! - [`states`] – the [`State`][states::State] trait and the five operating
//!   modes.
//! - [`robot`] – [`Robot`][robot::Robot]: applies pending transitions and
//!   steps the active state once per tick, feeding the watchdog between every
//!   stage.
//! - [`autonomous`] – [`AutonomousRoutine`][autonomous::AutonomousRoutine]:
//!   the tick-based kick-and-creep routine.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing] and the
//!   driver station text display.

pub mod arm_system;
pub mod autonomous;
pub mod drive_system;
pub mod kicker_system;
pub mod robot;
pub mod states;
pub mod telemetry;

pub use arm_system::ArmSystem;
pub use autonomous::{AutoSelector, AutonomousRoutine};
pub use drive_system::DriveSystem;
pub use kicker_system::{IntakeMode, KickerSystem};
pub use robot::{Robot, RobotContext, RobotOptions};
pub use states::{State, Transition};
pub use telemetry::{DriverDisplay, TracerProviderGuard, init_tracing};
