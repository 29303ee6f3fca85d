//! `boss-types` – shared vocabulary for the control workspace.
//!
//! Enumerations that cross crate boundaries (gear, presets, drive schemes),
//! the workspace-wide [`BossError`], the [`TelemetrySnapshot`] published to
//! operator displays, and the [`clock`] abstraction.

pub mod clock;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};

/// Drivetrain gearbox selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gear {
    #[default]
    Low,
    High,
}

/// Shoulder positions the arm subsystem knows how to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArmPreset {
    #[default]
    Stowed,
    Raised,
    /// "Get the frame upright" – the hanging position used in the finale.
    Gtfu,
}

/// Kicker winch strength presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KickStrength {
    #[default]
    Low,
    Medium,
    High,
}

impl KickStrength {
    /// Tuning-store key holding the winch voltage for this preset.
    pub fn config_key(self) -> &'static str {
        match self {
            KickStrength::Low => "kickerStrengthLo_pos",
            KickStrength::Medium => "kickerStrengthMd_pos",
            KickStrength::High => "kickerStrengthHi_pos",
        }
    }
}

/// Output of a three-state (forward / reverse / off) relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelayDirection {
    #[default]
    Off,
    Forward,
    Reverse,
}

/// How the drivetrain obtains its commanded speeds.
///
/// Every human-driven scheme funnels through the same mixing law; only the
/// axis mapping differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriveScheme {
    /// Programmatic control only; reading controls is a no-op.
    Autonomous,
    /// Joystick 1 Y for throttle, joystick 2 X for turning.
    #[default]
    Arcade,
    /// Joystick 1 Y for the left side, joystick 2 Y for the right side.
    Tank,
    /// Single gamepad: left stick throttle, right stick turning.
    Xbox,
}

impl DriveScheme {
    /// `true` for every scheme that reads the operator's controls.
    pub fn is_teleoperated(self) -> bool {
        !matches!(self, DriveScheme::Autonomous)
    }

    /// Parse a tuning-store name (`"arcade"`, `"tank"`, `"xbox"`).
    ///
    /// Unknown names fall back to [`DriveScheme::Arcade`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "tank" => DriveScheme::Tank,
            "xbox" => DriveScheme::Xbox,
            "autonomous" => DriveScheme::Autonomous,
            _ => DriveScheme::Arcade,
        }
    }
}

impl fmt::Display for DriveScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveScheme::Autonomous => write!(f, "autonomous"),
            DriveScheme::Arcade => write!(f, "arcade"),
            DriveScheme::Tank => write!(f, "tank"),
            DriveScheme::Xbox => write!(f, "xbox"),
        }
    }
}

/// Which drive-compensation strategy ran during the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompensationMode {
    /// Standing still, waiting out the settle delay with zero output.
    #[default]
    Settling,
    /// Standing still, holding encoder position with the inert PIDs.
    InertHold,
    /// Moving straight, correcting heading drift.
    HeadingHold,
    /// Moving and intentionally turning; no correction applied.
    Suspended,
}

/// Plain-value telemetry published once per tick for operator displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub timestamp: DateTime<Utc>,
    /// Name of the active mode state, or `"none"`.
    pub mode: String,
    pub drive_scheme: DriveScheme,
    pub left_speed: f32,
    pub right_speed: f32,
    pub gear: Gear,
    pub compensation: CompensationMode,
    pub heading_deg: f32,
    /// The six driver-station text lines.
    pub display: Vec<String>,
    pub watchdog_faults: u32,
}

/// Workspace-wide error type.
///
/// The control core never lets one of these escape a tick; hardware helpers
/// log and skip instead.  File and profile I/O surface them normally.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BossError {
    #[error("{kind} '{id}' is not registered")]
    NotRegistered { kind: String, id: String },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("I/O Error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BossError {
    fn from(e: std::io::Error) -> Self {
        BossError::Io(e.to_string())
    }
}
