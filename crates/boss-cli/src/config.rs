//! Robot profile – reads/writes `~/.boss/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use boss_runtime::robot::DEFAULT_TUNING_FILE;
use tracing::{info, warn};

/// Canned operator input played back by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    /// Hands off the sticks.
    #[default]
    Idle,
    /// Half stick forward.
    Forward,
    /// Half stick clockwise.
    Spin,
    /// One second forward, then hands off.
    Nudge,
}

impl std::str::FromStr for Script {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(Script::Idle),
            "forward" => Ok(Script::Forward),
            "spin" => Ok(Script::Spin),
            "nudge" => Ok(Script::Nudge),
            other => Err(format!("unknown script '{other}' (idle, forward, spin, nudge)")),
        }
    }
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Script::Idle => write!(f, "idle"),
            Script::Forward => write!(f, "forward"),
            Script::Spin => write!(f, "spin"),
            Script::Nudge => write!(f, "nudge"),
        }
    }
}

/// Persisted settings for the simulated robot, stored in
/// `~/.boss/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotProfile {
    /// Control loop period.
    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,

    /// Watchdog expiration.
    #[serde(default = "default_watchdog_ms")]
    pub watchdog_ms: u64,

    /// Tuning file read at start-up and written on exit.
    #[serde(default = "default_tuning_file")]
    pub tuning_file: PathBuf,

    /// Stop after this many ticks; run until Ctrl-C when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticks: Option<u64>,

    #[serde(default)]
    pub script: Script,
}

fn default_loop_period_ms() -> u64 {
    20
}
fn default_watchdog_ms() -> u64 {
    250
}
fn default_tuning_file() -> PathBuf {
    PathBuf::from(DEFAULT_TUNING_FILE)
}

impl Default for RobotProfile {
    fn default() -> Self {
        Self {
            loop_period_ms: default_loop_period_ms(),
            watchdog_ms: default_watchdog_ms(),
            tuning_file: default_tuning_file(),
            ticks: None,
            script: Script::default(),
        }
    }
}

impl RobotProfile {
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_period_ms.max(1))
    }

    pub fn watchdog_expiration(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }
}

/// Return the path to `~/.boss/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the profile path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".boss").join("config.toml")
}

/// Load the profile from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<RobotProfile>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read profile at {}: {}", path.display(), e))?;
    let mut profile: RobotProfile =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse profile: {}", e))?;
    apply_env_overrides(&mut profile);
    Ok(Some(profile))
}

/// Load the profile at `path`, falling back to the defaults when the file is
/// absent or unreadable.  Environment overrides apply in every case.
pub fn load_or_default(path: &Path) -> RobotProfile {
    match load_from(path) {
        Ok(Some(profile)) => {
            info!(path = %path.display(), "profile loaded");
            profile
        }
        Ok(None) => {
            info!(path = %path.display(), "no profile, using defaults");
            let mut profile = RobotProfile::default();
            apply_env_overrides(&mut profile);
            profile
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "profile not loaded, using defaults");
            let mut profile = RobotProfile::default();
            apply_env_overrides(&mut profile);
            profile
        }
    }
}

/// Apply `BOSS_*` environment variable overrides to `profile`.
///
/// | Variable | Profile field |
/// |---|---|
/// | `BOSS_TUNING_FILE` | `tuning_file` |
/// | `BOSS_LOOP_PERIOD_MS` | `loop_period_ms` |
/// | `BOSS_WATCHDOG_MS` | `watchdog_ms` |
pub fn apply_env_overrides(profile: &mut RobotProfile) {
    if let Ok(v) = std::env::var("BOSS_TUNING_FILE") {
        profile.tuning_file = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("BOSS_LOOP_PERIOD_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        profile.loop_period_ms = ms;
    }
    if let Ok(v) = std::env::var("BOSS_WATCHDOG_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        profile.watchdog_ms = ms;
    }
}

/// Save the profile to `path`, creating its directory if necessary.
pub fn save_to(profile: &RobotProfile, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create profile directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(profile)
        .map_err(|e| format!("Failed to serialize profile: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write profile at {}: {}", path.display(), e))
}
