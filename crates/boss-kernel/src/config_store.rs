//! [`ConfigStore`] – the robot's tuning store.
//!
//! Values are kept as strings in key order and persisted as one
//! `name=value` pair per line.  Lines starting with `#` are comments and a
//! line without `=` is ignored.  No whitespace is trimmed around keys, so
//! `kickerP = 1` defines the key `"kickerP "`.
//!
//! Numeric reads never fail: a missing or unparsable value reads as `0.0`,
//! and [`ConfigStore::set_default_f64`] substitutes the caller's default.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use boss_types::BossError;
use tracing::{debug, warn};

/// Tuning keys read by the control code.
pub mod keys {
    pub const INERT_P: &str = "inertP";
    pub const INERT_I: &str = "inertI";
    pub const INERT_D: &str = "inertD";
    pub const MOVING_P: &str = "movingP";
    pub const MOVING_I: &str = "movingI";
    pub const MOVING_D: &str = "movingD";
    pub const INERT_DELAY: &str = "inertDelay";
    pub const DRIVE_TICKS_PER_REV: &str = "driveEncoderTicksPerRev";
    pub const DRIVE_SYSTEM: &str = "driveSystem";

    pub const SHOULDER_P: &str = "shoulderP";
    pub const SHOULDER_I: &str = "shoulderI";
    pub const SHOULDER_D: &str = "shoulderD";
    pub const SHOULDER_STOWED_POS: &str = "shoulderStowedPos";
    pub const SHOULDER_RAISED_POS: &str = "shoulderRaisedPos";
    pub const SHOULDER_GTFU_POS: &str = "shoulderGTFUPos";
    pub const SHOULDER_MIN_POS: &str = "shoulderMinPos";
    pub const SHOULDER_MAX_POS: &str = "shoulderMaxPos";
    pub const SHOULDER_DEADBAND: &str = "shoulderDeadband";

    pub const KICKER_P: &str = "kickerP";
    pub const KICKER_I: &str = "kickerI";
    pub const KICKER_D: &str = "kickerD";
    pub const KICKER_REST_ANGLE: &str = "kickerRestAngle";
    pub const KICKER_COCKED_ANGLE: &str = "kickerCockedAngle";
    pub const KICKER_POS_TOLERANCE: &str = "kickerPosTolerance";
    pub const KICKER_ENCODER_VOLTAGE: &str = "kickerEncoderVoltage";
    pub const WINCH_POS_TOLERANCE: &str = "winchPosTolerance";

    pub const ELBOW_P: &str = "elbowP";
    pub const ELBOW_I: &str = "elbowI";
    pub const ELBOW_D: &str = "elbowD";
    pub const ELBOW_TARGET: &str = "elbowTarget";
    pub const ELBOW_MINIMUM: &str = "elbowMinimum";
    pub const ELBOW_MAXIMUM: &str = "elbowMaximum";
    pub const ELBOW_TOL: &str = "elbowTol";
    pub const QUASI_NEUTRAL_DELAY: &str = "quasiNeutralDelay";

    pub const AUTONOMOUS_MAX_DISTANCE: &str = "autonomousMaxDistance";
}

const HEADER_RULES: [&str; 3] = [
    "# Each line in this file must be in the form: name=value",
    "# There must not be any spaces around the equals sign.",
    "# Any line that starts with # is ignored and treated as a comment.",
];

/// Ordered string-to-string tuning map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Raw stored string.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Stored value as a number; `0.0` when missing or unparsable.
    pub fn get_f64(&self, key: &str) -> f64 {
        self.get(key).and_then(parse_number).unwrap_or(0.0)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn set_f64(&mut self, key: &str, value: f64) {
        self.set(key, value.to_string());
    }

    /// Return the stored string, storing `default` first if the key is
    /// absent.
    pub fn set_default_str(&mut self, key: &str, default: &str) -> String {
        self.values
            .entry(key.to_string())
            .or_insert_with(|| default.to_string())
            .clone()
    }

    /// Return the stored number, storing `default` first if the key is
    /// absent.  A stored value that does not parse yields `default`.
    pub fn set_default_f64(&mut self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            Some(raw) => match parse_number(raw) {
                Some(value) => value,
                None => {
                    warn!(key, value = %raw, default, "unparsable tuning value, using default");
                    default
                }
            },
            None => {
                self.set_f64(key, default);
                default
            }
        }
    }

    /// Like [`ConfigStore::set_default_f64`], narrowed to `f32`.
    pub fn param(&mut self, key: &str, default: f32) -> f32 {
        self.set_default_f64(key, f64::from(default)) as f32
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `name=value` lines from `text`, returning how many were read.
    pub fn parse(&mut self, text: &str) -> usize {
        let mut count = 0;
        for line in text.lines() {
            if line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                self.set(key, value);
                count += 1;
            }
        }
        count
    }

    /// File contents: a four-line header, a blank line, then every pair.
    pub fn render(&self, description: &str) -> String {
        let mut out = format!("# {description}\n");
        for rule in HEADER_RULES {
            out.push_str(rule);
            out.push('\n');
        }
        out.push('\n');
        for (key, value) in &self.values {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// Merge a tuning file into the store.  A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// [`BossError::Io`] if the file exists but cannot be read.
    pub fn read(&mut self, path: &Path) -> Result<usize, BossError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let count = self.parse(&text);
                debug!(path = %path.display(), count, "tuning file read");
                Ok(count)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no tuning file, using defaults");
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write the whole store to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// [`BossError::Io`] if the file cannot be written.
    pub fn write(&self, path: &Path, description: &str) -> Result<(), BossError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.render(description))?;
        debug!(path = %path.display(), count = self.len(), "tuning file written");
        Ok(())
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}
