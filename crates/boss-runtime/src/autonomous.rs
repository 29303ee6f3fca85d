//! Kick-and-creep autonomous routine.
//!
//! The routine drives forward with the intake running.  Whenever the intake
//! reports a ball it backs up for a second, kicks, and starts creeping
//! forward again.  It finishes once either drive encoder has covered
//! `autonomousMaxDistance`.
//!
//! It is advanced one tick at a time by
//! [`Robot::autonomous_tick`][crate::robot::Robot::autonomous_tick] instead
//! of blocking the caller, so the run loop keeps control of pacing.

use boss_hal::{HardwareRegistry, Timer, ports};
use boss_kernel::config_store::keys;
use boss_types::{DriveScheme, KickStrength};
use tracing::{debug, info};

use crate::robot::RobotContext;

/// Opening drive speed.
pub const OPENING_SPEED: f32 = 0.6;
/// Creep speed between kicks.
pub const CREEP_SPEED: f32 = 0.2;
/// Speed while backing off a captured ball.
pub const JOG_BACK_SPEED: f32 = -0.2;
/// How long the robot backs off before kicking.
pub const JOG_BACK_SECS: f64 = 1.0;
/// Time after a (re)start before possession is trusted.
pub const POSSESSION_GRACE_SECS: f64 = 1.0;
/// Default run length: eighteen feet, in inches.
pub const DEFAULT_MAX_DISTANCE: f64 = 12.0 * 18.0;

// ─────────────────────────────────────────────────────────────────────────────
// Selector
// ─────────────────────────────────────────────────────────────────────────────

/// The two 4-bit selector switches read at the start of autonomous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoSelector {
    /// Switch A: start delay in seconds.
    pub a: u8,
    /// Switch B: kick strength (1 low, 2 medium, 3 high).
    pub b: u8,
}

impl AutoSelector {
    pub fn new(a: u8, b: u8) -> Self {
        Self {
            a: a & 0x0f,
            b: b & 0x0f,
        }
    }

    /// Read both switches.  They are wired active-low; a missing input
    /// reads as open.
    pub fn read(io: &HardwareRegistry) -> Self {
        Self {
            a: switch_value(io, &ports::AUTO_SWITCH_A),
            b: switch_value(io, &ports::AUTO_SWITCH_B),
        }
    }

    pub fn strength(self) -> KickStrength {
        match self.b {
            1 => KickStrength::Low,
            3 => KickStrength::High,
            _ => KickStrength::Medium,
        }
    }

    pub fn start_delay_secs(self) -> f64 {
        f64::from(self.a)
    }

    /// Both values packed as `a << 4 | b`.
    pub fn packed(self) -> u8 {
        self.a << 4 | self.b
    }
}

fn switch_value(io: &HardwareRegistry, ids: &[&str; 4]) -> u8 {
    let raw = ids.iter().enumerate().fold(0u8, |acc, (bit, id)| {
        acc | u8::from(io.digital(id).unwrap_or(true)) << bit
    });
    !raw & 0x0f
}

// ─────────────────────────────────────────────────────────────────────────────
// Routine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct AutonomousRoutine {
    selector: AutoSelector,
    timer: Timer,
    started: bool,
    jog_back_at: Option<f64>,
    max_distance: f64,
    finished: bool,
}

impl AutonomousRoutine {
    /// Put the robot into its autonomous configuration and arm the routine:
    /// autonomous drive scheme, zeroed drive encoders, stopped drive, and
    /// the kicker reset and cocking at the selected strength.
    pub fn begin(ctx: &mut RobotContext, selector: AutoSelector) -> Self {
        ctx.install_drive_scheme(DriveScheme::Autonomous);
        ctx.io.reset_encoder(ports::LEFT_DRIVE_ENCODER);
        ctx.io.reset_encoder(ports::RIGHT_DRIVE_ENCODER);
        ctx.drive.stop();
        ctx.drive.drive(&mut ctx.io);

        ctx.kicker.reset(&ctx.io, &mut ctx.config);
        ctx.kicker.set_strength(selector.strength());
        ctx.kicker.cock();

        let max_distance = ctx
            .config
            .set_default_f64(keys::AUTONOMOUS_MAX_DISTANCE, DEFAULT_MAX_DISTANCE);

        let mut timer = Timer::new(ctx.clock());
        timer.start();
        ctx.drive.turn(OPENING_SPEED, 0.0);

        info!(
            delay = selector.a,
            strength = ?selector.strength(),
            max_distance,
            "autonomous started"
        );
        Self {
            selector,
            timer,
            started: false,
            jog_back_at: None,
            max_distance,
            finished: false,
        }
    }

    pub fn selector(&self) -> AutoSelector {
        self.selector
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `true` once the start delay has passed.
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// `true` while backing off a captured ball.
    pub fn is_jogging_back(&self) -> bool {
        self.jog_back_at.is_some()
    }

    /// Run one iteration.  Returns `true` once the routine has finished;
    /// later calls do nothing.
    pub fn tick(&mut self, ctx: &mut RobotContext) -> bool {
        if self.finished {
            return true;
        }

        let left = ctx.io.encoder_distance(ports::LEFT_DRIVE_ENCODER).unwrap_or(0.0);
        let right = ctx.io.encoder_distance(ports::RIGHT_DRIVE_ENCODER).unwrap_or(0.0);
        if left >= self.max_distance || right >= self.max_distance {
            ctx.drive.stop();
            ctx.drive.drive(&mut ctx.io);
            self.finished = true;
            info!(left, right, "autonomous finished");
            return true;
        }

        // Shoulder brake released.
        ctx.io.apply_solenoid(ports::SHOULDER_BRAKE, true);
        ctx.run_compressor();
        ctx.kicker.update(&mut ctx.io, &mut ctx.config);

        if !self.started {
            if self.timer.get() > self.selector.start_delay_secs() {
                self.started = true;
                ctx.kicker.run_intake();
                self.timer.reset();
                debug!("autonomous start delay elapsed");
            } else {
                return false;
            }
        }

        ctx.drive.drive(&mut ctx.io);

        let t = self.timer.get();
        if let Some(jog_start) = self.jog_back_at {
            if t - jog_start >= JOG_BACK_SECS {
                ctx.kicker.kick();
                ctx.drive.stop();
                self.timer.reset();
                self.jog_back_at = None;
                debug!("autonomous kick");
            }
        } else if t > POSSESSION_GRACE_SECS && ctx.kicker.has_possession() {
            self.jog_back_at = Some(t);
            ctx.drive.turn(JOG_BACK_SPEED, 0.0);
            debug!("ball captured, backing off");
        } else if !ctx.kicker.is_kicking() {
            ctx.kicker.cock();
            ctx.drive.turn(CREEP_SPEED, 0.0);
        }

        ctx.kicker.update(&mut ctx.io, &mut ctx.config);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boss_hal::sim::SimRobot;

    #[test]
    fn open_switches_select_zero() {
        let hw = SimRobot::new().with_auto_switches().build();
        assert_eq!(AutoSelector::read(&hw.registry), AutoSelector::new(0, 0));
    }

    #[test]
    fn closed_switches_read_as_set_bits() {
        let hw = SimRobot::new().with_auto_switches().build();
        hw.probes.set_digital(ports::AUTO_SWITCH_A[0], false);
        hw.probes.set_digital(ports::AUTO_SWITCH_A[2], false);
        hw.probes.set_digital(ports::AUTO_SWITCH_B[0], false);
        hw.probes.set_digital(ports::AUTO_SWITCH_B[1], false);
        let selector = AutoSelector::read(&hw.registry);
        assert_eq!(selector, AutoSelector::new(5, 3));
        assert_eq!(selector.start_delay_secs(), 5.0);
        assert_eq!(selector.strength(), KickStrength::High);
        assert_eq!(selector.packed(), 0x53);
    }

    #[test]
    fn strength_defaults_to_medium() {
        assert_eq!(AutoSelector::new(0, 0).strength(), KickStrength::Medium);
        assert_eq!(AutoSelector::new(0, 1).strength(), KickStrength::Low);
        assert_eq!(AutoSelector::new(0, 9).strength(), KickStrength::Medium);
    }
}
