//! Calibration mode.
//!
//! Held on panel 1.  Outputs are soft-stopped on entry and the operator's
//! joysticks move single mechanisms directly.  Buttons capture the current
//! sensor voltage into the tuning store:
//!
//! | Input | Stores |
//! |---|---|
//! | panel 15 / 11 / 7 | winch voltage as the low / medium / high strength |
//! | joystick 3 button 2 / 3 | kicker voltage as rest / cocked angle |
//! | joystick 1 button 2 / 3 / trigger | shoulder voltage as stowed / raised / GTFU |
//! | joystick 2 trigger / 4 / 5 | elbow position as target / minimum / maximum |
//!
//! The store is written back to the tuning file on exit.

use boss_hal::{Flag, ports};
use boss_kernel::config_store::keys;
use boss_types::{KickStrength, RelayDirection};
use tracing::info;

use super::{NormalState, State, panel};
use crate::robot::RobotContext;

/// Edge detectors for every capture input.
#[derive(Debug, Default)]
struct Captures {
    reread: Flag,
    strength_lo: Flag,
    strength_md: Flag,
    strength_hi: Flag,
    kick_rest: Flag,
    kick_cocked: Flag,
    shoulder_stowed: Flag,
    shoulder_raised: Flag,
    shoulder_gtfu: Flag,
    elbow_target: Flag,
    elbow_min: Flag,
    elbow_max: Flag,
}

#[derive(Debug, Default)]
pub struct ConfigState {
    captures: Captures,
}

impl ConfigState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Store `value` under `key` when `flag` has just been pressed.
fn capture(flag: &mut Flag, pressed: bool, ctx: &mut RobotContext, key: &str, value: f32) {
    flag.set(pressed);
    if flag.take_triggered_on() {
        ctx.config.set_f64(key, f64::from(value));
        info!(key, value, "calibration captured");
    }
}

impl State for ConfigState {
    fn name(&self) -> &'static str {
        "config"
    }

    fn enter(&mut self, ctx: &mut RobotContext) {
        ctx.display.clear();
        ctx.display.set_line(1, "CONFIGURATION");
        ctx.soft_stop();
        self.captures = Captures::default();
        ctx.reload_config();
    }

    fn exit(&mut self, ctx: &mut RobotContext) {
        ctx.save_config();
        ctx.kicker.reset_encoder_accumulator();
        ctx.kicker.reset(&ctx.io, &mut ctx.config);
    }

    fn step(&mut self, ctx: &mut RobotContext) {
        if !ctx.controls.panel(panel::CONFIG) {
            ctx.change_state(Box::new(NormalState::new()));
            return;
        }
        let controls = ctx.controls;
        let c = &mut self.captures;

        c.reread.set(controls.panel(panel::REREAD));
        if c.reread.take_triggered_on() {
            ctx.reload_config();
        }

        // Shoulder brake released.
        ctx.io.apply_solenoid(ports::SHOULDER_BRAKE, true);

        // Kicker and winch.
        let kicker = ctx.io.voltage(ports::KICKER_ENCODER_CHANNEL);
        let winch = ctx.io.voltage(ports::KICKER_WINCH_SENSOR_CHANNEL);
        for (flag, button, strength) in [
            (&mut c.strength_lo, 15, KickStrength::Low),
            (&mut c.strength_md, 11, KickStrength::Medium),
            (&mut c.strength_hi, 7, KickStrength::High),
        ] {
            capture(flag, controls.panel(button), ctx, strength.config_key(), winch);
        }

        let jog = if controls.button(3, 6) {
            RelayDirection::Forward
        } else if controls.button(3, 7) {
            RelayDirection::Reverse
        } else {
            RelayDirection::Off
        };
        for id in ports::KICKER_WINCHES {
            ctx.io.apply_relay(id, jog);
        }
        let kick = if controls.trigger(3) { 1.0 } else { 0.0 };
        ctx.io.apply_motor(ports::KICKER_MOTOR, kick);
        capture(&mut c.kick_rest, controls.button(3, 2), ctx, keys::KICKER_REST_ANGLE, kicker);
        capture(&mut c.kick_cocked, controls.button(3, 3), ctx, keys::KICKER_COCKED_ANGLE, kicker);

        // Shoulder.
        let shoulder = ctx.io.voltage(ports::SHOULDER_SENSOR_CHANNEL);
        for id in ports::SHOULDER_MOTORS {
            ctx.io.apply_motor(id, controls.y(1));
        }
        capture(&mut c.shoulder_stowed, controls.button(1, 2), ctx, keys::SHOULDER_STOWED_POS, shoulder);
        capture(&mut c.shoulder_raised, controls.button(1, 3), ctx, keys::SHOULDER_RAISED_POS, shoulder);
        capture(&mut c.shoulder_gtfu, controls.trigger(1), ctx, keys::SHOULDER_GTFU_POS, shoulder);

        // Elbow.
        let elbow = 5.0 - ctx.io.voltage(ports::ELBOW_SENSOR_CHANNEL);
        capture(&mut c.elbow_target, controls.trigger(2), ctx, keys::ELBOW_TARGET, elbow);
        capture(&mut c.elbow_min, controls.button(2, 4), ctx, keys::ELBOW_MINIMUM, elbow);
        capture(&mut c.elbow_max, controls.button(2, 5), ctx, keys::ELBOW_MAXIMUM, elbow);

        let selector = ctx.auto_selector();
        ctx.display.set_line(2, format!("Kicker: {kicker:.2}V"));
        ctx.display.set_line(3, format!("Winch: {winch:.2}V"));
        ctx.display.set_line(4, format!("Shoulder: {shoulder:.2}V"));
        ctx.display.set_line(5, format!("Elbow: {elbow:.2}"));
        ctx.display.set_line(6, format!("Auto: {:02x}", selector.packed()));
    }
}
