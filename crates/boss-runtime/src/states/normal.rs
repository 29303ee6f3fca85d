//! Teleop with every subsystem live.

use boss_hal::ports;
use boss_types::ArmPreset;

use super::{ConfigState, FinaleState, State, panel};
use crate::robot::{RobotContext, configured_scheme};

#[derive(Debug, Default)]
pub struct NormalState;

impl NormalState {
    pub fn new() -> Self {
        Self
    }
}

impl State for NormalState {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn enter(&mut self, ctx: &mut RobotContext) {
        ctx.display.clear();
        ctx.display.set_line(1, "Normal operation");

        let scheme = configured_scheme(&mut ctx.config);
        ctx.install_drive_scheme(scheme);
        ctx.io.reset_encoder(ports::LEFT_DRIVE_ENCODER);
        ctx.io.reset_encoder(ports::RIGHT_DRIVE_ENCODER);
        ctx.arm.set_preset(ArmPreset::Stowed);
    }

    fn exit(&mut self, ctx: &mut RobotContext) {
        ctx.io.reset_encoder(ports::LEFT_DRIVE_ENCODER);
        ctx.io.reset_encoder(ports::RIGHT_DRIVE_ENCODER);
    }

    fn step(&mut self, ctx: &mut RobotContext) {
        if ctx.controls.panel(panel::CONFIG) {
            ctx.change_state(Box::new(ConfigState::new()));
            return;
        }
        if ctx.controls.panel(panel::DISABLE) {
            ctx.suspend();
            return;
        }
        if ctx.controls.panel(panel::FINALE) {
            ctx.change_state(Box::new(FinaleState::new()));
            return;
        }

        ctx.teleop_drive();
        ctx.feed_watchdog();

        ctx.kicker.read_controls(&ctx.controls, &ctx.io, &mut ctx.config);
        ctx.kicker.update(&mut ctx.io, &mut ctx.config);
        ctx.feed_watchdog();

        ctx.arm.unbrake();
        ctx.arm.update(&mut ctx.io, &mut ctx.config);
        ctx.feed_watchdog();

        let kicker = ctx.kicker.encoder_voltage();
        ctx.display.set_line(2, format!("Drive: {}", ctx.drive.scheme()));
        ctx.display.set_line(5, format!("Kicker: {kicker:.2}V"));
    }
}
