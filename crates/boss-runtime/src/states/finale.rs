//! End-game driving with the arm raised.

use boss_types::ArmPreset;

use super::{NormalState, RaisingState, State, panel};
use crate::robot::RobotContext;

#[derive(Debug, Default)]
pub struct FinaleState;

impl FinaleState {
    pub fn new() -> Self {
        Self
    }
}

impl State for FinaleState {
    fn name(&self) -> &'static str {
        "finale"
    }

    fn enter(&mut self, ctx: &mut RobotContext) {
        ctx.display.clear();
        ctx.display.set_line(1, "FINALE!!!!!");
        ctx.soft_stop();
        ctx.arm.set_preset(ArmPreset::Raised);
    }

    fn step(&mut self, ctx: &mut RobotContext) {
        if ctx.controls.panel(panel::DISABLE) {
            ctx.suspend();
            return;
        }
        if !ctx.controls.panel(panel::FINALE) {
            ctx.change_state(Box::new(NormalState::new()));
            return;
        }
        if ctx.controls.trigger(3) {
            ctx.change_state(Box::new(RaisingState::new(ctx.clock())));
            return;
        }

        ctx.teleop_drive();
        ctx.feed_watchdog();
        ctx.arm.update(&mut ctx.io, &mut ctx.config);
    }
}
