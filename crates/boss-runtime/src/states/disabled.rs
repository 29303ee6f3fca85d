//! Soft-disable.
//!
//! Outputs are stopped on entry and the shoulder brake is held.  A state
//! interrupted by the disable switch is kept and re-entered when the switch
//! is released; without one the robot stays here until something else
//! changes state.

use boss_hal::{Flag, ports};

use super::State;
use crate::robot::RobotContext;

pub struct DisabledState {
    resume: Option<Box<dyn State>>,
    switch: Flag,
}

impl DisabledState {
    pub fn new(resume: Option<Box<dyn State>>) -> Self {
        Self {
            resume,
            switch: Flag::new(true),
        }
    }

    /// Name of the state that will be resumed, if any.
    pub fn resumes(&self) -> Option<&'static str> {
        self.resume.as_ref().map(|s| s.name())
    }
}

impl std::fmt::Debug for DisabledState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisabledState")
            .field("resume", &self.resumes())
            .field("switch", &self.switch)
            .finish()
    }
}

impl State for DisabledState {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn enter(&mut self, ctx: &mut RobotContext) {
        ctx.display.clear();
        ctx.display.set_line(1, "Soft-disabled");
        if self.resume.is_some() {
            ctx.display.set_line(3, "Flip disable switch");
            ctx.display.set_line(4, "to regain control");
        }
        ctx.soft_stop();
    }

    fn step(&mut self, ctx: &mut RobotContext) {
        self.switch.set(ctx.controls.panel(super::panel::DISABLE));
        if self.resume.is_some() && self.switch.take_triggered_off() {
            if let Some(resume) = self.resume.take() {
                ctx.change_state(resume);
            }
            return;
        }
        // Brake engaged.
        ctx.io.apply_solenoid(ports::SHOULDER_BRAKE, false);
    }
}
