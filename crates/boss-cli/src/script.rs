//! Operator input played back from a [`Script`].

use boss_hal::ControlBoard;

use crate::config::Script;

/// Seconds of forward stick in [`Script::Nudge`].
const NUDGE_SECS: f64 = 1.0;
/// Stick deflection used by every script.
const STICK: f32 = 0.5;

/// A control board whose sticks follow a script at a given time.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedBoard {
    script: Script,
    elapsed_secs: f64,
}

impl ScriptedBoard {
    pub fn at(script: Script, elapsed_secs: f64) -> Self {
        Self {
            script,
            elapsed_secs,
        }
    }

    fn forward(&self) -> bool {
        match self.script {
            Script::Forward => true,
            Script::Nudge => self.elapsed_secs < NUDGE_SECS,
            Script::Idle | Script::Spin => false,
        }
    }
}

impl ControlBoard for ScriptedBoard {
    fn axis(&self, joystick: usize, axis: usize) -> f32 {
        match (joystick, axis) {
            // Y axes read negative when pushed forward.
            (1, 2) if self.forward() => -STICK,
            (2, 1) if self.script == Script::Spin => STICK,
            _ => 0.0,
        }
    }

    fn button(&self, _joystick: usize, _button: usize) -> bool {
        false
    }

    fn panel_button(&self, _button: usize) -> bool {
        false
    }
}
