//! Operating modes of the robot.
//!
//! Exactly one [`State`] is active at a time.  A state asks for a change
//! through [`RobotContext`]; the request only takes effect at the top of the
//! next iteration, where the old state's [`State::exit`] runs before the new
//! state's [`State::enter`].  A later request in the same step replaces an
//! earlier one.
//!
//! | State | Entered from | Purpose |
//! |---|---|---|
//! | [`NormalState`] | start-up, Config, Finale | Teleop with every subsystem live |
//! | [`ConfigState`] | Normal (panel 1) | Calibration; the joysticks capture tuning values |
//! | [`FinaleState`] | Normal (panel 3) | End-game drive with the arm raised |
//! | [`RaisingState`] | Finale (operator trigger) | Drive motors wind the robot up the bar |
//! | [`DisabledState`] | panel 2 from any state | Soft-disable, optionally resuming |

mod config;
mod disabled;
mod finale;
mod normal;
mod raising;

pub use config::ConfigState;
pub use disabled::DisabledState;
pub use finale::FinaleState;
pub use normal::NormalState;
pub use raising::RaisingState;

use crate::robot::RobotContext;

/// One operating mode.
///
/// The same instance may be entered and exited more than once; a state
/// resumed from [`DisabledState`] is re-entered before it steps again.
pub trait State {
    /// Short name used in logs and telemetry.
    fn name(&self) -> &'static str;

    /// Called once before the first [`State::step`] after a transition.
    fn enter(&mut self, _ctx: &mut RobotContext) {}

    /// Called once when the robot leaves this state.
    fn exit(&mut self, _ctx: &mut RobotContext) {}

    /// One control tick.
    fn step(&mut self, ctx: &mut RobotContext);
}

/// A requested change of state, applied at the next iteration boundary.
pub enum Transition {
    /// Switch to the given state.
    To(Box<dyn State>),
    /// Soft-disable, resuming the current state once the disable switch is
    /// released.
    Suspend,
    /// Leave the current state with nothing to replace it.
    Clear,
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::To(state) => write!(f, "To({})", state.name()),
            Transition::Suspend => write!(f, "Suspend"),
            Transition::Clear => write!(f, "Clear"),
        }
    }
}

/// Operator panel buttons read by the states.
pub mod panel {
    /// Held: configuration mode.
    pub const CONFIG: usize = 1;
    /// Held: soft-disable.
    pub const DISABLE: usize = 2;
    /// Held: finale.
    pub const FINALE: usize = 3;
    /// Re-read the tuning file while configuring.
    pub const REREAD: usize = 5;
}
