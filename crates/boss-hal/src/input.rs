//! Operator inputs: joysticks and the driver-station button panel.
//!
//! Indices are 1-based to match the labels printed on the hardware.
//! [`ControlSnapshot::capture`] freezes every input at the start of a
//! cycle so all subsystems see the same values.

/// Number of joysticks on the driver station.
pub const JOYSTICKS: usize = 4;
/// Axes per joystick.
pub const AXES: usize = 6;
/// Buttons per joystick.
pub const BUTTONS: usize = 12;
/// Buttons on the driver-station panel.
pub const PANEL_BUTTONS: usize = 16;

/// Live source of operator inputs.
pub trait ControlBoard {
    /// Axis value in `[-1.0, 1.0]`.
    fn axis(&self, joystick: usize, axis: usize) -> f32;

    fn button(&self, joystick: usize, button: usize) -> bool;

    fn panel_button(&self, button: usize) -> bool;
}

/// All operator inputs frozen at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlSnapshot {
    axes: [[f32; AXES]; JOYSTICKS],
    buttons: [[bool; BUTTONS]; JOYSTICKS],
    panel: [bool; PANEL_BUTTONS],
}

impl ControlSnapshot {
    /// Read every input from `board`.
    pub fn capture(board: &dyn ControlBoard) -> Self {
        let mut snapshot = Self::default();
        for j in 0..JOYSTICKS {
            for a in 0..AXES {
                let value = board.axis(j + 1, a + 1);
                snapshot.axes[j][a] = if value.is_finite() {
                    value.clamp(-1.0, 1.0)
                } else {
                    0.0
                };
            }
            for b in 0..BUTTONS {
                snapshot.buttons[j][b] = board.button(j + 1, b + 1);
            }
        }
        for b in 0..PANEL_BUTTONS {
            snapshot.panel[b] = board.panel_button(b + 1);
        }
        snapshot
    }

    /// Axis value; `0.0` for out-of-range indices.
    pub fn axis(&self, joystick: usize, axis: usize) -> f32 {
        joystick
            .checked_sub(1)
            .and_then(|j| self.axes.get(j))
            .and_then(|row| axis.checked_sub(1).and_then(|a| row.get(a)))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn x(&self, joystick: usize) -> f32 {
        self.axis(joystick, 1)
    }

    pub fn y(&self, joystick: usize) -> f32 {
        self.axis(joystick, 2)
    }

    /// Button state; `false` for out-of-range indices.
    pub fn button(&self, joystick: usize, button: usize) -> bool {
        joystick
            .checked_sub(1)
            .and_then(|j| self.buttons.get(j))
            .and_then(|row| button.checked_sub(1).and_then(|b| row.get(b)))
            .copied()
            .unwrap_or(false)
    }

    pub fn trigger(&self, joystick: usize) -> bool {
        self.button(joystick, 1)
    }

    pub fn panel(&self, button: usize) -> bool {
        button
            .checked_sub(1)
            .and_then(|b| self.panel.get(b))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_axis(&mut self, joystick: usize, axis: usize, value: f32) {
        if let Some(slot) = joystick
            .checked_sub(1)
            .and_then(|j| self.axes.get_mut(j))
            .and_then(|row| axis.checked_sub(1).and_then(|a| row.get_mut(a)))
        {
            *slot = value.clamp(-1.0, 1.0);
        }
    }

    pub fn set_button(&mut self, joystick: usize, button: usize, pressed: bool) {
        if let Some(slot) = joystick
            .checked_sub(1)
            .and_then(|j| self.buttons.get_mut(j))
            .and_then(|row| button.checked_sub(1).and_then(|b| row.get_mut(b)))
        {
            *slot = pressed;
        }
    }

    pub fn set_panel(&mut self, button: usize, pressed: bool) {
        if let Some(slot) = button.checked_sub(1).and_then(|b| self.panel.get_mut(b)) {
            *slot = pressed;
        }
    }
}

/// A snapshot is itself a control board, which makes scripted input easy.
impl ControlBoard for ControlSnapshot {
    fn axis(&self, joystick: usize, axis: usize) -> f32 {
        ControlSnapshot::axis(self, joystick, axis)
    }

    fn button(&self, joystick: usize, button: usize) -> bool {
        ControlSnapshot::button(self, joystick, button)
    }

    fn panel_button(&self, button: usize) -> bool {
        self.panel(button)
    }
}
