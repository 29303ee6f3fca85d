//! Edge detector for boolean inputs such as buttons and switches.

/// A boolean that remembers the value it had before the last change.
///
/// A *trigger* is pending whenever the current value differs from the
/// remembered one.  `check_*` methods leave the trigger armed; `take_*`
/// methods consume it.  [`Flag::set`] clears any stale trigger before
/// storing the new value, so feeding the flag once per tick yields an edge
/// for exactly that tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flag {
    value: bool,
    previous: bool,
}

impl Flag {
    pub fn new(initial: bool) -> Self {
        Self {
            value: initial,
            previous: initial,
        }
    }

    pub fn get(&self) -> bool {
        self.value
    }

    pub fn set(&mut self, value: bool) {
        self.clear_trigger();
        self.value = value;
    }

    pub fn check_triggered(&self) -> bool {
        self.value != self.previous
    }

    /// Changed to `true` (pressed).
    pub fn check_triggered_on(&self) -> bool {
        self.value && self.check_triggered()
    }

    /// Changed to `false` (released).
    pub fn check_triggered_off(&self) -> bool {
        !self.value && self.check_triggered()
    }

    pub fn take_triggered(&mut self) -> bool {
        let triggered = self.check_triggered();
        self.clear_trigger();
        triggered
    }

    pub fn take_triggered_on(&mut self) -> bool {
        let triggered = self.check_triggered_on();
        self.clear_trigger();
        triggered
    }

    pub fn take_triggered_off(&mut self) -> bool {
        let triggered = self.check_triggered_off();
        self.clear_trigger();
        triggered
    }

    pub fn clear_trigger(&mut self) {
        self.previous = self.value;
    }
}
