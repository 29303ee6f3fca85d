//! Discrete outputs: three-state [`Relay`]s (winches, compressor) and
//! two-state [`Solenoid`]s (gear shift, brakes).

use boss_types::{BossError, RelayDirection};

/// A forward / reverse / off relay, e.g. a winch motor spike.
pub trait Relay: Send + Sync {
    /// Stable identifier for this relay, e.g. `"kicker_winch_1"`.
    fn id(&self) -> &str;

    /// Drive the relay in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`BossError::HardwareFault`] if the command cannot be applied.
    fn set(&mut self, direction: RelayDirection) -> Result<(), BossError>;

    /// Return the relay's current direction.
    fn get(&self) -> RelayDirection;
}

/// A single-acting pneumatic valve.
pub trait Solenoid: Send + Sync {
    /// Stable identifier for this solenoid, e.g. `"gear_switch"`.
    fn id(&self) -> &str;

    /// Energise (`true`) or vent (`false`) the valve.
    ///
    /// # Errors
    ///
    /// Returns [`BossError::HardwareFault`] if the command cannot be applied.
    fn set(&mut self, on: bool) -> Result<(), BossError>;

    /// Return the valve's current state (`true` = energised).
    fn get(&self) -> bool;
}
