//! `boss-kernel` – Safety & Configuration
//!
//! The pieces of the robot that are not control logic but that every
//! control loop depends on.
//!
//! # Modules
//!
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: the control-loop
//!   deadline.  The loop must feed it several times per tick; once it
//!   expires the robot forces every motor output to zero.
//! - [`config_store`] – [`ConfigStore`][config_store::ConfigStore]: the
//!   tuning store, a string-to-string map persisted as `name=value` lines,
//!   with numeric lookups that fall back to defaults.

pub mod config_store;
pub mod watchdog;

pub use config_store::ConfigStore;
pub use watchdog::{Watchdog, WatchdogStatus};
