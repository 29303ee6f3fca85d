//! # boss-hal
//!
//! Hardware Abstraction Layer for the robot control core.
//!
//! Drivers implement the narrow traits in [`motor`], [`relay`], [`sensor`]
//! and [`input`] and are registered with a [`registry::HardwareRegistry`].
//! On top of those sit the reusable control pieces: [`pid`] controllers,
//! the [`absolute_encoder`] unwrapper, [`steering`] actuators, the
//! edge-detecting [`flag`] and the clock-driven [`timer`].
//!
//! [`sim`] provides in-process drivers and a small plant model so the whole
//! stack runs without hardware.

pub mod absolute_encoder;
pub mod analog;
pub mod flag;
pub mod input;
pub mod math;
pub mod motor;
pub mod pid;
pub mod ports;
pub mod registry;
pub mod relay;
pub mod sensor;
pub mod sim;
pub mod steering;
pub mod timer;

pub use absolute_encoder::AbsoluteEncoder;
pub use analog::{AnalogBank, AnalogSampler};
pub use flag::Flag;
pub use input::{ControlBoard, ControlSnapshot};
pub use pid::{BandedPid, PidGains, SimplePid};
pub use registry::HardwareRegistry;
pub use steering::{DriveSide, SteeringMotor, SwerveDrive};
pub use timer::Timer;
