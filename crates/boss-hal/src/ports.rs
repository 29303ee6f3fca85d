//! Well-known hardware identifiers and analog channel assignments.
//!
//! Drivers register under these ids; subsystems look them up by the same
//! constants.  Analog channels index the [`AnalogBank`][crate::analog::AnalogBank].

// Drive base
pub const LEFT_FRONT_DRIVE: &str = "left_front_drive";
pub const LEFT_REAR_DRIVE: &str = "left_rear_drive";
pub const RIGHT_FRONT_DRIVE: &str = "right_front_drive";
pub const RIGHT_REAR_DRIVE: &str = "right_rear_drive";
pub const LEFT_DRIVE_MOTORS: [&str; 2] = [LEFT_FRONT_DRIVE, LEFT_REAR_DRIVE];
pub const RIGHT_DRIVE_MOTORS: [&str; 2] = [RIGHT_FRONT_DRIVE, RIGHT_REAR_DRIVE];
pub const LEFT_DRIVE_ENCODER: &str = "left_drive_encoder";
pub const RIGHT_DRIVE_ENCODER: &str = "right_drive_encoder";
pub const GEAR_SWITCH: &str = "gear_switch";

// Pneumatics
pub const COMPRESSOR: &str = "compressor";
pub const PRESSURE_SWITCH: &str = "pressure_switch";

// Arm
pub const SHOULDER_MOTOR_1: &str = "shoulder_motor_1";
pub const SHOULDER_MOTOR_2: &str = "shoulder_motor_2";
pub const SHOULDER_MOTORS: [&str; 2] = [SHOULDER_MOTOR_1, SHOULDER_MOTOR_2];
pub const SHOULDER_BRAKE: &str = "shoulder_brake";
pub const ELBOW_SWITCH: &str = "elbow_switch";

// Kicker
pub const KICKER_MOTOR: &str = "kicker_motor";
pub const KICKER_WINCH_1: &str = "kicker_winch_1";
pub const KICKER_WINCH_2: &str = "kicker_winch_2";
pub const KICKER_WINCHES: [&str; 2] = [KICKER_WINCH_1, KICKER_WINCH_2];
pub const INTAKE_MOTOR: &str = "intake_motor";
pub const INTAKE_ENCODER: &str = "intake_encoder";

// Autonomous selector, least significant bit first
pub const AUTO_SWITCH_A: [&str; 4] = ["auto_a1", "auto_a2", "auto_a4", "auto_a8"];
pub const AUTO_SWITCH_B: [&str; 4] = ["auto_b1", "auto_b2", "auto_b4", "auto_b8"];

// Analog channels
pub const KICKER_ENCODER_CHANNEL: usize = 1;
pub const KICKER_WINCH_SENSOR_CHANNEL: usize = 2;
pub const SHOULDER_SENSOR_CHANNEL: usize = 3;
pub const ELBOW_SENSOR_CHANNEL: usize = 4;
