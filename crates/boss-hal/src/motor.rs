//! Generic `SpeedController` trait for PWM motor controllers.
//!
//! Drivers implement this trait and register themselves with a
//! [`HardwareRegistry`][crate::registry::HardwareRegistry].  The control
//! core only ever talks to the trait, so a Victor, a Jaguar or a simulated
//! motor can be swapped without touching drive or mechanism logic.

use boss_types::BossError;

/// A motor controller accepting a normalized command in `[-1.0, 1.0]`.
pub trait SpeedController: Send + Sync {
    /// Stable identifier for this controller, e.g. `"left_front_drive"`.
    fn id(&self) -> &str;

    /// Command the motor.  Values outside `[-1.0, 1.0]` are clipped by the
    /// driver.
    ///
    /// # Errors
    ///
    /// Returns [`BossError::HardwareFault`] if the command cannot be applied.
    fn set(&mut self, speed: f32) -> Result<(), BossError>;

    /// Return the most recently applied command.
    fn get(&self) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process motor used only for tests.
    struct MockMotor {
        id: String,
        speed: f32,
    }

    impl SpeedController for MockMotor {
        fn id(&self) -> &str {
            &self.id
        }

        fn set(&mut self, speed: f32) -> Result<(), BossError> {
            self.speed = speed.clamp(-1.0, 1.0);
            Ok(())
        }

        fn get(&self) -> f32 {
            self.speed
        }
    }

    #[test]
    fn mock_motor_set_and_get() {
        let mut motor = MockMotor {
            id: "intake".to_string(),
            speed: 0.0,
        };
        assert_eq!(motor.id(), "intake");
        motor.set(0.4).unwrap();
        assert!((motor.get() - 0.4).abs() < f32::EPSILON);
        motor.set(3.0).unwrap();
        assert!((motor.get() - 1.0).abs() < f32::EPSILON);
    }
}
