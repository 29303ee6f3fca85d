//! Winding the robot up the bar.
//!
//! The elbow PID runs on `5 - elbow voltage` and its output drives every
//! drive motor (right side negated) once the gearbox has had
//! `quasiNeutralDelay` to settle.  Reaching `elbowTarget` soft-disables the
//! robot for good.

use std::sync::Arc;

use boss_hal::{SimplePid, Timer, ports};
use boss_kernel::config_store::keys;
use boss_types::{ArmPreset, Clock};
use tracing::info;

use super::{DisabledState, State, panel};
use crate::robot::RobotContext;

/// Elbow sensor travel outside which the drive motors are held at zero.
const ELBOW_TRAVEL: (f32, f32) = (0.1, 4.9);

#[derive(Debug)]
pub struct RaisingState {
    pid: SimplePid,
    timer: Timer,
}

impl RaisingState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            pid: SimplePid::with_clock(7.5, 0.0, 0.0, clock.clone()),
            timer: Timer::new(clock),
        }
    }

    pub fn target(&self) -> f32 {
        self.pid.target()
    }
}

fn elbow_position(ctx: &RobotContext) -> f32 {
    5.0 - ctx.io.voltage(ports::ELBOW_SENSOR_CHANNEL)
}

impl State for RaisingState {
    fn name(&self) -> &'static str {
        "raising"
    }

    fn enter(&mut self, ctx: &mut RobotContext) {
        ctx.display.clear();
        ctx.display.set_line(1, "Raising...");
        ctx.display.set_line(2, "User control disabled");
        ctx.soft_stop();
        ctx.arm.set_preset(ArmPreset::Raised);
        ctx.arm.update(&mut ctx.io, &mut ctx.config);

        let p = ctx.config.param(keys::ELBOW_P, 7.5);
        let i = ctx.config.param(keys::ELBOW_I, 0.0);
        let d = ctx.config.param(keys::ELBOW_D, 0.0);
        self.pid.set_limits(0.0, 1.0);
        self.pid.set_gains(p, i, d);
        self.pid.reset();
        self.pid.set_target(ctx.config.param(keys::ELBOW_TARGET, 1.0));
        self.pid.start();

        self.timer.reset();
        self.timer.start();
        info!(target = self.pid.target(), "raising started");
    }

    fn exit(&mut self, _ctx: &mut RobotContext) {
        self.pid.stop();
        self.timer.stop();
    }

    fn step(&mut self, ctx: &mut RobotContext) {
        let elbow = elbow_position(ctx);
        let tolerance = ctx.config.param(keys::ELBOW_TOL, 0.01);
        if (elbow - self.pid.target()).abs() < tolerance {
            info!(elbow, "raising complete");
            ctx.change_state(Box::new(DisabledState::new(None)));
            return;
        }
        if ctx.controls.panel(panel::DISABLE) {
            ctx.suspend();
            return;
        }

        ctx.io.apply_solenoid(ports::GEAR_SWITCH, true);
        ctx.arm.brake();
        ctx.arm.update(&mut ctx.io, &mut ctx.config);
        for id in ports::SHOULDER_MOTORS {
            ctx.io.apply_motor(id, 0.0);
        }

        let delay = ctx.config.set_default_f64(keys::QUASI_NEUTRAL_DELAY, 0.1);
        if self.timer.get() < delay {
            return;
        }

        let output = self.pid.update_timed(elbow);
        let command = if elbow > ELBOW_TRAVEL.0 && elbow < ELBOW_TRAVEL.1 {
            output
        } else {
            0.0
        };
        for id in ports::LEFT_DRIVE_MOTORS {
            ctx.io.apply_motor(id, command);
        }
        for id in ports::RIGHT_DRIVE_MOTORS {
            ctx.io.apply_motor(id, -command);
        }
        ctx.display.set_line(4, format!("PID: {output:.3}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::{Robot, RobotOptions};
    use boss_hal::sim::SimRobot;
    use boss_kernel::ConfigStore;
    use boss_types::ManualClock;
    use std::time::Duration;

    #[test]
    fn waits_for_the_gearbox_then_winds() {
        let hw = SimRobot::full().build();
        let probes = hw.probes.clone();
        // Elbow position 5 - 4.5 = 0.5, target 1.0.
        probes.set_voltage(ports::ELBOW_SENSOR_CHANNEL, 4.5);
        let clock = Arc::new(ManualClock::new());
        let mut robot = Robot::new(
            hw.registry,
            ConfigStore::new(),
            clock.clone(),
            RobotOptions::default(),
        );
        robot
            .context_mut()
            .change_state(Box::new(RaisingState::new(clock.clone())));
        robot.run_iteration();
        assert_eq!(robot.state_name(), Some("raising"));
        assert_eq!(probes.motor(ports::LEFT_FRONT_DRIVE), 0.0);
        assert_eq!(probes.solenoid(ports::GEAR_SWITCH), Some(true));

        clock.advance(Duration::from_millis(200));
        robot.run_iteration();
        // Error 0.5 * P 7.5 clips to the upper limit.
        assert_eq!(probes.motor(ports::LEFT_FRONT_DRIVE), 1.0);
        assert_eq!(probes.motor(ports::RIGHT_REAR_DRIVE), -1.0);
        assert_eq!(probes.motor(ports::SHOULDER_MOTOR_1), 0.0);
    }

    #[test]
    fn reaching_the_target_disables_without_resume() {
        let hw = SimRobot::full().build();
        hw.probes.set_voltage(ports::ELBOW_SENSOR_CHANNEL, 4.0);
        let clock = Arc::new(ManualClock::new());
        let mut robot = Robot::new(
            hw.registry,
            ConfigStore::new(),
            clock.clone(),
            RobotOptions::default(),
        );
        robot
            .context_mut()
            .change_state(Box::new(RaisingState::new(clock)));
        robot.run_iteration();
        robot.run_iteration();
        assert_eq!(robot.state_name(), Some("disabled"));
        assert_eq!(robot.context().display.line(3), "");
    }
}
