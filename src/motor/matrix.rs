use nalgebra::Vector3;
use num_traits::Float;

use super::{clamp_speed, MotorCommand, MotorId};
use crate::config::MOTOR_SPEED_MAX;

/// A motor and the sign of its response to roll, pitch and yaw corrections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motor {
    pub id: MotorId,
    pub factor: Vector3<f32>,
}

impl Motor {
    pub fn new(id: MotorId, factor: Vector3<f32>) -> Self {
        Self { id, factor }
    }

    /// Speed requested from this motor before clamping.
    pub fn thrust(&self, base_throttle: i32, corrections: &Vector3<f32>) -> f32 {
        base_throttle as f32 + self.factor.dot(corrections)
    }
}

/// Combines base throttle and axis corrections into per-motor speeds.
#[derive(Clone, Debug)]
pub struct MotorMixer {
    pub motors: [Motor; 4],
}

impl Default for MotorMixer {
    fn default() -> Self {
        Self::x_frame()
    }
}

impl MotorMixer {
    /// Create a mixer for the X-frame quad-copter layout.
    ///
    /// Positive roll speeds up the right motors, positive pitch the front motors
    /// and positive yaw the top-right/bottom-left diagonal.
    pub fn x_frame() -> Self {
        Self {
            motors: [
                Motor::new(MotorId::TopLeft, Vector3::new(-1., 1., -1.)),
                Motor::new(MotorId::TopRight, Vector3::new(1., 1., 1.)),
                Motor::new(MotorId::BottomLeft, Vector3::new(-1., -1., 1.)),
                Motor::new(MotorId::BottomRight, Vector3::new(1., -1., -1.)),
            ],
        }
    }

    /// Mix `(roll, pitch, yaw)` corrections onto `base_throttle`.
    /// Every motor is clamped to `0..=180`.
    pub fn mix(&self, base_throttle: i32, corrections: Vector3<f32>) -> MotorCommand {
        self.mix_with_ceiling(base_throttle, corrections, MOTOR_SPEED_MAX)
    }

    /// Same as [`mix`](Self::mix) with a lower ceiling. Ceilings above 180 are ignored.
    pub fn mix_with_ceiling(
        &self,
        base_throttle: i32,
        corrections: Vector3<f32>,
        ceiling: u8,
    ) -> MotorCommand {
        let mut command = MotorCommand::default();
        for motor in &self.motors {
            let thrust = motor.thrust(base_throttle, &corrections);
            let speed = if thrust.is_nan() {
                base_throttle
            } else {
                // Saturating float to int cast keeps huge values in range
                Float::round(thrust) as i32
            };
            command.set(motor.id, clamp_speed(speed, ceiling));
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mix(base: i32, roll: f32, pitch: f32, yaw: f32) -> MotorCommand {
        MotorMixer::x_frame().mix(base, Vector3::new(roll, pitch, yaw))
    }

    #[test]
    fn no_correction_is_uniform() {
        assert_eq!(mix(100, 0., 0., 0.), MotorCommand::uniform(100));
    }

    #[test]
    fn roll_speeds_up_right_side() {
        let command = mix(100, 10., 0., 0.);
        assert_eq!(command.top_left, 90);
        assert_eq!(command.bottom_left, 90);
        assert_eq!(command.top_right, 110);
        assert_eq!(command.bottom_right, 110);
    }

    #[test]
    fn pitch_speeds_up_front() {
        let command = mix(100, 0., 10., 0.);
        assert_eq!(command.top_left, 110);
        assert_eq!(command.top_right, 110);
        assert_eq!(command.bottom_left, 90);
        assert_eq!(command.bottom_right, 90);
    }

    #[test]
    fn yaw_speeds_up_one_diagonal() {
        let command = mix(100, 0., 0., 10.);
        assert_eq!(command.top_left, 90);
        assert_eq!(command.bottom_right, 90);
        assert_eq!(command.top_right, 110);
        assert_eq!(command.bottom_left, 110);
    }

    #[test]
    fn combined_axes_follow_layout() {
        let command = mix(100, 3., 5., 7.);
        // base + pitch - roll - yaw, and so on
        assert_eq!(command.top_left, 95);
        assert_eq!(command.top_right, 115);
        assert_eq!(command.bottom_left, 99);
        assert_eq!(command.bottom_right, 91);
    }

    #[test]
    fn output_is_clamped() {
        let command = mix(180, 100., 0., 0.);
        assert_eq!(command.top_right, 180);
        assert_eq!(command.top_left, 80);

        let command = mix(10, 0., -60., 40.);
        assert_eq!(command.top_left, 0);
        assert_eq!(command.bottom_left, 110);

        let command = mix(i32::MAX, f32::MAX, f32::MIN, f32::INFINITY);
        for (_, speed) in command.iter() {
            assert!(speed <= 180);
        }

        let command = mix(-500, 0., 0., 0.);
        assert_eq!(command, MotorCommand::uniform(0));
    }

    #[test]
    fn lower_ceiling_applies() {
        let command = MotorMixer::x_frame().mix_with_ceiling(140, Vector3::new(20., 0., 0.), 150);
        assert_eq!(command.top_right, 150);
        assert_eq!(command.top_left, 120);

        let command = MotorMixer::x_frame().mix_with_ceiling(175, Vector3::zeros(), 255);
        assert_eq!(command, MotorCommand::uniform(175));
    }

    #[test]
    fn nan_correction_falls_back_to_base() {
        let command = mix(60, f32::NAN, 0., 0.);
        assert_eq!(command, MotorCommand::uniform(60));
    }
}
