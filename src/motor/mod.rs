//! Motor identities, per-tick motor commands and the X-frame mixer.

use core::fmt;

use crate::config::{MOTOR_SPEED_MAX, MOTOR_SPEED_MIN};

pub mod matrix;
pub use matrix::{Motor, MotorMixer};

/// Position of a motor on the X-frame, front is "top".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotorId {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl MotorId {
    pub const ALL: [MotorId; 4] = [
        MotorId::TopLeft,
        MotorId::TopRight,
        MotorId::BottomLeft,
        MotorId::BottomRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Commanded speed of each motor in `0..=180`, before duty encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MotorCommand {
    pub top_left: u8,
    pub top_right: u8,
    pub bottom_left: u8,
    pub bottom_right: u8,
}

impl MotorCommand {
    /// Every motor at `speed`, clamped into the valid range.
    pub fn uniform(speed: i32) -> Self {
        let speed = clamp_speed(speed, MOTOR_SPEED_MAX);
        Self {
            top_left: speed,
            top_right: speed,
            bottom_left: speed,
            bottom_right: speed,
        }
    }

    pub fn get(&self, motor: MotorId) -> u8 {
        match motor {
            MotorId::TopLeft => self.top_left,
            MotorId::TopRight => self.top_right,
            MotorId::BottomLeft => self.bottom_left,
            MotorId::BottomRight => self.bottom_right,
        }
    }

    pub fn set(&mut self, motor: MotorId, speed: u8) {
        match motor {
            MotorId::TopLeft => self.top_left = speed,
            MotorId::TopRight => self.top_right = speed,
            MotorId::BottomLeft => self.bottom_left = speed,
            MotorId::BottomRight => self.bottom_right = speed,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MotorId, u8)> + '_ {
        MotorId::ALL.into_iter().map(move |motor| (motor, self.get(motor)))
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LT: {} RT: {} LB: {} RB: {}",
            self.top_left, self.top_right, self.bottom_left, self.bottom_right
        )
    }
}

/// Clamp a speed into `MOTOR_SPEED_MIN..=ceiling`.
pub(crate) fn clamp_speed(speed: i32, ceiling: u8) -> u8 {
    let ceiling = ceiling.min(MOTOR_SPEED_MAX);
    speed.clamp(i32::from(MOTOR_SPEED_MIN), i32::from(ceiling)) as u8
}
