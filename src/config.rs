//! Tuning constants and the [`Config`] used to build a [`FlightController`](crate::FlightController).
//!
//! Every value here is a plain constant or a `Copy` struct; nothing is persisted.

use crate::control::PidGains;

// Link input
pub const THROTTLE_INPUT_MAX: u16 = 1023;
pub const JOYSTICK_HALF_SPAN: i32 = 512;

// Measured stick centers of the reference transmitter
pub const LEFT_STICK_CENTER_X: u16 = 510;
pub const LEFT_STICK_CENTER_Y: u16 = 515;
pub const RIGHT_STICK_CENTER: u16 = 512;

// Angle mode (roll, pitch)
pub const MAX_ANGLE_DEG: f32 = 30.;
pub const ANGLE_DEADBAND_DEG: f32 = 3.;

// Yaw
pub const MAX_YAW_RATE_DPS: f32 = 150.;
pub const YAW_RATE_DEADBAND_DPS: f32 = 10.;
pub const INTEGRATING_YAW_RATE_DPS: f32 = 100.;
pub const YAW_INTEGRATION_STEP_S: f32 = 0.01;

// Motor speed units, before ESC duty encoding
pub const MOTOR_SPEED_MIN: u8 = 0;
pub const MOTOR_SPEED_MAX: u8 = 180;

// Correction saturation
pub const MAX_TILT_CORRECTION: f32 = 60.;
pub const MAX_YAW_CORRECTION: f32 = 40.;

// PID safety
pub const DT_CEILING_S: f32 = 0.5;
pub const INTEGRAL_LIMIT: f32 = 25.;
pub const MAX_TUNING_GAIN: f32 = 10.;

/// Base throttle at or below which the motors idle and the integrators are held at zero.
pub const ARM_THRESHOLD: i32 = 30;

// ESC arming sequence
pub const ARM_PULSE_SPEED: u8 = 0;
pub const ARM_PULSE_MS: u16 = 3_000;

// Link wait at startup
pub const LINK_POLL_ATTEMPTS: u32 = 6_000;
pub const LINK_POLL_INTERVAL_MS: u16 = 10;

/// Health value sent back over the link after every received frame.
pub const LINK_HEALTH: u16 = 69;

pub const REPORT_HZ: f32 = 5.;
pub const LOOP_RATE_HZ: u16 = 200;

// 1000..2000us pulses at 50Hz on a 16-bit duty register
pub const ESC_DUTY_MIN: u16 = 3_276;
pub const ESC_DUTY_MAX: u16 = 6_553;

/// Output range that the raw throttle `0..=1023` is mapped onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottleRange {
    pub min: i32,
    pub max: i32,
}

impl ThrottleRange {
    /// Full range from a standstill, leaving 30 units of headroom for corrections.
    pub const STANDARD: Self = Self { min: 0, max: 150 };

    /// Raised floor for ESCs that respond sluggishly near zero.
    pub const RESPONSIVE: Self = Self { min: 40, max: 180 };

    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

impl Default for ThrottleRange {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// How the right stick X axis commands yaw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum YawMode {
    /// The stick commands a yaw rate of up to [`MAX_YAW_RATE_DPS`].
    #[default]
    Rate,
    /// The stick commands a smaller rate that is also integrated into a heading target
    /// at [`YAW_INTEGRATION_STEP_S`] per frame.
    Integrating,
}

/// Raw stick values that correspond to a centered stick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StickCalibration {
    pub left_x: u16,
    pub left_y: u16,
    pub right_x: u16,
    pub right_y: u16,
}

impl Default for StickCalibration {
    fn default() -> Self {
        Self {
            left_x: LEFT_STICK_CENTER_X,
            left_y: LEFT_STICK_CENTER_Y,
            right_x: RIGHT_STICK_CENTER,
            right_y: RIGHT_STICK_CENTER,
        }
    }
}

/// Complete configuration of the stabilization core.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub throttle_range: ThrottleRange,
    pub arm_threshold: i32,
    pub yaw_mode: YawMode,
    pub sticks: StickCalibration,
    pub roll_gains: PidGains,
    pub pitch_gains: PidGains,
    pub yaw_gains: PidGains,
    pub integral_limit: f32,
    pub dt_ceiling_s: f32,
    /// Motor ceiling used while the roll and pitch sticks are centered.
    pub centered_ceiling: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            throttle_range: ThrottleRange::STANDARD,
            arm_threshold: ARM_THRESHOLD,
            yaw_mode: YawMode::Rate,
            sticks: StickCalibration::default(),
            roll_gains: PidGains::new(1.2, 0.02, 0.3),
            pitch_gains: PidGains::new(1.2, 0.02, 0.3),
            yaw_gains: PidGains::new(0.8, 0.01, 0.),
            integral_limit: INTEGRAL_LIMIT,
            dt_ceiling_s: DT_CEILING_S,
            centered_ceiling: None,
        }
    }
}

impl Config {
    /// Builder method to set `throttle_range` and return `self`
    pub fn with_throttle_range(mut self, range: ThrottleRange) -> Self {
        self.throttle_range = range;
        self
    }

    /// Builder method to set `arm_threshold` and return `self`
    pub fn with_arm_threshold(mut self, threshold: i32) -> Self {
        self.arm_threshold = threshold;
        self
    }

    /// Builder method to set `yaw_mode` and return `self`
    pub fn with_yaw_mode(mut self, yaw_mode: YawMode) -> Self {
        self.yaw_mode = yaw_mode;
        self
    }

    /// Builder method to set `sticks` and return `self`
    pub fn with_sticks(mut self, sticks: StickCalibration) -> Self {
        self.sticks = sticks;
        self
    }

    /// Builder method to set the roll, pitch and yaw gains and return `self`
    pub fn with_gains(mut self, roll: PidGains, pitch: PidGains, yaw: PidGains) -> Self {
        self.roll_gains = roll;
        self.pitch_gains = pitch;
        self.yaw_gains = yaw;
        self
    }

    /// Builder method to set `integral_limit` and return `self`
    pub fn with_integral_limit(mut self, limit: f32) -> Self {
        self.integral_limit = limit;
        self
    }

    /// Builder method to set `dt_ceiling_s` and return `self`
    pub fn with_dt_ceiling(mut self, seconds: f32) -> Self {
        self.dt_ceiling_s = seconds;
        self
    }

    /// Builder method to set `centered_ceiling` and return `self`
    pub fn with_centered_ceiling(mut self, ceiling: Option<u8>) -> Self {
        self.centered_ceiling = ceiling;
        self
    }
}
