use num_traits::Float;

use crate::config::*;
use crate::control::PidGains;
use crate::error::FrameError;

/// Raw position of a two-axis joystick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Joystick {
    pub x: u16,
    pub y: u16,
}

impl Joystick {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Control axis of the airframe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Roll = 0,
    Pitch = 1,
    Yaw = 2,
}

impl TryFrom<u8> for Axis {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Axis::Roll),
            1 => Ok(Axis::Pitch),
            2 => Ok(Axis::Yaw),
            other => Err(FrameError::UnknownAxis(other)),
        }
    }
}

/// Live replacement of one axis' PID gains, carried by a command frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TuningOverride {
    pub axis: Axis,
    pub gains: PidGains,
}

/// One frame of pilot input as received from the command link.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CommandFrame {
    /// Raw throttle in `0..=1023`.
    pub throttle: u16,
    /// Roll (x) and pitch (y).
    pub joystick_left: Joystick,
    /// Yaw (x); y is unused.
    pub joystick_right: Joystick,
    pub tuning: Option<TuningOverride>,
}

impl CommandFrame {
    /// Length of a frame without a tuning override.
    pub const LEN: usize = 10;

    /// Length of a frame carrying a tuning override.
    pub const TUNING_LEN: usize = Self::LEN + 13;

    /// Decode a little endian frame: throttle, left x, left y, right x, right y,
    /// optionally followed by an axis id and `kp`, `ki`, `kd` as `f32`.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < Self::LEN {
            return Err(FrameError::Truncated { len: bytes.len() });
        }

        let word = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let tuning = if bytes.len() >= Self::TUNING_LEN {
            let float = |i: usize| {
                f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
            };
            let axis = Axis::try_from(bytes[10])?;
            let gains = PidGains::new(float(11), float(15), float(19));
            if !gains.is_finite() {
                return Err(FrameError::NonFiniteGain);
            }
            Some(TuningOverride { axis, gains })
        } else {
            None
        };

        Ok(Self {
            throttle: word(0),
            joystick_left: Joystick::new(word(2), word(4)),
            joystick_right: Joystick::new(word(6), word(8)),
            tuning,
        })
    }

    /// Encode into `buf`, returning the number of bytes written.
    pub fn encode(&self, buf: &mut [u8; Self::TUNING_LEN]) -> usize {
        let words = [
            self.throttle,
            self.joystick_left.x,
            self.joystick_left.y,
            self.joystick_right.x,
            self.joystick_right.y,
        ];
        for (chunk, word) in buf.chunks_exact_mut(2).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }

        match self.tuning {
            Some(tuning) => {
                buf[10] = tuning.axis as u8;
                buf[11..15].copy_from_slice(&tuning.gains.kp.to_le_bytes());
                buf[15..19].copy_from_slice(&tuning.gains.ki.to_le_bytes());
                buf[19..23].copy_from_slice(&tuning.gains.kd.to_le_bytes());
                Self::TUNING_LEN
            }
            None => Self::LEN,
        }
    }
}

/// Targets derived from one command frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Setpoints {
    pub roll_deg: f32,
    pub pitch_deg: f32,
    pub yaw_rate_dps: f32,
    /// Integrated heading target, only tracked in [`YawMode::Integrating`].
    ///
    /// Diagnostic only: the yaw loop always follows `yaw_rate_dps`. It reaches
    /// the reporter through [`Snapshot::setpoints`](crate::flight::Snapshot).
    pub yaw_heading_deg: Option<f32>,
}

impl Setpoints {
    /// True when neither roll nor pitch is commanded.
    pub fn is_level(&self) -> bool {
        self.roll_deg == 0. && self.pitch_deg == 0.
    }
}

/// Maps raw stick and throttle values to base throttle and setpoints.
#[derive(Clone, Debug)]
pub struct CommandInterpreter {
    throttle_range: ThrottleRange,
    sticks: StickCalibration,
    yaw_mode: YawMode,
    yaw_heading_deg: f32,
}

impl CommandInterpreter {
    pub fn new(config: &Config) -> Self {
        Self {
            throttle_range: config.throttle_range,
            sticks: config.sticks,
            yaw_mode: config.yaw_mode,
            yaw_heading_deg: 0.,
        }
    }

    pub fn interpret(&mut self, frame: &CommandFrame) -> (i32, Setpoints) {
        let base_throttle = map_throttle(frame.throttle, self.throttle_range);

        let roll_deg = deadband(
            stick_to(frame.joystick_left.x, self.sticks.left_x, MAX_ANGLE_DEG),
            ANGLE_DEADBAND_DEG,
        );
        let pitch_deg = deadband(
            stick_to(frame.joystick_left.y, self.sticks.left_y, MAX_ANGLE_DEG),
            ANGLE_DEADBAND_DEG,
        );

        let (yaw_rate_dps, yaw_heading_deg) = match self.yaw_mode {
            YawMode::Rate => {
                let rate = stick_to(frame.joystick_right.x, self.sticks.right_x, MAX_YAW_RATE_DPS);
                (deadband(rate, YAW_RATE_DEADBAND_DPS), None)
            }
            YawMode::Integrating => {
                let rate = stick_to(
                    frame.joystick_right.x,
                    self.sticks.right_x,
                    INTEGRATING_YAW_RATE_DPS,
                );
                let rate = deadband(rate, YAW_RATE_DEADBAND_DPS);
                self.yaw_heading_deg = wrap_180(self.yaw_heading_deg + rate * YAW_INTEGRATION_STEP_S);
                (rate, Some(self.yaw_heading_deg))
            }
        };

        let setpoints = Setpoints {
            roll_deg,
            pitch_deg,
            yaw_rate_dps,
            yaw_heading_deg,
        };
        (base_throttle, setpoints)
    }
}

/// Integer linear map of the raw throttle onto `range`, as the ESC speed units are integral.
pub fn map_throttle(raw: u16, range: ThrottleRange) -> i32 {
    let raw = i32::from(raw.min(THROTTLE_INPUT_MAX));
    raw * (range.max - range.min) / i32::from(THROTTLE_INPUT_MAX) + range.min
}

/// Map a stick axis spanning `center - 512 ..= center + 511` onto `-limit..=limit`.
fn stick_to(raw: u16, center: u16, limit: f32) -> f32 {
    let low = i32::from(center) - JOYSTICK_HALF_SPAN;
    let high = i32::from(center) + JOYSTICK_HALF_SPAN - 1;
    let raw = i32::from(raw).clamp(low, high);
    (raw - low) as f32 * (2. * limit) / (high - low) as f32 - limit
}

fn deadband(value: f32, width: f32) -> f32 {
    if Float::abs(value) < width {
        0.
    } else {
        value
    }
}

fn wrap_180(mut degrees: f32) -> f32 {
    while degrees > 180. {
        degrees -= 360.;
    }
    while degrees <= -180. {
        degrees += 360.;
    }
    degrees
}
