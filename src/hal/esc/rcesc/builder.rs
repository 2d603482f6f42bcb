use embedded_hal::PwmPin;

use super::RCESC;
use crate::config::{ESC_DUTY_MAX, ESC_DUTY_MIN};

pub(super) const CALIBRATION_MS: u16 = 2000;

pub struct Builder<T> {
    arm: T,
    min: T,
    max: Option<T>,
    calibration_ms: u16,
}

impl<T: Default> Default for Builder<T> {
    fn default() -> Self {
        Self {
            arm: T::default(),
            min: T::default(),
            max: None,
            calibration_ms: CALIBRATION_MS,
        }
    }
}

impl Builder<u16> {
    /// 1-2ms pulses on a 16-bit, 50Hz timer. Arming holds the 1ms pulse.
    pub fn standard() -> Self {
        Self {
            arm: ESC_DUTY_MIN,
            min: ESC_DUTY_MIN,
            max: Some(ESC_DUTY_MAX),
            calibration_ms: CALIBRATION_MS,
        }
    }
}

impl<T> Builder<T> {
    pub fn arm(mut self, arm: T) -> Self {
        self.arm = arm;
        self
    }

    pub fn min(mut self, min: T) -> Self {
        self.min = min;
        self
    }

    pub fn max(mut self, max: T) -> Self {
        self.max = Some(max);
        self
    }

    /// How long each end of the range is held during calibration.
    pub fn calibration_delay(mut self, ms: u16) -> Self {
        self.calibration_ms = ms;
        self
    }

    /// Defaults `max` to the pin's maximum duty.
    pub fn build<P>(self, pin: P) -> RCESC<P>
    where
        P: PwmPin<Duty = T>,
    {
        RCESC {
            arm: self.arm,
            min: self.min,
            max: self.max.unwrap_or_else(|| pin.get_max_duty()),
            calibration_ms: self.calibration_ms,
            pin,
        }
    }
}
