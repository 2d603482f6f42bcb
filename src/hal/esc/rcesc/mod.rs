mod builder;

pub use builder::Builder;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::PwmPin;
use num_traits::{Float, NumCast};

use crate::config::MOTOR_SPEED_MAX;

use super::ESC;

/// An ESC implementation for RC hobby ESCs driven by a PWM pin.
///
/// Speeds `0..=180` are mapped linearly onto `min..=max` duty.
pub struct RCESC<T: PwmPin> {
    arm: T::Duty,
    min: T::Duty,
    max: T::Duty,
    calibration_ms: u16,
    pin: T,
}

impl<T> RCESC<T>
where
    T: PwmPin,
    T::Duty: NumCast + Copy,
{
    pub fn new(arm: T::Duty, min: T::Duty, max: T::Duty, pin: T) -> Self {
        Self {
            arm,
            min,
            max,
            calibration_ms: builder::CALIBRATION_MS,
            pin,
        }
    }

    pub fn builder() -> Builder<T::Duty>
    where
        T::Duty: Default,
    {
        Builder::default()
    }

    pub fn pin(&self) -> &T {
        &self.pin
    }

    pub fn release(self) -> T {
        self.pin
    }

    /// Teach the ESC its throttle range by holding full and then zero duty.
    pub fn calibrate<D>(&mut self, delay: &mut D)
    where
        D: DelayMs<u16>,
    {
        self.pin.set_duty(self.max);
        delay.delay_ms(self.calibration_ms);

        self.pin.set_duty(self.min);
        delay.delay_ms(self.calibration_ms);

        self.arm_inner();
    }

    /// Duty for `speed`, or `None` if the duty type cannot represent it.
    pub fn duty(&self, speed: u8) -> Option<T::Duty> {
        let min = <f32 as NumCast>::from(self.min)?;
        let max = <f32 as NumCast>::from(self.max)?;
        let speed = <f32 as From<u8>>::from(speed.min(MOTOR_SPEED_MAX));

        let duty = min + (max - min) * speed / <f32 as From<u8>>::from(MOTOR_SPEED_MAX);
        <T::Duty as NumCast>::from(Float::round(duty))
    }

    fn arm_inner(&mut self) {
        self.pin.set_duty(self.arm)
    }
}

impl<T> ESC for RCESC<T>
where
    T: PwmPin,
    T::Duty: NumCast + Copy,
{
    fn arm(&mut self) {
        self.arm_inner()
    }

    fn output(&mut self, speed: u8) {
        match self.duty(speed) {
            Some(duty) => self.pin.set_duty(duty),
            None => log::warn!("no duty for speed {}", speed),
        }
    }
}
