use embedded_time::duration::Microseconds;

use crate::config::{DT_CEILING_S, MAX_TUNING_GAIN};

/// Proportional, integral and derivative gains of one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }

    /// Clamp every gain into `0..=MAX_TUNING_GAIN`.
    pub fn sanitized(self) -> Self {
        Self {
            kp: self.kp.clamp(0., MAX_TUNING_GAIN),
            ki: self.ki.clamp(0., MAX_TUNING_GAIN),
            kd: self.kd.clamp(0., MAX_TUNING_GAIN),
        }
    }
}

/// PID controller for a single axis with integral anti-windup and a stale interval guard.
///
/// Time is measured from the `now` passed to each call, so the controller
/// works with any monotonic clock.
#[derive(Clone, Debug)]
pub struct PidController {
    pub gains: PidGains,
    /// Bound of the accumulated integral (before `ki` is applied).
    pub integral_limit: f32,
    /// Intervals longer than this (in seconds) produce no correction.
    pub dt_ceiling: f32,
    integral: f32,
    prev_error: f32,
    has_prev_error: bool,
    last_update: Option<Microseconds<u32>>,
}

impl PidController {
    pub fn new(gains: PidGains, integral_limit: f32) -> Self {
        Self {
            gains,
            integral_limit,
            dt_ceiling: DT_CEILING_S,
            integral: 0.,
            prev_error: 0.,
            has_prev_error: false,
            last_update: None,
        }
    }

    /// Builder method to set `dt_ceiling` and return `self`
    pub fn with_dt_ceiling(mut self, seconds: f32) -> Self {
        self.dt_ceiling = seconds;
        self
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn prev_error(&self) -> f32 {
        self.prev_error
    }

    pub fn last_update(&self) -> Option<Microseconds<u32>> {
        self.last_update
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    /// Drop the accumulated state and start a new baseline at `now`.
    pub fn reset(&mut self, now: Microseconds<u32>) {
        self.integral = 0.;
        self.prev_error = 0.;
        self.has_prev_error = false;
        self.last_update = Some(now);
    }

    /// Update the controller with a new measurement and calculate the correction.
    ///
    /// The very first call only records a baseline and returns the proportional term.
    /// After a [`reset`](Self::reset) the integral accumulates from the reset time
    /// but the derivative waits for a previous error.
    /// An interval longer than `dt_ceiling` returns `0` and leaves the integral
    /// and previous error untouched.
    pub fn update(&mut self, setpoint: f32, measured: f32, now: Microseconds<u32>) -> f32 {
        // don't process inf or NaN
        if !setpoint.is_finite() || !measured.is_finite() {
            return 0.;
        }

        let error = setpoint - measured;
        let last = self.last_update.replace(now);

        let Some(last) = last else {
            self.prev_error = error;
            self.has_prev_error = true;
            return self.gains.kp * error + self.gains.ki * self.integral;
        };

        let dt = elapsed_secs(last, now);
        if dt > self.dt_ceiling {
            log::debug!("pid interval {}s exceeds ceiling, skipping", dt);
            // The next derivative would span the stall too
            self.has_prev_error = false;
            return 0.;
        }

        let p_term = self.gains.kp * error;

        let limit = integral_bound(self.integral_limit);
        self.integral = (self.integral + error * dt).clamp(-limit, limit);
        let i_term = self.gains.ki * self.integral;

        let d_term = if dt > 0. && self.has_prev_error {
            self.gains.kd * (error - self.prev_error) / dt
        } else {
            0.
        };

        self.prev_error = error;
        self.has_prev_error = true;

        p_term + i_term + d_term
    }
}

/// A usable magnitude for the integral limit, NaN disables the integral.
fn integral_bound(limit: f32) -> f32 {
    if limit.is_nan() {
        0.
    } else {
        limit.max(-limit)
    }
}

/// Seconds between two microsecond timestamps, tolerating counter wrap.
fn elapsed_secs(last: Microseconds<u32>, now: Microseconds<u32>) -> f32 {
    now.0.wrapping_sub(last.0) as f32 * 1e-6
}
