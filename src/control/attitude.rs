use embedded_time::duration::Microseconds;
use nalgebra::Vector3;

use super::{Axis, PidController, Setpoints, TuningOverride};
use crate::config::{Config, MAX_TILT_CORRECTION, MAX_YAW_CORRECTION, MOTOR_SPEED_MAX};

/// Orientation snapshot from the inertial sensor, already bias corrected.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Attitude {
    pub roll_deg: f32,
    pub pitch_deg: f32,
    pub yaw_rate_dps: f32,
}

impl Attitude {
    pub const fn new(roll_deg: f32, pitch_deg: f32, yaw_rate_dps: f32) -> Self {
        Self {
            roll_deg,
            pitch_deg,
            yaw_rate_dps,
        }
    }
}

/// Angle-mode roll and pitch with rate-mode yaw, one PID per axis.
#[derive(Clone, Debug)]
pub struct AttitudeController {
    pub roll: PidController,
    pub pitch: PidController,
    pub yaw: PidController,
}

impl AttitudeController {
    pub fn new(config: &Config) -> Self {
        let pid = |gains| {
            PidController::new(gains, config.integral_limit).with_dt_ceiling(config.dt_ceiling_s)
        };
        Self {
            roll: pid(config.roll_gains),
            pitch: pid(config.pitch_gains),
            yaw: pid(config.yaw_gains),
        }
    }

    pub fn pid(&self, axis: Axis) -> &PidController {
        match axis {
            Axis::Roll => &self.roll,
            Axis::Pitch => &self.pitch,
            Axis::Yaw => &self.yaw,
        }
    }

    pub fn pid_mut(&mut self, axis: Axis) -> &mut PidController {
        match axis {
            Axis::Roll => &mut self.roll,
            Axis::Pitch => &mut self.pitch,
            Axis::Yaw => &mut self.yaw,
        }
    }

    /// Replace the gains of one axis. Accumulated state is kept.
    pub fn apply_tuning(&mut self, tuning: TuningOverride) {
        self.pid_mut(tuning.axis).set_gains(tuning.gains);
    }

    /// Reset all three controllers to a new baseline at `now`.
    pub fn reset(&mut self, now: Microseconds<u32>) {
        self.roll.reset(now);
        self.pitch.reset(now);
        self.yaw.reset(now);
    }

    /// Calculate the saturated roll, pitch and yaw corrections in motor speed units.
    ///
    /// Roll and pitch authority shrinks as `base_throttle` approaches the motor ceiling
    /// so the mix stays close to the valid range before the final clamp.
    pub fn compute_corrections(
        &mut self,
        setpoints: &Setpoints,
        attitude: &Attitude,
        base_throttle: i32,
        now: Microseconds<u32>,
    ) -> Vector3<f32> {
        let roll = self.roll.update(setpoints.roll_deg, attitude.roll_deg, now);
        let pitch = self.pitch.update(setpoints.pitch_deg, attitude.pitch_deg, now);
        let yaw = self
            .yaw
            .update(setpoints.yaw_rate_dps, attitude.yaw_rate_dps, now);

        let tilt_limit = tilt_authority(base_throttle);
        Vector3::new(
            roll.clamp(-tilt_limit, tilt_limit),
            pitch.clamp(-tilt_limit, tilt_limit),
            yaw.clamp(-MAX_YAW_CORRECTION, MAX_YAW_CORRECTION),
        )
    }
}

/// Largest roll or pitch correction allowed at `base_throttle`.
pub fn tilt_authority(base_throttle: i32) -> f32 {
    let headroom = (i32::from(MOTOR_SPEED_MAX) - base_throttle).max(0) as f32 / 2.;
    headroom.min(MAX_TILT_CORRECTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::PidGains;
    use approx::assert_abs_diff_eq;

    fn ms(n: u32) -> Microseconds<u32> {
        Microseconds::new(n * 1_000)
    }

    fn proportional(kp: f32) -> Config {
        let gains = PidGains::new(kp, 0., 0.);
        Config::default().with_gains(gains, gains, gains)
    }

    #[test]
    fn authority_shrinks_with_throttle() {
        assert_eq!(tilt_authority(0), 60.);
        assert_eq!(tilt_authority(60), 60.);
        assert_eq!(tilt_authority(100), 40.);
        assert_eq!(tilt_authority(170), 5.);
        assert_eq!(tilt_authority(180), 0.);
        assert_eq!(tilt_authority(250), 0.);
    }

    #[test]
    fn level_attitude_needs_no_correction() {
        let mut controller = AttitudeController::new(&Config::default());
        let setpoints = Setpoints::default();
        for tick in 0..10 {
            let corrections =
                controller.compute_corrections(&setpoints, &Attitude::default(), 75, ms(tick * 5));
            assert_abs_diff_eq!(corrections, Vector3::zeros(), epsilon = 1e-6);
        }
    }

    #[test]
    fn corrections_oppose_attitude_error() {
        let mut controller = AttitudeController::new(&proportional(1.));
        let attitude = Attitude::new(-10., 5., 20.);
        let corrections =
            controller.compute_corrections(&Setpoints::default(), &attitude, 75, ms(0));

        assert_abs_diff_eq!(corrections, Vector3::new(10., -5., -20.), epsilon = 1e-5);
    }

    #[test]
    fn corrections_saturate() {
        let mut controller = AttitudeController::new(&proportional(10.));
        let attitude = Attitude::new(-30., 30., -100.);

        let corrections =
            controller.compute_corrections(&Setpoints::default(), &attitude, 40, ms(0));
        assert_abs_diff_eq!(corrections, Vector3::new(60., -60., 40.), epsilon = 1e-5);

        let corrections =
            controller.compute_corrections(&Setpoints::default(), &attitude, 160, ms(10));
        assert_abs_diff_eq!(corrections, Vector3::new(10., -10., 40.), epsilon = 1e-5);
    }

    #[test]
    fn tuning_targets_one_axis() {
        let mut controller = AttitudeController::new(&Config::default());
        let gains = PidGains::new(4., 0.5, 0.25);
        controller.apply_tuning(TuningOverride {
            axis: Axis::Yaw,
            gains,
        });

        assert_eq!(controller.pid(Axis::Yaw).gains, gains);
        assert_eq!(controller.pid(Axis::Roll).gains, Config::default().roll_gains);
    }

    #[test]
    fn reset_clears_every_axis() {
        let mut controller = AttitudeController::new(&Config::default());
        let attitude = Attitude::new(5., -5., 30.);
        controller.compute_corrections(&Setpoints::default(), &attitude, 100, ms(0));
        controller.compute_corrections(&Setpoints::default(), &attitude, 100, ms(10));

        controller.reset(ms(20));
        for axis in [Axis::Roll, Axis::Pitch, Axis::Yaw] {
            assert_eq!(controller.pid(axis).integral(), 0.);
            assert_eq!(controller.pid(axis).prev_error(), 0.);
            assert_eq!(controller.pid(axis).last_update(), Some(ms(20)));
        }
    }
}
