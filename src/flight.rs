//! The stabilization core as a single aggregate.

use core::fmt;

use embedded_time::duration::Microseconds;

use crate::arming::{ArmState, ArmingState, ControlMode};
use crate::config::{Config, MOTOR_SPEED_MAX};
use crate::control::{
    Attitude, AttitudeController, CommandFrame, CommandInterpreter, Setpoints, TuningOverride,
};
use crate::motor::{MotorCommand, MotorMixer};

/// Everything computed during one tick, offered to the diagnostics sink.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    pub base_throttle: i32,
    pub motors: MotorCommand,
    pub attitude: Attitude,
    pub setpoints: Setpoints,
    pub mode: ControlMode,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} THR: {} ATT: {:.1}/{:.1}/{:.1} SET: {:.1}/{:.1}/{:.1}",
            self.motors,
            self.base_throttle,
            self.attitude.roll_deg,
            self.attitude.pitch_deg,
            self.attitude.yaw_rate_dps,
            self.setpoints.roll_deg,
            self.setpoints.pitch_deg,
            self.setpoints.yaw_rate_dps,
        )?;
        if self.mode == ControlMode::Idle {
            f.write_str(" IDLE")?;
        }
        Ok(())
    }
}

/// Owns the interpreter, the three axis controllers, the mixer and the arm state.
///
/// One call to [`tick`](Self::tick) is one control cycle; it must not be
/// interleaved with another.
#[derive(Clone, Debug)]
pub struct FlightController {
    config: Config,
    interpreter: CommandInterpreter,
    attitude_controller: AttitudeController,
    mixer: MotorMixer,
    arming: ArmingState,
    last_snapshot: Option<Snapshot>,
}

impl FlightController {
    pub fn new(config: Config) -> Self {
        Self {
            interpreter: CommandInterpreter::new(&config),
            attitude_controller: AttitudeController::new(&config),
            mixer: MotorMixer::x_frame(),
            arming: ArmingState::new(config.arm_threshold),
            last_snapshot: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn arm_state(&self) -> ArmState {
        self.arming.state()
    }

    pub fn attitude_controller(&self) -> &AttitudeController {
        &self.attitude_controller
    }

    /// The snapshot of the last tick that received a frame.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// Run one control cycle.
    ///
    /// Without a frame nothing is computed and `None` is returned, so the
    /// motors keep their previous outputs.
    pub fn tick(
        &mut self,
        frame: Option<&CommandFrame>,
        attitude: &Attitude,
        now: Microseconds<u32>,
    ) -> Option<Snapshot> {
        let Some(frame) = frame else {
            log::debug!("no command frame, holding motor outputs");
            return None;
        };

        if self.arming.observe_link() {
            log::info!("command link acquired, motors armed");
            self.attitude_controller.reset(now);
        }

        if let Some(tuning) = frame.tuning {
            self.apply_tuning(tuning);
        }

        let (base_throttle, setpoints) = self.interpreter.interpret(frame);
        let mode = self.arming.mode(base_throttle);

        let motors = match mode {
            ControlMode::Active => {
                let corrections = self.attitude_controller.compute_corrections(
                    &setpoints,
                    attitude,
                    base_throttle,
                    now,
                );
                let ceiling = match self.config.centered_ceiling {
                    Some(ceiling) if setpoints.is_level() => ceiling,
                    _ => MOTOR_SPEED_MAX,
                };
                self.mixer
                    .mix_with_ceiling(base_throttle, corrections, ceiling)
            }
            ControlMode::Idle => {
                self.attitude_controller.reset(now);
                MotorCommand::uniform(base_throttle)
            }
        };

        let snapshot = Snapshot {
            base_throttle,
            motors,
            attitude: *attitude,
            setpoints,
            mode,
        };
        self.last_snapshot = Some(snapshot);
        Some(snapshot)
    }

    fn apply_tuning(&mut self, tuning: TuningOverride) {
        if !tuning.gains.is_finite() {
            log::warn!("ignoring non-finite gains for {:?}", tuning.axis);
            return;
        }

        let gains = tuning.gains.sanitized();
        if gains != tuning.gains {
            log::warn!("clamped gains for {:?} to {:?}", tuning.axis, gains);
        } else {
            log::debug!("tuning {:?} to {:?}", tuning.axis, gains);
        }
        self.attitude_controller.apply_tuning(TuningOverride { gains, ..tuning });
    }
}
