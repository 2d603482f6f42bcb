//! Arm state of the motors and the per-tick idle decision.

/// Top-level arm state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArmState {
    /// Before the command link has been seen; only the arming pulse reaches the ESCs.
    #[default]
    Disarmed,
    /// The command link has been seen at least once. There is no way back.
    Armed,
}

/// What the armed copter does with the motors during one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlMode {
    /// Full PID correction and mixing.
    Active,
    /// Motors follow the base throttle directly and the integrators are reset.
    Idle,
}

#[derive(Clone, Copy, Debug)]
pub struct ArmingState {
    state: ArmState,
    /// Base throttle at or below which the motors idle.
    pub threshold: i32,
}

impl ArmingState {
    pub fn new(threshold: i32) -> Self {
        Self {
            state: ArmState::Disarmed,
            threshold,
        }
    }

    pub fn state(&self) -> ArmState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArmState::Armed
    }

    /// Record that the command link is available.
    /// Returns `true` if this armed the motors.
    pub fn observe_link(&mut self) -> bool {
        if self.is_armed() {
            return false;
        }
        self.state = ArmState::Armed;
        true
    }

    /// Decide the control mode for `base_throttle`. Disarmed always idles.
    pub fn mode(&self, base_throttle: i32) -> ControlMode {
        if self.is_armed() && base_throttle > self.threshold {
            ControlMode::Active
        } else {
            ControlMode::Idle
        }
    }
}
