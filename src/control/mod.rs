//! Setpoint generation and the per-axis feedback controllers.

mod attitude;
pub use attitude::{tilt_authority, Attitude, AttitudeController};

mod command;
pub use command::{
    map_throttle, Axis, CommandFrame, CommandInterpreter, Joystick, Setpoints, TuningOverride,
};

mod pid;
pub use pid::{PidController, PidGains};
