//! # quad-stabilizer
//! A `#![no_std]` stabilization core for a radio controlled X-frame quad-copter.
//!
//! Pilot frames from the command link become a base throttle and attitude setpoints,
//! three PID controllers turn the attitude error into roll, pitch and yaw corrections,
//! and the mixer spreads those over the four motors.
//!
//! # Components
//! [`FlightController`] runs one control tick from a frame, an attitude and a timestamp.
//!
//! [`Copter`] wires it to the [`hal`] traits: startup, arming and the per-tick I/O.
//!
//! [`scheduler`] runs the stabilize and report tasks at their rates.
//!
//! ```
//! use embedded_time::duration::Microseconds;
//! use quad_stabilizer::control::{Attitude, CommandFrame, Joystick};
//! use quad_stabilizer::{Config, FlightController};
//!
//! let mut flight = FlightController::new(Config::default());
//! let frame = CommandFrame {
//!     throttle: 512,
//!     joystick_left: Joystick::new(510, 515),
//!     joystick_right: Joystick::new(512, 512),
//!     tuning: None,
//! };
//!
//! let snapshot = flight
//!     .tick(Some(&frame), &Attitude::default(), Microseconds::new(0))
//!     .unwrap();
//! assert_eq!(snapshot.motors.top_left, 75);
//! ```

#![no_std]

pub mod arming;
pub use arming::{ArmState, ArmingState, ControlMode};

pub mod config;
pub use config::Config;

pub mod control;

pub mod copter;
pub use copter::{copter_tasks, Copter};

mod error;
pub use error::{Error, FlightResult, FrameError};

pub mod flight;
pub use flight::{FlightController, Snapshot};

pub mod hal;
pub use hal::{AttitudeSensor, Link, LogReporter, MotorDriver, Reporter, ESC};

pub mod motor;
pub use motor::{MotorCommand, MotorId, MotorMixer};

pub mod scheduler;
pub use scheduler::Scheduler;
