//! Error types for startup and the command link.
//!
//! Faults absorbed inside the control loop (stale intervals, missing frames)
//! never show up here.

use embedded_time::{clock, ConversionError};
use thiserror::Error;

/// A command frame could not be decoded from the wire.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: {len} bytes")]
    Truncated { len: usize },

    #[error("unknown tuning axis {0}")]
    UnknownAxis(u8),

    #[error("tuning gains must be finite")]
    NonFiniteGain,
}

/// Main error type of the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("command link failed to initialize")]
    LinkInit,

    #[error("attitude sensor failed to initialize")]
    SensorInit,

    #[error("no command link after {attempts} polls")]
    LinkTimeout { attempts: u32 },

    #[error("clock read failed: {0:?}")]
    Clock(clock::Error),

    #[error("time conversion failed: {0:?}")]
    Time(ConversionError),

    #[error("bad command frame: {0}")]
    Frame(#[from] FrameError),
}

impl From<clock::Error> for Error {
    fn from(clock_error: clock::Error) -> Self {
        Error::Clock(clock_error)
    }
}

impl From<ConversionError> for Error {
    fn from(time_error: ConversionError) -> Self {
        Error::Time(time_error)
    }
}

pub type FlightResult<T> = Result<T, Error>;
