//! Hardware seams: the command link, the attitude sensor, the motors and the
//! diagnostics sink.

use core::fmt::Debug;

use crate::config::ARM_PULSE_SPEED;
use crate::control::{Attitude, CommandFrame};
use crate::flight::Snapshot;
use crate::motor::{MotorCommand, MotorId};

pub mod esc;
pub use esc::{Builder, ESC, RCESC};

/// Radio link delivering pilot commands.
pub trait Link {
    type Error: Debug;

    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Take the next pending frame without blocking.
    fn try_receive(&mut self) -> Option<CommandFrame>;

    /// Attach a health value to the next acknowledgement.
    fn send_ack(&mut self, _health: u16) {}
}

/// Inertial measurement unit with sensor fusion, already bias corrected.
pub trait AttitudeSensor {
    type Error: Debug;

    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Advance the fusion filter. Called once per tick before [`read`](Self::read).
    fn update(&mut self) {}

    fn read(&mut self) -> Attitude;
}

/// The four motor outputs.
pub trait MotorDriver {
    /// Send the low arming pulse to every ESC.
    fn arm(&mut self) {
        self.write(&MotorCommand::uniform(i32::from(ARM_PULSE_SPEED)));
    }

    /// Output `speed` in `0..=180` on one motor.
    fn set_duty(&mut self, motor: MotorId, speed: u8);

    fn write(&mut self, command: &MotorCommand) {
        for (motor, speed) in command.iter() {
            self.set_duty(motor, speed);
        }
    }
}

impl<E: ESC> MotorDriver for [E; 4] {
    fn arm(&mut self) {
        for esc in self.iter_mut() {
            esc.arm();
        }
    }

    fn set_duty(&mut self, motor: MotorId, speed: u8) {
        self[motor.index()].output(speed);
    }
}

/// Sink for the periodic diagnostics line.
pub trait Reporter {
    fn report(&mut self, snapshot: &Snapshot);
}

impl Reporter for () {
    fn report(&mut self, _snapshot: &Snapshot) {}
}

/// Writes each snapshot through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, snapshot: &Snapshot) {
        log::info!("{}", snapshot);
    }
}
