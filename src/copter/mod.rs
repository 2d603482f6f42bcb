//! The quad-copter: hardware seams wired to the [`FlightController`].

use embedded_hal::blocking::delay::DelayMs;
use embedded_time::duration::Microseconds;

use crate::config::{
    Config, ARM_PULSE_MS, LINK_HEALTH, LINK_POLL_ATTEMPTS, LINK_POLL_INTERVAL_MS, REPORT_HZ,
};
use crate::control::CommandFrame;
use crate::error::{Error, FlightResult};
use crate::flight::{FlightController, Snapshot};
use crate::hal::{AttitudeSensor, Link, MotorDriver, Reporter};
use crate::scheduler::{Event, Task};

mod builder;
pub use builder::Builder;

pub struct Copter<L, S, M, R = ()> {
    pub link: L,
    pub sensor: S,
    pub motors: M,
    pub reporter: R,
    pub flight: FlightController,
    link_poll_attempts: u32,
    link_poll_interval_ms: u16,
    pending: Option<CommandFrame>,
    started: bool,
}

impl<L, S, M> Copter<L, S, M>
where
    L: Link,
    S: AttitudeSensor,
    M: MotorDriver,
{
    pub fn builder(link: L, sensor: S, motors: M) -> Builder<L, S, M> {
        Builder::new(link, sensor, motors)
    }
}

impl<L, S, M, R> Copter<L, S, M, R>
where
    L: Link,
    S: AttitudeSensor,
    M: MotorDriver,
    R: Reporter,
{
    pub fn new(link: L, sensor: S, motors: M, reporter: R, config: Config) -> Self {
        Self {
            link,
            sensor,
            motors,
            reporter,
            flight: FlightController::new(config),
            link_poll_attempts: LINK_POLL_ATTEMPTS,
            link_poll_interval_ms: LINK_POLL_INTERVAL_MS,
            pending: None,
            started: false,
        }
    }

    /// Bring up the hardware, arm the ESCs and wait for the first command frame.
    ///
    /// Nothing but the arming pulse reaches the motors before this returns `Ok`.
    pub fn start<D>(&mut self, delay: &mut D) -> FlightResult<()>
    where
        D: DelayMs<u16>,
    {
        self.link.begin().map_err(|error| {
            log::error!("command link init failed: {:?}", error);
            Error::LinkInit
        })?;
        self.sensor.begin().map_err(|error| {
            log::error!("attitude sensor init failed: {:?}", error);
            Error::SensorInit
        })?;

        log::info!("arming ESCs");
        self.motors.arm();
        delay.delay_ms(ARM_PULSE_MS);
        log::info!("ESCs armed, waiting for command link");

        let frame = self.wait_for_link(delay)?;
        self.pending = Some(frame);
        self.started = true;
        Ok(())
    }

    fn wait_for_link<D>(&mut self, delay: &mut D) -> FlightResult<CommandFrame>
    where
        D: DelayMs<u16>,
    {
        for _ in 0..self.link_poll_attempts {
            if let Some(frame) = self.link.try_receive() {
                return Ok(frame);
            }
            delay.delay_ms(self.link_poll_interval_ms);
        }

        log::warn!(
            "no command frame after {} polls",
            self.link_poll_attempts
        );
        Err(Error::LinkTimeout {
            attempts: self.link_poll_attempts,
        })
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Run one control tick at `now`.
    ///
    /// Motors are only written when a frame arrived, otherwise they hold
    /// their previous outputs.
    pub fn stabilize(&mut self, now: Microseconds<u32>) -> Option<Snapshot> {
        if !self.started {
            return None;
        }

        self.sensor.update();
        let frame = self.pending.take().or_else(|| self.link.try_receive());
        let attitude = self.sensor.read();

        let snapshot = self.flight.tick(frame.as_ref(), &attitude, now)?;
        self.motors.write(&snapshot.motors);
        self.link.send_ack(LINK_HEALTH);
        Some(snapshot)
    }

    /// Hand the latest snapshot to the reporter.
    pub fn report(&mut self) {
        if let Some(snapshot) = self.flight.last_snapshot() {
            self.reporter.report(snapshot);
        }
    }
}

/// Task to run the control loop.
pub fn stabilize_task<L, S, M, R>(event: Event<'_, Copter<L, S, M, R>>) -> FlightResult<()>
where
    L: Link,
    S: AttitudeSensor,
    M: MotorDriver,
    R: Reporter,
{
    event.state.stabilize(event.now);
    Ok(())
}

/// Task to emit the diagnostics line.
pub fn report_task<L, S, M, R>(event: Event<'_, Copter<L, S, M, R>>) -> FlightResult<()>
where
    L: Link,
    S: AttitudeSensor,
    M: MotorDriver,
    R: Reporter,
{
    event.state.report();
    Ok(())
}

/// The default copter tasks: stabilize on every loop and report at [`REPORT_HZ`].
pub fn copter_tasks<L, S, M, R>() -> [Task<Copter<L, S, M, R>>; 2]
where
    L: Link,
    S: AttitudeSensor,
    M: MotorDriver,
    R: Reporter,
{
    [
        Task::high_priority(stabilize_task::<L, S, M, R>),
        Task::new(report_task::<L, S, M, R>).with_hz(REPORT_HZ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;
    use crate::control::{Attitude, Joystick};
    use crate::motor::{MotorCommand, MotorId};
    use crate::scheduler::Scheduler;
    use core::cell::Cell;
    use embedded_time::{clock, rate::Fraction, Clock, Instant};

    fn frame(throttle: u16) -> CommandFrame {
        CommandFrame {
            throttle,
            joystick_left: Joystick::new(LEFT_STICK_CENTER_X, LEFT_STICK_CENTER_Y),
            joystick_right: Joystick::new(RIGHT_STICK_CENTER, RIGHT_STICK_CENTER),
            tuning: None,
        }
    }

    /// Delivers `frames` in order, `None` entries are empty polls.
    #[derive(Default)]
    struct ScriptedLink {
        frames: [Option<CommandFrame>; 8],
        next: usize,
        fail: bool,
        acks: u32,
        last_ack: u16,
    }

    impl ScriptedLink {
        fn after_polls(empty: usize, frame: CommandFrame) -> Self {
            let mut link = Self::default();
            link.frames[empty] = Some(frame);
            link
        }
    }

    impl Link for ScriptedLink {
        type Error = ();

        fn begin(&mut self) -> Result<(), ()> {
            if self.fail {
                Err(())
            } else {
                Ok(())
            }
        }

        fn try_receive(&mut self) -> Option<CommandFrame> {
            let frame = self.frames.get(self.next).copied().flatten();
            self.next += 1;
            frame
        }

        fn send_ack(&mut self, health: u16) {
            self.acks += 1;
            self.last_ack = health;
        }
    }

    #[derive(Default)]
    struct FixedSensor {
        attitude: Attitude,
        updates: u32,
    }

    impl AttitudeSensor for FixedSensor {
        type Error = ();

        fn update(&mut self) {
            self.updates += 1;
        }

        fn read(&mut self) -> Attitude {
            self.attitude
        }
    }

    #[derive(Default)]
    struct RecordingMotors {
        command: MotorCommand,
        writes: u32,
    }

    impl MotorDriver for RecordingMotors {
        fn set_duty(&mut self, motor: MotorId, speed: u8) {
            self.command.set(motor, speed);
            self.writes += 1;
        }
    }

    #[derive(Default)]
    struct CountingReporter {
        reports: u32,
        last: Option<Snapshot>,
    }

    impl Reporter for CountingReporter {
        fn report(&mut self, snapshot: &Snapshot) {
            self.reports += 1;
            self.last = Some(*snapshot);
        }
    }

    #[derive(Default)]
    struct CountingDelay(u32);

    impl DelayMs<u16> for CountingDelay {
        fn delay_ms(&mut self, ms: u16) {
            self.0 += u32::from(ms);
        }
    }

    type TestCopter = Copter<ScriptedLink, FixedSensor, RecordingMotors, CountingReporter>;

    fn copter(link: ScriptedLink) -> TestCopter {
        Copter::new(
            link,
            FixedSensor::default(),
            RecordingMotors::default(),
            CountingReporter::default(),
            Config::default(),
        )
    }

    fn us(n: u32) -> Microseconds<u32> {
        Microseconds::new(n)
    }

    #[test]
    fn start_arms_then_waits_for_link() {
        let mut copter = copter(ScriptedLink::after_polls(3, frame(512)));
        let mut delay = CountingDelay::default();

        copter.start(&mut delay).unwrap();
        assert!(copter.is_started());
        // Arming pulse only
        assert_eq!(copter.motors.command, MotorCommand::uniform(0));
        assert_eq!(copter.motors.writes, 4);
        assert_eq!(
            delay.0,
            u32::from(ARM_PULSE_MS) + 3 * u32::from(LINK_POLL_INTERVAL_MS)
        );

        // The frame that ended the wait drives the first tick
        let snapshot = copter.stabilize(us(0)).unwrap();
        assert_eq!(snapshot.motors, MotorCommand::uniform(75));
        assert_eq!(copter.motors.command, MotorCommand::uniform(75));
        assert_eq!(copter.link.acks, 1);
        assert_eq!(copter.link.last_ack, LINK_HEALTH);
    }

    #[test]
    fn start_gives_up_without_link() {
        let mut copter = Copter::builder(
            ScriptedLink::default(),
            FixedSensor::default(),
            RecordingMotors::default(),
        )
        .link_poll(5, 20)
        .build();
        let mut delay = CountingDelay::default();

        let result = copter.start(&mut delay);
        assert!(matches!(result, Err(Error::LinkTimeout { attempts: 5 })));
        assert_eq!(delay.0, u32::from(ARM_PULSE_MS) + 5 * 20);
        assert!(!copter.is_started());
    }

    #[test]
    fn link_init_failure_never_arms() {
        let link = ScriptedLink {
            fail: true,
            ..ScriptedLink::after_polls(0, frame(512))
        };
        let mut copter = copter(link);

        let result = copter.start(&mut CountingDelay::default());
        assert!(matches!(result, Err(Error::LinkInit)));
        assert_eq!(copter.motors.writes, 0);
    }

    #[test]
    fn stabilize_before_start_is_inert() {
        let mut copter = copter(ScriptedLink::after_polls(0, frame(900)));
        assert!(copter.stabilize(us(0)).is_none());
        assert_eq!(copter.motors.writes, 0);
        assert_eq!(copter.sensor.updates, 0);
    }

    #[test]
    fn link_loss_holds_outputs() {
        let mut copter = copter(ScriptedLink::after_polls(0, frame(700)));
        copter.sensor.attitude = Attitude::new(-5., 0., 0.);
        copter.start(&mut CountingDelay::default()).unwrap();

        let snapshot = copter.stabilize(us(0)).unwrap();
        let writes = copter.motors.writes;

        copter.sensor.attitude = Attitude::new(20., 0., 0.);
        assert!(copter.stabilize(us(5_000)).is_none());
        assert_eq!(copter.motors.writes, writes);
        assert_eq!(copter.motors.command, snapshot.motors);
        assert_eq!(copter.link.acks, 1);
        assert_eq!(copter.sensor.updates, 2);
    }

    #[test]
    fn report_sends_last_snapshot() {
        let mut copter = copter(ScriptedLink::after_polls(0, frame(512)));
        copter.report();
        assert_eq!(copter.reporter.reports, 0);

        copter.start(&mut CountingDelay::default()).unwrap();
        let snapshot = copter.stabilize(us(0));
        copter.report();
        assert_eq!(copter.reporter.reports, 1);
        assert_eq!(copter.reporter.last, snapshot);
    }

    struct StepClock(Cell<u32>);

    impl Clock for StepClock {
        type T = u32;

        const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

        fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
            let ticks = self.0.get();
            self.0.set(ticks + 50);
            Ok(Instant::new(ticks))
        }
    }

    #[test]
    fn tasks_stabilize_and_report() {
        let mut copter = copter(ScriptedLink::after_polls(0, frame(512)));
        copter.start(&mut CountingDelay::default()).unwrap();

        let mut tasks = copter_tasks();
        let mut scheduler = Scheduler::new(&mut tasks, StepClock(Cell::new(0)), LOOP_RATE_HZ);
        for _ in 0..40 {
            scheduler.run(&mut copter).unwrap();
        }

        assert_eq!(copter.reporter.reports, 1);
        assert_eq!(copter.motors.command, MotorCommand::uniform(75));
        assert_eq!(copter.sensor.updates, 40);
    }
}
