use crate::config::{Config, LINK_POLL_ATTEMPTS, LINK_POLL_INTERVAL_MS};
use crate::flight::FlightController;
use crate::hal::{AttitudeSensor, Link, MotorDriver, Reporter};

use super::Copter;

pub struct Builder<L, S, M, R = ()> {
    link: L,
    sensor: S,
    motors: M,
    reporter: R,
    config: Config,
    link_poll_attempts: u32,
    link_poll_interval_ms: u16,
}

impl<L, S, M> Builder<L, S, M> {
    pub fn new(link: L, sensor: S, motors: M) -> Self {
        Self {
            link,
            sensor,
            motors,
            reporter: (),
            config: Config::default(),
            link_poll_attempts: LINK_POLL_ATTEMPTS,
            link_poll_interval_ms: LINK_POLL_INTERVAL_MS,
        }
    }
}

impl<L, S, M, R> Builder<L, S, M, R> {
    pub fn reporter<R2>(self, reporter: R2) -> Builder<L, S, M, R2> {
        Builder {
            link: self.link,
            sensor: self.sensor,
            motors: self.motors,
            reporter,
            config: self.config,
            link_poll_attempts: self.link_poll_attempts,
            link_poll_interval_ms: self.link_poll_interval_ms,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// How many times and how often the link is polled at startup.
    pub fn link_poll(mut self, attempts: u32, interval_ms: u16) -> Self {
        self.link_poll_attempts = attempts;
        self.link_poll_interval_ms = interval_ms;
        self
    }

    pub fn build(self) -> Copter<L, S, M, R>
    where
        L: Link,
        S: AttitudeSensor,
        M: MotorDriver,
        R: Reporter,
    {
        Copter {
            link: self.link,
            sensor: self.sensor,
            motors: self.motors,
            reporter: self.reporter,
            flight: FlightController::new(self.config),
            link_poll_attempts: self.link_poll_attempts,
            link_poll_interval_ms: self.link_poll_interval_ms,
            pending: None,
            started: false,
        }
    }
}
