use embedded_time::duration::Microseconds;

use crate::Error;

/// An event containing the current time, available time, and state for a task.
pub struct Event<'a, T> {
    /// The state of the system running the scheduler.
    pub state: &'a mut T,

    /// The current time in microseconds.
    pub now: Microseconds<u32>,

    /// The time left in this loop for tasks (in microseconds).
    pub available: Microseconds<u32>,
}

type TaskFn<T, E> = fn(Event<'_, T>) -> Result<(), E>;

/// A task to run at a specific frequency
pub struct Task<T, E = Error> {
    /// The function to run.
    pub f: TaskFn<T, E>,

    /// The desired frequency (in hz) to run the task.
    pub hz: f32,

    /// The time budget of this task (in microseconds), `0` for none.
    pub max_time_micros: u16,

    /// Run this task on every loop of the scheduler, regardless of the time left.
    pub is_high_priority: bool,

    /// The last tick this task was ran.
    pub last_run: u16,
}

impl<T, E> Task<T, E> {
    pub fn new(f: TaskFn<T, E>) -> Self {
        Self {
            f,
            hz: 0.,
            max_time_micros: 0,
            is_high_priority: false,
            last_run: 0,
        }
    }

    pub fn high_priority(f: TaskFn<T, E>) -> Self {
        Self::new(f).with_high_priority(true)
    }

    /// Builder method to set `hz` and return `self`
    pub fn with_hz(mut self, hz: f32) -> Self {
        self.hz = hz;
        self
    }

    /// Builder method to set `max_time_micros` and return `self`
    pub fn with_max_time(mut self, micros: u16) -> Self {
        self.max_time_micros = micros;
        self
    }

    /// Builder method to set `is_high_priority` and return `self`
    pub fn with_high_priority(mut self, is_high_priority: bool) -> Self {
        self.is_high_priority = is_high_priority;
        self
    }

    /// Calculate the desired ticks between each run of the task
    pub fn ticks(&self, loop_rate_hz: u16) -> u16 {
        // A 0hz task runs at the rate of the scheduler loop
        if self.hz <= 0. {
            1
        } else {
            (f32::from(loop_rate_hz) / self.hz).max(1.) as u16
        }
    }

    /// If this task is ready returns the ticks elapsed since the last run.
    pub fn ready(&self, tick: u16, ticks: u16) -> Option<u16> {
        let dt = tick.wrapping_sub(self.last_run);
        if dt >= ticks {
            Some(dt)
        } else {
            None
        }
    }

    /// Run this task at the current tick.
    pub fn run(&mut self, event: Event<'_, T>, tick: u16) -> Result<(), E> {
        (self.f)(event)?;

        // Record the tick counter when we ran
        // This determines when we next run the task
        self.last_run = tick;

        Ok(())
    }
}
