//! Fixed rate task loop driven by an [`embedded_time::Clock`].

use embedded_time::{duration::Microseconds, Clock};

use crate::Error;

mod task;
pub use task::{Event, Task};

/// Runs high priority tasks on every loop and the rest at their own rate,
/// as long as the time left in the loop covers their budget.
pub struct Scheduler<'a, C, T, E = Error> {
    tasks: &'a mut [Task<T, E>],
    clock: C,
    tick_counter: u16,
    loop_rate_hz: u16,
    loop_period_us: u32,
    max_task_slowdown: u16,
    // Extra budget granted while low priority tasks keep missing their rate
    task_not_achieved: u32,
    task_all_achieved: u32,
    extra_loop_us: u32,
}

impl<'a, C, T, E> Scheduler<'a, C, T, E>
where
    C: Clock<T = u32>,
    E: From<Error>,
{
    pub fn new(tasks: &'a mut [Task<T, E>], clock: C, loop_rate_hz: u16) -> Self {
        let loop_rate_hz = loop_rate_hz.max(1);
        Self {
            tasks,
            clock,
            tick_counter: 0,
            loop_rate_hz,
            loop_period_us: 1_000_000 / u32::from(loop_rate_hz),
            max_task_slowdown: 4,
            task_not_achieved: 0,
            task_all_achieved: 0,
            extra_loop_us: 0,
        }
    }

    pub fn loop_period(&self) -> Microseconds<u32> {
        Microseconds::new(self.loop_period_us)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run one loop of the scheduler, calling every task that is due.
    pub fn run(&mut self, state: &mut T) -> Result<(), E> {
        let loop_start = self.micros_since_epoch()?;
        self.tick_counter = self.tick_counter.wrapping_add(1);

        let mut time_available = self.loop_period_us + self.extra_loop_us;
        let tick = self.tick_counter;

        for task in self.tasks.iter_mut() {
            if !task.is_high_priority {
                let interval_ticks = task.ticks(self.loop_rate_hz);
                let Some(dt) = task.ready(tick, interval_ticks) else {
                    continue;
                };

                if dt >= interval_ticks.saturating_mul(self.max_task_slowdown) {
                    self.task_not_achieved += 1;
                }

                if u32::from(task.max_time_micros) > time_available {
                    // Maybe another task fits into the time left
                    continue;
                }
            }

            let now = micros_since_epoch(&self.clock)?;
            task.run(
                Event {
                    state: &mut *state,
                    now,
                    available: Microseconds::new(time_available),
                },
                tick,
            )?;

            let elapsed = micros_since_epoch(&self.clock)?.0.wrapping_sub(now.0);
            if task.max_time_micros > 0 && elapsed > u32::from(task.max_time_micros) {
                log::warn!(
                    "task overran its budget: {}us of {}us",
                    elapsed,
                    task.max_time_micros
                );
            }

            let spent = micros_since_epoch(&self.clock)?.0.wrapping_sub(loop_start.0);
            time_available = (self.loop_period_us + self.extra_loop_us).saturating_sub(spent);
        }

        self.adjust_extra_time();
        Ok(())
    }

    fn adjust_extra_time(&mut self) {
        if self.task_not_achieved > 0 {
            self.extra_loop_us = (self.extra_loop_us + 100).min(5000);
            self.task_not_achieved = 0;
            self.task_all_achieved = 0;
        } else if self.extra_loop_us > 0 {
            self.task_all_achieved += 1;
            if self.task_all_achieved > 50 {
                // Pressure has eased, slowly hand the extra time back
                self.task_all_achieved = 0;
                self.extra_loop_us = self.extra_loop_us.saturating_sub(50);
            }
        }
    }

    fn micros_since_epoch(&self) -> Result<Microseconds<u32>, Error> {
        micros_since_epoch(&self.clock)
    }
}

fn micros_since_epoch<C>(clock: &C) -> Result<Microseconds<u32>, Error>
where
    C: Clock<T = u32>,
{
    let instant = clock.try_now()?;
    Microseconds::try_from(instant.duration_since_epoch()).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embedded_time::{clock, rate::Fraction, Instant};

    /// Advances by `step` microseconds on every read.
    struct StepClock {
        ticks: Cell<u32>,
        step: u32,
    }

    impl StepClock {
        fn new(step: u32) -> Self {
            Self {
                ticks: Cell::new(0),
                step,
            }
        }
    }

    impl Clock for StepClock {
        type T = u32;

        const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

        fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
            let ticks = self.ticks.get();
            self.ticks.set(ticks.wrapping_add(self.step));
            Ok(Instant::new(ticks))
        }
    }

    #[derive(Default)]
    struct Counts {
        fast: u32,
        slow: u32,
        last_now: u32,
        budgets: [u32; 2],
        budget_calls: usize,
    }

    fn fast(event: Event<'_, Counts>) -> Result<(), Error> {
        event.state.fast += 1;
        event.state.last_now = event.now.0;
        Ok(())
    }

    fn slow(event: Event<'_, Counts>) -> Result<(), Error> {
        event.state.slow += 1;
        Ok(())
    }

    fn budget(event: Event<'_, Counts>) -> Result<(), Error> {
        let calls = event.state.budget_calls;
        event.state.budgets[calls % 2] = event.available.0;
        event.state.budget_calls += 1;
        Ok(())
    }

    fn failing(_: Event<'_, Counts>) -> Result<(), Error> {
        Err(Error::LinkTimeout { attempts: 1 })
    }

    #[test]
    fn runs_tasks_at_their_rate() {
        let mut tasks = [Task::high_priority(fast), Task::new(slow).with_hz(5.)];
        let mut scheduler = Scheduler::new(&mut tasks, StepClock::new(10), 200);
        let mut counts = Counts::default();

        for _ in 0..80 {
            scheduler.run(&mut counts).unwrap();
        }

        assert_eq!(counts.fast, 80);
        assert_eq!(counts.slow, 2);
        assert!(counts.last_now > 0);
    }

    #[test]
    fn skips_tasks_over_budget() {
        let mut tasks = [
            Task::high_priority(fast),
            Task::new(slow).with_max_time(u16::MAX),
        ];
        let mut scheduler = Scheduler::new(&mut tasks, StepClock::new(10), 200);
        let mut counts = Counts::default();

        for _ in 0..10 {
            scheduler.run(&mut counts).unwrap();
        }

        assert_eq!(counts.fast, 10);
        assert_eq!(counts.slow, 0);
    }

    #[test]
    fn later_tasks_see_less_time() {
        let mut tasks = [Task::high_priority(budget), Task::high_priority(budget)];
        let mut scheduler = Scheduler::new(&mut tasks, StepClock::new(10), 200);
        let mut counts = Counts::default();

        scheduler.run(&mut counts).unwrap();

        assert_eq!(counts.budget_calls, 2);
        assert_eq!(counts.budgets[0], 5_000);
        assert!(counts.budgets[1] < 5_000);
    }

    #[test]
    fn propagates_task_errors() {
        let mut tasks = [Task::high_priority(failing)];
        let mut scheduler = Scheduler::new(&mut tasks, StepClock::new(10), 200);

        let result = scheduler.run(&mut Counts::default());
        assert!(matches!(result, Err(Error::LinkTimeout { attempts: 1 })));
    }
}
