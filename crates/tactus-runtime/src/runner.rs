//! [`Runner`] – the fixed-period loop around plant and scheduler.
//!
//! One tick is: advance plant physics by the nominal period, then run one
//! scheduler cycle with the same period as `dt`. Control always reads the
//! measurements the physics just produced, and time-based conditions see a
//! fixed step regardless of wall jitter.
//!
//! [`Runner::run`] paces ticks against the wall clock and feeds every
//! cycle's duration to the [`OverrunTracker`]; [`Runner::run_for`] runs
//! unpaced simulated time for tests and scripted demos.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use tactus_hal::Plant;
use tactus_kernel::Scheduler;

use crate::overrun::OverrunTracker;

/// Drives the plant and the scheduler at a fixed period.
pub struct Runner {
    plant: Rc<RefCell<Plant>>,
    scheduler: Scheduler,
    period: Duration,
    overruns: OverrunTracker,
}

impl Runner {
    pub fn new(plant: Rc<RefCell<Plant>>, scheduler: Scheduler, period: Duration) -> Self {
        Runner {
            plant,
            scheduler,
            period,
            overruns: OverrunTracker::new(period),
        }
    }

    /// One cycle: plant physics first, then the scheduler.
    pub fn tick(&mut self) {
        self.plant.borrow_mut().step_simulation(self.period);
        self.scheduler.run_cycle(self.period);
    }

    /// Run `cycles` ticks back to back, with no wall pacing.
    pub fn run_for(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick();
        }
    }

    /// Run up to `cycles` wall-paced ticks, stopping early when `shutdown`
    /// is raised. Returns the number of cycles completed.
    pub fn run(&mut self, cycles: u64, shutdown: &AtomicBool) -> u64 {
        debug!(
            cycles,
            period_ms = self.period.as_millis() as u64,
            "paced run"
        );
        let mut completed = 0;
        for _ in 0..cycles {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            let started = Instant::now();
            self.tick();
            let elapsed = started.elapsed();
            self.overruns.record(elapsed);
            if let Some(rest) = self.period.checked_sub(elapsed) {
                thread::sleep(rest);
            }
            completed += 1;
        }
        completed
    }

    /// Halt every mechanism. The binary calls this once the loop exits.
    pub fn halt(&mut self) {
        self.plant.borrow_mut().halt_all();
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn plant(&self) -> Rc<RefCell<Plant>> {
        self.plant.clone()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn overruns(&self) -> &OverrunTracker {
        &self.overruns
    }
}
