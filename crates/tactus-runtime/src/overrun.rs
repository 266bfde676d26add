//! [`OverrunTracker`] – cycle-budget bookkeeping for the control loop.
//!
//! The runner hands every completed cycle's wall duration to
//! [`OverrunTracker::record`]. The tracker counts budget misses, keeps the
//! worst cycle seen, and warns the moment a cycle blows its period.
//! Sustained misses degrade [`LoopHealth`], which the binary reports at
//! shutdown.

use std::time::Duration;

use tracing::warn;

/// Consecutive overruns before the loop is considered degraded.
const DEGRADED_AFTER: u64 = 5;

/// Aggregate judgement over recent cycle timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopHealth {
    /// Cycles are landing inside the period, or misses are isolated.
    Nominal,
    /// The last [`DEGRADED_AFTER`] or more cycles all overran.
    Degraded,
}

/// Tracks how cycle wall time compares against the configured period.
#[derive(Debug)]
pub struct OverrunTracker {
    period: Duration,
    cycles: u64,
    overruns: u64,
    consecutive: u64,
    worst: Duration,
}

impl OverrunTracker {
    pub fn new(period: Duration) -> Self {
        OverrunTracker {
            period,
            cycles: 0,
            overruns: 0,
            consecutive: 0,
            worst: Duration::ZERO,
        }
    }

    /// Record one completed cycle's wall duration.
    pub fn record(&mut self, elapsed: Duration) {
        self.cycles += 1;
        if elapsed > self.worst {
            self.worst = elapsed;
        }
        if elapsed > self.period {
            self.overruns += 1;
            self.consecutive += 1;
            warn!(
                elapsed_us = elapsed.as_micros() as u64,
                period_us = self.period.as_micros() as u64,
                consecutive = self.consecutive,
                "cycle overran its period"
            );
        } else {
            self.consecutive = 0;
        }
    }

    /// The budget each cycle is measured against.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Total cycles recorded.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Total cycles that exceeded the period.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Length of the current unbroken run of overruns.
    pub fn consecutive(&self) -> u64 {
        self.consecutive
    }

    /// Longest cycle recorded so far.
    pub fn worst(&self) -> Duration {
        self.worst
    }

    pub fn health(&self) -> LoopHealth {
        if self.consecutive >= DEGRADED_AFTER {
            LoopHealth::Degraded
        } else {
            LoopHealth::Nominal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(20);

    #[test]
    fn in_budget_cycles_leave_the_tracker_clean() {
        let mut tracker = OverrunTracker::new(PERIOD);
        tracker.record(Duration::from_millis(4));
        tracker.record(Duration::from_millis(19));
        tracker.record(PERIOD);

        assert_eq!(tracker.cycles(), 3);
        assert_eq!(tracker.overruns(), 0);
        assert_eq!(tracker.consecutive(), 0);
        assert_eq!(tracker.worst(), PERIOD);
        assert_eq!(tracker.health(), LoopHealth::Nominal);
    }

    #[test]
    fn overrun_counts_and_tracks_the_worst() {
        let mut tracker = OverrunTracker::new(PERIOD);
        tracker.record(Duration::from_millis(25));
        tracker.record(Duration::from_millis(60));
        tracker.record(Duration::from_millis(30));

        assert_eq!(tracker.overruns(), 3);
        assert_eq!(tracker.worst(), Duration::from_millis(60));
    }

    #[test]
    fn consecutive_resets_on_recovery() {
        let mut tracker = OverrunTracker::new(PERIOD);
        tracker.record(Duration::from_millis(25));
        tracker.record(Duration::from_millis(25));
        assert_eq!(tracker.consecutive(), 2);

        tracker.record(Duration::from_millis(5));
        assert_eq!(tracker.consecutive(), 0);
        assert_eq!(tracker.overruns(), 2);
    }

    #[test]
    fn health_degrades_after_sustained_misses() {
        let mut tracker = OverrunTracker::new(PERIOD);
        for _ in 0..4 {
            tracker.record(Duration::from_millis(30));
        }
        assert_eq!(tracker.health(), LoopHealth::Nominal);
        tracker.record(Duration::from_millis(30));
        assert_eq!(tracker.health(), LoopHealth::Degraded);

        tracker.record(Duration::from_millis(1));
        assert_eq!(tracker.health(), LoopHealth::Nominal);
    }
}
