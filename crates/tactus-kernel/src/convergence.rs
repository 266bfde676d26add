//! [`ConvergenceMonitor`] – tolerance-based completion detection for
//! closed-loop motion actions.
//!
//! A motion action owns the [`MotionFeedback`] writer and reports its live
//! tracking error every executed cycle; the monitor turns those reports into
//! a [`Condition`] via [`ConvergenceMonitor::within_tolerance`]. The
//! condition is true only when the latest report is *fresh* (written this
//! cycle or the previous one) and both error magnitudes sit inside their
//! tolerances, so a wrapped action that is not running, or whose measurement
//! went stale, reads as not converged rather than raising an error.
//!
//! Reports are raw per-cycle values with no averaging: near a tolerance
//! boundary the condition can chatter, and callers gate state changes with
//! [`Condition::debounced`].

use std::cell::Cell;
use std::rc::Rc;

use crate::action::CycleCx;
use crate::condition::Condition;

#[derive(Debug, Clone, Copy)]
struct Report {
    linear: f64,
    angular: f64,
    cycle: u64,
}

/// Writer half of a convergence channel, owned by the motion action.
#[derive(Clone)]
pub struct MotionFeedback {
    slot: Rc<Cell<Option<Report>>>,
}

impl MotionFeedback {
    /// Record this cycle's tracking error. Call from `execute`, every cycle
    /// the action has a usable measurement; skipping a cycle marks the
    /// channel stale.
    pub fn report(&self, cx: &CycleCx, linear_error: f64, angular_error: f64) {
        self.slot.set(Some(Report {
            linear: linear_error,
            angular: angular_error,
            cycle: cx.cycle().index,
        }));
    }

    /// Drop the latest report immediately. Call from `end`.
    pub fn clear(&self) {
        self.slot.set(None);
    }
}

/// Read half of a convergence channel.
///
/// # Example
///
/// ```
/// use tactus_kernel::convergence::ConvergenceMonitor;
///
/// let (monitor, feedback) = ConvergenceMonitor::channel();
/// let aligned = monitor.within_tolerance(0.10, 0.087);
/// // `feedback` moves into the motion action; `aligned` feeds bindings or
/// // orchestrator transitions. With no report yet, it evaluates false.
/// let _ = (aligned, feedback);
/// ```
pub struct ConvergenceMonitor {
    slot: Rc<Cell<Option<Report>>>,
}

impl ConvergenceMonitor {
    /// Create a connected monitor/feedback pair.
    pub fn channel() -> (ConvergenceMonitor, MotionFeedback) {
        let slot = Rc::new(Cell::new(None));
        (
            ConvergenceMonitor { slot: slot.clone() },
            MotionFeedback { slot },
        )
    }

    /// Condition that is true when the latest report is fresh and both
    /// error magnitudes are within the given tolerances (inclusive).
    ///
    /// `position_tolerance` is in meters, `heading_tolerance` in radians.
    pub fn within_tolerance(&self, position_tolerance: f64, heading_tolerance: f64) -> Condition {
        let slot = self.slot.clone();
        Condition::probe_with_cycle("within_tolerance", move |cycle| match slot.get() {
            Some(report) => {
                report.cycle + 1 >= cycle.index
                    && report.linear.abs() <= position_tolerance
                    && report.angular.abs() <= heading_tolerance
            }
            None => false,
        })
    }

    /// Latest `(linear, angular)` error, if a report is present. Telemetry
    /// convenience; freshness is not checked here.
    pub fn latest_error(&self) -> Option<(f64, f64)> {
        self.slot.get().map(|r| (r.linear, r.angular))
    }
}
