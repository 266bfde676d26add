//! [`SeekPose`] – drive the drivetrain toward a field pose.
//!
//! Issues a pose setpoint at admission, then reports the live tracking error
//! through a [`MotionFeedback`] channel every executed cycle, so a
//! [`ConvergenceMonitor`][tactus_kernel::ConvergenceMonitor] condition can
//! gate the next state change. The action itself never finishes: it keeps
//! station on the target until an orchestrator releases the drivetrain, which
//! lets a debounced alignment condition read a steady stream of fresh
//! reports.
//!
//! Declares [`InterruptPolicy::CancelIncoming`]: a competing claim on the
//! drivetrain is refused while the approach is in progress. An explicit
//! cancel still ends it and halts the drivetrain.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tactus_hal::{Plant, sim::SimDrivetrain};
//! use tactus_kernel::ConvergenceMonitor;
//! use tactus_runtime::seek::SeekPose;
//! use tactus_types::Pose;
//!
//! let mut plant = Plant::new();
//! let drive = plant
//!     .register_drivetrain(SimDrivetrain::new("drive", 2.0, 3.0))
//!     .unwrap();
//! let plant = Rc::new(RefCell::new(plant));
//!
//! let (monitor, feedback) = ConvergenceMonitor::channel();
//! let seek =
//!     SeekPose::new("approach", plant, drive, Pose::new(1.0, 0.5, 0.0), feedback).unwrap();
//! let aligned = monitor.within_tolerance(0.05, 0.05);
//! // `seek` registers with the scheduler; `aligned` gates the next state.
//! # let _ = (seek, aligned);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use tactus_hal::Plant;
use tactus_kernel::{Action, CycleCx, MotionFeedback};
use tactus_types::{InterruptPolicy, Pose, ResourceId, Setpoint, TactusError};

/// Motion action converging the drivetrain on a pose and reporting its error.
pub struct SeekPose {
    name: String,
    resources: [ResourceId; 1],
    plant: Rc<RefCell<Plant>>,
    target_fn: Box<dyn Fn() -> Pose>,
    target: Pose,
    feedback: MotionFeedback,
}

impl SeekPose {
    /// Seek a fixed pose.
    ///
    /// # Errors
    ///
    /// [`TactusError::UnknownResource`] or [`TactusError::SetpointMismatch`]
    /// when `drive` is not a drivetrain.
    pub fn new(
        name: impl Into<String>,
        plant: Rc<RefCell<Plant>>,
        drive: ResourceId,
        target: Pose,
        feedback: MotionFeedback,
    ) -> Result<Box<Self>, TactusError> {
        Self::toward(name, plant, drive, move || target, feedback)
    }

    /// Seek a pose sampled at each admission.
    ///
    /// The operator's side selector feeds this: whichever target the closure
    /// yields when the action is admitted is held for the whole approach.
    ///
    /// # Errors
    ///
    /// Same as [`SeekPose::new`].
    pub fn toward(
        name: impl Into<String>,
        plant: Rc<RefCell<Plant>>,
        drive: ResourceId,
        target_fn: impl Fn() -> Pose + 'static,
        feedback: MotionFeedback,
    ) -> Result<Box<Self>, TactusError> {
        let target = target_fn();
        plant
            .borrow()
            .validate_setpoint(drive, &Setpoint::Pose(target))?;
        Ok(Box::new(SeekPose {
            name: name.into(),
            resources: [drive],
            plant,
            target_fn: Box::new(target_fn),
            target,
            feedback,
        }))
    }

    fn command(&self, setpoint: Setpoint) {
        if let Err(e) = self.plant.borrow_mut().apply(self.resources[0], setpoint) {
            warn!(action = %self.name, error = %e, "setpoint rejected");
        }
    }
}

impl Action for SeekPose {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    fn interrupt_policy(&self) -> InterruptPolicy {
        InterruptPolicy::CancelIncoming
    }

    fn initialize(&mut self) {
        self.target = (self.target_fn)();
        self.command(Setpoint::Pose(self.target));
    }

    fn execute(&mut self, cx: &mut CycleCx) {
        self.command(Setpoint::Pose(self.target));
        // A missing measurement skips the report; the channel goes stale and
        // the alignment condition degrades to false.
        if let Some(pose) = self.plant.borrow().pose(self.resources[0]) {
            let linear = pose.distance_to(&self.target);
            let angular = pose.heading_error_to(&self.target);
            self.feedback.report(cx, linear, angular);
        }
    }

    fn end(&mut self, _cancelled: bool) {
        self.feedback.clear();
        self.command(Setpoint::Halt);
    }
}
