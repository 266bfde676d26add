//! Generic `Drivetrain` trait for the mobile base.
//!
//! The drivetrain accepts either a closed-loop pose target (`seek`) or an
//! open-loop cruise velocity, and reports its latest odometry estimate.  Path
//! planning and wheel-level kinematics live behind the implementation; the
//! scheduling core only ever sees poses.

use std::time::Duration;

use tactus_types::{Pose, TactusError};

/// The mobile base: commanded in field-relative poses, measured by odometry.
pub trait Drivetrain: Send + Sync {
    /// Stable identifier for this mechanism, e.g. `"drivetrain"`.
    fn id(&self) -> &str;

    /// Begin a closed-loop move toward `target`.  Replaces any previous
    /// target or cruise command.
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::MechanismFault`] if the command cannot be
    /// applied.
    fn seek(&mut self, target: Pose) -> Result<(), TactusError>;

    /// Cruise open-loop at `linear` meters per second along the current
    /// heading.  Replaces any previous target.
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::MechanismFault`] if the command cannot be
    /// applied.
    fn cruise(&mut self, linear: f64) -> Result<(), TactusError>;

    /// Latest odometry estimate.
    fn pose(&self) -> Pose;

    /// Stop in place and drop any active target.  Always safe to call.
    fn halt(&mut self);

    /// Advance simulated physics by `dt`.  No-op for real hardware.
    fn step(&mut self, _dt: Duration) {}
}
