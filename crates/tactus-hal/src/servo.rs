//! Generic `Servo` trait for position-controlled mechanisms.
//!
//! Elevator carriages, arm joints, and wrists all present the same narrow
//! surface: command a position target, read the measured position back.  The
//! rest of the stack only ever talks to the trait through the
//! [`Plant`][crate::plant::Plant], so a simulated mechanism and a real motor
//! controller are interchangeable.

use std::time::Duration;

use tactus_types::TactusError;

/// A position-controlled mechanism (elevator carriage, arm joint, wrist).
///
/// Every mechanism has a stable string identifier so the
/// [`Plant`][crate::plant::Plant] can name it in errors and log events.
pub trait Servo: Send + Sync {
    /// Stable identifier for this mechanism, e.g. `"elevator"`.
    fn id(&self) -> &str;

    /// Command a closed-loop move to `target`, in mechanism units from the
    /// zero position (meters for a linear axis, radians for a joint).
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::MechanismFault`] if the command cannot be
    /// applied (e.g. the controller is in a fault state).
    fn set_target(&mut self, target: f64) -> Result<(), TactusError>;

    /// Most recently measured position in mechanism units.
    fn position(&self) -> f64;

    /// Stop and hold the current position.  Always safe to call.
    fn halt(&mut self);

    /// Advance simulated physics by `dt`.  No-op for real hardware.
    fn step(&mut self, _dt: Duration) {}
}
