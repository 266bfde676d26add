//! Generic `Roller` trait for voltage-driven spinners.
//!
//! Intake wheels, feeder belts, and ejector rollers take an open-loop output
//! voltage and keep applying it until told otherwise.  There is no closed
//! loop to converge; `halt` cuts the output to zero.

use std::time::Duration;

use tactus_types::TactusError;

/// A voltage-driven spinning mechanism (intake wheels, feeder belt).
pub trait Roller: Send + Sync {
    /// Stable identifier for this mechanism, e.g. `"intake"`.
    fn id(&self) -> &str;

    /// Apply an open-loop output voltage.  Sign convention is up to the
    /// mechanism; the stock wiring uses positive to intake and negative to
    /// eject.
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::MechanismFault`] if the command cannot be
    /// applied.
    fn set_voltage(&mut self, volts: f64) -> Result<(), TactusError>;

    /// Last commanded output voltage.
    fn voltage(&self) -> f64;

    /// Cut the output to zero volts.  Always safe to call.
    fn halt(&mut self);

    /// Advance simulated physics by `dt`.  No-op for real hardware.
    fn step(&mut self, _dt: Duration) {}
}
