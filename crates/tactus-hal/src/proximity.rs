//! Generic `Proximity` trait for object-presence sensors.
//!
//! Beam-break and short-range laser sensors answer one question: is there an
//! object in front of me right now.  Sensors are never commanded, so they are
//! not mechanism resources; the [`Plant`][crate::plant::Plant] keeps them in
//! a separate catalog keyed by identifier.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A boolean object-presence sensor (beam break, short-range laser).
pub trait Proximity: Send + Sync {
    /// Stable identifier for this sensor, e.g. `"intake_beam"`.
    fn id(&self) -> &str;

    /// True while an object interrupts the beam.
    fn detected(&self) -> bool;

    /// Advance simulated physics by `dt`.  No-op for real hardware.
    fn step(&mut self, _dt: Duration) {}
}

/// Shared flag behind a [`Proximity`] implementation.
///
/// Cloning hands out another handle to the same flag.  The simulated sensor
/// reads it, and scenario harnesses keep a clone to inject object presence
/// from outside the plant.
#[derive(Clone, Debug, Default)]
pub struct ProximityLatch(Arc<AtomicBool>);

impl ProximityLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag; the sensor reports the new value from the next read.
    pub fn set(&self, detected: bool) {
        self.0.store(detected, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
