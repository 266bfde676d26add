//! [`ApplySetpoint`] – hold one mechanism at a commanded setpoint.
//!
//! The everyday goal action: claim a mechanism, push a setpoint into the
//! [`Plant`] at admission, keep re-asserting it every cycle, and halt the
//! mechanism on the way out. It never finishes on its own; it runs until the
//! scheduler displaces it or an orchestrator releases the resource.
//!
//! Setpoint kind is checked against the mechanism once, in the constructor,
//! so a kind mismatch is a wiring error surfaced at build time rather than a
//! fault mid-cycle.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tactus_hal::{Plant, sim::SimRoller};
//! use tactus_kernel::Action;
//! use tactus_runtime::goal::ApplySetpoint;
//! use tactus_types::Setpoint;
//!
//! let mut plant = Plant::new();
//! let intake = plant.register_roller(SimRoller::new("intake")).unwrap();
//! let plant = Rc::new(RefCell::new(plant));
//!
//! let mut spin =
//!     ApplySetpoint::new("intake_spin", plant.clone(), intake, Setpoint::Voltage(6.0)).unwrap();
//! spin.initialize();
//! assert_eq!(plant.borrow().voltage(intake), Some(6.0));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use tactus_hal::Plant;
use tactus_kernel::{Action, CycleCx};
use tactus_types::{ResourceId, Setpoint, TactusError};

/// Goal action holding one mechanism at a setpoint until displaced.
pub struct ApplySetpoint {
    name: String,
    resources: [ResourceId; 1],
    plant: Rc<RefCell<Plant>>,
    goal: Box<dyn Fn() -> Setpoint>,
    current: Setpoint,
}

impl ApplySetpoint {
    /// Goal action with a fixed setpoint.
    ///
    /// # Errors
    ///
    /// [`TactusError::UnknownResource`] or [`TactusError::SetpointMismatch`]
    /// when `setpoint` cannot be dispatched to `resource`.
    pub fn new(
        name: impl Into<String>,
        plant: Rc<RefCell<Plant>>,
        resource: ResourceId,
        setpoint: Setpoint,
    ) -> Result<Box<Self>, TactusError> {
        Self::sampled(name, plant, resource, move || setpoint)
    }

    /// Goal action that samples its setpoint at each admission.
    ///
    /// The sample taken at initialize is held for the whole run, so a goal
    /// admitted while the operator changes a selector keeps the value it
    /// started with. `goal` must keep one setpoint kind; the kind is
    /// validated against `resource` once here.
    ///
    /// # Errors
    ///
    /// Same as [`ApplySetpoint::new`].
    pub fn sampled(
        name: impl Into<String>,
        plant: Rc<RefCell<Plant>>,
        resource: ResourceId,
        goal: impl Fn() -> Setpoint + 'static,
    ) -> Result<Box<Self>, TactusError> {
        let current = goal();
        plant.borrow().validate_setpoint(resource, &current)?;
        Ok(Box::new(ApplySetpoint {
            name: name.into(),
            resources: [resource],
            plant,
            goal: Box::new(goal),
            current,
        }))
    }

    fn command(&self, setpoint: Setpoint) {
        if let Err(e) = self.plant.borrow_mut().apply(self.resources[0], setpoint) {
            warn!(action = %self.name, error = %e, "setpoint rejected");
        }
    }
}

impl Action for ApplySetpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    fn initialize(&mut self) {
        self.current = (self.goal)();
        self.command(self.current);
    }

    fn execute(&mut self, _cx: &mut CycleCx) {
        // Re-asserted every cycle so a mechanism reset mid-run is re-commanded
        // on the next advance.
        self.command(self.current);
    }

    fn end(&mut self, _cancelled: bool) {
        self.command(Setpoint::Halt);
    }
}
