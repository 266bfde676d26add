//! [`Plant`] – mechanism catalog and setpoint dispatcher.
//!
//! The plant owns every registered mechanism and sensor.  Mechanisms are
//! issued dense [`ResourceId`] handles in registration order; the scheduler
//! arbitrates ownership over those same handles, so the index a mechanism
//! gets here is the index actions claim.  Sensors are never commanded and
//! live in a separate catalog keyed by identifier.
//!
//! # Setpoint dispatch
//!
//! | Mechanism | Accepted setpoints |
//! |---|---|
//! | [`Servo`] | `Position`, `Halt` |
//! | [`Roller`] | `Voltage`, `Halt` |
//! | [`Drivetrain`] | `Pose`, `Velocity`, `Halt` |
//!
//! Anything else is a [`TactusError::SetpointMismatch`].  Goal actions
//! validate their setpoint against the target mechanism when they are built,
//! so dispatch during a cycle cannot fail for them.
//!
//! # Example
//!
//! ```rust
//! use tactus_hal::plant::Plant;
//! use tactus_hal::sim::SimRoller;
//! use tactus_types::Setpoint;
//!
//! let mut plant = Plant::new();
//! let intake = plant.register_roller(SimRoller::new("intake")).unwrap();
//!
//! plant.apply(intake, Setpoint::Voltage(8.0)).unwrap();
//! assert_eq!(plant.voltage(intake), Some(8.0));
//! ```

use std::time::Duration;

use tracing::{debug, info};

use tactus_types::{Pose, ResourceId, Setpoint, TactusError};

use crate::drivetrain::Drivetrain;
use crate::proximity::Proximity;
use crate::roller::Roller;
use crate::servo::Servo;

/// One registered mechanism, tagged by kind so setpoints can be dispatched
/// to the right trait method.
pub(crate) enum Mechanism {
    Servo(Box<dyn Servo>),
    Roller(Box<dyn Roller>),
    Drivetrain(Box<dyn Drivetrain>),
}

impl Mechanism {
    pub(crate) fn id(&self) -> &str {
        match self {
            Mechanism::Servo(s) => s.id(),
            Mechanism::Roller(r) => r.id(),
            Mechanism::Drivetrain(d) => d.id(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Mechanism::Servo(_) => "servo",
            Mechanism::Roller(_) => "roller",
            Mechanism::Drivetrain(_) => "drivetrain",
        }
    }

    fn halt(&mut self) {
        match self {
            Mechanism::Servo(s) => s.halt(),
            Mechanism::Roller(r) => r.halt(),
            Mechanism::Drivetrain(d) => d.halt(),
        }
    }

    fn step(&mut self, dt: Duration) {
        match self {
            Mechanism::Servo(s) => s.step(dt),
            Mechanism::Roller(r) => r.step(dt),
            Mechanism::Drivetrain(d) => d.step(dt),
        }
    }
}

/// Mechanism catalog and [`Setpoint`] dispatcher.
///
/// Construct with [`Plant::new`] (or through
/// [`PlantBuilder`][crate::builder::PlantBuilder]), register mechanisms, then
/// call [`Plant::apply`] to translate setpoints into device calls.
#[derive(Default)]
pub struct Plant {
    mechanisms: Vec<Mechanism>,
    sensors: Vec<Box<dyn Proximity>>,
}

impl Plant {
    /// Create an empty plant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a position-controlled mechanism and return its resource
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::DuplicateMechanism`] when the identifier is
    /// already taken.
    pub fn register_servo(&mut self, servo: Box<dyn Servo>) -> Result<ResourceId, TactusError> {
        self.register(Mechanism::Servo(servo))
    }

    /// Register a voltage-driven mechanism and return its resource handle.
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::DuplicateMechanism`] when the identifier is
    /// already taken.
    pub fn register_roller(&mut self, roller: Box<dyn Roller>) -> Result<ResourceId, TactusError> {
        self.register(Mechanism::Roller(roller))
    }

    /// Register a drivetrain and return its resource handle.
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::DuplicateMechanism`] when the identifier is
    /// already taken.
    pub fn register_drivetrain(
        &mut self,
        drivetrain: Box<dyn Drivetrain>,
    ) -> Result<ResourceId, TactusError> {
        self.register(Mechanism::Drivetrain(drivetrain))
    }

    /// Register an object-presence sensor.  Sensors are not mechanism
    /// resources and get no [`ResourceId`]; read them with
    /// [`Plant::detected`].
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::DuplicateMechanism`] when the identifier is
    /// already taken.
    pub fn register_proximity(&mut self, sensor: Box<dyn Proximity>) -> Result<(), TactusError> {
        if self.id_taken(sensor.id()) {
            return Err(TactusError::DuplicateMechanism(sensor.id().to_string()));
        }
        debug!(sensor = sensor.id(), "proximity sensor registered");
        self.sensors.push(sensor);
        Ok(())
    }

    pub(crate) fn register(&mut self, mechanism: Mechanism) -> Result<ResourceId, TactusError> {
        if self.id_taken(mechanism.id()) {
            return Err(TactusError::DuplicateMechanism(mechanism.id().to_string()));
        }
        let resource = ResourceId::new(self.mechanisms.len());
        debug!(
            resource = %resource,
            mechanism = mechanism.id(),
            kind = mechanism.kind(),
            "mechanism registered"
        );
        self.mechanisms.push(mechanism);
        Ok(resource)
    }

    fn id_taken(&self, id: &str) -> bool {
        self.mechanisms.iter().any(|m| m.id() == id) || self.sensors.iter().any(|s| s.id() == id)
    }

    /// Dispatch a [`Setpoint`] to the mechanism behind `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::UnknownResource`] for a handle the plant never
    /// issued, [`TactusError::SetpointMismatch`] when the mechanism kind does
    /// not accept the setpoint, or whatever fault the device reports.
    pub fn apply(&mut self, resource: ResourceId, setpoint: Setpoint) -> Result<(), TactusError> {
        let Some(mechanism) = self.mechanisms.get_mut(resource.index()) else {
            return Err(TactusError::UnknownResource(resource.to_string()));
        };
        match (mechanism, setpoint) {
            (Mechanism::Servo(s), Setpoint::Position(target)) => s.set_target(target),
            (Mechanism::Servo(s), Setpoint::Halt) => {
                s.halt();
                Ok(())
            }
            (Mechanism::Roller(r), Setpoint::Voltage(volts)) => r.set_voltage(volts),
            (Mechanism::Roller(r), Setpoint::Halt) => {
                r.halt();
                Ok(())
            }
            (Mechanism::Drivetrain(d), Setpoint::Pose(pose)) => d.seek(pose),
            (Mechanism::Drivetrain(d), Setpoint::Velocity(linear)) => d.cruise(linear),
            (Mechanism::Drivetrain(d), Setpoint::Halt) => {
                d.halt();
                Ok(())
            }
            (mechanism, setpoint) => Err(TactusError::SetpointMismatch {
                mechanism: mechanism.id().to_string(),
                kind: setpoint.kind(),
            }),
        }
    }

    /// Check that `resource` exists and accepts setpoints of this kind,
    /// without commanding anything.  Goal actions call this when they are
    /// built so dispatch during a cycle cannot mismatch.
    ///
    /// # Errors
    ///
    /// Same classification as [`Plant::apply`], minus device faults.
    pub fn validate_setpoint(
        &self,
        resource: ResourceId,
        setpoint: &Setpoint,
    ) -> Result<(), TactusError> {
        let Some(mechanism) = self.mechanisms.get(resource.index()) else {
            return Err(TactusError::UnknownResource(resource.to_string()));
        };
        let accepted = matches!(
            (mechanism, setpoint),
            (Mechanism::Servo(_), Setpoint::Position(_) | Setpoint::Halt)
                | (Mechanism::Roller(_), Setpoint::Voltage(_) | Setpoint::Halt)
                | (
                    Mechanism::Drivetrain(_),
                    Setpoint::Pose(_) | Setpoint::Velocity(_) | Setpoint::Halt
                )
        );
        if accepted {
            Ok(())
        } else {
            Err(TactusError::SetpointMismatch {
                mechanism: mechanism.id().to_string(),
                kind: setpoint.kind(),
            })
        }
    }

    /// Measured position of a [`Servo`], or `None` for other kinds.
    pub fn position(&self, resource: ResourceId) -> Option<f64> {
        match self.mechanisms.get(resource.index())? {
            Mechanism::Servo(s) => Some(s.position()),
            _ => None,
        }
    }

    /// Last commanded voltage of a [`Roller`], or `None` for other kinds.
    pub fn voltage(&self, resource: ResourceId) -> Option<f64> {
        match self.mechanisms.get(resource.index())? {
            Mechanism::Roller(r) => Some(r.voltage()),
            _ => None,
        }
    }

    /// Latest odometry of a [`Drivetrain`], or `None` for other kinds.
    pub fn pose(&self, resource: ResourceId) -> Option<Pose> {
        match self.mechanisms.get(resource.index())? {
            Mechanism::Drivetrain(d) => Some(d.pose()),
            _ => None,
        }
    }

    /// True while the named sensor reports an object.  An unknown sensor
    /// reads `false`, never an error, so condition probes stay infallible.
    pub fn detected(&self, sensor: &str) -> bool {
        self.sensors
            .iter()
            .find(|s| s.id() == sensor)
            .is_some_and(|s| s.detected())
    }

    /// Identifier of the mechanism behind `resource`.
    pub fn name(&self, resource: ResourceId) -> Option<&str> {
        self.mechanisms.get(resource.index()).map(|m| m.id())
    }

    /// Every mechanism with its handle, in registration order.  The runtime
    /// walks this to mirror the catalog into the scheduler's resource table.
    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &str)> + '_ {
        self.mechanisms
            .iter()
            .enumerate()
            .map(|(index, m)| (ResourceId::new(index), m.id()))
    }

    /// Number of registered mechanisms (sensors not counted).
    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }

    /// Drive every mechanism to its safe idle output.  Called on shutdown
    /// and by the Ctrl-C path in the binary.
    pub fn halt_all(&mut self) {
        info!("halting all mechanisms");
        for mechanism in &mut self.mechanisms {
            mechanism.halt();
        }
    }

    /// Advance simulated physics on every device by `dt`.  Real hardware
    /// ignores this; the runner calls it once per cycle before conditions
    /// are evaluated.
    pub fn step_simulation(&mut self, dt: Duration) {
        for mechanism in &mut self.mechanisms {
            mechanism.step(dt);
        }
        for sensor in &mut self.sensors {
            sensor.step(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use super::*;

    // ------------------------------------------------------------------
    // Test doubles.  Shared atomics let the tests observe calls that
    // arrive through the boxed trait object.
    // ------------------------------------------------------------------

    struct RecordingServo {
        id: String,
        target: f64,
        halted: Arc<AtomicBool>,
        steps: Arc<AtomicU32>,
    }

    impl RecordingServo {
        fn new(id: &str) -> Box<Self> {
            Self::with_probes(id, Arc::default(), Arc::default())
        }

        fn with_probes(id: &str, halted: Arc<AtomicBool>, steps: Arc<AtomicU32>) -> Box<Self> {
            Box::new(Self {
                id: id.to_string(),
                target: 0.0,
                halted,
                steps,
            })
        }
    }

    impl Servo for RecordingServo {
        fn id(&self) -> &str {
            &self.id
        }
        fn set_target(&mut self, target: f64) -> Result<(), TactusError> {
            self.target = target;
            self.halted.store(false, Ordering::Relaxed);
            Ok(())
        }
        fn position(&self) -> f64 {
            self.target
        }
        fn halt(&mut self) {
            self.halted.store(true, Ordering::Relaxed);
        }
        fn step(&mut self, _dt: Duration) {
            self.steps.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct RecordingRoller {
        id: String,
        volts: f64,
    }

    impl RecordingRoller {
        fn new(id: &str) -> Box<Self> {
            Box::new(Self {
                id: id.to_string(),
                volts: 0.0,
            })
        }
    }

    impl Roller for RecordingRoller {
        fn id(&self) -> &str {
            &self.id
        }
        fn set_voltage(&mut self, volts: f64) -> Result<(), TactusError> {
            self.volts = volts;
            Ok(())
        }
        fn voltage(&self) -> f64 {
            self.volts
        }
        fn halt(&mut self) {
            self.volts = 0.0;
        }
    }

    struct RecordingDrivetrain {
        id: String,
        pose: Pose,
        halted: Arc<AtomicBool>,
    }

    impl RecordingDrivetrain {
        fn new(id: &str) -> Box<Self> {
            Box::new(Self {
                id: id.to_string(),
                pose: Pose::ZERO,
                halted: Arc::default(),
            })
        }
    }

    impl Drivetrain for RecordingDrivetrain {
        fn id(&self) -> &str {
            &self.id
        }
        fn seek(&mut self, target: Pose) -> Result<(), TactusError> {
            self.pose = target;
            self.halted.store(false, Ordering::Relaxed);
            Ok(())
        }
        fn cruise(&mut self, _linear: f64) -> Result<(), TactusError> {
            self.halted.store(false, Ordering::Relaxed);
            Ok(())
        }
        fn pose(&self) -> Pose {
            self.pose
        }
        fn halt(&mut self) {
            self.halted.store(true, Ordering::Relaxed);
        }
    }

    struct FixedBeam {
        id: String,
        blocked: bool,
    }

    impl Proximity for FixedBeam {
        fn id(&self) -> &str {
            &self.id
        }
        fn detected(&self) -> bool {
            self.blocked
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn apply_position_reaches_servo() {
        let mut plant = Plant::new();
        let elevator = plant.register_servo(RecordingServo::new("elevator")).unwrap();

        plant.apply(elevator, Setpoint::Position(1.2)).unwrap();
        assert_eq!(plant.position(elevator), Some(1.2));
    }

    #[test]
    fn apply_pose_and_velocity_reach_drivetrain() {
        let mut plant = Plant::new();
        let drive = plant
            .register_drivetrain(RecordingDrivetrain::new("drivetrain"))
            .unwrap();

        plant
            .apply(drive, Setpoint::Pose(Pose::new(2.0, 1.0, 0.5)))
            .unwrap();
        let pose = plant.pose(drive).unwrap();
        assert!((pose.x - 2.0).abs() < f64::EPSILON);

        plant.apply(drive, Setpoint::Velocity(0.4)).unwrap();
    }

    #[test]
    fn apply_mismatched_kind_returns_error() {
        let mut plant = Plant::new();
        let elevator = plant.register_servo(RecordingServo::new("elevator")).unwrap();

        let result = plant.apply(elevator, Setpoint::Voltage(6.0));
        assert!(matches!(result, Err(TactusError::SetpointMismatch { .. })));
    }

    #[test]
    fn apply_unknown_resource_returns_error() {
        let mut plant = Plant::new();
        let result = plant.apply(ResourceId::new(7), Setpoint::Halt);
        assert!(matches!(result, Err(TactusError::UnknownResource(_))));
    }

    #[test]
    fn validate_setpoint_agrees_with_dispatch() {
        let mut plant = Plant::new();
        let intake = plant.register_roller(RecordingRoller::new("intake")).unwrap();

        assert!(plant.validate_setpoint(intake, &Setpoint::Voltage(4.0)).is_ok());
        assert!(plant.validate_setpoint(intake, &Setpoint::Halt).is_ok());
        assert!(matches!(
            plant.validate_setpoint(intake, &Setpoint::Pose(Pose::ZERO)),
            Err(TactusError::SetpointMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_identifier_rejected_across_kinds() {
        let mut plant = Plant::new();
        plant.register_servo(RecordingServo::new("elevator")).unwrap();

        let dup = plant.register_roller(RecordingRoller::new("elevator"));
        assert!(matches!(dup, Err(TactusError::DuplicateMechanism(_))));

        let sensor_dup = plant.register_proximity(Box::new(FixedBeam {
            id: "elevator".to_string(),
            blocked: false,
        }));
        assert!(matches!(sensor_dup, Err(TactusError::DuplicateMechanism(_))));
    }

    #[test]
    fn halt_all_halts_every_mechanism() {
        let servo_halted = Arc::new(AtomicBool::new(false));
        let drive_halted = Arc::new(AtomicBool::new(false));

        let mut plant = Plant::new();
        let elevator = plant
            .register_servo(RecordingServo::with_probes(
                "elevator",
                servo_halted.clone(),
                Arc::default(),
            ))
            .unwrap();
        let intake = plant.register_roller(RecordingRoller::new("intake")).unwrap();
        plant
            .register_drivetrain(Box::new(RecordingDrivetrain {
                id: "drivetrain".to_string(),
                pose: Pose::ZERO,
                halted: drive_halted.clone(),
            }))
            .unwrap();

        plant.apply(elevator, Setpoint::Position(0.8)).unwrap();
        plant.apply(intake, Setpoint::Voltage(8.0)).unwrap();
        plant.halt_all();

        assert_eq!(plant.voltage(intake), Some(0.0));
        assert!(servo_halted.load(Ordering::Relaxed));
        assert!(drive_halted.load(Ordering::Relaxed));
    }

    #[test]
    fn resources_enumerate_in_registration_order() {
        let mut plant = Plant::new();
        let drive = plant
            .register_drivetrain(RecordingDrivetrain::new("drivetrain"))
            .unwrap();
        let elevator = plant.register_servo(RecordingServo::new("elevator")).unwrap();

        let catalog: Vec<(ResourceId, String)> = plant
            .resources()
            .map(|(id, name)| (id, name.to_string()))
            .collect();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0], (drive, "drivetrain".to_string()));
        assert_eq!(catalog[1], (elevator, "elevator".to_string()));
        assert_eq!(plant.name(elevator), Some("elevator"));
    }

    #[test]
    fn unknown_sensor_reads_false() {
        let mut plant = Plant::new();
        plant
            .register_proximity(Box::new(FixedBeam {
                id: "intake_beam".to_string(),
                blocked: true,
            }))
            .unwrap();

        assert!(plant.detected("intake_beam"));
        assert!(!plant.detected("missing_beam"));
    }

    #[test]
    fn step_simulation_reaches_every_device() {
        let steps = Arc::new(AtomicU32::new(0));
        let mut plant = Plant::new();
        plant
            .register_servo(RecordingServo::with_probes(
                "elevator",
                Arc::default(),
                steps.clone(),
            ))
            .unwrap();

        plant.step_simulation(Duration::from_millis(20));
        plant.step_simulation(Duration::from_millis(20));

        assert_eq!(steps.load(Ordering::Relaxed), 2);
    }
}
