//! [`PlantBuilder`] – mode-selected plant construction.
//!
//! One builder covers both non-hardware variants: [`Mode::Sim`] populates
//! the plant with the physics devices from [`sim`][crate::sim],
//! [`Mode::Offline`] with inert stubs that accept every command and report
//! static measurements.  Real drivers would slot in behind the same traits
//! via [`Plant`]'s `register_*` methods.
//!
//! # Stub behaviour (`Mode::Offline`)
//!
//! | Device | Behaviour |
//! |---|---|
//! | Servo | Accepts targets; `position()` is always `0.0`. |
//! | Roller | Accepts voltages; `voltage()` is always `0.0`. |
//! | Drivetrain | Accepts targets; `pose()` is always [`Pose::ZERO`]. |
//! | Proximity | `detected()` is always `false`. |
//!
//! # Example
//!
//! ```rust
//! use tactus_hal::builder::PlantBuilder;
//! use tactus_types::Mode;
//!
//! let plant = PlantBuilder::new(Mode::Sim)
//!     .with_drivetrain("drivetrain", 1.5, 3.0)
//!     .with_servo("elevator", 1.2)
//!     .with_roller("intake")
//!     .with_proximity("intake_beam")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(plant.len(), 3);
//! ```

use tracing::info;

use tactus_types::{Mode, Pose, TactusError};

use crate::drivetrain::Drivetrain;
use crate::plant::{Mechanism, Plant};
use crate::proximity::{Proximity, ProximityLatch};
use crate::roller::Roller;
use crate::servo::Servo;
use crate::sim::{SimDrivetrain, SimProximity, SimRoller, SimServo};

// ─────────────────────────────────────────────────────────────────────────────
// Offline stubs
// ─────────────────────────────────────────────────────────────────────────────

struct OfflineServo {
    id: String,
}

impl Servo for OfflineServo {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_target(&mut self, _target: f64) -> Result<(), TactusError> {
        Ok(())
    }

    fn position(&self) -> f64 {
        0.0
    }

    fn halt(&mut self) {}
}

struct OfflineRoller {
    id: String,
}

impl Roller for OfflineRoller {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_voltage(&mut self, _volts: f64) -> Result<(), TactusError> {
        Ok(())
    }

    fn voltage(&self) -> f64 {
        0.0
    }

    fn halt(&mut self) {}
}

struct OfflineDrivetrain {
    id: String,
}

impl Drivetrain for OfflineDrivetrain {
    fn id(&self) -> &str {
        &self.id
    }

    fn seek(&mut self, _target: Pose) -> Result<(), TactusError> {
        Ok(())
    }

    fn cruise(&mut self, _linear: f64) -> Result<(), TactusError> {
        Ok(())
    }

    fn pose(&self) -> Pose {
        Pose::ZERO
    }

    fn halt(&mut self) {}
}

struct OfflineProximity {
    id: String,
}

impl Proximity for OfflineProximity {
    fn id(&self) -> &str {
        &self.id
    }

    fn detected(&self) -> bool {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PlantBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder that constructs a [`Plant`] populated with the device variant the
/// given [`Mode`] selects.  Devices are registered in declaration order, so
/// the first `with_*` call gets resource index 0.
pub struct PlantBuilder {
    mode: Mode,
    mechanisms: Vec<Mechanism>,
    sensors: Vec<Box<dyn Proximity>>,
    latches: Vec<(String, ProximityLatch)>,
}

impl PlantBuilder {
    /// Create a builder with no devices.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            mechanisms: Vec::new(),
            sensors: Vec::new(),
            latches: Vec::new(),
        }
    }

    /// Add a drivetrain.  The rates parameterise the simulated slew model
    /// and are ignored in offline mode.
    pub fn with_drivetrain(
        mut self,
        id: impl Into<String>,
        linear_rate: f64,
        angular_rate: f64,
    ) -> Self {
        let id = id.into();
        let device: Box<dyn Drivetrain> = match self.mode {
            Mode::Sim => SimDrivetrain::new(id, linear_rate, angular_rate),
            Mode::Offline => Box::new(OfflineDrivetrain { id }),
        };
        self.mechanisms.push(Mechanism::Drivetrain(device));
        self
    }

    /// Add a position mechanism.  `rate` parameterises the simulated slew
    /// model and is ignored in offline mode.
    pub fn with_servo(mut self, id: impl Into<String>, rate: f64) -> Self {
        let id = id.into();
        let device: Box<dyn Servo> = match self.mode {
            Mode::Sim => SimServo::new(id, rate),
            Mode::Offline => Box::new(OfflineServo { id }),
        };
        self.mechanisms.push(Mechanism::Servo(device));
        self
    }

    /// Add a voltage mechanism.
    pub fn with_roller(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        let device: Box<dyn Roller> = match self.mode {
            Mode::Sim => SimRoller::new(id),
            Mode::Offline => Box::new(OfflineRoller { id }),
        };
        self.mechanisms.push(Mechanism::Roller(device));
        self
    }

    /// Add an object-presence sensor.
    pub fn with_proximity(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        match self.mode {
            Mode::Sim => {
                let (sensor, latch) = SimProximity::new(id.clone());
                self.latches.push((id, latch));
                self.sensors.push(sensor);
            }
            Mode::Offline => self.sensors.push(Box::new(OfflineProximity { id })),
        }
        self
    }

    /// Latch of a simulated proximity sensor added earlier, for injecting
    /// object presence from scenario code.  `None` in offline mode or for an
    /// unknown identifier.
    pub fn latch(&self, id: &str) -> Option<ProximityLatch> {
        self.latches
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, latch)| latch.clone())
    }

    /// Consume the builder and return the populated [`Plant`].
    ///
    /// # Errors
    ///
    /// Returns [`TactusError::DuplicateMechanism`] when two devices share an
    /// identifier.
    pub fn build(self) -> Result<Plant, TactusError> {
        info!(
            mode = %self.mode,
            mechanisms = self.mechanisms.len(),
            sensors = self.sensors.len(),
            "building plant"
        );
        let mut plant = Plant::new();
        for mechanism in self.mechanisms {
            plant.register(mechanism)?;
        }
        for sensor in self.sensors {
            plant.register_proximity(sensor)?;
        }
        Ok(plant)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tactus_types::Setpoint;

    use super::*;

    fn stock_builder(mode: Mode) -> PlantBuilder {
        PlantBuilder::new(mode)
            .with_drivetrain("drivetrain", 1.5, 3.0)
            .with_servo("elevator", 1.2)
            .with_roller("intake")
            .with_proximity("intake_beam")
    }

    #[test]
    fn sim_plant_runs_the_full_stack() {
        let builder = stock_builder(Mode::Sim);
        let latch = builder.latch("intake_beam").unwrap();
        let mut plant = builder.build().unwrap();

        let catalog: Vec<String> = plant.resources().map(|(_, n)| n.to_string()).collect();
        assert_eq!(catalog, vec!["drivetrain", "elevator", "intake"]);

        let (drive, _) = plant.resources().next().unwrap();
        plant
            .apply(drive, Setpoint::Pose(Pose::new(0.5, 0.0, 0.0)))
            .unwrap();
        plant.step_simulation(Duration::from_millis(100));
        let pose = plant.pose(drive).unwrap();
        assert!(pose.x > 0.0);

        latch.set(true);
        assert!(plant.detected("intake_beam"));
    }

    #[test]
    fn offline_plant_accepts_commands_and_reads_static() {
        let builder = stock_builder(Mode::Offline);
        assert!(builder.latch("intake_beam").is_none());
        let mut plant = builder.build().unwrap();

        let ids: Vec<_> = plant.resources().map(|(id, _)| id).collect();
        for id in ids {
            plant.apply(id, Setpoint::Halt).unwrap();
        }

        let (drive, _) = plant.resources().next().unwrap();
        plant
            .apply(drive, Setpoint::Pose(Pose::new(3.0, 3.0, 0.0)))
            .unwrap();
        plant.step_simulation(Duration::from_millis(100));
        let pose = plant.pose(drive).unwrap();
        assert!(pose.x.abs() < f64::EPSILON);
        assert!(!plant.detected("intake_beam"));
    }

    #[test]
    fn duplicate_identifier_surfaces_at_build() {
        let result = PlantBuilder::new(Mode::Sim)
            .with_roller("intake")
            .with_roller("intake")
            .build();
        assert!(matches!(result, Err(TactusError::DuplicateMechanism(_))));
    }

    #[test]
    fn resource_indices_follow_declaration_order() {
        let plant = stock_builder(Mode::Sim).build().unwrap();
        let catalog: Vec<(usize, String)> = plant
            .resources()
            .map(|(id, name)| (id.index(), name.to_string()))
            .collect();
        assert_eq!(catalog[0], (0, "drivetrain".to_string()));
        assert_eq!(catalog[1], (1, "elevator".to_string()));
        assert_eq!(catalog[2], (2, "intake".to_string()));
    }
}
