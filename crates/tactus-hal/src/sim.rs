//! Simulated mechanism physics.
//!
//! Every device here integrates a simple first-order model in `step`: the
//! servo and the drivetrain slew toward their targets at a fixed rate, the
//! roller applies voltage instantly, and the proximity sensor reads a shared
//! [`ProximityLatch`] that scenario code flips from outside the plant.
//! Enough to exercise convergence detection and the full scheduling stack
//! without hardware; not a dynamics simulation.

use std::time::Duration;

use tactus_types::{Pose, TactusError, wrap_angle};

use crate::drivetrain::Drivetrain;
use crate::proximity::{Proximity, ProximityLatch};
use crate::roller::Roller;
use crate::servo::Servo;

// ────────────────────────────────────────────────────────────────────────────
// Simulated servo
// ────────────────────────────────────────────────────────────────────────────

/// Position mechanism that slews toward its target at a fixed rate.
pub struct SimServo {
    id: String,
    position: f64,
    target: f64,
    /// Travel rate in mechanism units per second.
    rate: f64,
}

impl SimServo {
    pub fn new(id: impl Into<String>, rate: f64) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            position: 0.0,
            target: 0.0,
            rate,
        })
    }
}

impl Servo for SimServo {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_target(&mut self, target: f64) -> Result<(), TactusError> {
        self.target = target;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn halt(&mut self) {
        self.target = self.position;
    }

    fn step(&mut self, dt: Duration) {
        let max_step = self.rate * dt.as_secs_f64();
        let delta = self.target - self.position;
        if delta.abs() <= max_step {
            self.position = self.target;
        } else {
            self.position += max_step.copysign(delta);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated roller
// ────────────────────────────────────────────────────────────────────────────

/// Voltage mechanism with no inertia: the commanded voltage is the output.
pub struct SimRoller {
    id: String,
    volts: f64,
}

impl SimRoller {
    pub fn new(id: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            volts: 0.0,
        })
    }
}

impl Roller for SimRoller {
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

// ────────────────────────────────────────────────────────────────────────────
// Simulated drivetrain
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum DriveCommand {
    Hold,
    Seek(Pose),
    Cruise(f64),
}

/// Mobile base that translates toward its target at `linear_rate` and turns
/// toward the target heading at `angular_rate`, both capped per step.
/// Heading always takes the short way around.
pub struct SimDrivetrain {
    id: String,
    pose: Pose,
    command: DriveCommand,
    /// Meters per second.
    linear_rate: f64,
    /// Radians per second.
    angular_rate: f64,
}

impl SimDrivetrain {
    pub fn new(id: impl Into<String>, linear_rate: f64, angular_rate: f64) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            pose: Pose::ZERO,
            command: DriveCommand::Hold,
            linear_rate,
            angular_rate,
        })
    }
}

impl Drivetrain for SimDrivetrain {
    fn id(&self) -> &str {
        &self.id
    }

    fn seek(&mut self, target: Pose) -> Result<(), TactusError> {
        self.command = DriveCommand::Seek(target);
        Ok(())
    }

    fn cruise(&mut self, linear: f64) -> Result<(), TactusError> {
        self.command = DriveCommand::Cruise(linear);
        Ok(())
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn halt(&mut self) {
        self.command = DriveCommand::Hold;
    }

    fn step(&mut self, dt: Duration) {
        match self.command {
            DriveCommand::Hold => {}
            DriveCommand::Seek(target) => {
                let dist = self.pose.distance_to(&target);
                let max_lin = self.linear_rate * dt.as_secs_f64();
                if dist <= max_lin {
                    self.pose.x = target.x;
                    self.pose.y = target.y;
                } else {
                    let scale = max_lin / dist;
                    self.pose.x += (target.x - self.pose.x) * scale;
                    self.pose.y += (target.y - self.pose.y) * scale;
                }

                let heading_err = wrap_angle(target.heading_rad - self.pose.heading_rad);
                let max_ang = self.angular_rate * dt.as_secs_f64();
                if heading_err.abs() <= max_ang {
                    self.pose.heading_rad = target.heading_rad;
                } else {
                    self.pose.heading_rad =
                        wrap_angle(self.pose.heading_rad + max_ang.copysign(heading_err));
                }
            }
            DriveCommand::Cruise(linear) => {
                let travel = linear * dt.as_secs_f64();
                self.pose.x += travel * self.pose.heading_rad.cos();
                self.pose.y += travel * self.pose.heading_rad.sin();
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated proximity sensor
// ────────────────────────────────────────────────────────────────────────────

/// Beam-break sensor backed by a [`ProximityLatch`].  Construction returns
/// the sensor together with a latch clone so scenario code can place and
/// remove the object.
pub struct SimProximity {
    id: String,
    latch: ProximityLatch,
}

impl SimProximity {
    pub fn new(id: impl Into<String>) -> (Box<Self>, ProximityLatch) {
        let latch = ProximityLatch::new();
        let sensor = Box::new(Self {
            id: id.into(),
            latch: latch.clone(),
        });
        (sensor, latch)
    }
}

impl Proximity for SimProximity {
    fn id(&self) -> &str {
        &self.id
    }

    fn detected(&self) -> bool {
        self.latch.get()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Duration = Duration::from_millis(250);

    #[test]
    fn sim_servo_slews_at_its_rate() {
        let mut servo = SimServo::new("elevator", 1.0);
        servo.set_target(1.0).unwrap();

        servo.step(DT);
        assert!((servo.position() - 0.25).abs() < 1e-9);

        for _ in 0..3 {
            servo.step(DT);
        }
        assert!((servo.position() - 1.0).abs() < 1e-9);

        // Settled: further steps do not overshoot.
        servo.step(DT);
        assert!((servo.position() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sim_servo_halt_holds_mid_travel() {
        let mut servo = SimServo::new("elevator", 1.0);
        servo.set_target(1.0).unwrap();
        servo.step(DT);

        servo.halt();
        servo.step(DT);
        servo.step(DT);
        assert!((servo.position() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn sim_roller_applies_voltage_instantly() {
        let mut roller = SimRoller::new("intake");
        roller.set_voltage(-6.0).unwrap();
        assert!((roller.voltage() - (-6.0)).abs() < f64::EPSILON);
        roller.halt();
        assert!(roller.voltage().abs() < f64::EPSILON);
    }

    #[test]
    fn sim_drivetrain_converges_on_pose() {
        let mut drive = SimDrivetrain::new("drivetrain", 1.0, 1.0);
        drive.seek(Pose::new(1.0, 0.0, 0.5)).unwrap();

        for _ in 0..4 {
            drive.step(DT);
        }
        let pose = drive.pose();
        assert!(pose.distance_to(&Pose::new(1.0, 0.0, 0.5)) < 1e-9);
        assert!((pose.heading_rad - 0.5).abs() < 1e-9);
    }

    #[test]
    fn sim_drivetrain_turns_the_short_way() {
        let mut drive = SimDrivetrain::new("drivetrain", 1.0, 1.0);
        drive.seek(Pose::new(0.0, 0.0, 3.0)).unwrap();
        for _ in 0..16 {
            drive.step(DT);
        }
        assert!((drive.pose().heading_rad - 3.0).abs() < 1e-9);

        // +3 rad to -3 rad is a 0.28 rad hop across pi, not a 6 rad sweep
        // back through zero.
        drive.seek(Pose::new(0.0, 0.0, -3.0)).unwrap();
        for _ in 0..2 {
            drive.step(DT);
        }
        assert!((drive.pose().heading_rad - (-3.0)).abs() < 1e-9);
    }

    #[test]
    fn sim_drivetrain_cruises_along_heading() {
        let mut drive = SimDrivetrain::new("drivetrain", 1.0, 1.0);
        drive.cruise(0.8).unwrap();
        for _ in 0..4 {
            drive.step(DT);
        }
        let pose = drive.pose();
        assert!((pose.x - 0.8).abs() < 1e-9);
        assert!(pose.y.abs() < 1e-9);
    }

    #[test]
    fn sim_drivetrain_halt_drops_target() {
        let mut drive = SimDrivetrain::new("drivetrain", 1.0, 1.0);
        drive.seek(Pose::new(4.0, 0.0, 0.0)).unwrap();
        drive.step(DT);
        let mid = drive.pose();

        drive.halt();
        drive.step(DT);
        assert!((drive.pose().x - mid.x).abs() < 1e-9);
    }

    #[test]
    fn sim_proximity_reflects_latch() {
        let (mut beam, latch) = SimProximity::new("intake_beam");
        assert!(!beam.detected());

        latch.set(true);
        assert!(beam.detected());

        beam.step(DT);
        latch.set(false);
        assert!(!beam.detected());
    }
}
