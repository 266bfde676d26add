//! `tactus-hal` – Mechanism traits and the plant
//!
//! Where setpoints become device calls. The scheduling core never touches a
//! motor controller; it commands [`ResourceId`][tactus_types::ResourceId]
//! handles, and the plant translates.
//!
//! # Modules
//!
//! - [`servo`] – [`Servo`][servo::Servo]: position-controlled mechanisms
//!   (elevator carriage, arm joint).
//! - [`roller`] – [`Roller`][roller::Roller]: voltage-driven spinners
//!   (intake wheels, feeder belt).
//! - [`drivetrain`] – [`Drivetrain`][drivetrain::Drivetrain]: the mobile
//!   base, commanded in field-relative poses.
//! - [`proximity`] – [`Proximity`][proximity::Proximity]: object-presence
//!   sensors, read-only, with a shared [`ProximityLatch`][proximity::ProximityLatch]
//!   for simulation.
//! - [`plant`] – [`Plant`][plant::Plant]: the mechanism catalog and
//!   [`Setpoint`][tactus_types::Setpoint] dispatcher.
//! - [`sim`] – first-order simulated devices.
//! - [`builder`] – [`PlantBuilder`][builder::PlantBuilder]: mode-selected
//!   construction (simulated physics or inert offline stubs).

pub mod builder;
pub mod drivetrain;
pub mod plant;
pub mod proximity;
pub mod roller;
pub mod servo;
pub mod sim;

pub use builder::PlantBuilder;
pub use drivetrain::Drivetrain;
pub use plant::Plant;
pub use proximity::{Proximity, ProximityLatch};
pub use roller::Roller;
pub use servo::Servo;
