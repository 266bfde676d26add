//! Tactus runtime – the assembled platform above the kernel.
//!
//! Where `tactus-kernel` is policy-free machinery (conditions, actions,
//! arbitration, the cycle loop), this crate is the opinionated layer that
//! turns it into a running robot:
//!
//! | Module             | Responsibility                                            |
//! |--------------------|-----------------------------------------------------------|
//! | [`config`]         | `tactus.toml` on-disk configuration plus env overrides    |
//! | [`telemetry`]      | `tracing` subscriber setup, compact or JSON               |
//! | [`goal`]           | [`ApplySetpoint`] – hold one setpoint on one mechanism    |
//! | [`seek`]           | [`SeekPose`] – drive at a pose and report convergence     |
//! | [`operator`]       | [`OperatorConsole`] – buttons and selectors as conditions |
//! | [`superstructure`] | [`Superstructure`] – the declarative mode machine         |
//! | [`overrun`]        | [`OverrunTracker`] – loop-period budget accounting        |
//! | [`runner`]         | [`Runner`] – physics and control stepping, paced or free  |
//! | [`wiring`]         | [`Robot`] – the standard platform assembled end to end    |

pub mod config;
pub mod goal;
pub mod operator;
pub mod overrun;
pub mod runner;
pub mod seek;
pub mod superstructure;
pub mod telemetry;
pub mod wiring;

pub use config::RobotConfig;
pub use goal::ApplySetpoint;
pub use operator::OperatorConsole;
pub use overrun::{LoopHealth, OverrunTracker};
pub use runner::Runner;
pub use seek::SeekPose;
pub use superstructure::{SuperHandle, Superstructure, SuperstructureBuilder};
pub use telemetry::init_telemetry;
pub use wiring::Robot;
