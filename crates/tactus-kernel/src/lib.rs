//! `tactus-kernel` – Reactive scheduling core
//!
//! The beat-keeper of Tactus. It does not decide what the robot wants; it
//! decides who may move, and when.
//!
//! # Modules
//!
//! - [`condition`] – [`Condition`][condition::Condition]:
//!   per-cycle boolean predicates over sampled signals, with and/or/negate
//!   combinators, rising/falling edge detection and duration debounce, all
//!   refreshed into one coherent snapshot at the top of each cycle.
//! - [`action`] – [`Action`][action::Action]:
//!   the capability interface every behavior implements
//!   (initialize/execute/is_finished/end plus declared resources and
//!   interruption policy), a deferred-operation context
//!   ([`CycleCx`][action::CycleCx]), and stock building blocks
//!   (run_once, run, wait_until, wait_secs, [`Sequence`][action::Sequence]).
//! - [`arbiter`] – [`Arbiter`][arbiter::Arbiter]:
//!   the exclusive-ownership ledger mapping mechanism resources to the one
//!   action commanding each, plus the per-resource default-action table.
//! - [`scheduler`] – [`Scheduler`][scheduler::Scheduler]:
//!   the fixed-period cooperative loop: condition refresh, binding edges,
//!   policy-based conflict resolution, one advance per active action,
//!   terminal retirement.
//! - [`convergence`] – [`ConvergenceMonitor`][convergence::ConvergenceMonitor]:
//!   turns a motion action's live tracking error into a freshness-checked
//!   within-tolerance [`Condition`][condition::Condition].

pub mod action;
pub mod arbiter;
pub mod condition;
pub mod convergence;
pub mod scheduler;

pub use action::{Action, CycleCx, Sequence, run, run_once, wait_secs, wait_until, with_policy};
pub use arbiter::Arbiter;
pub use condition::{Condition, Cycle};
pub use convergence::{ConvergenceMonitor, MotionFeedback};
pub use scheduler::Scheduler;
