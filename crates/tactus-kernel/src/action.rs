//! Action capability interface and stock behaviors.
//!
//! An [`Action`] is a resumable behavior advanced one step per control cycle
//! by the scheduler: hardware goals, waits, and whole state machines all
//! implement the same five-verb surface, so the scheduler never knows which
//! concrete variant (simulated, offline, composite) it is driving.
//!
//! # Stock actions
//!
//! | Constructor    | Behavior                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`run_once`]   | Runs a closure at admission, finishes on the next advance |
//! | [`run`]        | Runs a closure every cycle, never finishes                |
//! | [`wait_until`] | Finishes once a predicate reads true                      |
//! | [`wait_secs`]  | Finishes after a wall-time duration of advances           |
//! | [`Sequence`]   | Runs children back to back, claiming the resource union   |
//! | [`with_policy`]| Wraps an action with a different interruption policy      |
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tactus_kernel::action::{Action, wait_until};
//!
//! let ready = Rc::new(Cell::new(false));
//! let r = ready.clone();
//! let mut gate = wait_until("sensor_ready", move || r.get());
//!
//! gate.initialize();
//! assert!(!gate.is_finished());
//! ready.set(true);
//! assert!(gate.is_finished());
//! ```

use std::time::Duration;

use tactus_types::{ActionId, InterruptPolicy, ResourceId};

use crate::condition::Cycle;

// ─────────────────────────────────────────────────────────────────────────────
// CycleCx
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduler operation requested by an action mid-cycle.
///
/// Applied after the advance phase so an executing action never re-enters
/// the scheduler that is iterating over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferredOp {
    Schedule(ActionId),
    Cancel(ActionId),
}

/// Per-cycle context handed to [`Action::execute`].
///
/// Carries the evaluation clock and collects deferred schedule/cancel
/// requests (the orchestrator issues its goal actions through these).
pub struct CycleCx {
    cycle: Cycle,
    ops: Vec<DeferredOp>,
}

impl CycleCx {
    pub(crate) fn new(cycle: Cycle) -> Self {
        CycleCx {
            cycle,
            ops: Vec::new(),
        }
    }

    /// The current evaluation clock.
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Time step since the previous cycle.
    pub fn dt(&self) -> Duration {
        self.cycle.dt
    }

    /// Request that `id` be scheduled once this cycle's advance completes.
    pub fn schedule(&mut self, id: ActionId) {
        self.ops.push(DeferredOp::Schedule(id));
    }

    /// Request that `id` be cancelled once this cycle's advance completes.
    pub fn cancel(&mut self, id: ActionId) {
        self.ops.push(DeferredOp::Cancel(id));
    }

    pub(crate) fn take_ops(&mut self) -> Vec<DeferredOp> {
        std::mem::take(&mut self.ops)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action
// ─────────────────────────────────────────────────────────────────────────────

/// A resumable behavior advanced one step per cycle.
///
/// The declared resource set and interruption policy are fixed for the life
/// of the action; the scheduler validates the resource set at registration.
/// Lifecycle verbs must return promptly every cycle (no blocking, no
/// spinning) and must not panic: anything fallible belongs in the
/// constructor.
///
/// `end(true)` means cancelled; actions that command mechanisms leave them
/// in a safe idle output before returning.
pub trait Action {
    /// Human-readable name carried into log events.
    fn name(&self) -> &str;

    /// Mechanism resources this action claims exclusively while active.
    fn resources(&self) -> &[ResourceId];

    /// How conflicts are resolved while this action owns its resources.
    fn interrupt_policy(&self) -> InterruptPolicy {
        InterruptPolicy::CancelSelf
    }

    /// Called once at admission, before the first advance.
    fn initialize(&mut self) {}

    /// Called once per cycle while running.
    fn execute(&mut self, cx: &mut CycleCx);

    /// Checked after each advance; `true` completes the action this cycle.
    fn is_finished(&self) -> bool {
        false
    }

    /// Called exactly once when the action finishes (`cancelled == false`)
    /// or is cancelled (`cancelled == true`).
    fn end(&mut self, cancelled: bool) {
        let _ = cancelled;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stock actions
// ─────────────────────────────────────────────────────────────────────────────

struct RunOnce {
    name: String,
    resources: Vec<ResourceId>,
    body: Box<dyn FnMut()>,
}

impl Action for RunOnce {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    fn initialize(&mut self) {
        (self.body)();
    }

    fn execute(&mut self, _cx: &mut CycleCx) {}

    fn is_finished(&self) -> bool {
        true
    }
}

/// Run `body` once at admission, then finish on the first advance.
pub fn run_once(
    name: impl Into<String>,
    resources: Vec<ResourceId>,
    body: impl FnMut() + 'static,
) -> Box<dyn Action> {
    Box::new(RunOnce {
        name: name.into(),
        resources,
        body: Box::new(body),
    })
}

struct RunForever {
    name: String,
    resources: Vec<ResourceId>,
    body: Box<dyn FnMut()>,
}

impl Action for RunForever {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    fn execute(&mut self, _cx: &mut CycleCx) {
        (self.body)();
    }
}

/// Run `body` every cycle until cancelled. The usual shape of a default
/// action.
pub fn run(
    name: impl Into<String>,
    resources: Vec<ResourceId>,
    body: impl FnMut() + 'static,
) -> Box<dyn Action> {
    Box::new(RunForever {
        name: name.into(),
        resources,
        body: Box::new(body),
    })
}

struct WaitUntil {
    name: String,
    predicate: Box<dyn Fn() -> bool>,
}

impl Action for WaitUntil {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> &[ResourceId] {
        &[]
    }

    fn execute(&mut self, _cx: &mut CycleCx) {}

    fn is_finished(&self) -> bool {
        (self.predicate)()
    }
}

/// Claim nothing and finish once `predicate` reads true.
///
/// The predicate samples signals directly; it is the action's own completion
/// test, not a registered condition.
pub fn wait_until(
    name: impl Into<String>,
    predicate: impl Fn() -> bool + 'static,
) -> Box<dyn Action> {
    Box::new(WaitUntil {
        name: name.into(),
        predicate: Box::new(predicate),
    })
}

struct WaitSecs {
    name: String,
    duration: Duration,
    elapsed: Duration,
}

impl Action for WaitSecs {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> &[ResourceId] {
        &[]
    }

    fn initialize(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn execute(&mut self, cx: &mut CycleCx) {
        self.elapsed = self.elapsed.saturating_add(cx.dt());
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Claim nothing and finish once `duration` of advances has accumulated.
/// Rescheduling restarts the clock.
pub fn wait_secs(name: impl Into<String>, duration: Duration) -> Box<dyn Action> {
    Box::new(WaitSecs {
        name: name.into(),
        duration,
        elapsed: Duration::ZERO,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Sequence
// ─────────────────────────────────────────────────────────────────────────────

/// Runs child actions back to back as one schedulable unit.
///
/// The sequence claims the union of its children's resources for its whole
/// duration, so mid-sequence steps can never lose a mechanism to arbitration.
/// Cancelling the sequence cancels whichever child is current.
pub struct Sequence {
    name: String,
    resources: Vec<ResourceId>,
    children: Vec<Box<dyn Action>>,
    current: usize,
}

impl Sequence {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Action>>) -> Self {
        let mut resources: Vec<ResourceId> = Vec::new();
        for child in &children {
            for r in child.resources() {
                if !resources.contains(r) {
                    resources.push(*r);
                }
            }
        }
        Sequence {
            name: name.into(),
            resources,
            children,
            current: 0,
        }
    }
}

impl Action for Sequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    fn initialize(&mut self) {
        self.current = 0;
        if let Some(first) = self.children.first_mut() {
            first.initialize();
        }
    }

    fn execute(&mut self, cx: &mut CycleCx) {
        let Some(child) = self.children.get_mut(self.current) else {
            return;
        };
        child.execute(cx);
        if child.is_finished() {
            child.end(false);
            self.current += 1;
            if let Some(next) = self.children.get_mut(self.current) {
                next.initialize();
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.current >= self.children.len()
    }

    fn end(&mut self, cancelled: bool) {
        if cancelled
            && let Some(child) = self.children.get_mut(self.current)
        {
            child.end(true);
        }
    }
}

struct PolicyOverride {
    inner: Box<dyn Action>,
    policy: InterruptPolicy,
}

impl Action for PolicyOverride {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn resources(&self) -> &[ResourceId] {
        self.inner.resources()
    }

    fn interrupt_policy(&self) -> InterruptPolicy {
        self.policy
    }

    fn initialize(&mut self) {
        self.inner.initialize();
    }

    fn execute(&mut self, cx: &mut CycleCx) {
        self.inner.execute(cx);
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    fn end(&mut self, cancelled: bool) {
        self.inner.end(cancelled);
    }
}

/// Wrap `inner` with a different interruption policy, leaving everything
/// else untouched.
pub fn with_policy(inner: Box<dyn Action>, policy: InterruptPolicy) -> Box<dyn Action> {
    Box::new(PolicyOverride { inner, policy })
}
