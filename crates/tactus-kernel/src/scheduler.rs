//! [`Scheduler`] – the fixed-period cooperative scheduling core.
//!
//! Owns every registered action, the condition roots, the bindings between
//! them, and the resource [`Arbiter`]. An external runner calls
//! [`Scheduler::run_cycle`] once per period; within a cycle the phases run
//! in a fixed order:
//!
//! 1. refresh every registered condition (one coherent snapshot);
//! 2. collect binding edges into schedule/cancel requests;
//! 3. resolve conflicts: cancellations, then explicit admissions by
//!    priority (declaration order breaks ties, and the cycle's winner keeps
//!    its claim against later requests in the same batch), then default
//!    re-admission for unowned resources;
//! 4. advance every active action exactly one step, then drain the
//!    schedule/cancel requests actions deferred through [`CycleCx`];
//! 5. retire actions that reached a terminal state this cycle.
//!
//! Admission consults the *owner's* declared [`InterruptPolicy`]: a
//! `CancelSelf` owner is cancelled synchronously (end-notified, resources
//! released) and the newcomer admitted the same cycle; a `CancelIncoming`
//! owner keeps running and the request is refused. Contention is never an
//! error.
//!
//! Configuration defects (unknown resources, duplicate defaults) surface as
//! [`TactusError`] at registration time, never mid-cycle.

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use tactus_types::{
    ActionId, ActionState, ActivationMode, InterruptPolicy, ResourceId, RunId, TactusError,
};

use crate::action::{Action, CycleCx, DeferredOp};
use crate::arbiter::Arbiter;
use crate::condition::{Condition, Cycle};

// ─────────────────────────────────────────────────────────────────────────────
// Internal entries
// ─────────────────────────────────────────────────────────────────────────────

struct Entry {
    action: Box<dyn Action>,
    state: ActionState,
    run: Option<RunId>,
    /// Declared resource set, cached (deduplicated) at registration.
    resources: Vec<ResourceId>,
    policy: InterruptPolicy,
    name: String,
}

struct Binding {
    condition: Condition,
    mode: ActivationMode,
    action: ActionId,
    priority: i32,
    seq: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Cooperative scheduler for condition-gated, resource-exclusive actions.
///
/// Single-threaded by contract; every mutation happens between or inside
/// [`run_cycle`][Scheduler::run_cycle] calls on the loop thread.
#[derive(Default)]
pub struct Scheduler {
    arbiter: Arbiter,
    entries: Vec<Entry>,
    bindings: Vec<Binding>,
    conditions: Vec<Condition>,
    cycle_index: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // ── construction surface ────────────────────────────────────────────────

    /// Register a mechanism resource. See [`Arbiter::register_resource`].
    ///
    /// # Errors
    ///
    /// [`TactusError::DuplicateMechanism`] when the name is taken.
    pub fn register_resource(
        &mut self,
        name: impl Into<String>,
    ) -> Result<ResourceId, TactusError> {
        self.arbiter.register_resource(name)
    }

    /// Look up a resource handle by name.
    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.arbiter.resource_id(name)
    }

    /// Printable name of `resource`.
    pub fn resource_name(&self, resource: ResourceId) -> String {
        self.arbiter.name(resource)
    }

    /// Hand an action to the scheduler and receive its handle.
    ///
    /// The declared resource set is validated and cached here; the set and
    /// the interruption policy are fixed for the life of the action.
    ///
    /// # Errors
    ///
    /// [`TactusError::UnknownResource`] when the action claims a resource
    /// that was never registered.
    pub fn register(&mut self, action: Box<dyn Action>) -> Result<ActionId, TactusError> {
        let declared = action.resources().to_vec();
        self.arbiter.validate(&declared)?;

        let mut resources: Vec<ResourceId> = Vec::new();
        for r in declared {
            if !resources.contains(&r) {
                resources.push(r);
            }
        }

        let policy = action.interrupt_policy();
        let name = action.name().to_string();
        let id = ActionId::new(self.entries.len());
        debug!(action = %name, id = %id, "action registered");
        self.entries.push(Entry {
            action,
            state: ActionState::Idle,
            run: None,
            resources,
            policy,
            name,
        });
        Ok(id)
    }

    /// Register `action` as the default for `resource`, auto-admitted
    /// whenever the resource has no explicit claimant.
    ///
    /// # Errors
    ///
    /// [`TactusError::UnknownAction`] for an unregistered handle,
    /// [`TactusError::DefaultNotClaiming`] when the action does not declare
    /// `resource`, and [`TactusError::DuplicateDefault`] when the resource
    /// already has a default.
    pub fn set_default_action(
        &mut self,
        resource: ResourceId,
        action: ActionId,
    ) -> Result<(), TactusError> {
        let entry = self
            .entries
            .get(action.index())
            .ok_or_else(|| TactusError::UnknownAction(action.to_string()))?;
        if !entry.resources.contains(&resource) {
            return Err(TactusError::DefaultNotClaiming {
                action: entry.name.clone(),
                resource: self.arbiter.name(resource),
            });
        }
        if entry.policy == InterruptPolicy::CancelIncoming {
            warn!(
                action = %entry.name,
                "default action refuses interruption; explicit requests on this resource will never win"
            );
        }
        if entry.resources.len() > 1 {
            warn!(
                action = %entry.name,
                "default action claims several resources; it is only admitted when all of them are free"
            );
        }
        self.arbiter.set_default(resource, action)
    }

    /// Register a condition root for the per-cycle refresh.
    ///
    /// Bindings register their conditions automatically; call this for
    /// conditions read only through [`Condition::value`] (the orchestrator's
    /// transition gates, for example). Registering the same node twice is a
    /// no-op.
    pub fn add_condition(&mut self, condition: &Condition) {
        let ptr = condition.node_ptr();
        if self.conditions.iter().all(|c| c.node_ptr() != ptr) {
            self.conditions.push(condition.clone());
        }
    }

    /// Bind `condition` to `action` with declaration-order priority.
    ///
    /// # Errors
    ///
    /// [`TactusError::UnknownAction`] for an unregistered handle.
    pub fn bind(
        &mut self,
        condition: &Condition,
        mode: ActivationMode,
        action: ActionId,
    ) -> Result<(), TactusError> {
        self.bind_prioritized(condition, mode, action, 0)
    }

    /// Bind with an explicit priority. Among requests that rise in the same
    /// cycle, higher priority wins a conflict; ties fall back to declaration
    /// order.
    ///
    /// # Errors
    ///
    /// [`TactusError::UnknownAction`] for an unregistered handle.
    pub fn bind_prioritized(
        &mut self,
        condition: &Condition,
        mode: ActivationMode,
        action: ActionId,
        priority: i32,
    ) -> Result<(), TactusError> {
        if action.index() >= self.entries.len() {
            return Err(TactusError::UnknownAction(action.to_string()));
        }
        self.add_condition(condition);
        let seq = self.bindings.len();
        self.bindings.push(Binding {
            condition: condition.clone(),
            mode,
            action,
            priority,
            seq,
        });
        Ok(())
    }

    // ── queries ─────────────────────────────────────────────────────────────

    /// Lifecycle state of `action`; `Idle` for unknown handles.
    pub fn action_state(&self, action: ActionId) -> ActionState {
        self.entries
            .get(action.index())
            .map(|e| e.state)
            .unwrap_or(ActionState::Idle)
    }

    /// Registered name of `action`, for telemetry.
    pub fn action_name(&self, action: ActionId) -> Option<&str> {
        self.entries.get(action.index()).map(|e| e.name.as_str())
    }

    /// Identity of the current scheduling instance, while one is active.
    pub fn run_id(&self, action: ActionId) -> Option<RunId> {
        self.entries.get(action.index()).and_then(|e| e.run)
    }

    /// Current owner of `resource`, if any.
    pub fn owner(&self, resource: ResourceId) -> Option<ActionId> {
        self.arbiter.owner(resource)
    }

    /// Default action registered for `resource`, if any.
    pub fn default_action(&self, resource: ResourceId) -> Option<ActionId> {
        self.arbiter.default_for(resource)
    }

    /// Index of the most recently completed cycle (0 before the first).
    pub fn cycle_index(&self) -> u64 {
        self.cycle_index
    }

    // ── scheduling surface ──────────────────────────────────────────────────

    /// Request admission of `action` now.
    ///
    /// Returns `true` when the action is active afterwards (admitted here,
    /// or already active). A refusal by a `CancelIncoming` owner returns
    /// `false` and changes nothing.
    pub fn schedule(&mut self, action: ActionId) -> bool {
        self.try_admit(action)
    }

    /// Cancel `action` if it is active: `end(true)` runs, its resources are
    /// released synchronously, and its state becomes `Cancelled`. No-ops on
    /// inactive actions.
    pub fn cancel(&mut self, action: ActionId) {
        self.cancel_active(action);
    }

    /// Run one control cycle. `dt` is the time since the previous cycle and
    /// feeds time-based conditions and actions.
    pub fn run_cycle(&mut self, dt: Duration) {
        self.cycle_index += 1;
        let cycle = Cycle {
            index: self.cycle_index,
            dt,
        };

        // 1. One coherent condition snapshot for everything downstream.
        for condition in &self.conditions {
            condition.update(cycle);
        }

        // 2. Binding edges become requests; nothing is applied yet.
        let mut cancels: Vec<ActionId> = Vec::new();
        let mut requests: Vec<(i32, usize, ActionId)> = Vec::new();
        for b in &self.bindings {
            match b.mode {
                ActivationMode::OnTrue => {
                    if b.condition.rose() {
                        requests.push((b.priority, b.seq, b.action));
                    }
                }
                ActivationMode::OnFalse => {
                    if b.condition.fell() {
                        requests.push((b.priority, b.seq, b.action));
                    }
                }
                ActivationMode::WhileTrue => {
                    if b.condition.rose() {
                        requests.push((b.priority, b.seq, b.action));
                    } else if b.condition.fell() {
                        cancels.push(b.action);
                    }
                }
            }
        }

        // 3. Cancellations first, then admissions (priority desc, then
        //    declaration order), then defaults for whatever is left unowned.
        //    A request that lost this cycle's batch to a higher-priority
        //    winner is dropped outright; interruption policy only governs
        //    takeovers from owners established in earlier cycles.
        for id in cancels {
            self.cancel_active(id);
        }
        requests.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let mut batch_claimed: Vec<ResourceId> = Vec::new();
        for (_, _, id) in requests {
            let Some(entry) = self.entries.get(id.index()) else {
                continue;
            };
            if entry.state.is_active() {
                continue;
            }
            if entry.resources.iter().any(|r| batch_claimed.contains(r)) {
                debug!(
                    action = %entry.name,
                    "simultaneous request lost to a higher-priority binding"
                );
                continue;
            }
            let resources = entry.resources.clone();
            if self.try_admit(id) {
                batch_claimed.extend(resources);
            }
        }
        self.admit_defaults();

        // 4. Advance. Actions admitted in earlier phases advance this cycle;
        //    actions admitted from the deferred drain below start next cycle.
        let mut cx = CycleCx::new(cycle);
        for i in 0..self.entries.len() {
            match self.entries[i].state {
                ActionState::Initializing => self.entries[i].state = ActionState::Running,
                ActionState::Running => {}
                _ => continue,
            }
            let entry = &mut self.entries[i];
            entry.action.execute(&mut cx);
            if entry.action.is_finished() {
                entry.action.end(false);
                entry.state = ActionState::Finished;
                let id = ActionId::new(i);
                self.arbiter.release_all(id);
                info!(action = %self.entries[i].name, "action finished");
            }
        }
        for op in cx.take_ops() {
            match op {
                DeferredOp::Schedule(id) => {
                    self.try_admit(id);
                }
                DeferredOp::Cancel(id) => self.cancel_active(id),
            }
        }

        // 5. Retire. Terminal states stay visible until the next admission;
        //    only the run identity is dropped.
        for entry in &mut self.entries {
            if entry.state.is_terminal() && entry.run.is_some() {
                debug!(action = %entry.name, state = %entry.state, "action retired");
                entry.run = None;
            }
        }
    }

    // ── internals ───────────────────────────────────────────────────────────

    fn try_admit(&mut self, id: ActionId) -> bool {
        let Some(entry) = self.entries.get(id.index()) else {
            warn!(id = %id, "schedule request for unregistered action");
            return false;
        };
        if entry.state.is_active() {
            return true;
        }

        let resources = entry.resources.clone();
        let holders = self.arbiter.conflicts(&resources);
        for holder in &holders {
            if self.entries[holder.index()].policy == InterruptPolicy::CancelIncoming {
                debug!(
                    incoming = %self.entries[id.index()].name,
                    owner = %self.entries[holder.index()].name,
                    "request refused: owner keeps its resources"
                );
                return false;
            }
        }
        for holder in holders {
            self.cancel_active(holder);
        }

        self.arbiter.claim(id, &resources);
        let run = Uuid::new_v4();
        let entry = &mut self.entries[id.index()];
        entry.state = ActionState::Initializing;
        entry.run = Some(run);
        entry.action.initialize();
        info!(action = %entry.name, run = %run, "action admitted");
        true
    }

    fn cancel_active(&mut self, id: ActionId) {
        let Some(entry) = self.entries.get_mut(id.index()) else {
            return;
        };
        if !entry.state.is_active() {
            return;
        }
        entry.action.end(true);
        entry.state = ActionState::Cancelled;
        info!(action = %entry.name, "action cancelled");
        self.arbiter.release_all(id);
    }

    fn admit_defaults(&mut self) {
        for resource in self.arbiter.unowned() {
            let Some(default) = self.arbiter.default_for(resource) else {
                continue;
            };
            if self.entries[default.index()].state.is_active() {
                continue;
            }
            // Lowest priority: a default never displaces anyone, so it is
            // admitted only when its whole resource set is free.
            if self
                .arbiter
                .conflicts(&self.entries[default.index()].resources)
                .is_empty()
            {
                self.try_admit(default);
            }
        }
    }
}
