//! [`Superstructure`] – the mechanism-coordinating state machine.
//!
//! A zero-resource action hosting the robot's top-level FSM. Each cycle it
//! commits at most one transition: a pending forced override first,
//! otherwise the first declared transition whose gate reads true this cycle.
//! It then asserts the current state's goal set through deferred scheduler
//! ops: goals belonging to the state are scheduled when not already active,
//! goals belonging to other states are cancelled. A mechanism with no goal
//! in the current state falls to its per-resource default through ordinary
//! arbitration.
//!
//! Because goals are re-asserted every cycle, a goal displaced out of band
//! is re-admitted on the next advance; the machine heals itself instead of
//! silently losing a mechanism.
//!
//! The [`SuperHandle`] is the external view: current state, forced override
//! requests, and the committed transition history.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::Utc;
use tracing::{debug, info};

use tactus_kernel::{Action, Condition, CycleCx, Scheduler};
use tactus_types::{ActionId, ResourceId, SuperState, TactusError, TransitionRecord};

// ─────────────────────────────────────────────────────────────────────────────
// SuperHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Shared view of the superstructure. Cheap to clone; clones observe and
/// steer the same machine.
#[derive(Clone)]
pub struct SuperHandle {
    state: Rc<Cell<SuperState>>,
    forced: Rc<Cell<Option<SuperState>>>,
    history: Rc<RefCell<Vec<TransitionRecord>>>,
}

impl SuperHandle {
    fn new() -> Self {
        SuperHandle {
            state: Rc::new(Cell::new(SuperState::Idle)),
            forced: Rc::new(Cell::new(None)),
            history: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// The state the machine is currently in.
    pub fn state(&self) -> SuperState {
        self.state.get()
    }

    /// Request a forced jump to `state`, bypassing the declared gates.
    ///
    /// Consumed at the machine's next advance, so it takes effect within one
    /// cycle. Forcing the current state is ignored. A second force before
    /// the next cycle replaces the first.
    pub fn force(&self, state: SuperState) {
        info!(state = %state, "forced state requested");
        self.forced.set(Some(state));
    }

    /// Every committed transition, oldest first.
    pub fn history(&self) -> Vec<TransitionRecord> {
        self.history.borrow().clone()
    }

    /// The most recently committed transition.
    pub fn last_transition(&self) -> Option<TransitionRecord> {
        self.history.borrow().last().cloned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Superstructure
// ─────────────────────────────────────────────────────────────────────────────

struct Transition {
    from: SuperState,
    to: SuperState,
    gate: Condition,
}

/// Declarative builder: transitions in priority order, goals per state.
#[derive(Default)]
pub struct SuperstructureBuilder {
    transitions: Vec<Transition>,
    goals: Vec<(SuperState, ActionId)>,
}

impl SuperstructureBuilder {
    /// Declare a transition. Within one cycle, earlier declarations win when
    /// several gates read true from the same state.
    pub fn with_transition(mut self, from: SuperState, gate: &Condition, to: SuperState) -> Self {
        self.transitions.push(Transition {
            from,
            to,
            gate: gate.clone(),
        });
        self
    }

    /// Keep `action` scheduled whenever the machine is in `state`.
    ///
    /// An action listed under several states keeps running across those
    /// transitions without being re-initialized.
    pub fn with_goal(mut self, state: SuperState, action: ActionId) -> Self {
        self.goals.push((state, action));
        self
    }

    /// Register the machine with `scheduler` and start it.
    ///
    /// Transition gates join the per-cycle condition refresh; the machine
    /// itself is admitted immediately (it claims no resources and can never
    /// lose arbitration).
    ///
    /// # Errors
    ///
    /// [`TactusError::UnknownAction`] when a goal handle was never
    /// registered.
    pub fn register(self, scheduler: &mut Scheduler) -> Result<SuperHandle, TactusError> {
        for (_, id) in &self.goals {
            if scheduler.action_name(*id).is_none() {
                return Err(TactusError::UnknownAction(id.to_string()));
            }
        }
        for t in &self.transitions {
            scheduler.add_condition(&t.gate);
        }

        let mut all_goals: Vec<ActionId> = Vec::new();
        for (_, id) in &self.goals {
            if !all_goals.contains(id) {
                all_goals.push(*id);
            }
        }

        let handle = SuperHandle::new();
        let machine = Superstructure {
            handle: handle.clone(),
            transitions: self.transitions,
            goals: self.goals,
            all_goals,
        };
        let id = scheduler.register(Box::new(machine))?;
        scheduler.schedule(id);
        Ok(handle)
    }
}

/// The state machine itself, advanced by the scheduler like any action.
pub struct Superstructure {
    handle: SuperHandle,
    transitions: Vec<Transition>,
    goals: Vec<(SuperState, ActionId)>,
    all_goals: Vec<ActionId>,
}

impl Superstructure {
    pub fn builder() -> SuperstructureBuilder {
        SuperstructureBuilder::default()
    }

    fn wanted(&self, state: SuperState, id: ActionId) -> bool {
        self.goals.iter().any(|&(s, g)| s == state && g == id)
    }
}

impl Action for Superstructure {
    fn name(&self) -> &str {
        "superstructure"
    }

    fn resources(&self) -> &[ResourceId] {
        &[]
    }

    fn execute(&mut self, cx: &mut CycleCx) {
        let current = self.handle.state.get();
        let committed = if let Some(target) = self.handle.forced.take() {
            if target == current {
                debug!(state = %current, "forced state equals current state; ignored");
                None
            } else {
                Some((target, true))
            }
        } else {
            self.transitions
                .iter()
                .find(|t| t.from == current && t.gate.value())
                .map(|t| (t.to, false))
        };

        if let Some((to, forced)) = committed {
            info!(from = %current, to = %to, forced, "superstructure transition");
            self.handle.state.set(to);
            self.handle.history.borrow_mut().push(TransitionRecord {
                at: Utc::now(),
                cycle: cx.cycle().index,
                from: current,
                to,
                forced,
            });
        }

        // Cancels drain before schedules, so a mechanism changing hands is
        // released before its next goal claims it.
        let state = self.handle.state.get();
        for &id in &self.all_goals {
            if !self.wanted(state, id) {
                cx.cancel(id);
            }
        }
        for &(s, id) in &self.goals {
            if s == state {
                cx.schedule(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tactus_kernel::run;
    use tactus_types::ActionState;

    const DT: Duration = Duration::from_millis(20);

    fn flag() -> (Rc<Cell<bool>>, Condition) {
        let cell = Rc::new(Cell::new(false));
        let c = cell.clone();
        (cell, Condition::probe("flag", move || c.get()))
    }

    #[test]
    fn declared_transition_fires_and_is_recorded() {
        let mut sched = Scheduler::new();
        let drive = sched.register_resource("drive").unwrap();
        let seek = sched.register(run("seek", vec![drive], || {})).unwrap();
        let (go, gate) = flag();

        let handle = Superstructure::builder()
            .with_transition(SuperState::Idle, &gate, SuperState::Seeking)
            .with_goal(SuperState::Seeking, seek)
            .register(&mut sched)
            .unwrap();

        sched.run_cycle(DT);
        assert_eq!(handle.state(), SuperState::Idle);
        assert!(handle.history().is_empty());

        go.set(true);
        sched.run_cycle(DT);
        assert_eq!(handle.state(), SuperState::Seeking);
        assert_eq!(sched.owner(drive), Some(seek));

        let record = handle.last_transition().unwrap();
        assert_eq!(record.from, SuperState::Idle);
        assert_eq!(record.to, SuperState::Seeking);
        assert_eq!(record.cycle, 2);
        assert!(!record.forced);
    }

    #[test]
    fn one_transition_per_cycle_in_declaration_order() {
        let mut sched = Scheduler::new();
        let (go, gate) = flag();

        let handle = Superstructure::builder()
            .with_transition(SuperState::Idle, &gate, SuperState::Seeking)
            .with_transition(SuperState::Idle, &gate, SuperState::Holding)
            .with_transition(SuperState::Seeking, &gate, SuperState::Holding)
            .register(&mut sched)
            .unwrap();

        go.set(true);
        sched.run_cycle(DT);
        // Both Idle transitions were eligible; the first declared won, and
        // the Seeking chain had to wait for the next cycle.
        assert_eq!(handle.state(), SuperState::Seeking);
        sched.run_cycle(DT);
        assert_eq!(handle.state(), SuperState::Holding);
        assert_eq!(handle.history().len(), 2);
    }

    #[test]
    fn forced_override_wins_within_one_cycle() {
        let mut sched = Scheduler::new();
        let drive = sched.register_resource("drive").unwrap();
        let seek = sched.register(run("seek", vec![drive], || {})).unwrap();
        let (go, go_gate) = flag();
        let (done, done_gate) = flag();

        let handle = Superstructure::builder()
            .with_transition(SuperState::Idle, &go_gate, SuperState::Seeking)
            .with_transition(SuperState::Seeking, &done_gate, SuperState::Holding)
            .with_goal(SuperState::Seeking, seek)
            .register(&mut sched)
            .unwrap();

        go.set(true);
        sched.run_cycle(DT);
        go.set(false);
        sched.run_cycle(DT);
        assert_eq!(handle.state(), SuperState::Seeking);
        assert_eq!(sched.owner(drive), Some(seek));

        // A declared transition is eligible the same cycle; the override
        // still wins and the goal is released before the cycle ends.
        done.set(true);
        handle.force(SuperState::Idle);
        sched.run_cycle(DT);
        assert_eq!(handle.state(), SuperState::Idle);
        assert_eq!(sched.action_state(seek), ActionState::Cancelled);
        assert_eq!(sched.owner(drive), None);
        let record = handle.last_transition().unwrap();
        assert!(record.forced);
        assert_eq!(record.to, SuperState::Idle);

        // The override was consumed; the stale Seeking gate cannot fire from
        // Idle.
        sched.run_cycle(DT);
        assert_eq!(handle.state(), SuperState::Idle);
        assert_eq!(handle.history().len(), 2);
    }

    #[test]
    fn forcing_the_current_state_is_ignored() {
        let mut sched = Scheduler::new();
        let handle = Superstructure::builder().register(&mut sched).unwrap();

        handle.force(SuperState::Idle);
        sched.run_cycle(DT);
        assert_eq!(handle.state(), SuperState::Idle);
        assert!(handle.history().is_empty());
    }

    #[test]
    fn goals_follow_the_state_and_shared_goals_keep_running() {
        let mut sched = Scheduler::new();
        let drive = sched.register_resource("drive").unwrap();
        let elevator = sched.register_resource("elevator").unwrap();
        let approach = sched.register(run("approach", vec![drive], || {})).unwrap();
        let hold = sched.register(run("hold", vec![drive], || {})).unwrap();
        let carry = sched.register(run("carry", vec![elevator], || {})).unwrap();
        let (arrived, gate) = flag();

        let handle = Superstructure::builder()
            .with_transition(SuperState::Seeking, &gate, SuperState::Holding)
            .with_goal(SuperState::Seeking, approach)
            .with_goal(SuperState::Seeking, carry)
            .with_goal(SuperState::Holding, hold)
            .with_goal(SuperState::Holding, carry)
            .register(&mut sched)
            .unwrap();

        handle.force(SuperState::Seeking);
        sched.run_cycle(DT);
        sched.run_cycle(DT);
        assert_eq!(sched.owner(drive), Some(approach));
        assert_eq!(sched.owner(elevator), Some(carry));
        let carry_run = sched.run_id(carry).unwrap();

        arrived.set(true);
        sched.run_cycle(DT);
        assert_eq!(handle.state(), SuperState::Holding);
        assert_eq!(sched.action_state(approach), ActionState::Cancelled);
        assert_eq!(sched.owner(drive), Some(hold));
        // Listed under both states: same run, never re-initialized.
        assert_eq!(sched.run_id(carry), Some(carry_run));
    }

    #[test]
    fn displaced_goal_is_reasserted_next_cycle() {
        let mut sched = Scheduler::new();
        let drive = sched.register_resource("drive").unwrap();
        let approach = sched.register(run("approach", vec![drive], || {})).unwrap();
        let rival = sched.register(run("rival", vec![drive], || {})).unwrap();

        let handle = Superstructure::builder()
            .with_goal(SuperState::Seeking, approach)
            .register(&mut sched)
            .unwrap();
        handle.force(SuperState::Seeking);
        sched.run_cycle(DT);
        assert_eq!(sched.owner(drive), Some(approach));

        sched.schedule(rival);
        assert_eq!(sched.owner(drive), Some(rival));
        sched.run_cycle(DT);
        assert_eq!(sched.owner(drive), Some(approach));
        assert_eq!(sched.action_state(rival), ActionState::Cancelled);
    }

    #[test]
    fn goal_handles_are_validated_eagerly() {
        let mut sched = Scheduler::new();
        let result = Superstructure::builder()
            .with_goal(SuperState::Seeking, ActionId::new(99))
            .register(&mut sched);
        assert!(matches!(result, Err(TactusError::UnknownAction(_))));
    }
}
