//! Condition graph.
//!
//! Boolean predicates over continuously sampled signals (geometry, sensor
//! thresholds, operator inputs), composed into a reference-counted graph and
//! refreshed exactly once per control cycle by the scheduler. Bindings and
//! the orchestrator then read the frozen per-cycle values, so every consumer
//! sees one coherent snapshot.
//!
//! # Nodes
//!
//! | Node            | Description                                                   |
//! |-----------------|---------------------------------------------------------------|
//! | probe           | Leaf closure sampling an external signal.                     |
//! | and / or / not  | Pointwise boolean combinators.                                |
//! | rising, falling | True only on the cycle the inner value changed.               |
//! | debounced       | True once the inner value has held true for a duration.       |
//!
//! A node shared by several graphs updates once per cycle; combinator values
//! are computed from already-updated children, so composing conditions never
//! skips a base evaluation.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use tactus_kernel::condition::{Condition, Cycle};
//!
//! let signal = Rc::new(Cell::new(false));
//! let s = signal.clone();
//! let near = Condition::probe("near_target", move || s.get());
//! let steady = near.debounced(Duration::from_millis(40));
//!
//! let cycle = |i| Cycle { index: i, dt: Duration::from_millis(20) };
//! signal.set(true);
//! steady.update(cycle(1));
//! assert!(!steady.value());
//! steady.update(cycle(2));
//! assert!(steady.value());
//! ```

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Cycle
// ─────────────────────────────────────────────────────────────────────────────

/// Evaluation clock for one control cycle.
///
/// `index` increases monotonically from 1 (0 means "never evaluated") and
/// stamps memoized nodes; `dt` is the time step since the previous cycle and
/// feeds time-based nodes such as [`Condition::debounced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub index: u64,
    pub dt: Duration,
}

// ─────────────────────────────────────────────────────────────────────────────
// Condition
// ─────────────────────────────────────────────────────────────────────────────

enum NodeKind {
    Probe {
        name: String,
        sample: Box<dyn Fn() -> bool>,
    },
    CycleProbe {
        name: String,
        sample: Box<dyn Fn(Cycle) -> bool>,
    },
    And(Condition, Condition),
    Or(Condition, Condition),
    Not(Condition),
    Rising(Condition),
    Falling(Condition),
    Debounced {
        inner: Condition,
        duration: Duration,
        held_for: Cell<Duration>,
    },
}

struct Node {
    kind: NodeKind,
    value: Cell<bool>,
    prev: Cell<bool>,
    stamp: Cell<u64>,
}

impl Node {
    fn new(kind: NodeKind) -> Rc<Self> {
        Rc::new(Node {
            kind,
            value: Cell::new(false),
            prev: Cell::new(false),
            stamp: Cell::new(0),
        })
    }
}

/// A per-cycle boolean predicate over external signals.
///
/// Cheap to clone (a reference-counted handle); conditions are created once
/// at construction, registered with the scheduler, and re-evaluated every
/// cycle for the life of the process. The first evaluated cycle compares
/// against an initial `false` baseline, so a signal that is already true on
/// cycle one produces a rising edge on cycle one.
///
/// Not `Send`: the whole scheduling core is single-threaded by contract.
#[derive(Clone)]
pub struct Condition {
    node: Rc<Node>,
}

impl Condition {
    /// Leaf condition sampling an external signal.
    ///
    /// `sample` must be pure with respect to the current cycle: it reads state
    /// but never mutates it. It is called at most once per cycle.
    pub fn probe(name: impl Into<String>, sample: impl Fn() -> bool + 'static) -> Self {
        Condition {
            node: Node::new(NodeKind::Probe {
                name: name.into(),
                sample: Box::new(sample),
            }),
        }
    }

    /// Leaf condition whose sample sees the evaluation clock.
    ///
    /// For predicates that depend on recency, such as the convergence
    /// monitor's freshness check. Same purity contract as
    /// [`Condition::probe`].
    pub fn probe_with_cycle(
        name: impl Into<String>,
        sample: impl Fn(Cycle) -> bool + 'static,
    ) -> Self {
        Condition {
            node: Node::new(NodeKind::CycleProbe {
                name: name.into(),
                sample: Box::new(sample),
            }),
        }
    }

    /// True when both conditions are true.
    pub fn and(&self, other: &Condition) -> Condition {
        Condition {
            node: Node::new(NodeKind::And(self.clone(), other.clone())),
        }
    }

    /// True when either condition is true.
    pub fn or(&self, other: &Condition) -> Condition {
        Condition {
            node: Node::new(NodeKind::Or(self.clone(), other.clone())),
        }
    }

    /// Logical complement.
    pub fn negate(&self) -> Condition {
        Condition {
            node: Node::new(NodeKind::Not(self.clone())),
        }
    }

    /// True only on the cycle the inner condition went false to true.
    pub fn rising(&self) -> Condition {
        Condition {
            node: Node::new(NodeKind::Rising(self.clone())),
        }
    }

    /// True only on the cycle the inner condition went true to false.
    pub fn falling(&self) -> Condition {
        Condition {
            node: Node::new(NodeKind::Falling(self.clone())),
        }
    }

    /// True once the inner condition has held true for at least `duration`.
    ///
    /// Active time accumulates from each cycle's `dt`, so with period `p` the
    /// output turns true on the N-th consecutive true cycle where
    /// `N * p >= duration`. Any false cycle resets the accumulator and the
    /// output immediately; there is no decay grace.
    pub fn debounced(&self, duration: Duration) -> Condition {
        Condition {
            node: Node::new(NodeKind::Debounced {
                inner: self.clone(),
                duration,
                held_for: Cell::new(Duration::ZERO),
            }),
        }
    }

    /// Refresh this node (children first) and return the new value.
    ///
    /// Driven by the scheduler at the top of every cycle; a node already
    /// stamped with `cycle.index` returns its memoized value, which is what
    /// keeps shared subgraphs and their edge state consistent under multiple
    /// parents.
    pub fn update(&self, cycle: Cycle) -> bool {
        let node = &self.node;
        if node.stamp.get() == cycle.index {
            return node.value.get();
        }

        let next = match &node.kind {
            NodeKind::Probe { sample, .. } => sample(),
            NodeKind::CycleProbe { sample, .. } => sample(cycle),
            NodeKind::And(a, b) => {
                let va = a.update(cycle);
                let vb = b.update(cycle);
                va && vb
            }
            NodeKind::Or(a, b) => {
                let va = a.update(cycle);
                let vb = b.update(cycle);
                va || vb
            }
            NodeKind::Not(a) => !a.update(cycle),
            NodeKind::Rising(a) => {
                a.update(cycle);
                a.rose()
            }
            NodeKind::Falling(a) => {
                a.update(cycle);
                a.fell()
            }
            NodeKind::Debounced {
                inner,
                duration,
                held_for,
            } => {
                if inner.update(cycle) {
                    let held = held_for.get().saturating_add(cycle.dt);
                    held_for.set(held);
                    held >= *duration
                } else {
                    held_for.set(Duration::ZERO);
                    false
                }
            }
        };

        node.prev.set(node.value.get());
        node.value.set(next);
        node.stamp.set(cycle.index);
        next
    }

    /// The value computed by this cycle's [`update`][Condition::update].
    ///
    /// `false` before the first evaluation.
    pub fn value(&self) -> bool {
        self.node.value.get()
    }

    /// True when this cycle's value is true and the previous cycle's was not.
    pub fn rose(&self) -> bool {
        self.node.value.get() && !self.node.prev.get()
    }

    /// True when this cycle's value is false and the previous cycle's was true.
    pub fn fell(&self) -> bool {
        !self.node.value.get() && self.node.prev.get()
    }

    /// The name of this node, if it is a probe leaf.
    pub fn name(&self) -> Option<&str> {
        match &self.node.kind {
            NodeKind::Probe { name, .. } | NodeKind::CycleProbe { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Pointer identity of the underlying node, for registration dedup.
    pub(crate) fn node_ptr(&self) -> usize {
        Rc::as_ptr(&self.node) as usize
    }
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.node.kind {
            NodeKind::Probe { name, .. } | NodeKind::CycleProbe { name, .. } => {
                return write!(f, "Condition({name})");
            }
            NodeKind::And(..) => "and",
            NodeKind::Or(..) => "or",
            NodeKind::Not(..) => "not",
            NodeKind::Rising(..) => "rising",
            NodeKind::Falling(..) => "falling",
            NodeKind::Debounced { .. } => "debounced",
        };
        write!(f, "Condition({kind})")
    }
}
