use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Handle to a mechanism resource registered with the plant at construction.
///
/// Resources are the unit of mutual exclusion: at most one action commands a
/// resource at any time. The handle is a plain index into the resource
/// catalog, so components can refer to mechanisms without holding references
/// to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(usize);

impl ResourceId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "resource[{}]", self.0)
    }
}

/// Handle to an action registered with the scheduler.
///
/// Registration hands ownership of the boxed action to the scheduler and
/// returns this index. Bindings, default-action tables and the orchestrator
/// all refer to actions through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(usize);

impl ActionId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "action[{}]", self.0)
    }
}

/// Identity of one scheduling instance of an action.
///
/// A registered action can run many times over the life of the process; each
/// admission is stamped with a fresh id so log events from different runs can
/// be told apart.
pub type RunId = Uuid;

/// Lifecycle of a scheduled action.
///
/// `Idle → Initializing → Running → {Finished, Cancelled}`. Terminal states
/// return to `Initializing` when the action is scheduled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionState {
    /// Registered but never scheduled, or retired after a terminal state.
    Idle,
    /// Admitted this cycle; `initialize` has run, first advance pending.
    Initializing,
    /// Advancing once per cycle.
    Running,
    /// Completed on its own terms.
    Finished,
    /// Ended by arbitration, a binding, or an explicit cancel.
    Cancelled,
}

impl ActionState {
    /// True for `Finished` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionState::Finished | ActionState::Cancelled)
    }

    /// True while the action occupies its resources.
    pub fn is_active(self) -> bool {
        matches!(self, ActionState::Initializing | ActionState::Running)
    }
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionState::Idle => "idle",
            ActionState::Initializing => "initializing",
            ActionState::Running => "running",
            ActionState::Finished => "finished",
            ActionState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// How an action behaves when an incoming request conflicts with it.
///
/// The policy of the *running* owner decides the outcome: a `CancelSelf`
/// owner yields its resources to the newcomer, a `CancelIncoming` owner
/// refuses the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptPolicy {
    /// Keep running; the conflicting request is refused.
    CancelIncoming,
    /// Yield: this action is cancelled and the newcomer admitted.
    CancelSelf,
}

/// Edge semantics of a condition-to-action binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationMode {
    /// Schedule the action on the condition's rising edge.
    OnTrue,
    /// Schedule on the rising edge, cancel on the falling edge.
    WhileTrue,
    /// Schedule the action on the condition's falling edge.
    OnFalse,
}

/// A commanded target for one mechanism.
///
/// Compatibility between a setpoint kind and a mechanism kind is checked when
/// goal actions are built, so dispatch at runtime cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Setpoint {
    /// Closed-loop position target in mechanism units (meters or radians).
    Position(f64),
    /// Velocity target in mechanism units per second.
    Velocity(f64),
    /// Open-loop output voltage.
    Voltage(f64),
    /// Field-relative pose target for a drivetrain.
    Pose(Pose),
    /// Safe idle output: stop and hold.
    Halt,
}

impl Setpoint {
    /// Short kind name used in dispatch errors and log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Setpoint::Position(_) => "position",
            Setpoint::Velocity(_) => "velocity",
            Setpoint::Voltage(_) => "voltage",
            Setpoint::Pose(_) => "pose",
            Setpoint::Halt => "halt",
        }
    }
}

/// Field-relative planar pose: meters and radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading_rad: f64,
}

impl Pose {
    pub const ZERO: Pose = Pose {
        x: 0.0,
        y: 0.0,
        heading_rad: 0.0,
    };

    pub fn new(x: f64, y: f64, heading_rad: f64) -> Self {
        Self { x, y, heading_rad }
    }

    /// Euclidean distance to `other` in meters.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Signed shortest-path heading error to `other`, wrapped to `[-pi, pi]`.
    pub fn heading_error_to(&self, other: &Pose) -> f64 {
        wrap_angle(other.heading_rad - self.heading_rad)
    }
}

/// Wrap an angle in radians to `[-pi, pi]`.
pub fn wrap_angle(rad: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut a = rad % two_pi;
    if a > std::f64::consts::PI {
        a -= two_pi;
    } else if a < -std::f64::consts::PI {
        a += two_pi;
    }
    a
}

/// Which device variants the plant builder constructs.
///
/// Selected once at construction. `Sim` devices integrate simple first-order
/// physics every cycle; `Offline` devices accept commands and report static
/// measurements, for replaying logs or running the loop headless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Sim,
    Offline,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Sim => f.write_str("sim"),
            Mode::Offline => f.write_str("offline"),
        }
    }
}

/// Superstructure states. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuperState {
    /// Mechanisms released to their default actions.
    Idle,
    /// Driving to the pickup target with the intake staged.
    Seeking,
    /// Object secured, carrying at stow height.
    Holding,
    /// Elevator at the selected level, rollers ejecting.
    Scoring,
    /// Returning the elevator to stow after release.
    Stowing,
}

impl std::fmt::Display for SuperState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SuperState::Idle => "idle",
            SuperState::Seeking => "seeking",
            SuperState::Holding => "holding",
            SuperState::Scoring => "scoring",
            SuperState::Stowing => "stowing",
        };
        f.write_str(s)
    }
}

/// Operator-selected approach side for the seek target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSide {
    Left,
    Right,
}

/// Operator-selected elevator height preset for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreLevel {
    Low,
    Mid,
    High,
}

/// One committed superstructure transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub at: DateTime<Utc>,
    pub cycle: u64,
    pub from: SuperState,
    pub to: SuperState,
    /// True when the transition came from the forced-state override.
    pub forced: bool,
}

/// Global error type. Every variant is a construction-time defect or a
/// hardware-layer fault; scheduling contention and stale measurements are
/// never reported through it.
#[derive(Error, Debug)]
pub enum TactusError {
    #[error("unknown resource `{0}`")]
    UnknownResource(String),

    #[error("unknown action `{0}`")]
    UnknownAction(String),

    #[error("duplicate mechanism id `{0}`")]
    DuplicateMechanism(String),

    #[error("resource `{0}` already has a default action")]
    DuplicateDefault(String),

    #[error("default action `{action}` does not claim resource `{resource}`")]
    DefaultNotClaiming { action: String, resource: String },

    #[error("mechanism `{mechanism}` does not accept {kind} setpoints")]
    SetpointMismatch {
        mechanism: String,
        kind: &'static str,
    },

    #[error("hardware fault on {mechanism}: {details}")]
    MechanismFault { mechanism: String, details: String },

    #[error("config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setpoint_serialization_roundtrip() {
        let sp = Setpoint::Position(1.25);
        let json = serde_json::to_string(&sp).unwrap();
        let back: Setpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(sp, back);
    }

    #[test]
    fn pose_setpoint_roundtrip() {
        let sp = Setpoint::Pose(Pose::new(3.0, -1.5, 0.75));
        let json = serde_json::to_string(&sp).unwrap();
        let back: Setpoint = serde_json::from_str(&json).unwrap();
        match back {
            Setpoint::Pose(p) => {
                assert!((p.x - 3.0).abs() < f64::EPSILON);
                assert!((p.y - (-1.5)).abs() < f64::EPSILON);
                assert!((p.heading_rad - 0.75).abs() < f64::EPSILON);
            }
            _ => panic!("unexpected variant"),
        }
    }

    #[test]
    fn setpoint_kind_names() {
        assert_eq!(Setpoint::Halt.kind(), "halt");
        assert_eq!(Setpoint::Voltage(6.0).kind(), "voltage");
        assert_eq!(Setpoint::Pose(Pose::ZERO).kind(), "pose");
    }

    #[test]
    fn action_state_classification() {
        assert!(ActionState::Finished.is_terminal());
        assert!(ActionState::Cancelled.is_terminal());
        assert!(!ActionState::Running.is_terminal());
        assert!(ActionState::Running.is_active());
        assert!(ActionState::Initializing.is_active());
        assert!(!ActionState::Idle.is_active());
    }

    #[test]
    fn heading_error_takes_shortest_path() {
        let a = Pose::new(0.0, 0.0, 3.0);
        let b = Pose::new(0.0, 0.0, -3.0);
        // Going from +3 rad to -3 rad is a short hop across pi, not a full
        // sweep back through zero.
        let err = a.heading_error_to(&b);
        assert!(err.abs() < 0.3, "got {err}");
    }

    #[test]
    fn wrap_angle_bounds() {
        let pi = std::f64::consts::PI;
        assert!((wrap_angle(3.0 * pi) - pi).abs() < 1e-9 || (wrap_angle(3.0 * pi) + pi).abs() < 1e-9);
        assert!((wrap_angle(-3.0 * pi) - pi).abs() < 1e-9 || (wrap_angle(-3.0 * pi) + pi).abs() < 1e-9);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn distance_is_planar() {
        let a = Pose::new(1.0, 2.0, 0.0);
        let b = Pose::new(4.0, 6.0, 1.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn mode_parses_lowercase() {
        let m: Mode = serde_json::from_str("\"sim\"").unwrap();
        assert_eq!(m, Mode::Sim);
        let m: Mode = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(m, Mode::Offline);
    }

    #[test]
    fn error_display() {
        let err = TactusError::UnknownResource("winch".to_string());
        assert!(err.to_string().contains("winch"));

        let err2 = TactusError::SetpointMismatch {
            mechanism: "intake".to_string(),
            kind: "pose",
        };
        assert!(err2.to_string().contains("intake"));
        assert!(err2.to_string().contains("pose"));
    }

    #[test]
    fn transition_record_roundtrip() {
        let rec = TransitionRecord {
            at: Utc::now(),
            cycle: 42,
            from: SuperState::Idle,
            to: SuperState::Seeking,
            forced: false,
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: TransitionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cycle, 42);
        assert_eq!(back.from, SuperState::Idle);
        assert_eq!(back.to, SuperState::Seeking);
    }
}
