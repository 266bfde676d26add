//! [`OperatorConsole`] – operator inputs as shared flags and conditions.
//!
//! Buttons are plain shared flags set from the binary's input handling and
//! sampled by [`Condition`] probes at the top of every cycle, so the rest of
//! the system sees operator intent only through the usual condition snapshot.
//! The side and level selectors follow a single-writer discipline: the
//! console is the only writer, goal closures and transition gates only read.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use tactus_kernel::Condition;
use tactus_types::{ScoreLevel, TargetSide};

/// Shared operator inputs. Cheap to clone; clones share one set of flags.
#[derive(Clone)]
pub struct OperatorConsole {
    seek: Rc<Cell<bool>>,
    score: Rc<Cell<bool>>,
    climb: Rc<Cell<bool>>,
    stow: Rc<Cell<bool>>,
    side: Rc<Cell<TargetSide>>,
    level: Rc<Cell<ScoreLevel>>,
}

impl Default for OperatorConsole {
    fn default() -> Self {
        OperatorConsole {
            seek: Rc::new(Cell::new(false)),
            score: Rc::new(Cell::new(false)),
            climb: Rc::new(Cell::new(false)),
            stow: Rc::new(Cell::new(false)),
            side: Rc::new(Cell::new(TargetSide::Left)),
            level: Rc::new(Cell::new(ScoreLevel::Mid)),
        }
    }
}

impl OperatorConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold or release the seek button.
    pub fn set_seek(&self, held: bool) {
        self.seek.set(held);
    }

    /// Press or release the score button.
    pub fn set_score(&self, pressed: bool) {
        self.score.set(pressed);
    }

    /// Press or release the climb button on the pad.
    pub fn set_climb(&self, pressed: bool) {
        self.climb.set(pressed);
    }

    /// Press or release the stow button on the pad.
    pub fn set_stow(&self, pressed: bool) {
        self.stow.set(pressed);
    }

    pub fn select_side(&self, side: TargetSide) {
        debug!(?side, "target side selected");
        self.side.set(side);
    }

    pub fn select_level(&self, level: ScoreLevel) {
        debug!(?level, "score level selected");
        self.level.set(level);
    }

    pub fn side(&self) -> TargetSide {
        self.side.get()
    }

    pub fn level(&self) -> ScoreLevel {
        self.level.get()
    }

    /// Probe over the seek button. Each call builds a fresh node over the
    /// same flag; derive edges from one instance per consumer.
    pub fn seek_condition(&self) -> Condition {
        let seek = self.seek.clone();
        Condition::probe("operator_seek", move || seek.get())
    }

    /// Probe over the score button.
    pub fn score_condition(&self) -> Condition {
        let score = self.score.clone();
        Condition::probe("operator_score", move || score.get())
    }

    /// Probe over the climb button.
    pub fn climb_condition(&self) -> Condition {
        let climb = self.climb.clone();
        Condition::probe("operator_climb", move || climb.get())
    }

    /// Probe over the stow button.
    pub fn stow_condition(&self) -> Condition {
        let stow = self.stow.clone();
        Condition::probe("operator_stow", move || stow.get())
    }
}
