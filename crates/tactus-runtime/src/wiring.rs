//! [`Robot`] – the standard platform wired end to end.
//!
//! [`Robot::assemble`] builds the plant for the configured mode, mirrors its
//! mechanisms into the scheduler as resources, registers the goal and
//! default actions, and hangs the superstructure's transition graph off
//! operator and alignment conditions. The result is a ready [`Runner`] plus
//! the handles the binary talks to.
//!
//! | Mechanism  | Kind       | Default action  |
//! |------------|------------|-----------------|
//! | `drive`    | drivetrain | `drive_hold`    |
//! | `elevator` | servo      | `elevator_hold` |
//! | `intake`   | roller     | `intake_idle`   |
//! | `climber`  | servo      | `climber_hold`  |
//!
//! The game loop is a fetch-and-score cycle:
//!
//! | From    | Gate                     | To      | Goals entered                      |
//! |---------|--------------------------|---------|------------------------------------|
//! | Idle    | seek button rises        | Seeking | `seek_station`, `intake_collect`   |
//! | Seeking | seek button falls        | Idle    | defaults only                      |
//! | Seeking | aligned and settled      | Holding | `intake_hold`                      |
//! | Holding | score button rises       | Scoring | `elevator_to_level`, `intake_eject`|
//! | Scoring | intake beam clear        | Stowing | `elevator_stow`                    |
//! | Stowing | elevator at stow height  | Idle    | defaults only                      |
//!
//! The climber sits outside the game loop. Its pad buttons bind straight to
//! the scheduler as edge-triggered requests, so a press in any game state
//! moves the pivot and a forced override never touches it:
//!
//! | Button | Edge  | Action          |
//! |--------|-------|-----------------|
//! | climb  | rises | `climber_climb` |
//! | stow   | rises | `climber_stow`  |

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use tactus_hal::{Plant, PlantBuilder, ProximityLatch};
use tactus_kernel::{Condition, ConvergenceMonitor, Scheduler};
use tactus_types::{
    ActivationMode, Pose, ResourceId, Setpoint, SuperState, TactusError, TargetSide,
};

use crate::config::RobotConfig;
use crate::goal::ApplySetpoint;
use crate::operator::OperatorConsole;
use crate::runner::Runner;
use crate::seek::SeekPose;
use crate::superstructure::{SuperHandle, Superstructure};

// ─────────────────────────────────────────────────────────────────────────────
// Field geometry and mechanism rates
// ─────────────────────────────────────────────────────────────────────────────

const LEFT_STATION: Pose = Pose {
    x: 1.8,
    y: 1.2,
    heading_rad: 0.0,
};
const RIGHT_STATION: Pose = Pose {
    x: 1.8,
    y: -1.2,
    heading_rad: 0.0,
};

const DRIVE_LINEAR_RATE: f64 = 2.5;
const DRIVE_ANGULAR_RATE: f64 = 4.0;
const ELEVATOR_RATE: f64 = 0.8;
const CLIMBER_RATE: f64 = 1.5;

fn station_for(side: TargetSide) -> Pose {
    match side {
        TargetSide::Left => LEFT_STATION,
        TargetSide::Right => RIGHT_STATION,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Robot
// ─────────────────────────────────────────────────────────────────────────────

/// The assembled platform: runner, orchestrator handle, operator console.
pub struct Robot {
    runner: Runner,
    superstructure: SuperHandle,
    console: OperatorConsole,
    plant: Rc<RefCell<Plant>>,
    intake_latch: Option<ProximityLatch>,
    drive: ResourceId,
    elevator: ResourceId,
    intake: ResourceId,
    climber: ResourceId,
}

impl Robot {
    /// Build and wire the whole platform for `config.mode`.
    ///
    /// # Errors
    ///
    /// Any [`TactusError`] raised while registering mechanisms, actions, or
    /// defaults; assembly is all-or-nothing.
    pub fn assemble(config: &RobotConfig) -> Result<Robot, TactusError> {
        info!(mode = %config.mode, "assembling robot");

        let builder = PlantBuilder::new(config.mode)
            .with_drivetrain("drive", DRIVE_LINEAR_RATE, DRIVE_ANGULAR_RATE)
            .with_servo("elevator", ELEVATOR_RATE)
            .with_roller("intake")
            .with_servo("climber", CLIMBER_RATE)
            .with_proximity("intake_beam");
        let intake_latch = builder.latch("intake_beam");
        let plant = Rc::new(RefCell::new(builder.build()?));

        // The scheduler's resource table mirrors the plant's registration
        // order, so the ids line up index for index.
        let mut sched = Scheduler::new();
        let names: Vec<String> = plant
            .borrow()
            .resources()
            .map(|(_, name)| name.to_string())
            .collect();
        for name in &names {
            sched.register_resource(name.as_str())?;
        }
        let drive = mirrored(&sched, "drive")?;
        let elevator = mirrored(&sched, "elevator")?;
        let intake = mirrored(&sched, "intake")?;
        let climber = mirrored(&sched, "climber")?;

        // ── conditions ──────────────────────────────────────────────────────
        let console = OperatorConsole::new();
        let seek_held = console.seek_condition();
        let score = console.score_condition();

        let (monitor, feedback) = ConvergenceMonitor::channel();
        let aligned = monitor
            .within_tolerance(config.position_tolerance_m, config.heading_tolerance_rad)
            .debounced(config.settle());

        let beam = plant.clone();
        let holding = Condition::probe("holding_object", move || {
            beam.borrow().detected("intake_beam")
        });
        let height = plant.clone();
        let stow_height = config.elevator_stow_m;
        let stow_tolerance = config.elevator_tolerance_m;
        let stowed = Condition::probe("elevator_stowed", move || {
            height
                .borrow()
                .position(elevator)
                .is_some_and(|h| (h - stow_height).abs() <= stow_tolerance)
        });

        // ── goal actions ────────────────────────────────────────────────────
        let side = console.clone();
        let seek_station = sched.register(SeekPose::toward(
            "seek_station",
            plant.clone(),
            drive,
            move || station_for(side.side()),
            feedback,
        )?)?;
        let level = console.clone();
        let presets = config.clone();
        let elevator_to_level = sched.register(ApplySetpoint::sampled(
            "elevator_to_level",
            plant.clone(),
            elevator,
            move || Setpoint::Position(presets.level_height(level.level())),
        )?)?;
        let elevator_stow = sched.register(ApplySetpoint::new(
            "elevator_stow",
            plant.clone(),
            elevator,
            Setpoint::Position(config.elevator_stow_m),
        )?)?;
        let intake_collect = sched.register(ApplySetpoint::new(
            "intake_collect",
            plant.clone(),
            intake,
            Setpoint::Voltage(config.intake_collect_volts),
        )?)?;
        let intake_hold = sched.register(ApplySetpoint::new(
            "intake_hold",
            plant.clone(),
            intake,
            Setpoint::Voltage(config.intake_hold_volts),
        )?)?;
        let intake_eject = sched.register(ApplySetpoint::new(
            "intake_eject",
            plant.clone(),
            intake,
            Setpoint::Voltage(config.intake_eject_volts),
        )?)?;
        let climber_climb = sched.register(ApplySetpoint::new(
            "climber_climb",
            plant.clone(),
            climber,
            Setpoint::Position(config.climber_climb_rad),
        )?)?;
        let climber_stow = sched.register(ApplySetpoint::new(
            "climber_stow",
            plant.clone(),
            climber,
            Setpoint::Position(config.climber_stow_rad),
        )?)?;

        // ── defaults ────────────────────────────────────────────────────────
        let drive_hold = sched.register(ApplySetpoint::new(
            "drive_hold",
            plant.clone(),
            drive,
            Setpoint::Halt,
        )?)?;
        sched.set_default_action(drive, drive_hold)?;
        let elevator_hold = sched.register(ApplySetpoint::new(
            "elevator_hold",
            plant.clone(),
            elevator,
            Setpoint::Halt,
        )?)?;
        sched.set_default_action(elevator, elevator_hold)?;
        let intake_idle = sched.register(ApplySetpoint::new(
            "intake_idle",
            plant.clone(),
            intake,
            Setpoint::Halt,
        )?)?;
        sched.set_default_action(intake, intake_idle)?;
        let climber_hold = sched.register(ApplySetpoint::new(
            "climber_hold",
            plant.clone(),
            climber,
            Setpoint::Halt,
        )?)?;
        sched.set_default_action(climber, climber_hold)?;

        // ── pad bindings ────────────────────────────────────────────────────
        // Each press is one edge-triggered request; the two goals displace
        // each other through the arbiter like any other conflict.
        sched.bind(
            &console.climb_condition(),
            ActivationMode::OnTrue,
            climber_climb,
        )?;
        sched.bind(
            &console.stow_condition(),
            ActivationMode::OnTrue,
            climber_stow,
        )?;

        // ── superstructure ──────────────────────────────────────────────────
        let superstructure = Superstructure::builder()
            .with_transition(SuperState::Idle, &seek_held.rising(), SuperState::Seeking)
            .with_transition(SuperState::Seeking, &seek_held.falling(), SuperState::Idle)
            .with_transition(SuperState::Seeking, &aligned, SuperState::Holding)
            .with_transition(SuperState::Holding, &score.rising(), SuperState::Scoring)
            .with_transition(SuperState::Scoring, &holding.negate(), SuperState::Stowing)
            .with_transition(SuperState::Stowing, &stowed, SuperState::Idle)
            .with_goal(SuperState::Seeking, seek_station)
            .with_goal(SuperState::Seeking, intake_collect)
            .with_goal(SuperState::Holding, intake_hold)
            .with_goal(SuperState::Scoring, elevator_to_level)
            .with_goal(SuperState::Scoring, intake_eject)
            .with_goal(SuperState::Stowing, elevator_stow)
            .register(&mut sched)?;

        let runner = Runner::new(plant.clone(), sched, config.period());
        Ok(Robot {
            runner,
            superstructure,
            console,
            plant,
            intake_latch,
            drive,
            elevator,
            intake,
            climber,
        })
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut Runner {
        &mut self.runner
    }

    pub fn superstructure(&self) -> &SuperHandle {
        &self.superstructure
    }

    pub fn console(&self) -> &OperatorConsole {
        &self.console
    }

    pub fn plant(&self) -> Rc<RefCell<Plant>> {
        self.plant.clone()
    }

    /// Write half of the simulated intake beam; `None` in offline mode.
    pub fn intake_latch(&self) -> Option<&ProximityLatch> {
        self.intake_latch.as_ref()
    }

    pub fn state(&self) -> SuperState {
        self.superstructure.state()
    }

    pub fn drive_pose(&self) -> Option<Pose> {
        self.plant.borrow().pose(self.drive)
    }

    pub fn elevator_height(&self) -> Option<f64> {
        self.plant.borrow().position(self.elevator)
    }

    pub fn intake_volts(&self) -> Option<f64> {
        self.plant.borrow().voltage(self.intake)
    }

    pub fn climber_angle(&self) -> Option<f64> {
        self.plant.borrow().position(self.climber)
    }

    pub fn holding_object(&self) -> bool {
        self.plant.borrow().detected("intake_beam")
    }

    /// Name of the action currently owning `resource`, if any.
    pub fn owner_of(&self, resource: &str) -> Option<String> {
        let sched = self.runner.scheduler();
        let id = sched.resource_id(resource)?;
        let owner = sched.owner(id)?;
        sched.action_name(owner).map(str::to_string)
    }
}

fn mirrored(sched: &Scheduler, name: &str) -> Result<ResourceId, TactusError> {
    sched
        .resource_id(name)
        .ok_or_else(|| TactusError::UnknownResource(name.to_string()))
}
