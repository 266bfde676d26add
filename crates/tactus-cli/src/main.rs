//! `tactus-cli` – Tactus command line runner.
//!
//! This binary is the entry point for the Tactus stack. It:
//!
//! 1. Loads `tactus.toml` (environment variables override the file).
//! 2. Assembles the standard platform for the configured mode and period.
//! 3. Runs a scripted demonstration match: approach, hold, score, stow, a
//!    forced abort on the second approach, and an endgame climb.
//! 4. Intercepts **Ctrl-C** to stop the loop and halt every mechanism.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tracing::warn;

use tactus_runtime::{Robot, RobotConfig, init_telemetry};
use tactus_types::{Pose, ScoreLevel, SuperState, TargetSide};

fn main() {
    let config = match RobotConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", "Config error".red());
            eprintln!("  Using default configuration.");
            RobotConfig::default()
        }
    };
    init_telemetry(&config.log_level);

    print_banner();
    println!(
        "  mode {}  period {} ms  settle {} ms",
        config.mode.to_string().bold(),
        config.period_ms,
        config.settle_ms,
    );

    let mut robot = match Robot::assemble(&config) {
        Ok(robot) => robot,
        Err(e) => {
            eprintln!("{}: {e}", "Assembly failed".red());
            std::process::exit(1);
        }
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // The handler only raises the flag; the loop notices it at the next
    // cycle boundary and the halt runs on this thread.
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_for_ctrlc = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the loop …".yellow().bold());
        shutdown_for_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    run_demo(&mut robot, &shutdown);

    robot.runner_mut().halt();
    print_summary(&robot);
    println!("{}", "  ✓ All mechanisms halted.".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// Demonstration match
// ─────────────────────────────────────────────────────────────────────────────

fn run_demo(robot: &mut Robot, shutdown: &AtomicBool) {
    let console = robot.console().clone();
    let latch = robot.intake_latch().cloned();

    phase("Startup hold");
    robot.runner_mut().run(25, shutdown);
    print_status(robot);
    if shutdown.load(Ordering::SeqCst) {
        return;
    }

    phase("Approach the left station");
    console.set_seek(true);
    robot.runner_mut().run(40, shutdown);
    if let Some(latch) = &latch {
        println!("  {}", "game piece breaks the intake beam".dimmed());
        latch.set(true);
    }
    robot.runner_mut().run(120, shutdown);
    print_status(robot);
    if shutdown.load(Ordering::SeqCst) {
        return;
    }

    phase("Score high");
    console.set_seek(false);
    console.select_level(ScoreLevel::High);
    console.set_score(true);
    robot.runner_mut().run(10, shutdown);
    console.set_score(false);
    robot.runner_mut().run(80, shutdown);
    if let Some(latch) = &latch {
        println!("  {}", "game piece leaves the intake".dimmed());
        latch.set(false);
    }
    robot.runner_mut().run(100, shutdown);
    print_status(robot);
    if shutdown.load(Ordering::SeqCst) {
        return;
    }

    phase("Forced abort on the right side");
    console.select_side(TargetSide::Right);
    console.set_seek(true);
    robot.runner_mut().run(40, shutdown);
    robot.superstructure().force(SuperState::Idle);
    console.set_seek(false);
    robot.runner_mut().run(25, shutdown);
    print_status(robot);
    if shutdown.load(Ordering::SeqCst) {
        return;
    }

    phase("Endgame climb");
    console.set_climb(true);
    robot.runner_mut().run(5, shutdown);
    console.set_climb(false);
    robot.runner_mut().run(60, shutdown);
    print_status(robot);
}

fn phase(label: &str) {
    println!();
    println!("  {} {}", "▶".bold().cyan(), label.bold());
}

fn print_status(robot: &Robot) {
    let pose = robot.drive_pose().unwrap_or(Pose::ZERO);
    println!(
        "  {} state={}  pose=({:.2}, {:.2})  elevator={:.2} m  intake={:.1} V  climber={:.2} rad",
        "✓".green().bold(),
        robot.state().to_string().bold(),
        pose.x,
        pose.y,
        robot.elevator_height().unwrap_or(0.0),
        robot.intake_volts().unwrap_or(0.0),
        robot.climber_angle().unwrap_or(0.0),
    );
    for mechanism in ["drive", "elevator", "intake", "climber"] {
        if let Some(owner) = robot.owner_of(mechanism) {
            println!("    {} {:<9} {}", "•".dimmed(), mechanism, owner.dimmed());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner and summary
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ______           __"#.bold().cyan());
    println!("{}", r#"  /_  __/___ ______/ /___  _______"#.bold().cyan());
    println!("{}", r#"   / / / __ `/ ___/ __/ / / / ___/"#.bold().cyan());
    println!("{}", r#"  / / / /_/ / /__/ /_/ /_/ (__  )"#.bold().cyan());
    println!("{}", r#" /_/  \__,_/\___/\__/\__,_/____/"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Tactus".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Reactive behavior runtime for electromechanical platforms");
}

fn print_summary(robot: &Robot) {
    println!();
    println!("  {}", "Match summary".bold());
    for record in robot.superstructure().history() {
        let how = if record.forced {
            "forced".yellow().to_string()
        } else {
            "auto".dimmed().to_string()
        };
        println!(
            "    cycle {:>4}  {} -> {}  [{}]",
            record.cycle, record.from, record.to, how
        );
    }
    let overruns = robot.runner().overruns();
    println!(
        "    {} cycles, {} overruns (worst {:?}), health {:?}",
        overruns.cycles(),
        overruns.overruns(),
        overruns.worst(),
        overruns.health(),
    );
}
