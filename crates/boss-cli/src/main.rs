//! `boss` – runs the robot program against simulated hardware.
//!
//! 1. Loads the robot profile from `~/.boss/config.toml` (or `--config`),
//!    falling back to defaults when it is absent.
//! 2. Reads the tuning file, builds a fully simulated robot and starts the
//!    analog sampling thread.
//! 3. Runs operator control at the profile's loop period, feeding scripted
//!    stick input and stepping the plant model, until Ctrl-C or `--ticks`.
//! 4. Stops every output and writes the tuning file back on the way out.

mod config;
mod script;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use boss_hal::AnalogSampler;
use boss_hal::sim::{SimHardware, SimPlant, SimRobot};
use boss_kernel::ConfigStore;
use boss_runtime::{Robot, RobotOptions};
use boss_types::SystemClock;

use config::Script;
use script::ScriptedBoard;

/// Analog sampler period.
const SAMPLE_PERIOD: Duration = Duration::from_millis(5);

const USAGE: &str = "usage: boss [--config <path>] [--ticks <n>] [--script <idle|forward|spin|nudge>] [--json]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    ticks: Option<u64>,
    script: Option<Script>,
    json: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let mut value = |name: &str| args.next().ok_or_else(|| format!("{name} needs a value"));
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--ticks" => {
                let raw = value("--ticks")?;
                parsed.ticks = Some(raw.parse().map_err(|_| format!("invalid tick count '{raw}'"))?);
            }
            "--script" => parsed.script = Some(value("--script")?.parse()?),
            "--json" => parsed.json = true,
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }
    Ok(parsed)
}

fn main() {
    let _guard = boss_runtime::init_tracing("boss");

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    if !args.json {
        print_banner();
    }

    // ── Profile ───────────────────────────────────────────────────────────
    let profile_path = args.config.clone().unwrap_or_else(config::config_path);
    let mut profile = config::load_or_default(&profile_path);
    if let Some(ticks) = args.ticks {
        profile.ticks = Some(ticks);
    }
    if let Some(script) = args.script {
        profile.script = script;
    }

    // ── Robot ─────────────────────────────────────────────────────────────
    let mut tuning = ConfigStore::new();
    if let Err(e) = tuning.read(&profile.tuning_file) {
        warn!(path = %profile.tuning_file.display(), error = %e, "tuning file not read, using defaults");
    }

    let SimHardware {
        registry,
        probes,
        sources,
    } = SimRobot::full().build();
    let _sampler = match AnalogSampler::spawn(sources, registry.analog().clone(), SAMPLE_PERIOD) {
        Ok(sampler) => Some(sampler),
        Err(e) => {
            warn!(error = %e, "analog sampler not started");
            None
        }
    };
    let mut plant = SimPlant::new(probes);
    let mut robot = Robot::new(
        registry,
        tuning,
        Arc::new(SystemClock::new()),
        RobotOptions {
            watchdog_expiration: profile.watchdog_expiration(),
            tuning_path: Some(profile.tuning_file.clone()),
        },
    );

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop with --ticks instead");
    }

    if !args.json {
        println!(
            "  Script {} at {} ms per tick, tuning in {}",
            profile.script.to_string().bold(),
            profile.loop_period_ms,
            profile.tuning_file.display().to_string().bold()
        );
        println!("  Press {} to stop.\n", "Ctrl-C".bold().cyan());
    }

    // ── Control loop ──────────────────────────────────────────────────────
    let period = profile.loop_period();
    let report_every = (1_000 / profile.loop_period_ms.max(1)).max(1);
    let started = Instant::now();
    let mut tick: u64 = 0;

    while !shutdown.load(Ordering::SeqCst) && profile.ticks.is_none_or(|limit| tick < limit) {
        let tick_start = Instant::now();

        let board = ScriptedBoard::at(profile.script, started.elapsed().as_secs_f64());
        robot.operator_tick(&board, false);
        plant.step(period.as_secs_f64());
        tick += 1;

        if tick % report_every == 0 {
            report(&robot, args.json);
        }

        if let Some(remaining) = period.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    if shutdown.load(Ordering::SeqCst) && !args.json {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());
    }
    robot.shutdown();
    info!(ticks = tick, faults = robot.context().watchdog_faults(), "robot stopped");
    if !args.json {
        println!("{}", "  ✓ Outputs stopped, tuning file written.".green());
    }
}

fn report(robot: &Robot, json: bool) {
    let snapshot = robot.telemetry();
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "telemetry not serialised"),
        }
        return;
    }
    println!(
        "  {} {} L {:+.2} R {:+.2} {:?} {:+.1}° {}",
        snapshot.timestamp.format("%H:%M:%S").to_string().dimmed(),
        snapshot.mode.bold(),
        snapshot.left_speed,
        snapshot.right_speed,
        snapshot.compensation,
        snapshot.heading_deg,
        format!("faults {}", snapshot.watchdog_faults).dimmed()
    );
    for line in snapshot.display.iter().filter(|l| !l.is_empty()) {
        println!("    │ {line}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___  ____  ________"#.bold().cyan());
    println!("{}", r#"  / _ )/ __ \/ __/ __/"#.bold().cyan());
    println!("{}", r#" / _  / /_/ /\ \_\ \  "#.bold().cyan());
    println!("{}", r#"/____/\____/___/___/  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "BOSS".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Robot control loop on simulated hardware");
    println!();
}
