//! rover-core daemon
//!
//! Loads configuration, spawns the control / IMU / diagnostics tasks and
//! idles until Ctrl+C. Built against the simulated hardware backend (the
//! `mock` feature, on by default); board-specific `BusPhy` / `WheelEncoder`
//! / `PwmPair` implementations slot in at the same seams.

use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rover_core::bus::BusMaster;
use rover_core::devices::bno080::Bno080;
use rover_core::encoder::EncoderPair;
use rover_core::motor::{WheelController, WheelSide};
use rover_core::sim::imu::ImuSim;
use rover_core::sim::robot::SimWheel;
use rover_core::state::Waypoint;
use rover_core::tasks::control::ControlTask;
use rover_core::tasks::diag::DiagTask;
use rover_core::tasks::imu::ImuTask;
use rover_core::{AppConfig, Error, Result, SharedState};

/// Parse the config path from the command line.
///
/// Supports `rover-core <path>`, `rover-core --config <path>` and
/// `rover-core -c <path>`; defaults to `/etc/rover-core.toml`.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }
    "/etc/rover-core.toml".to_string()
}

/// Optional `--target X,Y` waypoint (encoder ticks, inertial frame)
fn parse_target() -> Option<Waypoint> {
    let args: Vec<String> = env::args().collect();
    for i in 1..args.len() {
        if args[i] == "--target" && i + 1 < args.len() {
            let (x, y) = args[i + 1].split_once(',')?;
            return Some(Waypoint {
                x: x.trim().parse().ok()?,
                y: y.trim().parse().ok()?,
            });
        }
    }
    None
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = if Path::new(&config_path).exists() {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::defaults()
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.clone()),
    )
    .init();

    log::info!("rover-core starting (config: {})", config_path);
    log::info!(
        "wheelbase {} ticks, control period {} ms, imu at 0x{:02X}",
        config.robot.wheelbase_ticks,
        config.robot.control_period_ms,
        config.imu.address
    );

    let state = SharedState::new();
    if let Some(target) = parse_target() {
        log::info!("driving to ({}, {})", target.x, target.y);
        state.set_target(target);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            shutdown.store(true, Ordering::Relaxed);
        })
        .map_err(|e| Error::Other(format!("failed to install signal handler: {}", e)))?;
    }

    // Simulated chassis: two wheels and the IMU on its own bus
    let left_wheel = SimWheel::new(config.sim.max_ticks_per_sec);
    let right_wheel = SimWheel::new(config.sim.max_ticks_per_sec);
    let encoders = EncoderPair::new(left_wheel.encoder(), right_wheel.encoder());
    let left = WheelController::new(left_wheel.pwm(), WheelSide::Left);
    let right = WheelController::new(right_wheel.pwm(), WheelSide::Right);

    let (diag_tx, diag_rx) = crossbeam_channel::bounded(64);

    let control = ControlTask::new(&config, encoders, left, right, state.clone(), diag_tx);
    let control_handle = control.spawn(Arc::clone(&shutdown))?;
    let diag_handle = DiagTask::new(diag_rx).spawn(Arc::clone(&shutdown))?;

    let sequence_policy = config.imu.sequence_numbering.parse()?;
    let imu = Bno080::new(
        BusMaster::new(ImuSim::new()),
        config.imu.address,
        sequence_policy,
    );
    let mut imu_task = ImuTask::new(imu, &config.imu, state.clone());
    imu_task.init()?;
    let imu_handle = imu_task.spawn(Arc::clone(&shutdown))?;

    log::info!("all tasks running, press Ctrl+C to stop");

    let mut last_stats = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
        if last_stats.elapsed().as_secs() >= 10 {
            let snap = state.snapshot();
            log::info!(
                "pose x={} y={} theta={} after {} cycles, orientation real={:.3}",
                snap.pose.x,
                snap.pose.y,
                snap.pose.theta,
                snap.cycles,
                snap.orientation.real
            );
            last_stats = Instant::now();
        }
    }

    log::info!("stopping tasks");
    for handle in [control_handle, imu_handle, diag_handle] {
        if handle.join().is_err() {
            log::warn!("a task panicked during shutdown");
        }
    }
    log::info!("rover-core stopped");
    Ok(())
}
