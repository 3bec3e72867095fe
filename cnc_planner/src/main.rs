//! # CNC Planner
//!
//! Runs a block program through the move buffer pool against the simulated
//! step layer. The producer half queues blocks on the main thread while the
//! consumer cycle runs on its own thread, then the final positions are
//! logged.

use clap::Parser;
use cnc_common::config::LogLevel;
use cnc_common::consts::{DEFAULT_CONFIG_PATH, PLANNER_BUFFER_POOL_SIZE};
use cnc_common::planner::state::RunState;
use cnc_planner::collab::MachineControl;
use cnc_planner::config::{LoadedConfig, load_config};
use cnc_planner::cycle::{CycleRunner, rt_setup};
use cnc_planner::kinematics::CartesianKinematics;
use cnc_planner::planner::Planner;
use cnc_planner::program::queue_program;
use cnc_planner::sim::SimMachine;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// CNC planner: move queue and continuation engine
#[derive(Parser, Debug)]
#[command(name = "cnc_planner")]
#[command(version)]
#[command(about = "Queue and execute a block program against a simulated step layer")]
struct Args {
    /// Planner configuration TOML.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Block program to run.
    #[arg(long, value_name = "FILE")]
    program: PathBuf,

    /// CPU core to pin the cycle thread to.
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority of the cycle thread.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}: {e}", args.config.display());
            process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Shutdown complete");
}

fn run(args: &Args, config: &LoadedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(&args.program)
        .map_err(|e| format!("failed to read {}: {e}", args.program.display()))?;

    info!(
        "Config OK: cycle_time={}µs, segment_time={}s, pool={} buffers",
        config.planner.cycle_time_us, config.planner.segment_time, PLANNER_BUFFER_POOL_SIZE
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(true, Ordering::Release);
    })?;

    let mut planner: Planner = Planner::with_config(&config.planner);
    let kinematics = CartesianKinematics::from_config(&config.kinematics);
    let machine = SimMachine::new();

    let (mut producer, consumer) = planner.split();
    let mut runner = CycleRunner::new(consumer, kinematics, machine.clone(), &config.planner);

    let (queued, cycle) = std::thread::scope(|s| {
        let runner = &mut runner;
        let stop = &*shutdown;
        let cycle = s.spawn(move || {
            rt_setup(args.cpu_core, args.rt_priority)?;
            runner.run(stop)
        });

        let mut producer_machine = machine.clone();
        let queued = queue_program(&mut producer, &mut producer_machine, &source, &shutdown);

        // Let the consumer drain the queue before stopping the cycle.
        while queued.is_ok()
            && producer.buffers_available() < PLANNER_BUFFER_POOL_SIZE
            && !shutdown.load(Ordering::Acquire)
            && !cycle.is_finished()
            && machine.run_state() != RunState::Estopped
        {
            std::thread::sleep(Duration::from_millis(1));
        }
        shutdown.store(true, Ordering::Release);

        (queued, cycle.join())
    });

    let runtime = runner.consumer().runtime();
    info!(
        "Final position: planner={:?} runtime={:?} encoder={:?}",
        producer.planner_position(),
        runtime.position,
        runner.steps().encoder_steps()
    );
    info!(
        cycle_ends = machine.cycle_ends(),
        commands = machine.commands_executed(),
        "Run finished"
    );
    if let Some(alarm) = machine.alarm() {
        warn!("Machine alarmed: {alarm}");
    }

    cycle.map_err(|_| "cycle thread panicked")??;
    queued?;
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
