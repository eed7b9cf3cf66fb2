//! `rwsim` - run readers-writers simulations from the command line.
//!
//! ```text
//! rwsim --primitive spinlock --seed 7 --trace
//! rwsim --runs 1000 --json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use rwsim::PrimitiveKind;
use rwsim::SimConfig;
use rwsim::Simulation;
use rwsim::run_batch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rwsim", version, about = "Deterministic bounded readers-writers simulator")]
struct Args {
    /// Path to TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of processes; the first half are readers.
    #[arg(long)]
    processes: Option<u32>,

    /// Primitive backing all three resources.
    /// Options: "semaphore" (default), "spinlock", "unguarded"
    #[arg(long)]
    primitive: Option<PrimitiveKind>,

    /// Reader-admission capacity.
    #[arg(long)]
    admission_capacity: Option<u32>,

    /// Writer-exclusion capacity.
    #[arg(long)]
    writer_capacity: Option<u32>,

    /// Seed for the scheduler. With --runs, the seed of the first run.
    #[arg(long)]
    seed: Option<u64>,

    /// Run a batch of this many simulations with consecutive seeds.
    #[arg(long)]
    runs: Option<u32>,

    /// Tick bound per run.
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Print every trace event.
    #[arg(long)]
    trace: bool,

    /// Print the report (or batch summary) as JSON.
    #[arg(long)]
    json: bool,

    /// Suppress all logging output.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Filter used when `RUST_LOG` is not set.
fn default_filter(args: &Args) -> &'static str {
    if args.quiet {
        "off"
    } else if args.verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(args: &Args) {
    let filter = if args.quiet || args.verbose {
        EnvFilter::new(default_filter(args))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(args)))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Defaults, file and environment layers, then CLI flags on top.
fn build_config(args: &Args) -> Result<SimConfig> {
    let mut config = SimConfig::load_with_layers(args.config.as_deref()).context("failed to load configuration")?;
    apply_args(args, &mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// CLI flags override only what they set.
fn apply_args(args: &Args, config: &mut SimConfig) {
    if let Some(processes) = args.processes {
        config.processes = processes;
    }
    if let Some(primitive) = args.primitive {
        config.primitive = primitive;
    }
    if let Some(capacity) = args.admission_capacity {
        config.admission_capacity = capacity;
    }
    if let Some(capacity) = args.writer_capacity {
        config.writer_exclusion_capacity = capacity;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(max_ticks) = args.max_ticks {
        config.max_ticks = max_ticks;
    }
    if args.trace {
        config.record_trace = true;
    }
}

fn run(args: &Args) -> Result<bool> {
    let config = build_config(args)?;

    if let Some(runs) = args.runs {
        let summary = run_batch(&config, runs).context("batch run failed")?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "{}: {}/{} completed, {} with violations ({} total), {} deadlocked, {} over tick limit, max ticks {}",
                summary.name,
                summary.completed,
                summary.runs,
                summary.violating_runs,
                summary.total_violations,
                summary.deadlocked,
                summary.tick_limit_exceeded,
                summary.max_ticks_used,
            );
            for failure in &summary.failures {
                println!("  seed {}: {:?} ({} violations)", failure.seed, failure.outcome, failure.violations);
            }
        }
        return Ok(summary.is_clean());
    }

    let simulation = Simulation::new(config).context("failed to create simulation")?;
    let report = simulation.run().context("simulation failed")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(trace) = &report.trace {
            for event in trace {
                println!("{event}");
            }
        }
        println!("{} (seed {}): {}", report.name, report.seed, report.outcome);
        println!(
            "  steps {}, spins {}, blocks {}, wakes {}, violations {}",
            report.metrics.steps,
            report.metrics.spins,
            report.metrics.blocks,
            report.metrics.wakes,
            report.metrics.violations,
        );
        for violation in &report.violations {
            println!("  {violation}");
        }
        if report.dropped_events > 0 {
            println!("  {} events not kept (trace cap reached)", report.dropped_events);
        }
    }
    Ok(report.is_clean())
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(&args);
    info!(version = env!("CARGO_PKG_VERSION"), "starting rwsim");

    if run(&args)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
