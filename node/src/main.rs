// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Blocksim
//!
//! Entry point for the `blocksim` binary. Parses CLI arguments, initializes
//! logging, runs the simulator, and writes the report and metrics.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — run one simulation and print its report
//! - `sweep`   — average repeated runs across a parameter range into CSV
//! - `version` — print build version information

mod cli;
mod logging;
mod metrics;
mod sweep;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use blocksim_protocol::config::SimConfig;
use blocksim_protocol::sim::{Simulation, StreamRng};

use cli::{BlocksimCli, Commands, ParamArgs};
use metrics::PrometheusMetrics;

fn main() -> Result<()> {
    let cli = BlocksimCli::parse();

    match cli.command {
        Commands::Run(args) => run_simulation(args),
        Commands::Sweep(args) => run_sweep(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the configuration file (if any), applies CLI overrides, and
/// validates the result.
fn load_config(params: &ParamArgs) -> Result<SimConfig> {
    let mut config = match &params.config {
        Some(path) => SimConfig::from_path(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SimConfig::default(),
    };
    params.apply(&mut config);
    config.validate().context("invalid simulation parameters")?;
    Ok(config)
}

/// Runs one simulation to completion and emits its report.
fn run_simulation(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::RUN_FILTER, args.params.log_format);

    let mut config = load_config(&args.params)?;
    let rng = StreamRng::from_optional_seed(config.seed);
    config.seed = Some(rng.master_seed());

    tracing::info!(
        seed = rng.master_seed(),
        nodes = config.node_count,
        min_links = config.min_links_per_node,
        max_blocks = config.max_blocks,
        "starting simulation"
    );

    let metrics = PrometheusMetrics::new().context("failed to create metrics registry")?;
    let mut sim = Simulation::new(config, rng, metrics).context("failed to set up the simulation")?;
    let report = sim.run().context("simulation aborted")?;

    let rendered = if args.json {
        serde_json::to_string_pretty(&report).context("failed to serialize report")?
    } else {
        report.to_string()
    };
    emit(args.output.as_deref(), &rendered)?;

    if let Some(path) = &args.metrics_file {
        let metrics = sim.metrics();
        metrics.observe_report(&report);
        metrics.observe_network(sim.network());
        let text = metrics.encode().context("failed to encode metrics")?;
        fs::write(path, text)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
        tracing::info!(path = %path.display(), "metrics written");
    }

    Ok(())
}

/// Averages repeated runs across a parameter range and emits CSV.
fn run_sweep(args: cli::SweepArgs) -> Result<()> {
    logging::init_logging(logging::SWEEP_FILTER, args.params.log_format);

    let base = load_config(&args.params)?;
    let values = sweep::sweep_values(args.from, args.to, args.step)?;
    tracing::info!(
        param = ?args.param,
        points = values.len(),
        runs = args.runs,
        "starting sweep"
    );

    let rows = sweep::run_sweep(&base, args.param, &values, args.runs)?;
    let csv = sweep::to_csv(&rows);
    emit(args.output.as_deref(), csv.trim_end())
}

/// Prints `text` to stdout and also writes it to `path` when given.
fn emit(path: Option<&Path>, text: &str) -> Result<()> {
    println!("{}", text);
    if let Some(path) = path {
        fs::write(path, format!("{}\n", text))
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "output written");
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("blocksim {}", env!("CARGO_PKG_VERSION"));
    println!("rustc    {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
