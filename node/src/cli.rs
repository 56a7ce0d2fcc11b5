//! # CLI Interface
//!
//! Defines the command-line argument structure for `blocksim` using `clap`
//! derive. Supports three subcommands: `run`, `sweep`, and `version`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use blocksim_protocol::config::SimConfig;

use crate::logging::LogFormat;
use crate::sweep::SweepParam;

/// Blockchain gossip propagation simulator.
///
/// Builds a random peer-to-peer network, floods transactions and blocks
/// through it, and reports confirmation latency and fee statistics.
#[derive(Parser, Debug)]
#[command(
    name = "blocksim",
    about = "Blockchain gossip propagation simulator",
    version,
    propagate_version = true
)]
pub struct BlocksimCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the `blocksim` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one simulation and print its report.
    Run(RunArgs),
    /// Repeat runs across a range of one parameter and emit averaged CSV.
    Sweep(SweepArgs),
    /// Print version information and exit.
    Version,
}

/// Parameter overrides shared by `run` and `sweep`. Applied on top of the
/// configuration file, or the built-in defaults when there is none.
#[derive(Args, Debug, Default)]
pub struct ParamArgs {
    /// Configuration file: `.json`, or the four-field legacy input
    /// `min_links tx_interarrival block_interarrival link_speed`.
    #[arg(long, short = 'c', env = "BLOCKSIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of nodes in the network.
    #[arg(long)]
    pub nodes: Option<usize>,

    /// Fraction of nodes that mine.
    #[arg(long)]
    pub miner_fraction: Option<f64>,

    /// Minimum number of links per node.
    #[arg(long)]
    pub min_links: Option<usize>,

    /// Mean time between new transactions.
    #[arg(long)]
    pub mean_tx_interarrival: Option<f64>,

    /// Mean time between new blocks.
    #[arg(long)]
    pub mean_block_interarrival: Option<f64>,

    /// Mean link propagation delay.
    #[arg(long)]
    pub mean_link_speed: Option<f64>,

    /// Stop after this many blocks.
    #[arg(long)]
    pub max_blocks: Option<u64>,

    /// Greediness for every miner instead of a random one.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub greediness: Option<u8>,

    /// Master seed. Omit for a fresh random run.
    #[arg(long, env = "BLOCKSIM_SEED")]
    pub seed: Option<u64>,

    /// Log output format.
    #[arg(long, value_enum, env = "BLOCKSIM_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl ParamArgs {
    /// Overwrites every field of `config` that was given on the command line.
    pub fn apply(&self, config: &mut SimConfig) {
        if let Some(v) = self.nodes {
            config.node_count = v;
        }
        if let Some(v) = self.miner_fraction {
            config.miner_fraction = v;
        }
        if let Some(v) = self.min_links {
            config.min_links_per_node = v;
        }
        if let Some(v) = self.mean_tx_interarrival {
            config.mean_tx_interarrival = v;
        }
        if let Some(v) = self.mean_block_interarrival {
            config.mean_block_interarrival = v;
        }
        if let Some(v) = self.mean_link_speed {
            config.mean_link_speed = v;
        }
        if let Some(v) = self.max_blocks {
            config.max_blocks = v;
        }
        if self.greediness.is_some() {
            config.miner_greediness = self.greediness;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub params: ParamArgs,

    /// Also write the report to this file.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Write Prometheus text-format metrics for the run to this file.
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

/// Arguments for the `sweep` subcommand.
#[derive(Args, Debug)]
pub struct SweepArgs {
    #[command(flatten)]
    pub params: ParamArgs,

    /// Parameter to vary.
    #[arg(long, value_enum)]
    pub param: SweepParam,

    /// First value.
    #[arg(long)]
    pub from: f64,

    /// Last value, inclusive.
    #[arg(long)]
    pub to: f64,

    /// Increment between values.
    #[arg(long)]
    pub step: f64,

    /// Runs averaged per value.
    #[arg(long, default_value_t = 10)]
    pub runs: u32,

    /// Also write the CSV to this file.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}
