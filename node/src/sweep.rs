//! # Parameter Sweeps
//!
//! Repeats seeded runs across a range of one parameter and averages the
//! headline statistics per value, producing one CSV row per value:
//!
//! ```text
//! value,mean_ttc,mean_fee,confirmed_fraction
//! ```
//!
//! When the base configuration carries a seed, run `i` of every value uses
//! `seed + i`, so a whole sweep is reproducible.

use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use tracing::{debug, info};

use blocksim_protocol::config::SimConfig;
use blocksim_protocol::sim::{SampleStats, Simulation, StreamRng};

/// The parameter a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SweepParam {
    MinLinks,
    TxInterarrival,
    BlockInterarrival,
    LinkSpeed,
}

impl SweepParam {
    /// Writes `value` into the matching field of `config`.
    pub fn apply(self, config: &mut SimConfig, value: f64) {
        match self {
            Self::MinLinks => config.min_links_per_node = value.round().max(0.0) as usize,
            Self::TxInterarrival => config.mean_tx_interarrival = value,
            Self::BlockInterarrival => config.mean_block_interarrival = value,
            Self::LinkSpeed => config.mean_link_speed = value,
        }
    }
}

/// Averages for one swept value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRow {
    pub value: f64,
    pub mean_ttc: f64,
    pub mean_fee: f64,
    pub confirmed_fraction: f64,
}

/// Values from `from` to `to` inclusive in increments of `step`.
pub fn sweep_values(from: f64, to: f64, step: f64) -> Result<Vec<f64>> {
    if !(from.is_finite() && to.is_finite() && step.is_finite()) {
        bail!("sweep bounds must be finite");
    }
    if step <= 0.0 {
        bail!("sweep step must be positive, got {}", step);
    }
    if to < from {
        bail!("sweep range is empty: {} > {}", from, to);
    }

    // Tolerate accumulated rounding at the upper bound.
    let count = ((to - from) / step + 1e-9).floor() as usize + 1;
    Ok((0..count).map(|i| from + step * i as f64).collect())
}

/// Runs `runs` simulations per value and averages them.
pub fn run_sweep(
    base: &SimConfig,
    param: SweepParam,
    values: &[f64],
    runs: u32,
) -> Result<Vec<SweepRow>> {
    if runs == 0 {
        bail!("a sweep needs at least one run per value");
    }

    let mut rows = Vec::with_capacity(values.len());
    for &value in values {
        let mut config = base.clone();
        param.apply(&mut config, value);
        config
            .validate()
            .with_context(|| format!("invalid configuration at {:?} = {}", param, value))?;

        let mut totals = SweepRow {
            value,
            mean_ttc: 0.0,
            mean_fee: 0.0,
            confirmed_fraction: 0.0,
        };
        for run in 0..runs {
            let mut config = config.clone();
            config.seed = base.seed.map(|seed| seed.wrapping_add(u64::from(run)));
            let rng = StreamRng::from_optional_seed(config.seed);
            let report = Simulation::new(config, rng, SampleStats::new())
                .and_then(|mut sim| sim.run())
                .with_context(|| format!("run {} at {:?} = {} failed", run, param, value))?;
            debug!(value, run, mean_ttc = report.mean_time_to_confirmation, "sweep run finished");

            totals.mean_ttc += report.mean_time_to_confirmation;
            totals.mean_fee += report.mean_tx_fee;
            totals.confirmed_fraction += report.confirmed_fraction;
        }

        let n = f64::from(runs);
        let row = SweepRow {
            value,
            mean_ttc: totals.mean_ttc / n,
            mean_fee: totals.mean_fee / n,
            confirmed_fraction: totals.confirmed_fraction / n,
        };
        info!(param = ?param, value, mean_ttc = row.mean_ttc, mean_fee = row.mean_fee, "sweep point done");
        rows.push(row);
    }
    Ok(rows)
}

/// Renders rows as CSV with a header line.
pub fn to_csv(rows: &[SweepRow]) -> String {
    let mut out = String::from("value,mean_ttc,mean_fee,confirmed_fraction\n");
    for row in rows {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{}",
            row.value, row.mean_ttc, row.mean_fee, row.confirmed_fraction
        );
    }
    out
}
