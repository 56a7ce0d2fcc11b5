//! # Run Report
//!
//! Summary of a finished (or paused) run. Serializes to JSON for tooling
//! and renders as plain text in the line layout the plotting scripts
//! expect: four parameter lines, then block count, transaction count,
//! mean time-to-confirmation and mean fee. Extra lines follow those.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SimConfig;
use crate::sim::driver::Counters;

/// Parameters echoed at the top of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportParameters {
    pub node_count: usize,
    pub miner_count: usize,
    pub min_links_per_node: usize,
    pub mean_tx_interarrival: f64,
    pub mean_block_interarrival: f64,
    pub mean_link_speed: f64,
    pub default_block_reward: f64,
    pub max_blocks: u64,
    /// Master seed, when known. Re-running with it reproduces the report.
    pub seed: Option<u64>,
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub parameters: ReportParameters,
    pub blocks_mined: u64,
    pub transactions_created: u64,
    /// Distinct transactions included in at least one block.
    pub transactions_confirmed: u64,
    pub confirmed_fraction: f64,
    pub mean_time_to_confirmation: f64,
    pub mean_tx_fee: f64,
    pub tx_relays: u64,
    pub block_relays: u64,
    pub events_processed: u64,
    /// Simulated clock when the report was taken.
    pub simulated_time: f64,
    pub generated_at: DateTime<Utc>,
}

impl SimReport {
    pub(crate) fn new(
        config: &SimConfig,
        miner_count: usize,
        counters: Counters,
        transactions_confirmed: u64,
        mean_time_to_confirmation: f64,
        mean_tx_fee: f64,
        simulated_time: f64,
    ) -> Self {
        let confirmed_fraction = if counters.transactions_created == 0 {
            0.0
        } else {
            transactions_confirmed as f64 / counters.transactions_created as f64
        };

        Self {
            parameters: ReportParameters {
                node_count: config.node_count,
                miner_count,
                min_links_per_node: config.min_links_per_node,
                mean_tx_interarrival: config.mean_tx_interarrival,
                mean_block_interarrival: config.mean_block_interarrival,
                mean_link_speed: config.mean_link_speed,
                default_block_reward: config.default_block_reward,
                max_blocks: config.max_blocks,
                seed: config.seed,
            },
            blocks_mined: counters.blocks_mined,
            transactions_created: counters.transactions_created,
            transactions_confirmed,
            confirmed_fraction,
            mean_time_to_confirmation,
            mean_tx_fee,
            tx_relays: counters.tx_relays,
            block_relays: counters.block_relays,
            events_processed: counters.events_processed,
            simulated_time,
            generated_at: Utc::now(),
        }
    }
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.parameters;
        writeln!(f, "Mean interarrival time for transactions: {:.3}", p.mean_tx_interarrival)?;
        writeln!(f, "Mean link speed: {:.3}", p.mean_link_speed)?;
        writeln!(f, "Block reward: {}", p.default_block_reward)?;
        writeln!(f, "Min links per node: {}", p.min_links_per_node)?;
        writeln!(f, "Number of blocks: {}", self.blocks_mined)?;
        writeln!(f, "Number of transactions: {}", self.transactions_created)?;
        writeln!(f, "Mean time-to-confirmation: {:.4}", self.mean_time_to_confirmation)?;
        writeln!(f, "Average transaction fee: {:.6}", self.mean_tx_fee)?;
        writeln!(f, "Fraction confirmed: {:.4}", self.confirmed_fraction)?;
        writeln!(f, "Mean interarrival time for blocks: {:.3}", p.mean_block_interarrival)?;
        writeln!(f, "Simulated time: {:.3}", self.simulated_time)?;
        writeln!(f, "Relays: {} transaction, {} block", self.tx_relays, self.block_relays)?;
        match p.seed {
            Some(seed) => write!(f, "Seed: {}", seed),
            None => write!(f, "Seed: unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> SimReport {
        let counters = Counters {
            blocks_mined: 100,
            transactions_created: 1000,
            tx_relays: 5000,
            block_relays: 400,
            events_processed: 6600,
        };
        let config = SimConfig {
            seed: Some(7),
            ..SimConfig::default()
        };
        SimReport::new(&config, 1, counters, 950, 42.5, 0.0125, 10_000.0)
    }

    #[test]
    fn confirmed_fraction_uses_distinct_confirmations() {
        assert_eq!(report().confirmed_fraction, 0.95);
    }

    #[test]
    fn confirmed_fraction_is_zero_without_transactions() {
        let r = SimReport::new(&SimConfig::default(), 1, Counters::default(), 0, 0.0, 0.0, 0.0);
        assert_eq!(r.confirmed_fraction, 0.0);
    }

    #[test]
    fn text_layout_matches_the_plotting_scripts() {
        let text = report().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "Block reward: 25");
        assert_eq!(lines[4].split_whitespace().nth(3), Some("100"));
        assert_eq!(lines[5].split_whitespace().nth(3), Some("1000"));
        assert_eq!(lines[6].split_whitespace().nth(2), Some("42.5000"));
        assert_eq!(lines[7].split_whitespace().nth(3), Some("0.012500"));
        assert_eq!(lines.last(), Some(&"Seed: 7"));
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["blocks_mined"], 100);
        assert_eq!(json["parameters"]["seed"], 7);
        assert!(json["generated_at"].is_string());
    }
}
