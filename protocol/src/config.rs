//! # Simulation Configuration & Constants
//!
//! Every magic number in blocksim lives here. The constants are the
//! defaults of [`SimConfig`]; a run reads its configuration once at start
//! and never mutates it afterwards.
//!
//! ## Input Formats
//!
//! [`SimConfig::from_path`] accepts two formats:
//!
//! - `*.json` — a (possibly partial) JSON object whose keys match the
//!   `SimConfig` field names. Missing keys take the defaults below.
//! - anything else — the legacy whitespace-separated input file holding
//!   exactly four values:
//!
//! ```text
//! <min_links_per_node> <mean_tx_interarrival> <mean_block_interarrival> <mean_link_speed>
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Network Shape
// ---------------------------------------------------------------------------

/// Total number of nodes on the simulated network.
pub const NUMBER_NODES: usize = 10;

/// Fraction of the nodes that are miners rather than relay nodes.
pub const MINER_FRACTION: f64 = 0.1;

/// Minimum number of links every node must end up with.
pub const MIN_LINKS_PER_NODE: usize = 4;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Mean time between two newly created transactions.
pub const MEAN_TX_INTERARRIVAL: f64 = 10.0;

/// Blocks arrive this many times less often than transactions unless the
/// block interarrival is configured explicitly.
pub const BLOCK_INTERARRIVAL_MULTIPLIER: f64 = 10.0;

/// Mean propagation delay of a link. Larger is slower.
pub const MEAN_LINK_SPEED: f64 = 2.0;

/// Blocks cost this many times a link's speed to cross it.
pub const BLOCK_RELAY_COST_FACTOR: f64 = 2.0;

// ---------------------------------------------------------------------------
// Economics
// ---------------------------------------------------------------------------

/// Fee carried by a transaction when no fee history is available.
pub const DEFAULT_FEE: f64 = 0.01;

/// Reward paid for the first blocks, before any halving.
pub const DEFAULT_BLOCK_REWARD: f64 = 25.0;

/// Number of blocks between two reward halvings.
pub const BLOCKS_BETWEEN_REWARD_CHANGES: u64 = 10;

/// An empty block is treated as if its transactions had waited this many
/// times the network-wide mean confirmation latency.
pub const EMPTY_BLOCK_TTC_PENALTY: f64 = 10.0;

/// Upper bound of the greediness scale.
pub const MAX_GREEDINESS: u8 = 100;

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

/// The simulation stops after this many blocks are mined network-wide.
pub const MAX_BLOCKS: u64 = 100;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a [`SimConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The JSON document did not match the configuration schema.
    #[error("invalid JSON configuration in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The legacy input file did not hold four numeric fields.
    #[error("malformed input file {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// A parameter is outside its admissible range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Parameters of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of nodes in the network.
    pub node_count: usize,
    /// Fraction of nodes created as miners. The miner count is
    /// `round(node_count * miner_fraction)`.
    pub miner_fraction: f64,
    /// Minimum degree every node reaches during topology construction.
    pub min_links_per_node: usize,
    /// Mean of the exponential transaction interarrival time.
    pub mean_tx_interarrival: f64,
    /// Mean of the exponential block interarrival time.
    pub mean_block_interarrival: f64,
    /// Mean of the exponential link speed distribution.
    pub mean_link_speed: f64,
    /// Fee used on cold start.
    pub default_fee: f64,
    /// Block reward before any halving.
    pub default_block_reward: f64,
    /// Blocks between two reward halvings.
    pub blocks_between_reward_changes: u64,
    /// Blocks mined network-wide before the run stops.
    pub max_blocks: u64,
    /// Fixed greediness for every miner. When `None`, each miner draws a
    /// uniform greediness in `[1, 100]`.
    pub miner_greediness: Option<u8>,
    /// Master seed for all random streams. When `None`, seeds come from
    /// OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: NUMBER_NODES,
            miner_fraction: MINER_FRACTION,
            min_links_per_node: MIN_LINKS_PER_NODE,
            mean_tx_interarrival: MEAN_TX_INTERARRIVAL,
            mean_block_interarrival: MEAN_TX_INTERARRIVAL * BLOCK_INTERARRIVAL_MULTIPLIER,
            mean_link_speed: MEAN_LINK_SPEED,
            default_fee: DEFAULT_FEE,
            default_block_reward: DEFAULT_BLOCK_REWARD,
            blocks_between_reward_changes: BLOCKS_BETWEEN_REWARD_CHANGES,
            max_blocks: MAX_BLOCKS,
            miner_greediness: None,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Loads a configuration from disk. See the module docs for formats.
    ///
    /// The result is validated before it is returned.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config = if is_json {
            serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
                path: display,
                source,
            })?
        } else {
            Self::from_legacy_input(&raw).map_err(|reason| ConfigError::Malformed {
                path: display,
                reason,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parses the four-field legacy input format on top of the defaults.
    fn from_legacy_input(raw: &str) -> Result<Self, String> {
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(format!("expected 4 fields, found {}", fields.len()));
        }

        let min_links = fields[0]
            .parse::<usize>()
            .map_err(|e| format!("min_links_per_node `{}`: {}", fields[0], e))?;
        let mut floats = [0.0f64; 3];
        for (slot, field) in floats.iter_mut().zip(&fields[1..]) {
            *slot = field
                .parse::<f64>()
                .map_err(|e| format!("`{}`: {}", field, e))?;
        }

        Ok(Self {
            min_links_per_node: min_links,
            mean_tx_interarrival: floats[0],
            mean_block_interarrival: floats[1],
            mean_link_speed: floats[2],
            ..Self::default()
        })
    }

    /// Number of miner nodes this configuration produces.
    pub fn miner_count(&self) -> usize {
        (self.node_count as f64 * self.miner_fraction).round() as usize
    }

    /// Checks every parameter against its admissible range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count < 2 {
            return Err(invalid("node_count", format!("need at least 2 nodes, got {}", self.node_count)));
        }
        if !(self.miner_fraction > 0.0 && self.miner_fraction <= 1.0) {
            return Err(invalid(
                "miner_fraction",
                format!("must be in (0, 1], got {}", self.miner_fraction),
            ));
        }
        if self.miner_count() == 0 {
            return Err(invalid(
                "miner_fraction",
                format!(
                    "{} of {} nodes rounds to zero miners",
                    self.miner_fraction, self.node_count
                ),
            ));
        }
        if self.min_links_per_node == 0 || self.min_links_per_node >= self.node_count {
            return Err(invalid(
                "min_links_per_node",
                format!(
                    "must be in [1, {}] for {} nodes, got {}",
                    self.node_count - 1,
                    self.node_count,
                    self.min_links_per_node
                ),
            ));
        }
        for (name, value) in [
            ("mean_tx_interarrival", self.mean_tx_interarrival),
            ("mean_block_interarrival", self.mean_block_interarrival),
            ("mean_link_speed", self.mean_link_speed),
            ("default_fee", self.default_fee),
            ("default_block_reward", self.default_block_reward),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(name, format!("must be positive and finite, got {}", value)));
            }
        }
        if self.blocks_between_reward_changes == 0 {
            return Err(invalid("blocks_between_reward_changes", "must be non-zero".into()));
        }
        if self.max_blocks == 0 {
            return Err(invalid("max_blocks", "must be non-zero".into()));
        }
        if let Some(g) = self.miner_greediness {
            if g == 0 || g > MAX_GREEDINESS {
                return Err(invalid(
                    "miner_greediness",
                    format!("must be in [1, {}], got {}", MAX_GREEDINESS, g),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidParameter { name, reason }
}
