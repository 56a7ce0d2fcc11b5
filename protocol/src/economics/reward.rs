//! Block reward halving.

use crate::config::SimConfig;

/// Reward halves every `interval` blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardSchedule {
    pub default_reward: f64,
    pub interval: u64,
}

impl RewardSchedule {
    pub fn new(default_reward: f64, interval: u64) -> Self {
        Self {
            default_reward,
            interval,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.default_block_reward, config.blocks_between_reward_changes)
    }

    /// Reward for the block mined after `blocks_mined` earlier blocks:
    /// `default / 2^(blocks_mined / interval)`, integer division on the
    /// exponent. A zero interval never halves.
    pub fn reward_for(&self, blocks_mined: u64) -> f64 {
        let halvings = blocks_mined.checked_div(self.interval).unwrap_or(0);
        // Past 2^1100 the reward underflows to zero anyway.
        let exponent = halvings.min(1_100) as i32;
        self.default_reward / 2f64.powi(exponent)
    }
}
