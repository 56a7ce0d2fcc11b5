//! # Transaction Inclusion
//!
//! Chooses the mempool entries a miner puts into a new block.
//!
//! ```text
//! reward_factor         = 1 - block_reward / default_block_reward
//! effective_greediness  = g + (100 - g) * reward_factor      (clamped to [0, 100])
//! included              = floor(effective_greediness / 100 * |mempool|)
//! ```
//!
//! The mempool is sorted by fee ascending and the *prefix* of that length
//! is included, lowest fees first. Every included copy is stamped with the
//! block time and its confirmation latency recorded into
//! [`MetricId::TimeToConfirmation`].

use tracing::debug;

use crate::chain::Transaction;
use crate::config::{SimConfig, MAX_GREEDINESS};
use crate::network::Node;
use crate::sim::stats::{MetricId, Metrics};

/// Parameters of the inclusion policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InclusionPolicy {
    pub default_block_reward: f64,
}

impl InclusionPolicy {
    pub fn new(default_block_reward: f64) -> Self {
        Self {
            default_block_reward,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.default_block_reward)
    }

    /// Greediness after accounting for reward decay, clamped to `[0, 100]`.
    pub fn effective_greediness(&self, greediness: u8, block_reward: f64) -> f64 {
        let g = f64::from(greediness);
        let max = f64::from(MAX_GREEDINESS);
        let reward_factor = 1.0 - block_reward / self.default_block_reward;
        (g + (max - g) * reward_factor).clamp(0.0, max)
    }

    /// Number of mempool entries to include.
    pub fn selection_len(&self, greediness: u8, block_reward: f64, mempool_len: usize) -> usize {
        if greediness == 0 || mempool_len == 0 {
            return 0;
        }
        let effective = self.effective_greediness(greediness, block_reward);
        // Multiply first: an integral effective greediness then floors exactly.
        let len = (effective * mempool_len as f64 / f64::from(MAX_GREEDINESS)).floor();
        (len as usize).min(mempool_len)
    }

    /// Selects, stamps, and returns the transactions `miner` includes in a
    /// block mined at `block_time` for `block_reward`.
    pub fn decide_included_tx_list<M: Metrics + ?Sized>(
        &self,
        miner: &Node,
        block_reward: f64,
        block_time: f64,
        metrics: &mut M,
    ) -> Vec<Transaction> {
        let mempool = miner.mempool();
        let take = self.selection_len(miner.greediness(), block_reward, mempool.len());
        if take == 0 {
            return Vec::new();
        }

        let mut included = mempool.by_fee_ascending();
        included.truncate(take);
        for tx in &mut included {
            let ttc = tx.confirm(block_time);
            metrics.record(MetricId::TimeToConfirmation, ttc);
        }

        debug!(
            miner = miner.node_no(),
            greediness = miner.greediness(),
            block_reward,
            pending = mempool.len(),
            included = included.len(),
            "transactions selected"
        );
        included
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, NodeKind};
    use crate::sim::queue::EventQueue;
    use crate::sim::stats::SampleStats;

    fn miner_with_fees(greediness: u8, fees: &[f64]) -> Network {
        let mut network = Network::from_edges(&[(NodeKind::Miner, greediness)], &[]).unwrap();
        let mut queue = EventQueue::new();
        for (i, &fee) in fees.iter().enumerate() {
            let tx = Transaction::new(i as u64 + 1, fee, i as f64);
            network.broadcast_transaction(0, tx, &mut queue).unwrap();
        }
        network
    }

    #[test]
    fn half_greedy_takes_cheapest_half() {
        let network = miner_with_fees(50, &[0.5, 0.1, 0.4, 0.2, 0.3]);
        let mut stats = SampleStats::new();
        let policy = InclusionPolicy::new(25.0);

        let included = policy.decide_included_tx_list(&network.nodes()[0], 25.0, 10.0, &mut stats);

        // floor(0.5 * 5) = 2, lowest fees first.
        let fees: Vec<_> = included.iter().map(|tx| tx.fee).collect();
        assert_eq!(fees, vec![0.1, 0.2]);
        assert!(included.iter().all(|tx| tx.confirmation_time == Some(10.0)));

        // Broadcast times were 1.0 and 3.0.
        assert_eq!(stats.count(MetricId::TimeToConfirmation), 2);
        assert_eq!(stats.mean(MetricId::TimeToConfirmation), 8.0);
    }

    #[test]
    fn selection_does_not_touch_the_mempool() {
        let network = miner_with_fees(100, &[0.1, 0.2]);
        let mut stats = SampleStats::new();
        InclusionPolicy::new(25.0).decide_included_tx_list(&network.nodes()[0], 25.0, 5.0, &mut stats);

        let miner = &network.nodes()[0];
        assert_eq!(miner.mempool().len(), 2);
        assert!(miner.mempool().iter().all(|tx| !tx.is_confirmed()));
    }

    #[test]
    fn empty_mempool_or_zero_greediness_includes_nothing() {
        let policy = InclusionPolicy::new(25.0);
        let mut stats = SampleStats::new();

        let empty = miner_with_fees(80, &[]);
        assert!(policy.decide_included_tx_list(&empty.nodes()[0], 25.0, 1.0, &mut stats).is_empty());

        let relay = {
            let mut network = Network::from_edges(&[(NodeKind::Relay, 0)], &[]).unwrap();
            let mut queue = EventQueue::new();
            network.broadcast_transaction(0, Transaction::new(1, 0.1, 0.0), &mut queue).unwrap();
            network
        };
        assert!(policy.decide_included_tx_list(&relay.nodes()[0], 25.0, 1.0, &mut stats).is_empty());
        assert_eq!(stats.count(MetricId::TimeToConfirmation), 0);
    }

    #[test]
    fn reward_decay_raises_greediness() {
        let policy = InclusionPolicy::new(25.0);
        assert_eq!(policy.effective_greediness(50, 25.0), 50.0);
        // Half reward: 50 + 50 * 0.5
        assert_eq!(policy.effective_greediness(50, 12.5), 75.0);
        assert_eq!(policy.selection_len(50, 12.5, 10), 7);
        // No reward left: everyone is fully inclusive.
        assert_eq!(policy.effective_greediness(1, 0.0), 100.0);
        assert_eq!(policy.selection_len(1, 0.0, 9), 9);
    }

    #[test]
    fn full_reward_selection_floors_exactly() {
        let policy = InclusionPolicy::new(25.0);
        for g in 1..=100u8 {
            for n in 1..=200usize {
                assert_eq!(
                    policy.selection_len(g, 25.0, n),
                    usize::from(g) * n / 100,
                    "greediness {} mempool {}",
                    g,
                    n
                );
            }
        }
        // 0.29 * 100 is 28.999... in floating point.
        assert_eq!(policy.selection_len(29, 25.0, 100), 29);
    }

    #[test]
    fn effective_greediness_is_clamped() {
        let policy = InclusionPolicy::new(25.0);
        // A reward above the default would push greediness negative.
        assert_eq!(policy.effective_greediness(10, 100.0), 0.0);
        assert_eq!(policy.selection_len(10, 100.0, 10), 0);
        assert_eq!(policy.effective_greediness(100, -25.0), 100.0);
        assert_eq!(policy.selection_len(100, -25.0, 4), 4);
    }
}
