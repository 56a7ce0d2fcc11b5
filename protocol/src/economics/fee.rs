//! # Adaptive Transaction Fees
//!
//! A node prices a new transaction from the most recent block it has seen:
//!
//! ```text
//! fee = avg_fee(latest block) * avg_ttc(latest block) / avg_ttc(network)
//! ```
//!
//! Fees rise when recent confirmations were slower than the network-wide
//! average and fall when they were faster. An empty latest block counts as
//! having waited `EMPTY_BLOCK_TTC_PENALTY` times the network average, and
//! borrows the network-wide mean fee since it has none of its own.
//!
//! Whenever a term is zero (no blocks yet, no confirmations yet) the
//! default fee is used.

use tracing::trace;

use crate::config::{SimConfig, EMPTY_BLOCK_TTC_PENALTY};
use crate::network::Node;
use crate::sim::stats::{MetricId, Metrics};

/// Parameters of the fee estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeePolicy {
    pub default_fee: f64,
    pub empty_block_penalty: f64,
}

impl FeePolicy {
    pub fn new(default_fee: f64) -> Self {
        Self {
            default_fee,
            empty_block_penalty: EMPTY_BLOCK_TTC_PENALTY,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.default_fee)
    }

    /// Fee a new transaction created at `node` should carry. The result is
    /// recorded into [`MetricId::TxFee`].
    pub fn decide_tx_fee<M: Metrics + ?Sized>(&self, node: &Node, metrics: &mut M) -> f64 {
        let fee = self.estimate(node, &*metrics);
        metrics.record(MetricId::TxFee, fee);
        fee
    }

    fn estimate<M: Metrics + ?Sized>(&self, node: &Node, metrics: &M) -> f64 {
        let overall_ttc = metrics.mean(MetricId::TimeToConfirmation);

        let (avg_ttc, avg_fee) = match node.latest_block() {
            None => (0.0, 0.0),
            Some(block) if block.is_empty() => (
                self.empty_block_penalty * overall_ttc,
                metrics.mean(MetricId::TxFee),
            ),
            Some(block) => (
                block.average_confirmation_time().unwrap_or(0.0),
                block.average_fee().unwrap_or(0.0),
            ),
        };

        if avg_ttc <= 0.0 || avg_fee <= 0.0 || overall_ttc <= 0.0 {
            return self.default_fee;
        }

        let fee = avg_fee * (avg_ttc / overall_ttc);
        trace!(node = node.node_no(), avg_ttc, avg_fee, overall_ttc, fee, "fee estimated");
        fee
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Block, Transaction};
    use crate::network::{NodeKind, Network};
    use crate::sim::queue::EventQueue;
    use crate::sim::stats::SampleStats;

    fn confirmed(tx_no: u64, fee: f64, broadcast: f64, at: f64) -> Transaction {
        let mut tx = Transaction::new(tx_no, fee, broadcast);
        tx.confirm(at);
        tx
    }

    fn node_with_block(block: Block) -> Network {
        let mut network = Network::from_edges(&[(NodeKind::Relay, 0)], &[]).unwrap();
        let mut queue = EventQueue::new();
        network.broadcast_block(0, block, &mut queue).unwrap();
        network
    }

    #[test]
    fn cold_start_uses_default_fee() {
        let network = Network::from_edges(&[(NodeKind::Relay, 0)], &[]).unwrap();
        let mut stats = SampleStats::new();
        let policy = FeePolicy::new(0.01);

        assert_eq!(policy.decide_tx_fee(&network.nodes()[0], &mut stats), 0.01);
        assert_eq!(stats.count(MetricId::TxFee), 1);
        assert_eq!(stats.mean(MetricId::TxFee), 0.01);
    }

    #[test]
    fn slow_recent_block_raises_fee() {
        // Latest block: fees 0.02 and 0.04 (avg 0.03), waited 8 and 4 (avg 6).
        let block = Block::new(
            1,
            vec![confirmed(1, 0.02, 2.0, 10.0), confirmed(2, 0.04, 6.0, 10.0)],
            10.0,
            25.0,
        );
        let network = node_with_block(block);
        let mut stats = SampleStats::new();
        stats.record(MetricId::TimeToConfirmation, 3.0);

        let fee = FeePolicy::new(0.01).decide_tx_fee(&network.nodes()[0], &mut stats);
        assert!((fee - 0.06).abs() < 1e-12, "fee {}", fee);
    }

    #[test]
    fn empty_block_applies_penalty_with_network_mean_fee() {
        let network = node_with_block(Block::new(1, vec![], 10.0, 25.0));
        let mut stats = SampleStats::new();
        stats.record(MetricId::TimeToConfirmation, 2.0);
        stats.record(MetricId::TxFee, 0.02);

        // avg_ttc = 10 * 2, avg_fee = 0.02, overall = 2  =>  0.2
        let fee = FeePolicy::new(0.01).decide_tx_fee(&network.nodes()[0], &mut stats);
        assert!((fee - 0.2).abs() < 1e-12, "fee {}", fee);
    }

    #[test]
    fn empty_block_without_history_falls_back() {
        let network = node_with_block(Block::new(1, vec![], 10.0, 25.0));
        let mut stats = SampleStats::new();
        assert_eq!(FeePolicy::new(0.01).decide_tx_fee(&network.nodes()[0], &mut stats), 0.01);
    }

    #[test]
    fn zero_network_ttc_falls_back() {
        let block = Block::new(1, vec![confirmed(1, 0.05, 0.0, 4.0)], 4.0, 25.0);
        let network = node_with_block(block);
        let mut stats = SampleStats::new();
        stats.record(MetricId::TimeToConfirmation, 0.0);
        assert_eq!(FeePolicy::new(0.01).decide_tx_fee(&network.nodes()[0], &mut stats), 0.01);
    }
}
