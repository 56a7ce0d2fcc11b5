//! # Block Structure
//!
//! A block carries a snapshot of the transactions its miner chose to
//! include, stamped with the block time. The snapshot is reference
//! counted: relaying a block to a neighbour hands over the same immutable
//! list instead of cloning every transaction.

use std::fmt;
use std::sync::Arc;

use crate::chain::transaction::{Transaction, TxNo};

/// Network-global, monotonic block number. Assigned by the driver.
pub type BlockNo = u64;

/// A mined block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Network-global identifier.
    pub block_no: BlockNo,
    /// Included transactions, lowest fee first. Immutable after creation.
    pub transactions: Arc<[Transaction]>,
    /// Simulated time at which the block was mined.
    pub block_time: f64,
    /// Reward the miner collected for this block.
    pub reward: f64,
}

impl Block {
    /// Builds a block from the transactions a miner selected.
    pub fn new(block_no: BlockNo, transactions: Vec<Transaction>, block_time: f64, reward: f64) -> Self {
        Self {
            block_no,
            transactions: transactions.into(),
            block_time,
            reward,
        }
    }

    /// Number of transactions in the block.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns `true` if the block confirms no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Iterates over the numbers of the confirmed transactions.
    pub fn tx_nos(&self) -> impl Iterator<Item = TxNo> + '_ {
        self.transactions.iter().map(|tx| tx.tx_no)
    }

    /// Mean fee over the block's transactions, `None` for an empty block.
    pub fn average_fee(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let total: f64 = self.transactions.iter().map(|tx| tx.fee).sum();
        Some(total / self.len() as f64)
    }

    /// Mean confirmation latency over the block's transactions, `None` for
    /// an empty block. Unconfirmed entries count as zero latency.
    pub fn average_confirmation_time(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let total: f64 = self
            .transactions
            .iter()
            .map(|tx| tx.time_to_confirmation().unwrap_or(0.0))
            .sum();
        Some(total / self.len() as f64)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block#{} ({} txs, reward {:.4}, t={:.3})",
            self.block_no,
            self.len(),
            self.reward,
            self.block_time
        )
    }
}
