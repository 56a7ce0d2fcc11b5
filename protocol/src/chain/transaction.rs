//! Transactions as seen by the gossip layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Network-global transaction number. Assigned by the driver, starting at 1.
pub type TxNo = u64;

/// A transaction travelling through the network.
///
/// Everything except `confirmation_time` is fixed at creation. The
/// confirmation time is stamped once, when a miner includes the
/// transaction in a block, and is then copied forward with the block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Network-global identifier.
    pub tx_no: TxNo,
    /// Fee offered to the miner that includes the transaction.
    pub fee: f64,
    /// Simulated time at which the transaction was first broadcast.
    pub broadcast_time: f64,
    /// Simulated time of the block that confirmed it, if any.
    pub confirmation_time: Option<f64>,
}

impl Transaction {
    /// Creates an unconfirmed transaction.
    pub fn new(tx_no: TxNo, fee: f64, broadcast_time: f64) -> Self {
        Self {
            tx_no,
            fee,
            broadcast_time,
            confirmation_time: None,
        }
    }

    /// Returns `true` once a miner has included the transaction in a block.
    pub fn is_confirmed(&self) -> bool {
        self.confirmation_time.is_some()
    }

    /// Time between broadcast and confirmation, if confirmed.
    pub fn time_to_confirmation(&self) -> Option<f64> {
        self.confirmation_time.map(|t| t - self.broadcast_time)
    }

    /// Stamps the confirmation time and returns the confirmation latency.
    ///
    /// A transaction is confirmed at most once per copy; stamping an
    /// already confirmed copy keeps the original time.
    pub fn confirm(&mut self, block_time: f64) -> f64 {
        let at = *self.confirmation_time.get_or_insert(block_time);
        at - self.broadcast_time
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{} (fee {:.4})", self.tx_no, self.fee)
    }
}
