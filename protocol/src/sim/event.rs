//! Typed simulation events.
//!
//! Every event kind carries its own payload struct, so a handler can only
//! read the fields that belong to it.

use std::fmt;

use crate::chain::{BlockNo, Transaction, TxNo};
use crate::network::NodeId;

/// Discriminant of an [`Event`], used for logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NewTransaction,
    NewBlock,
    TxRelay,
    BlockRelay,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewTransaction => write!(f, "new_transaction"),
            Self::NewBlock => write!(f, "new_block"),
            Self::TxRelay => write!(f, "tx_relay"),
            Self::BlockRelay => write!(f, "block_relay"),
        }
    }
}

/// A transaction crossing one link.
#[derive(Debug, Clone, PartialEq)]
pub struct TxRelay {
    pub tx_no: TxNo,
    pub fee: f64,
    pub broadcast_time: f64,
    pub confirmation_time: Option<f64>,
    /// Node that scheduled the relay.
    pub from: NodeId,
    /// Node the transaction arrives at.
    pub to: NodeId,
}

impl TxRelay {
    /// Captures the fields of `tx` for delivery from `from` to `to`.
    pub fn new(tx: &Transaction, from: NodeId, to: NodeId) -> Self {
        Self {
            tx_no: tx.tx_no,
            fee: tx.fee,
            broadcast_time: tx.broadcast_time,
            confirmation_time: tx.confirmation_time,
            from,
            to,
        }
    }

    /// Rebuilds the transaction copy handed to the receiving node.
    pub fn transaction(&self) -> Transaction {
        Transaction {
            tx_no: self.tx_no,
            fee: self.fee,
            broadcast_time: self.broadcast_time,
            confirmation_time: self.confirmation_time,
        }
    }
}

/// A block crossing one link. The transaction snapshot is looked up in
/// the sending node's known blocks when the relay fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRelay {
    pub block_no: BlockNo,
    pub from: NodeId,
    pub to: NodeId,
}

/// Everything the event queue can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Create a transaction at a random node.
    NewTransaction,
    /// Mine a block at a random miner.
    NewBlock,
    /// Deliver a transaction to a neighbour.
    TxRelay(TxRelay),
    /// Deliver a block to a neighbour.
    BlockRelay(BlockRelay),
}

impl Event {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NewTransaction => EventKind::NewTransaction,
            Self::NewBlock => EventKind::NewBlock,
            Self::TxRelay(_) => EventKind::TxRelay,
            Self::BlockRelay(_) => EventKind::BlockRelay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_relay_round_trips_the_transaction() {
        let mut tx = Transaction::new(7, 0.02, 3.5);
        tx.confirm(9.0);

        let relay = TxRelay::new(&tx, 1, 4);
        assert_eq!(relay.transaction(), tx);
        assert_eq!(Event::TxRelay(relay).kind(), EventKind::TxRelay);
    }
}
