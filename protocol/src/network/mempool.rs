//! Per-node transaction pool.
//!
//! Holds the unconfirmed transactions a node has heard about, keyed by
//! transaction number. Inserting a number that is already present is a
//! no-op, so a transaction that reaches a node over two converging paths
//! is stored once.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::chain::{Block, Transaction, TxNo};

/// Unconfirmed transactions known to one node.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: BTreeMap<TxNo, Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tx` unless its number is already present. Returns `true` if
    /// the transaction was inserted.
    pub fn insert(&mut self, tx: Transaction) -> bool {
        match self.transactions.entry(tx.tx_no) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(tx);
                true
            }
        }
    }

    /// Removes and returns the transaction with the given number.
    pub fn remove(&mut self, tx_no: TxNo) -> Option<Transaction> {
        self.transactions.remove(&tx_no)
    }

    /// Drops every transaction the block confirms. Returns how many were
    /// present.
    pub fn remove_confirmed(&mut self, block: &Block) -> usize {
        block
            .tx_nos()
            .filter(|tx_no| self.transactions.remove(tx_no).is_some())
            .count()
    }

    /// Returns `true` if the pool holds the given transaction number.
    pub fn contains(&self, tx_no: TxNo) -> bool {
        self.transactions.contains_key(&tx_no)
    }

    /// Looks up a transaction by number.
    pub fn get(&self, tx_no: TxNo) -> Option<&Transaction> {
        self.transactions.get(&tx_no)
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Iterates in transaction-number order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// Snapshot of the pool sorted by fee, lowest first. Equal fees keep
    /// transaction-number order.
    pub fn by_fee_ascending(&self) -> Vec<Transaction> {
        let mut sorted: Vec<Transaction> = self.transactions.values().cloned().collect();
        // Stable sort over tx_no order keeps ties deterministic.
        sorted.sort_by(|a, b| a.fee.total_cmp(&b.fee));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_has_set_semantics() {
        let mut pool = Mempool::new();
        assert!(pool.insert(Transaction::new(1, 0.01, 0.0)));
        assert!(!pool.insert(Transaction::new(1, 0.99, 5.0)));
        assert_eq!(pool.len(), 1);
        // The first copy wins.
        assert_eq!(pool.get(1).unwrap().fee, 0.01);
    }

    #[test]
    fn remove_confirmed_drops_block_transactions() {
        let mut pool = Mempool::new();
        for n in 1..=4 {
            pool.insert(Transaction::new(n, 0.01, 0.0));
        }
        let block = Block::new(
            1,
            vec![Transaction::new(2, 0.01, 0.0), Transaction::new(9, 0.01, 0.0)],
            1.0,
            25.0,
        );

        assert_eq!(pool.remove_confirmed(&block), 1);
        assert!(!pool.contains(2));
        assert_eq!(pool.iter().map(|tx| tx.tx_no).collect::<Vec<_>>(), vec![1, 3, 4]);
    }

    #[test]
    fn fee_order_is_ascending_with_stable_ties() {
        let mut pool = Mempool::new();
        pool.insert(Transaction::new(1, 0.30, 0.0));
        pool.insert(Transaction::new(2, 0.10, 0.0));
        pool.insert(Transaction::new(3, 0.20, 0.0));
        pool.insert(Transaction::new(4, 0.10, 0.0));

        let order: Vec<_> = pool.by_fee_ascending().iter().map(|tx| tx.tx_no).collect();
        assert_eq!(order, vec![2, 4, 3, 1]);
    }
}
