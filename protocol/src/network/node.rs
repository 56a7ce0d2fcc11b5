//! # Node State
//!
//! Everything a single node knows: its links, the unconfirmed transactions
//! in its mempool, the blocks it has seen, and the identifiers currently in
//! flight towards it.
//!
//! ## Awareness
//!
//! A node is *aware* of a transaction if it holds it in its mempool, has
//! seen a block confirming it, or has it in flight towards it. Blocks work
//! the same way minus the confirmation case. Awareness is the only gate the
//! gossip protocol consults before scheduling a relay.
//!
//! In-transit sets never count as "known": a node cannot mine or price
//! from a transaction that has not arrived yet.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::{Block, BlockNo, Transaction, TxNo};
use crate::network::mempool::Mempool;

/// Stable index of a node in the network arena.
pub type NodeId = usize;

/// Role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Relays transactions and blocks, never mines.
    Relay,
    /// Relays and mines.
    Miner,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay => write!(f, "RELAY"),
            Self::Miner => write!(f, "MINER"),
        }
    }
}

/// One direction of an undirected link. Links are always created in pairs
/// with equal speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// The node at the other end.
    pub peer: NodeId,
    /// Propagation delay across the link. Larger is slower.
    pub speed: f64,
}

/// What happened when a transaction or block reached a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// New to the node; it was stored and may be relayed.
    Accepted,
    /// Already known; nothing changed.
    Duplicate,
    /// The transaction is already confirmed by a block this node knows.
    AlreadyConfirmed,
}

impl Admission {
    /// Returns `true` if the node stored something new.
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

/// A simulated network participant.
#[derive(Debug, Clone)]
pub struct Node {
    node_no: NodeId,
    kind: NodeKind,
    /// 1..=100 for miners, 0 for relays.
    greediness: u8,
    links: Vec<Link>,
    mempool: Mempool,
    known_blocks: Vec<Block>,
    known_block_nos: HashSet<BlockNo>,
    /// Every transaction confirmed by a block in `known_blocks`.
    confirmed_tx_nos: HashSet<TxNo>,
    in_transit_tx_nos: HashSet<TxNo>,
    in_transit_block_nos: HashSet<BlockNo>,
}

impl Node {
    /// Creates a node with no links and empty knowledge.
    ///
    /// Relay nodes ignore `greediness` and store zero.
    pub fn new(node_no: NodeId, kind: NodeKind, greediness: u8) -> Self {
        let greediness = match kind {
            NodeKind::Miner => greediness,
            NodeKind::Relay => 0,
        };
        Self {
            node_no,
            kind,
            greediness,
            links: Vec::new(),
            mempool: Mempool::new(),
            known_blocks: Vec::new(),
            known_block_nos: HashSet::new(),
            confirmed_tx_nos: HashSet::new(),
            in_transit_tx_nos: HashSet::new(),
            in_transit_block_nos: HashSet::new(),
        }
    }

    pub fn node_no(&self) -> NodeId {
        self.node_no
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_miner(&self) -> bool {
        self.kind == NodeKind::Miner
    }

    pub fn greediness(&self) -> u8 {
        self.greediness
    }

    /// Outbound links, in creation order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn degree(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if a link to `peer` exists.
    pub fn is_linked_to(&self, peer: NodeId) -> bool {
        self.links.iter().any(|l| l.peer == peer)
    }

    /// Speed of the link to `peer`, if any.
    pub fn link_speed(&self, peer: NodeId) -> Option<f64> {
        self.links.iter().find(|l| l.peer == peer).map(|l| l.speed)
    }

    pub(crate) fn add_link(&mut self, peer: NodeId, speed: f64) {
        self.links.push(Link { peer, speed });
    }

    /// Unconfirmed transactions this node knows.
    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Blocks in arrival order.
    pub fn known_blocks(&self) -> &[Block] {
        &self.known_blocks
    }

    /// The most recently arrived block.
    pub fn latest_block(&self) -> Option<&Block> {
        self.known_blocks.last()
    }

    /// Finds a known block by number.
    pub fn known_block(&self, block_no: BlockNo) -> Option<&Block> {
        if !self.known_block_nos.contains(&block_no) {
            return None;
        }
        self.known_blocks.iter().rev().find(|b| b.block_no == block_no)
    }

    /// Returns `true` if a known block confirms the transaction.
    pub fn has_confirmed(&self, tx_no: TxNo) -> bool {
        self.confirmed_tx_nos.contains(&tx_no)
    }

    // -----------------------------------------------------------------------
    // Awareness
    // -----------------------------------------------------------------------

    /// Known, confirmed, or on its way here.
    pub fn aware_of_tx(&self, tx_no: TxNo) -> bool {
        self.mempool.contains(tx_no)
            || self.confirmed_tx_nos.contains(&tx_no)
            || self.in_transit_tx_nos.contains(&tx_no)
    }

    /// Known or on its way here.
    pub fn aware_of_block(&self, block_no: BlockNo) -> bool {
        self.known_block_nos.contains(&block_no) || self.in_transit_block_nos.contains(&block_no)
    }

    pub fn tx_in_transit(&self, tx_no: TxNo) -> bool {
        self.in_transit_tx_nos.contains(&tx_no)
    }

    pub fn block_in_transit(&self, block_no: BlockNo) -> bool {
        self.in_transit_block_nos.contains(&block_no)
    }

    pub(crate) fn mark_tx_in_transit(&mut self, tx_no: TxNo) {
        self.in_transit_tx_nos.insert(tx_no);
    }

    pub(crate) fn mark_block_in_transit(&mut self, block_no: BlockNo) {
        self.in_transit_block_nos.insert(block_no);
    }

    // -----------------------------------------------------------------------
    // Arrival
    // -----------------------------------------------------------------------

    /// A transaction reaches this node. Clears its in-transit mark and
    /// stores it unless already known or confirmed.
    pub(crate) fn admit_transaction(&mut self, tx: Transaction) -> Admission {
        self.in_transit_tx_nos.remove(&tx.tx_no);
        if self.confirmed_tx_nos.contains(&tx.tx_no) {
            return Admission::AlreadyConfirmed;
        }
        if self.mempool.insert(tx) {
            Admission::Accepted
        } else {
            Admission::Duplicate
        }
    }

    /// A block reaches this node. Clears its in-transit mark, appends it to
    /// the known blocks and drops every transaction it confirms from the
    /// mempool.
    pub(crate) fn admit_block(&mut self, block: Block) -> Admission {
        self.in_transit_block_nos.remove(&block.block_no);
        if !self.known_block_nos.insert(block.block_no) {
            return Admission::Duplicate;
        }
        self.mempool.remove_confirmed(&block);
        self.confirmed_tx_nos.extend(block.tx_nos());
        self.known_blocks.push(block);
        Admission::Accepted
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {} ({}, {} links, {} pending, {} blocks)",
            self.node_no,
            self.kind,
            self.degree(),
            self.mempool.len(),
            self.known_blocks.len()
        )
    }
}
