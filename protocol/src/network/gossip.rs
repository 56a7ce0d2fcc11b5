//! # Gossip Protocol
//!
//! Flooding broadcast of transactions and blocks over the link graph.
//!
//! When a node receives something new it stores it and schedules a relay
//! over every link whose far end is not yet aware of it. Each relay fires
//! after the link's speed (twice the speed for blocks) and repeats the
//! process at the receiving node, until the whole connected component has
//! seen the message.
//!
//! ## Suppression
//!
//! Scheduling a relay to Y immediately marks the identifier as in transit
//! at Y. Any other neighbour of Y that broadcasts before the relay lands
//! sees Y as aware and skips it, so between any pair of nodes at most one
//! relay per message is ever in flight.
//!
//! ## Duplicates
//!
//! A node may still be handed a message it already knows (for example, a
//! transaction injected directly at a node that was also a relay target).
//! Such arrivals only clear the in-transit mark; nothing is stored twice
//! and nothing is relayed again.

use thiserror::Error;
use tracing::trace;

use crate::chain::{Block, Transaction};
use crate::config::BLOCK_RELAY_COST_FACTOR;
use crate::network::node::{Admission, NodeId};
use crate::network::topology::Network;
use crate::sim::event::{BlockRelay, Event, TxRelay};
use crate::sim::queue::{ScheduleError, Timeline};

/// Errors raised while broadcasting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GossipError {
    /// A node index outside the arena.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The relay could not be placed on the timeline.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Outcome of one broadcast step at one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
    /// How the message was received at the broadcasting node.
    pub admission: Admission,
    /// Relays scheduled to neighbours.
    pub relays: usize,
}

impl Propagation {
    fn absorbed(admission: Admission) -> Self {
        Self {
            admission,
            relays: 0,
        }
    }
}

impl Network {
    /// Delivers `tx` to node `at` and relays it to every unaware neighbour.
    pub fn broadcast_transaction<T: Timeline + ?Sized>(
        &mut self,
        at: NodeId,
        tx: Transaction,
        timeline: &mut T,
    ) -> Result<Propagation, GossipError> {
        self.check_links(at)?;
        let node = self.node_mut(at).ok_or(GossipError::UnknownNode(at))?;
        let relay_template = tx.clone();

        let admission = node.admit_transaction(tx);
        if !admission.is_accepted() {
            trace!(node = at, tx = relay_template.tx_no, ?admission, "transaction absorbed");
            return Ok(Propagation::absorbed(admission));
        }

        let mut relays = 0;
        for i in 0..self.nodes[at].links().len() {
            let link = self.nodes[at].links()[i];
            let peer = &mut self.nodes[link.peer];
            if peer.aware_of_tx(relay_template.tx_no) {
                continue;
            }
            timeline.schedule_in(
                link.speed,
                Event::TxRelay(TxRelay::new(&relay_template, at, link.peer)),
            )?;
            peer.mark_tx_in_transit(relay_template.tx_no);
            relays += 1;
        }

        trace!(node = at, tx = relay_template.tx_no, relays, "transaction relayed");
        Ok(Propagation { admission, relays })
    }

    /// Delivers `block` to node `at`, confirms its transactions there, and
    /// relays it to every unaware neighbour at twice the link delay.
    pub fn broadcast_block<T: Timeline + ?Sized>(
        &mut self,
        at: NodeId,
        block: Block,
        timeline: &mut T,
    ) -> Result<Propagation, GossipError> {
        self.check_links(at)?;
        let node = self.node_mut(at).ok_or(GossipError::UnknownNode(at))?;
        let block_no = block.block_no;

        let admission = node.admit_block(block);
        if !admission.is_accepted() {
            trace!(node = at, block = block_no, ?admission, "block absorbed");
            return Ok(Propagation::absorbed(admission));
        }

        let mut relays = 0;
        for i in 0..self.nodes[at].links().len() {
            let link = self.nodes[at].links()[i];
            let peer = &mut self.nodes[link.peer];
            if peer.aware_of_block(block_no) {
                continue;
            }
            timeline.schedule_in(
                BLOCK_RELAY_COST_FACTOR * link.speed,
                Event::BlockRelay(BlockRelay {
                    block_no,
                    from: at,
                    to: link.peer,
                }),
            )?;
            peer.mark_block_in_transit(block_no);
            relays += 1;
        }

        trace!(node = at, block = block_no, relays, "block relayed");
        Ok(Propagation { admission, relays })
    }

    /// Verifies that `at` exists and that all its links point inside the
    /// arena, so the relay loops can index without panicking.
    fn check_links(&self, at: NodeId) -> Result<(), GossipError> {
        let node = self.node(at).ok_or(GossipError::UnknownNode(at))?;
        match node.links().iter().find(|l| l.peer >= self.nodes.len()) {
            Some(l) => Err(GossipError::UnknownNode(l.peer)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::node::NodeKind;
    use crate::sim::queue::EventQueue;

    /// 0 - 1 - 2 in a line, plus 0 - 2 directly: a triangle.
    fn triangle() -> Network {
        let kinds = [(NodeKind::Miner, 50), (NodeKind::Relay, 0), (NodeKind::Relay, 0)];
        Network::from_edges(&kinds, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 3.0)]).unwrap()
    }

    fn drain_tx(network: &mut Network, queue: &mut EventQueue) -> Vec<(f64, TxRelay)> {
        let mut delivered = Vec::new();
        while let Some((time, event)) = queue.pop() {
            if let Event::TxRelay(relay) = event {
                network
                    .broadcast_transaction(relay.to, relay.transaction(), queue)
                    .unwrap();
                delivered.push((time, relay));
            }
        }
        delivered
    }

    #[test]
    fn transaction_relays_to_unaware_neighbours_and_marks_them() {
        let mut network = triangle();
        let mut queue = EventQueue::new();

        let p = network
            .broadcast_transaction(0, Transaction::new(1, 0.01, 0.0), &mut queue)
            .unwrap();
        assert_eq!(p, Propagation { admission: Admission::Accepted, relays: 2 });
        assert!(network.node(1).unwrap().tx_in_transit(1));
        assert!(network.node(2).unwrap().tx_in_transit(1));
        assert!(!network.node(1).unwrap().mempool().contains(1));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn no_pair_sees_two_relays_of_the_same_transaction() {
        let mut network = triangle();
        let mut queue = EventQueue::new();
        network
            .broadcast_transaction(0, Transaction::new(1, 0.01, 0.0), &mut queue)
            .unwrap();

        let delivered = drain_tx(&mut network, &mut queue);
        // Node 1 arrives at t=1 and finds node 2 already in transit: no
        // relay 1 -> 2, and nobody relays back to 0.
        let mut pairs: Vec<_> = delivered.iter().map(|(_, r)| (r.from, r.to)).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 1), (0, 2)]);
        assert_eq!(delivered.iter().map(|(t, _)| *t).fold(0.0, f64::max), 3.0);

        for node in network.nodes() {
            assert_eq!(node.mempool().len(), 1);
            assert!(!node.tx_in_transit(1));
        }
    }

    #[test]
    fn repeated_broadcast_keeps_one_entry() {
        let mut network = triangle();
        let mut queue = EventQueue::new();
        let tx = Transaction::new(4, 0.01, 0.0);

        network.broadcast_transaction(1, tx.clone(), &mut queue).unwrap();
        let again = network.broadcast_transaction(1, tx, &mut queue).unwrap();

        assert_eq!(again, Propagation { admission: Admission::Duplicate, relays: 0 });
        assert_eq!(network.node(1).unwrap().mempool().len(), 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn block_confirms_everywhere_and_uses_double_delay() {
        let mut network = triangle();
        let mut queue = EventQueue::new();
        network
            .broadcast_transaction(0, Transaction::new(1, 0.01, 0.0), &mut queue)
            .unwrap();
        drain_tx(&mut network, &mut queue);

        let block = Block::new(1, vec![Transaction::new(1, 0.01, 0.0)], queue.now(), 25.0);
        let p = network.broadcast_block(0, block, &mut queue).unwrap();
        assert_eq!(p.relays, 2);
        assert!(!network.node(0).unwrap().mempool().contains(1));

        let start = queue.now();
        let mut arrivals = Vec::new();
        while let Some((time, event)) = queue.pop() {
            let relay = match event {
                Event::BlockRelay(relay) => relay,
                other => panic!("unexpected event {:?}", other),
            };
            let block = network
                .node(relay.from)
                .and_then(|n| n.known_block(relay.block_no))
                .cloned()
                .unwrap();
            network.broadcast_block(relay.to, block, &mut queue).unwrap();
            arrivals.push((relay.to, time - start));
        }

        arrivals.sort_by_key(|(to, _)| *to);
        assert_eq!(arrivals, vec![(1, 2.0), (2, 6.0)]);
        for node in network.nodes() {
            assert!(node.mempool().is_empty());
            assert_eq!(node.known_blocks().len(), 1);
            assert!(node.has_confirmed(1));
        }
    }

    #[test]
    fn unknown_node_is_an_error() {
        let mut network = triangle();
        let mut queue = EventQueue::new();
        assert_eq!(
            network.broadcast_transaction(9, Transaction::new(1, 0.01, 0.0), &mut queue),
            Err(GossipError::UnknownNode(9))
        );
        assert!(queue.is_empty());
    }
}
