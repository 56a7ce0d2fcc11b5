//! # Topology
//!
//! Builds the node arena and a randomized undirected link graph.
//!
//! The first `round(node_count * miner_fraction)` nodes are miners, the
//! rest relays. Each node, in creation order, is then linked to uniformly
//! random peers it is not yet linked to until its degree reaches
//! `min_links_per_node`. Every link is created as a symmetric pair whose
//! speed is drawn from an exponential distribution.
//!
//! The construction guarantees the minimum degree but not connectivity.
//! With realistic parameters the graph is connected with high probability;
//! [`Network::is_connected`] checks it and the builder logs a warning when
//! it is not.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::network::node::{Node, NodeId, NodeKind};
use crate::sim::rng::{RandomSource, Stream};

/// Errors raised while building the link graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The requested degree cannot be reached with this many nodes.
    #[error("cannot give every node {min_links} links with only {node_count} nodes")]
    Infeasible { min_links: usize, node_count: usize },

    /// A node still needs links but is already linked to every other node.
    #[error("node {node} is linked to every other node but still below the minimum degree")]
    Saturated { node: NodeId },

    /// The configuration yields no miner nodes.
    #[error("network has no miner nodes")]
    NoMiners,

    /// An explicit edge names a node outside the arena.
    #[error("edge {a} <-> {b} names an unknown node")]
    UnknownNode { a: NodeId, b: NodeId },

    /// An explicit edge links a node to itself.
    #[error("node {node} cannot link to itself")]
    SelfLink { node: NodeId },
}

/// Arena owning every node for the lifetime of a run.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    miners: Vec<NodeId>,
}

impl Network {
    /// Builds nodes and links according to `config`.
    pub fn build<R: RandomSource + ?Sized>(config: &SimConfig, rng: &mut R) -> Result<Self, TopologyError> {
        let node_count = config.node_count;
        let min_links = config.min_links_per_node;
        if min_links >= node_count {
            return Err(TopologyError::Infeasible {
                min_links,
                node_count,
            });
        }

        let miner_count = config.miner_count().min(node_count);
        if miner_count == 0 {
            return Err(TopologyError::NoMiners);
        }

        let mut network = Network::default();
        for node_no in 0..node_count {
            if node_no < miner_count {
                let greediness = config
                    .miner_greediness
                    .unwrap_or_else(|| rng.greediness(Stream::Greediness));
                debug!(node = node_no, greediness, "created MINER node");
                network.push_node(Node::new(node_no, NodeKind::Miner, greediness));
            } else {
                debug!(node = node_no, "created RELAY node");
                network.push_node(Node::new(node_no, NodeKind::Relay, 0));
            }
        }

        for node_no in 0..node_count {
            while network.nodes[node_no].degree() < min_links {
                let candidates: Vec<NodeId> = (0..node_count)
                    .filter(|&peer| peer != node_no && !network.nodes[node_no].is_linked_to(peer))
                    .collect();
                if candidates.is_empty() {
                    return Err(TopologyError::Saturated { node: node_no });
                }
                let peer = candidates[rng.index(candidates.len(), Stream::NodeSelection)];
                let speed = rng.exponential(config.mean_link_speed, Stream::LinkSpeed);
                debug!(node = node_no, peer, speed, "linking nodes");
                network.link(node_no, peer, speed);
            }
        }

        if !network.is_connected() {
            warn!(
                nodes = node_count,
                min_links, "generated topology is not connected; some nodes will never hear some messages"
            );
        }
        info!(
            nodes = node_count,
            miners = miner_count,
            links = network.link_count(),
            "topology built"
        );

        Ok(network)
    }

    /// Appends a node. Its index must equal its `node_no`.
    pub(crate) fn push_node(&mut self, node: Node) {
        debug_assert_eq!(node.node_no(), self.nodes.len());
        if node.is_miner() {
            self.miners.push(node.node_no());
        }
        self.nodes.push(node);
    }

    /// Creates the symmetric link pair `a <-> b`.
    pub(crate) fn link(&mut self, a: NodeId, b: NodeId, speed: f64) {
        self.nodes[a].add_link(b, speed);
        self.nodes[b].add_link(a, speed);
    }

    /// Assembles a network from explicit nodes and edges.
    ///
    /// Node `i` of `kinds` gets index `i`; miners take the paired
    /// greediness. Edges are `(a, b, speed)` between two distinct existing
    /// nodes.
    pub fn from_edges(
        kinds: &[(NodeKind, u8)],
        edges: &[(NodeId, NodeId, f64)],
    ) -> Result<Self, TopologyError> {
        let mut network = Network::default();
        for (node_no, &(kind, greediness)) in kinds.iter().enumerate() {
            network.push_node(Node::new(node_no, kind, greediness));
        }
        for &(a, b, speed) in edges {
            if a >= network.len() || b >= network.len() {
                return Err(TopologyError::UnknownNode { a, b });
            }
            if a == b {
                return Err(TopologyError::SelfLink { node: a });
            }
            network.link(a, b, speed);
        }
        Ok(network)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Indices of the miner nodes, ascending.
    pub fn miners(&self) -> &[NodeId] {
        &self.miners
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of undirected links.
    pub fn link_count(&self) -> usize {
        self.nodes.iter().map(Node::degree).sum::<usize>() / 2
    }

    /// Smallest degree over all nodes.
    pub fn min_degree(&self) -> usize {
        self.nodes.iter().map(Node::degree).min().unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Graph checks
    // -----------------------------------------------------------------------

    /// Returns `true` if every link has a mirror link with the same speed.
    pub fn is_symmetric(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.links().iter().all(|link| {
                self.nodes
                    .get(link.peer)
                    .and_then(|peer| peer.link_speed(node.node_no()))
                    == Some(link.speed)
            })
        })
    }

    /// Returns `true` if every node can reach every other node.
    pub fn is_connected(&self) -> bool {
        if self.nodes.is_empty() {
            return true;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([0]);
        seen[0] = true;
        while let Some(id) = queue.pop_front() {
            for link in self.nodes[id].links() {
                if !seen[link.peer] {
                    seen[link.peer] = true;
                    queue.push_back(link.peer);
                }
            }
        }
        seen.into_iter().all(|s| s)
    }

    /// Cumulative link speed of the fastest path from `source` to every
    /// node. Unreachable nodes get `f64::INFINITY`.
    pub fn path_latencies(&self, source: NodeId) -> Vec<f64> {
        let mut dist = vec![f64::INFINITY; self.nodes.len()];
        if source >= self.nodes.len() {
            return dist;
        }

        #[derive(PartialEq)]
        struct Entry(f64, NodeId);
        impl Eq for Entry {}
        impl Ord for Entry {
            fn cmp(&self, other: &Self) -> Ordering {
                other.0.total_cmp(&self.0).then_with(|| other.1.cmp(&self.1))
            }
        }
        impl PartialOrd for Entry {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        dist[source] = 0.0;
        let mut heap = BinaryHeap::from([Entry(0.0, source)]);
        while let Some(Entry(d, id)) = heap.pop() {
            if d > dist[id] {
                continue;
            }
            for link in self.nodes[id].links() {
                let next = d + link.speed;
                if next < dist[link.peer] {
                    dist[link.peer] = next;
                    heap.push(Entry(next, link.peer));
                }
            }
        }
        dist
    }
}
