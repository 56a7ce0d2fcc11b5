//! # Network Module
//!
//! The simulated peer-to-peer network: node state, the link graph, and the
//! gossip protocol that moves transactions and blocks across it.
//!
//! ## Architecture
//!
//! ```text
//! node.rs      — Per-node knowledge sets and the awareness gate
//! mempool.rs   — Set of unconfirmed transactions a node knows about
//! topology.rs  — Node arena and randomized link graph construction
//! gossip.rs    — Transaction and block broadcast over the link graph
//! ```
//!
//! ## Design Decisions
//!
//! - Nodes live in a single arena (`Network`) and are addressed by their
//!   stable index. Links hold indices, never references.
//! - Suppression works on in-transit sets kept at the *receiving* node:
//!   scheduling a relay to Y marks Y, so no other neighbour of Y schedules
//!   a second copy before the first one lands.

pub mod gossip;
pub mod mempool;
pub mod node;
pub mod topology;

pub use gossip::{GossipError, Propagation};
pub use mempool::Mempool;
pub use node::{Admission, Link, Node, NodeId, NodeKind};
pub use topology::{Network, TopologyError};
