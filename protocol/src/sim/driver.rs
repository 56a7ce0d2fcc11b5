//! # Simulation Driver
//!
//! Owns the network, the event queue, the random streams and the sample
//! statistics, and dispatches every event to its handler.
//!
//! ## Event Handlers
//!
//! ```text
//! NEW_TRANSACTION — random node prices and broadcasts a new tx, re-arms
//! NEW_BLOCK       — random miner selects txs, mines, broadcasts, re-arms
//! TX_RELAY        — delivers a tx copy to the target node
//! BLOCK_RELAY     — delivers the sender's block snapshot to the target
//! ```
//!
//! Handlers keep no state of their own beyond the counters; everything
//! else lives in the nodes. The run stops once `max_blocks` blocks have
//! been mined network-wide.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::chain::{Block, BlockNo, Transaction, TxNo};
use crate::config::{ConfigError, SimConfig};
use crate::economics::{FeePolicy, InclusionPolicy, RewardSchedule};
use crate::network::{GossipError, Network, NodeId, Propagation, TopologyError};
use crate::sim::event::{BlockRelay, Event, EventKind, TxRelay};
use crate::sim::queue::{EventQueue, ScheduleError, Timeline};
use crate::sim::report::SimReport;
use crate::sim::rng::{RandomSource, Stream, StreamRng};
use crate::sim::stats::{MetricId, Metrics, SampleStats};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that stop a simulation run.
///
/// Apart from configuration and topology failures, every variant is an
/// invariant violation carried by an event payload or a driver call.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Gossip(#[from] GossipError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// A node index outside the arena.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// A block relay names a block its sender does not know.
    #[error("block {block_no} is not known at sending node {from}")]
    UnknownBlock { block_no: BlockNo, from: NodeId },

    /// Blocks can only be mined at miner nodes.
    #[error("node {0} is not a miner")]
    NotAMiner(NodeId),

    /// The timeline emptied before the run finished.
    #[error("event queue ran dry after {blocks_mined} of {max_blocks} blocks")]
    QueueExhausted { blocks_mined: u64, max_blocks: u64 },
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Network-wide tallies kept by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub blocks_mined: u64,
    pub transactions_created: u64,
    pub tx_relays: u64,
    pub block_relays: u64,
    pub events_processed: u64,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A single simulation run.
#[derive(Debug)]
pub struct Simulation<R: RandomSource = StreamRng, M: Metrics = SampleStats> {
    config: SimConfig,
    network: Network,
    queue: EventQueue,
    rng: R,
    metrics: M,
    fees: FeePolicy,
    inclusion: InclusionPolicy,
    rewards: RewardSchedule,
    counters: Counters,
    /// Every transaction number confirmed by at least one block.
    confirmed: HashSet<TxNo>,
    started: bool,
}

impl<R: RandomSource, M: Metrics> Simulation<R, M> {
    /// Validates `config` and builds a fresh topology from `rng`.
    pub fn new(config: SimConfig, mut rng: R, metrics: M) -> Result<Self, SimError> {
        config.validate()?;
        let network = Network::build(&config, &mut rng)?;
        Ok(Self::assemble(config, network, rng, metrics))
    }

    /// Runs on a prebuilt network. The network must contain a miner.
    pub fn with_network(config: SimConfig, network: Network, rng: R, metrics: M) -> Result<Self, SimError> {
        config.validate()?;
        if network.miners().is_empty() {
            return Err(TopologyError::NoMiners.into());
        }
        Ok(Self::assemble(config, network, rng, metrics))
    }

    fn assemble(config: SimConfig, network: Network, rng: R, metrics: M) -> Self {
        Self {
            fees: FeePolicy::from_config(&config),
            inclusion: InclusionPolicy::from_config(&config),
            rewards: RewardSchedule::from_config(&config),
            config,
            network,
            queue: EventQueue::new(),
            rng,
            metrics,
            counters: Counters::default(),
            confirmed: HashSet::new(),
            started: false,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Current simulated time.
    pub fn now(&self) -> f64 {
        self.queue.now()
    }

    /// Number of events waiting on the timeline.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Number of distinct transactions confirmed so far.
    pub fn confirmed_transactions(&self) -> usize {
        self.confirmed.len()
    }

    /// Returns `true` once `max_blocks` blocks have been mined.
    pub fn is_finished(&self) -> bool {
        self.counters.blocks_mined >= self.config.max_blocks
    }

    /// Consumes the run and hands back the metrics sink.
    pub fn into_metrics(self) -> M {
        self.metrics
    }

    // -----------------------------------------------------------------------
    // Running
    // -----------------------------------------------------------------------

    /// Arms the first transaction and block arrivals. Idempotent.
    pub fn start(&mut self) -> Result<(), SimError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.arm(EventKind::NewTransaction)?;
        self.arm(EventKind::NewBlock)?;
        info!(
            nodes = self.network.len(),
            miners = self.network.miners().len(),
            max_blocks = self.config.max_blocks,
            "simulation started"
        );
        Ok(())
    }

    /// Runs until `max_blocks` blocks are mined and returns the report.
    pub fn run(&mut self) -> Result<SimReport, SimError> {
        self.start()?;
        while !self.is_finished() {
            if self.step()?.is_none() {
                return Err(SimError::QueueExhausted {
                    blocks_mined: self.counters.blocks_mined,
                    max_blocks: self.config.max_blocks,
                });
            }
        }
        let report = self.report();
        info!(
            blocks = report.blocks_mined,
            transactions = report.transactions_created,
            mean_ttc = report.mean_time_to_confirmation,
            time = report.simulated_time,
            "simulation finished"
        );
        Ok(report)
    }

    /// Processes every event scheduled at or before `time`. Returns the
    /// number of events handled.
    pub fn run_until(&mut self, time: f64) -> Result<u64, SimError> {
        let mut handled = 0;
        while self.queue.peek_time().map_or(false, |t| t <= time) {
            self.step()?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Pops and handles the next event. Returns `None` if the queue is empty.
    pub fn step(&mut self) -> Result<Option<EventKind>, SimError> {
        let Some((time, event)) = self.queue.pop() else {
            return Ok(None);
        };
        let kind = event.kind();
        self.counters.events_processed += 1;
        debug!(time, event = %kind, "dispatching event");

        match event {
            Event::NewTransaction => self.new_transaction()?,
            Event::NewBlock => self.new_block()?,
            Event::TxRelay(relay) => self.tx_relay(relay)?,
            Event::BlockRelay(relay) => self.block_relay(relay)?,
        }
        Ok(Some(kind))
    }

    /// Snapshot report of the run so far.
    pub fn report(&self) -> SimReport {
        SimReport::new(
            &self.config,
            self.network.miners().len(),
            self.counters,
            self.confirmed.len() as u64,
            self.metrics.mean(MetricId::TimeToConfirmation),
            self.metrics.mean(MetricId::TxFee),
            self.now(),
        )
    }

    // -----------------------------------------------------------------------
    // Driver-originated actions
    // -----------------------------------------------------------------------

    /// Creates a transaction with an explicit fee at `node` and broadcasts
    /// it. Does not re-arm anything.
    pub fn inject_transaction(&mut self, node: NodeId, fee: f64) -> Result<TxNo, SimError> {
        if self.network.node(node).is_none() {
            return Err(SimError::UnknownNode(node));
        }
        self.metrics.record(MetricId::TxFee, fee);
        self.originate_transaction(node, fee)
    }

    /// Mines a block at `miner` from its current mempool and broadcasts it.
    /// Does not re-arm anything.
    pub fn mine_block_at(&mut self, miner: NodeId) -> Result<BlockNo, SimError> {
        let node = self.network.node(miner).ok_or(SimError::UnknownNode(miner))?;
        if !node.is_miner() {
            return Err(SimError::NotAMiner(miner));
        }

        let now = self.now();
        let reward = self.rewards.reward_for(self.counters.blocks_mined);
        let included = self
            .inclusion
            .decide_included_tx_list(node, reward, now, &mut self.metrics);
        self.confirmed.extend(included.iter().map(|tx| tx.tx_no));

        self.counters.blocks_mined += 1;
        let block_no = self.counters.blocks_mined;
        let block = Block::new(block_no, included, now, reward);
        debug!(miner, %block, "block mined");

        let propagation = self.network.broadcast_block(miner, block, &mut self.queue)?;
        self.count_relays(EventKind::BlockRelay, propagation);
        Ok(block_no)
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn new_transaction(&mut self) -> Result<(), SimError> {
        let origin = self.rng.index(self.network.len(), Stream::NodeSelection);
        let node = self.network.node(origin).ok_or(SimError::UnknownNode(origin))?;
        let fee = self.fees.decide_tx_fee(node, &mut self.metrics);
        self.originate_transaction(origin, fee)?;
        self.arm(EventKind::NewTransaction)
    }

    fn new_block(&mut self) -> Result<(), SimError> {
        let miners = self.network.miners();
        let miner = miners[self.rng.index(miners.len(), Stream::NodeSelection)];
        self.mine_block_at(miner)?;
        self.arm(EventKind::NewBlock)
    }

    fn tx_relay(&mut self, relay: TxRelay) -> Result<(), SimError> {
        if self.network.node(relay.to).is_none() {
            return Err(SimError::UnknownNode(relay.to));
        }
        let propagation = self
            .network
            .broadcast_transaction(relay.to, relay.transaction(), &mut self.queue)?;
        self.count_relays(EventKind::TxRelay, propagation);
        Ok(())
    }

    fn block_relay(&mut self, relay: BlockRelay) -> Result<(), SimError> {
        let sender = self
            .network
            .node(relay.from)
            .ok_or(SimError::UnknownNode(relay.from))?;
        let block = sender
            .known_block(relay.block_no)
            .cloned()
            .ok_or(SimError::UnknownBlock {
                block_no: relay.block_no,
                from: relay.from,
            })?;
        if self.network.node(relay.to).is_none() {
            return Err(SimError::UnknownNode(relay.to));
        }
        let propagation = self.network.broadcast_block(relay.to, block, &mut self.queue)?;
        self.count_relays(EventKind::BlockRelay, propagation);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn originate_transaction(&mut self, node: NodeId, fee: f64) -> Result<TxNo, SimError> {
        self.counters.transactions_created += 1;
        let tx_no = self.counters.transactions_created;
        let tx = Transaction::new(tx_no, fee, self.now());
        debug!(node, %tx, "transaction created");

        let propagation = self.network.broadcast_transaction(node, tx, &mut self.queue)?;
        self.count_relays(EventKind::TxRelay, propagation);
        Ok(tx_no)
    }

    /// Schedules the next arrival of a self-re-arming event kind.
    fn arm(&mut self, kind: EventKind) -> Result<(), SimError> {
        let (event, mean, stream) = match kind {
            EventKind::NewTransaction => (
                Event::NewTransaction,
                self.config.mean_tx_interarrival,
                Stream::TxInterarrival,
            ),
            EventKind::NewBlock => (
                Event::NewBlock,
                self.config.mean_block_interarrival,
                Stream::BlockInterarrival,
            ),
            EventKind::TxRelay | EventKind::BlockRelay => return Ok(()),
        };
        let delay = self.rng.exponential(mean, stream);
        self.queue.schedule_in(delay, event)?;
        Ok(())
    }

    fn count_relays(&mut self, kind: EventKind, propagation: Propagation) {
        let relays = propagation.relays as u64;
        match kind {
            EventKind::BlockRelay => self.counters.block_relays += relays,
            _ => self.counters.tx_relays += relays,
        }
    }
}

impl Simulation<StreamRng, SampleStats> {
    /// Builds a run with the default random streams and statistics, seeded
    /// from `config.seed` or OS entropy.
    pub fn from_config(config: SimConfig) -> Result<Self, SimError> {
        let rng = StreamRng::from_optional_seed(config.seed);
        Self::new(config, rng, SampleStats::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NodeKind;

    fn small_config() -> SimConfig {
        SimConfig {
            node_count: 10,
            min_links_per_node: 2,
            max_blocks: 20,
            seed: Some(11),
            ..SimConfig::default()
        }
    }

    /// 0 (miner) - 1 - 2, speeds 1.0.
    fn line() -> Simulation {
        let kinds = [(NodeKind::Miner, 100), (NodeKind::Relay, 0), (NodeKind::Relay, 0)];
        let network = Network::from_edges(&kinds, &[(0, 1, 1.0), (1, 2, 1.0)]).unwrap();
        let config = SimConfig {
            node_count: 3,
            min_links_per_node: 1,
            miner_fraction: 1.0 / 3.0,
            ..SimConfig::default()
        };
        Simulation::with_network(config, network, StreamRng::from_seed(1), SampleStats::new()).unwrap()
    }

    #[test]
    fn run_stops_at_max_blocks() {
        let mut sim = Simulation::from_config(small_config()).unwrap();
        let report = sim.run().unwrap();

        assert_eq!(report.blocks_mined, 20);
        assert!(sim.is_finished());
        assert!(report.confirmed_fraction >= 0.0 && report.confirmed_fraction <= 1.0);
        assert!(report.simulated_time > 0.0);
    }

    #[test]
    fn same_seed_same_report() {
        let a = Simulation::from_config(small_config()).unwrap().run().unwrap();
        let b = Simulation::from_config(small_config()).unwrap().run().unwrap();
        assert_eq!(a.transactions_created, b.transactions_created);
        assert_eq!(a.tx_relays, b.tx_relays);
        assert_eq!(a.mean_time_to_confirmation, b.mean_time_to_confirmation);
        assert_eq!(a.mean_tx_fee, b.mean_tx_fee);
    }

    #[test]
    fn injected_transaction_reaches_the_end_of_the_line() {
        let mut sim = line();
        assert_eq!(sim.inject_transaction(0, 0.01).unwrap(), 1);
        assert_eq!(sim.counters().tx_relays, 1);

        sim.run_until(1.5).unwrap();
        assert!(sim.network().node(1).unwrap().mempool().contains(1));
        assert!(!sim.network().node(2).unwrap().mempool().contains(1));

        sim.run_until(2.0).unwrap();
        assert!(sim.network().node(2).unwrap().mempool().contains(1));
        assert_eq!(sim.counters().tx_relays, 2);
        assert_eq!(sim.pending_events(), 0);
    }

    #[test]
    fn mined_block_confirms_across_the_network() {
        let mut sim = line();
        sim.inject_transaction(2, 0.01).unwrap();
        sim.run_until(10.0).unwrap();

        let block_no = sim.mine_block_at(0).unwrap();
        assert_eq!(block_no, 1);
        assert_eq!(sim.confirmed_transactions(), 1);
        assert_eq!(sim.metrics().mean(MetricId::TimeToConfirmation), 2.0);

        sim.run_until(100.0).unwrap();
        for node in sim.network().nodes() {
            assert!(node.mempool().is_empty());
            assert_eq!(node.known_blocks().len(), 1);
            let block = node.latest_block().unwrap();
            assert_eq!(block.transactions[0].confirmation_time, Some(2.0));
        }

        let report = sim.report();
        assert_eq!(report.confirmed_fraction, 1.0);
        assert_eq!(report.block_relays, 2);
    }

    #[test]
    fn mining_at_a_relay_is_rejected() {
        let mut sim = line();
        assert!(matches!(sim.mine_block_at(1), Err(SimError::NotAMiner(1))));
        assert!(matches!(sim.mine_block_at(7), Err(SimError::UnknownNode(7))));
        assert!(matches!(sim.inject_transaction(7, 0.01), Err(SimError::UnknownNode(7))));
    }

    #[test]
    fn block_relay_from_unaware_sender_is_an_error() {
        let mut sim = line();
        sim.queue
            .schedule_in(1.0, Event::BlockRelay(BlockRelay { block_no: 9, from: 1, to: 2 }))
            .unwrap();
        assert!(matches!(
            sim.step(),
            Err(SimError::UnknownBlock { block_no: 9, from: 1 })
        ));
    }

    #[test]
    fn tx_relay_to_unknown_node_is_an_error() {
        let mut sim = line();
        let relay = TxRelay::new(&Transaction::new(1, 0.01, 0.0), 0, 42);
        sim.queue.schedule_in(1.0, Event::TxRelay(relay)).unwrap();
        assert!(matches!(sim.step(), Err(SimError::UnknownNode(42))));
    }

    #[test]
    fn start_is_idempotent() {
        let mut sim = line();
        sim.start().unwrap();
        sim.start().unwrap();
        assert_eq!(sim.pending_events(), 2);
    }

    #[test]
    fn rewards_halve_as_blocks_are_mined() {
        let mut sim = line();
        for _ in 0..11 {
            sim.mine_block_at(0).unwrap();
        }
        let miner = sim.network().node(0).unwrap();
        let rewards: Vec<_> = miner.known_blocks().iter().map(|b| b.reward).collect();
        assert_eq!(rewards[0], 25.0);
        assert_eq!(rewards[9], 25.0);
        assert_eq!(rewards[10], 12.5);
    }
}
