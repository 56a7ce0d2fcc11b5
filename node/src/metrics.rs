//! # Prometheus Metrics
//!
//! Mirrors a simulation run into a dedicated [`prometheus::Registry`] so it
//! can be dumped in the text exposition format next to the report.
//!
//! [`PrometheusMetrics`] is itself the run's [`Metrics`] sink: every sample
//! the simulator records lands both in the exact running statistics it
//! reads back and in a histogram.

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

use blocksim_protocol::network::Network;
use blocksim_protocol::sim::{MetricId, Metrics, SampleStats, SimReport};

/// Holds all Prometheus metric handles for a run.
pub struct PrometheusMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Exact statistics the simulator reads back.
    samples: SampleStats,
    pub blocks_mined_total: IntCounter,
    pub transactions_created_total: IntCounter,
    pub transactions_confirmed_total: IntCounter,
    pub tx_relays_total: IntCounter,
    pub block_relays_total: IntCounter,
    /// Unconfirmed transactions summed over every node's mempool.
    pub mempool_transactions: IntGauge,
    /// Largest single mempool at the end of the run.
    pub mempool_max: IntGauge,
    pub confirmed_fraction: Gauge,
    /// Time-to-confirmation in simulated time units.
    pub time_to_confirmation: Histogram,
    pub tx_fee: Histogram,
}

fn register<C: prometheus::core::Collector + Clone + 'static>(
    registry: &Registry,
    collector: C,
) -> Result<C, prometheus::Error> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl PrometheusMetrics {
    /// Creates and registers all metrics under the `blocksim` prefix.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("blocksim".into()), None)?;

        let counter = |name: &str, help: &str| register(&registry, IntCounter::new(name, help)?);
        let blocks_mined_total = counter("blocks_mined_total", "Blocks mined network-wide")?;
        let transactions_created_total = counter("transactions_created_total", "Transactions created")?;
        let transactions_confirmed_total = counter(
            "transactions_confirmed_total",
            "Distinct transactions included in at least one block",
        )?;
        let tx_relays_total = counter("tx_relays_total", "Transaction relays scheduled")?;
        let block_relays_total = counter("block_relays_total", "Block relays scheduled")?;

        let mempool_transactions = register(
            &registry,
            IntGauge::new("mempool_transactions", "Unconfirmed transactions across all mempools")?,
        )?;
        let mempool_max = register(
            &registry,
            IntGauge::new("mempool_max", "Largest single mempool")?,
        )?;
        let confirmed_fraction = register(
            &registry,
            Gauge::new("confirmed_fraction", "Fraction of created transactions confirmed")?,
        )?;

        let time_to_confirmation = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "time_to_confirmation",
                    "Time from broadcast to inclusion in a block, in simulated time units",
                )
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 14)?),
            )?,
        )?;
        let tx_fee = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new("tx_fee", "Fee attached to each new transaction")
                    .buckets(prometheus::exponential_buckets(0.000_5, 2.0, 14)?),
            )?,
        )?;

        Ok(Self {
            registry,
            samples: SampleStats::new(),
            blocks_mined_total,
            transactions_created_total,
            transactions_confirmed_total,
            tx_relays_total,
            block_relays_total,
            mempool_transactions,
            mempool_max,
            confirmed_fraction,
            time_to_confirmation,
            tx_fee,
        })
    }

    /// The exact running statistics.
    pub fn samples(&self) -> &SampleStats {
        &self.samples
    }

    /// Adds a finished run's tallies to the counters.
    pub fn observe_report(&self, report: &SimReport) {
        self.blocks_mined_total.inc_by(report.blocks_mined);
        self.transactions_created_total.inc_by(report.transactions_created);
        self.transactions_confirmed_total.inc_by(report.transactions_confirmed);
        self.tx_relays_total.inc_by(report.tx_relays);
        self.block_relays_total.inc_by(report.block_relays);
        self.confirmed_fraction.set(report.confirmed_fraction);
    }

    /// Snapshots mempool sizes.
    pub fn observe_network(&self, network: &Network) {
        let sizes = network.nodes().iter().map(|node| node.mempool().len());
        let (total, max) = sizes.fold((0usize, 0usize), |(t, m), len| (t + len, m.max(len)));
        self.mempool_transactions.set(total as i64);
        self.mempool_max.set(max as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Metrics for PrometheusMetrics {
    fn record(&mut self, id: MetricId, value: f64) {
        self.samples.record(id, value);
        match id {
            MetricId::TimeToConfirmation => self.time_to_confirmation.observe(value),
            MetricId::TxFee => self.tx_fee.observe(value),
        }
    }

    fn mean(&self, id: MetricId) -> f64 {
        self.samples.mean(id)
    }

    fn count(&self, id: MetricId) -> u64 {
        self.samples.count(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_feed_both_statistics_and_histograms() {
        let mut metrics = PrometheusMetrics::new().unwrap();
        metrics.record(MetricId::TimeToConfirmation, 4.0);
        metrics.record(MetricId::TimeToConfirmation, 8.0);
        metrics.record(MetricId::TxFee, 0.01);

        assert_eq!(metrics.mean(MetricId::TimeToConfirmation), 6.0);
        assert_eq!(metrics.count(MetricId::TxFee), 1);
        assert_eq!(metrics.time_to_confirmation.get_sample_count(), 2);
        assert_eq!(metrics.time_to_confirmation.get_sample_sum(), 12.0);
    }

    #[test]
    fn encoded_output_is_prefixed() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.blocks_mined_total.inc_by(3);
        let text = metrics.encode().unwrap();
        assert!(text.contains("blocksim_blocks_mined_total 3"));
        assert!(text.contains("blocksim_time_to_confirmation_bucket"));
    }
}
