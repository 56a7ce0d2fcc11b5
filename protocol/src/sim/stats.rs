//! Running sample statistics.
//!
//! The simulation records two series: the time each confirmed transaction
//! waited and the fee each new transaction offered. Only running
//! aggregates are kept, never the samples themselves.

use std::fmt;

use serde::Serialize;

/// The series the simulation samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricId {
    /// Broadcast-to-inclusion latency of a confirmed transaction.
    TimeToConfirmation,
    /// Fee chosen for a new transaction.
    TxFee,
}

impl MetricId {
    fn index(self) -> usize {
        match self {
            Self::TimeToConfirmation => 0,
            Self::TxFee => 1,
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeToConfirmation => write!(f, "time_to_confirmation"),
            Self::TxFee => write!(f, "tx_fee"),
        }
    }
}

/// Sink for sampled values.
pub trait Metrics {
    /// Records one sample.
    fn record(&mut self, id: MetricId, value: f64);

    /// Mean of all samples so far, `0.0` when there are none.
    fn mean(&self, id: MetricId) -> f64;

    /// Number of samples recorded.
    fn count(&self, id: MetricId) -> u64;
}

/// Aggregates for a single series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub count: u64,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Summary {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Mean of the samples, `0.0` when empty.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// In-memory [`Metrics`] implementation.
#[derive(Debug, Clone, Default)]
pub struct SampleStats {
    series: [Summary; 2],
}

impl SampleStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full aggregates for one series.
    pub fn summary(&self, id: MetricId) -> Summary {
        self.series[id.index()]
    }
}

impl Metrics for SampleStats {
    fn record(&mut self, id: MetricId, value: f64) {
        self.series[id.index()].record(value);
    }

    fn mean(&self, id: MetricId) -> f64 {
        self.series[id.index()].mean()
    }

    fn count(&self, id: MetricId) -> u64 {
        self.series[id.index()].count
    }
}
