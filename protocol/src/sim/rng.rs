//! # Random Streams
//!
//! Independent random number streams, one per concern, so that changing
//! how often one stream is consumed (say, more transactions) does not
//! shift the values another stream produces (say, link speeds).
//!
//! All streams derive from a single master seed. A configured seed makes a
//! run reproducible; without one the master seed comes from OS entropy,
//! falling back to wall-clock time mixed with the process id.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use tracing::warn;

use crate::config::MAX_GREEDINESS;

/// Named random streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Transaction interarrival times.
    TxInterarrival,
    /// Block interarrival times.
    BlockInterarrival,
    /// Link propagation delays.
    LinkSpeed,
    /// Choice of nodes: link peers, transaction origins, block miners.
    NodeSelection,
    /// Miner greediness.
    Greediness,
}

impl Stream {
    /// Every stream, in seed derivation order.
    pub const ALL: [Stream; 5] = [
        Stream::TxInterarrival,
        Stream::BlockInterarrival,
        Stream::LinkSpeed,
        Stream::NodeSelection,
        Stream::Greediness,
    ];

    fn index(self) -> usize {
        match self {
            Self::TxInterarrival => 0,
            Self::BlockInterarrival => 1,
            Self::LinkSpeed => 2,
            Self::NodeSelection => 3,
            Self::Greediness => 4,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TxInterarrival => write!(f, "tx_interarrival"),
            Self::BlockInterarrival => write!(f, "block_interarrival"),
            Self::LinkSpeed => write!(f, "link_speed"),
            Self::NodeSelection => write!(f, "node_selection"),
            Self::Greediness => write!(f, "greediness"),
        }
    }
}

/// The random variates the simulation consumes.
pub trait RandomSource {
    /// Exponentially distributed variate with the given mean.
    fn exponential(&mut self, mean: f64, stream: Stream) -> f64;

    /// Uniform index in `[0, bound)`. `bound` must be non-zero.
    fn index(&mut self, bound: usize, stream: Stream) -> usize;

    /// Uniform greediness in `[1, 100]`.
    fn greediness(&mut self, stream: Stream) -> u8;
}

/// [`RandomSource`] backed by one `StdRng` per [`Stream`].
#[derive(Debug, Clone)]
pub struct StreamRng {
    master_seed: u64,
    streams: [StdRng; 5],
}

impl StreamRng {
    /// Deterministic streams derived from `seed`.
    pub fn from_seed(seed: u64) -> Self {
        let mut master = StdRng::seed_from_u64(seed);
        let streams = Stream::ALL.map(|_| StdRng::seed_from_u64(master.gen()));
        Self {
            master_seed: seed,
            streams,
        }
    }

    /// Streams seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::from_seed(entropy_seed())
    }

    /// Uses `seed` when given, OS entropy otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }

    /// The master seed all streams were derived from. Logging it makes an
    /// entropy-seeded run reproducible after the fact.
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    fn stream(&mut self, stream: Stream) -> &mut StdRng {
        &mut self.streams[stream.index()]
    }
}

impl RandomSource for StreamRng {
    fn exponential(&mut self, mean: f64, stream: Stream) -> f64 {
        // Inverse transform; 1 - u lies in (0, 1] so the log is finite.
        let u: f64 = self.stream(stream).gen();
        -mean * (1.0 - u).ln()
    }

    fn index(&mut self, bound: usize, stream: Stream) -> usize {
        self.stream(stream).gen_range(0..bound)
    }

    fn greediness(&mut self, stream: Stream) -> u8 {
        self.stream(stream).gen_range(1..=MAX_GREEDINESS)
    }
}

/// Reads a seed from the OS, falling back to time and process id.
fn entropy_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(e) => {
            warn!(error = %e, "OS entropy unavailable, seeding from clock and pid");
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            nanos ^ u64::from(std::process::id()).rotate_left(32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_streams() {
        let mut a = StreamRng::from_seed(42);
        let mut b = StreamRng::from_seed(42);
        for stream in Stream::ALL {
            assert_eq!(a.exponential(3.0, stream), b.exponential(3.0, stream));
        }
        assert_eq!(a.master_seed(), 42);
    }

    #[test]
    fn streams_are_independent() {
        let mut a = StreamRng::from_seed(7);
        let mut b = StreamRng::from_seed(7);

        // Drain one stream on `a` only; the other streams must not shift.
        for _ in 0..100 {
            a.exponential(1.0, Stream::TxInterarrival);
        }
        assert_eq!(
            a.exponential(2.0, Stream::LinkSpeed),
            b.exponential(2.0, Stream::LinkSpeed)
        );
    }

    #[test]
    fn exponential_mean_is_close() {
        let mut rng = StreamRng::from_seed(1);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| rng.exponential(5.0, Stream::LinkSpeed)).sum();
        let mean = total / n as f64;
        assert!((mean - 5.0).abs() < 0.25, "sample mean {} too far from 5", mean);
    }

    #[test]
    fn exponential_is_non_negative() {
        let mut rng = StreamRng::from_seed(9);
        assert!((0..1_000).all(|_| rng.exponential(1.0, Stream::BlockInterarrival) >= 0.0));
    }

    #[test]
    fn index_and_greediness_stay_in_range() {
        let mut rng = StreamRng::from_seed(3);
        for _ in 0..1_000 {
            assert!(rng.index(7, Stream::NodeSelection) < 7);
            let g = rng.greediness(Stream::Greediness);
            assert!((1..=100).contains(&g));
        }
    }
}
