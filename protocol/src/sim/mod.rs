//! # Discrete-Event Simulation
//!
//! The run loop and everything it owns:
//!
//! - **queue** — time-ordered event timeline, FIFO among equal times.
//! - **event** — the four event kinds and their payloads.
//! - **rng** — independent seeded random streams.
//! - **stats** — running sample statistics.
//! - **driver** — the [`Simulation`] that dispatches events to handlers.
//! - **report** — the end-of-run summary.

pub mod driver;
pub mod event;
pub mod queue;
pub mod report;
pub mod rng;
pub mod stats;

pub use driver::{Counters, SimError, Simulation};
pub use event::{BlockRelay, Event, EventKind, TxRelay};
pub use queue::{EventQueue, ScheduleError, Timeline};
pub use report::{ReportParameters, SimReport};
pub use rng::{RandomSource, Stream, StreamRng};
pub use stats::{MetricId, Metrics, SampleStats, Summary};
