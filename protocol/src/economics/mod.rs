//! # Economic Policy
//!
//! How nodes price new transactions and how miners fill blocks.
//!
//! ```text
//! fee.rs       — Adaptive fee for a new transaction
//! inclusion.rs — Which mempool entries a miner puts into a block
//! reward.rs    — Block reward halving schedule
//! ```
//!
//! ## Greediness
//!
//! A miner's greediness (1..=100) is its willingness to include
//! *low-value* transactions. Selection sorts the mempool by fee ascending
//! and takes a prefix: a greediness of 50 includes the cheapest half. As
//! the block reward decays, miners grow more inclusive, because fees are
//! all that is left to collect.

pub mod fee;
pub mod inclusion;
pub mod reward;

pub use fee::FeePolicy;
pub use inclusion::InclusionPolicy;
pub use reward::RewardSchedule;
