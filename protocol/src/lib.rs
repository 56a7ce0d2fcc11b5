// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Blocksim Protocol — Core Library
//!
//! A discrete-event simulator of how transactions and blocks spread through
//! a randomly wired peer-to-peer network, and of what that spreading does
//! to fees and time-to-confirmation.
//!
//! ## Architecture
//!
//! - **chain** — Transactions and blocks, the payloads being gossiped.
//! - **network** — Node state, mempools, topology and the gossip protocol.
//! - **economics** — Fee estimation, transaction selection and block rewards.
//! - **sim** — Event queue, random streams, statistics and the run driver.
//! - **config** — Simulation constants and the loadable run configuration.
//!
//! ## Design Decisions
//!
//! 1. Single-threaded and deterministic: one seed reproduces a whole run.
//! 2. Nodes live in an arena and refer to each other by index.
//! 3. Blocks carry an immutable snapshot of their transactions, so the
//!    sender's copy can be handed to every receiver without re-copying.
//! 4. Randomness and statistics sit behind traits so tests can pin them.

pub mod chain;
pub mod config;
pub mod economics;
pub mod network;
pub mod sim;

pub use config::SimConfig;
pub use sim::{SimError, SimReport, Simulation};
