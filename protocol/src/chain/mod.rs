//! # Chain Values
//!
//! The two values that travel across the simulated network: transactions
//! and blocks. Both are plain data. A node never shares a mutable
//! transaction with another node; it hands over a copy, and a block's
//! transaction list is an immutable snapshot taken when the block is mined.
//!
//! ```text
//! transaction.rs — Transaction, TxNo
//! block.rs       — Block, BlockNo
//! ```

pub mod block;
pub mod transaction;

pub use block::{Block, BlockNo};
pub use transaction::{Transaction, TxNo};
