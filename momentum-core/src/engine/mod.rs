//! Momentum engine: pure transforms from price series to ranked tables.
//!
//! Nothing in here performs I/O or holds state between calls.

pub mod momentum;
pub mod rank;

pub use momentum::{compute_momentum, compute_table, reference_for, EngineParams};
pub use rank::{complete_rows, filter_min, rank, sorted_symbols};
