//! Momentum Core: price series, lookbacks, the momentum engine and its collaborators.
//!
//! This crate contains:
//! - Domain types (observations, price series, lookbacks, momentum tables)
//! - The momentum engine: per-symbol computation, ranking, filtering
//! - Data collaborators (Yahoo Finance provider, symbol lists, TTL cache)
//! - CSV persistence and TOML configuration

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod export;

pub use config::{ConfigError, LookbackPolicy, ResolvedConfig, ScreenerConfig, SourceKind};
pub use domain::{
    Lookback, LookbackError, LookbackKind, LookbackSet, MomentumTable, Observation, PriceSeries,
    SeriesError, SymbolMomentum,
};
pub use engine::{
    compute_momentum, compute_table, complete_rows, filter_min, rank, sorted_symbols, EngineParams,
};
pub use export::ExportError;
