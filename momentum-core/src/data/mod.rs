//! External collaborators: price providers, symbol lists, collection, caching.

pub mod circuit_breaker;
pub mod collect;
pub mod provider;
pub mod ttl_cache;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use collect::{collect_series, CollectedSeries, FetchProgress, LogProgress, NoProgress};
pub use provider::{DataError, HistoryRange, HistoryRequest, Interval, PriceProvider};
pub use ttl_cache::{CachedProvider, Clock, ManualClock, SystemClock, TtlCache};
pub use universe::{
    normalize_symbol, normalize_symbols, SymbolFile, SymbolSource, Universe, WikipediaSp500,
};
pub use yahoo::YahooProvider;
