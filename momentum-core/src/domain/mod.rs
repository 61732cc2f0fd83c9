//! Domain types: price series, lookbacks, momentum results.

pub mod lookback;
pub mod result;
pub mod series;

pub use lookback::{Lookback, LookbackError, LookbackKind, LookbackSet};
pub use result::{MomentumTable, SymbolMomentum};
pub use series::{Observation, PriceSeries, SeriesError};
