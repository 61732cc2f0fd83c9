//! Momentum computation over an irregularly-sampled price series.
//!
//! momentum = (latest - reference) / reference
//!
//! The reference observation is located per lookback:
//! - `Elapsed(d)`: most recent observation at or before `latest_ts - d`
//! - `Count(n)`: the observation exactly `n` positions before the latest
//!
//! A missing reference or a zero reference price yields `None`.

use crate::domain::{
    Lookback, LookbackKind, LookbackSet, MomentumTable, Observation, PriceSeries, SymbolMomentum,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Engine knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    /// Series shorter than this are skipped entirely.
    pub min_observations: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            min_observations: 1,
        }
    }
}

impl EngineParams {
    pub fn with_min_observations(min_observations: usize) -> Self {
        Self { min_observations }
    }
}

/// Compute momentum for one series across all lookbacks.
///
/// Returns `None` (a skip) when the series is empty or shorter than
/// `params.min_observations`.
pub fn compute_momentum(
    series: &PriceSeries,
    lookbacks: &LookbackSet,
    params: &EngineParams,
) -> Option<SymbolMomentum> {
    let latest = series.latest()?;
    if series.len() < params.min_observations {
        return None;
    }

    let values: BTreeMap<String, Option<f64>> = lookbacks
        .iter()
        .map(|lb| {
            let value = reference_for(series, lb).and_then(|past| ratio(latest, past));
            (lb.name().to_string(), value)
        })
        .collect();

    Some(SymbolMomentum {
        symbol: series.symbol().to_string(),
        as_of: Some(latest.timestamp),
        latest_price: Some(latest.price),
        values,
    })
}

/// Locate the reference observation for a lookback.
pub fn reference_for<'a>(series: &'a PriceSeries, lookback: &Lookback) -> Option<&'a Observation> {
    match lookback.kind() {
        LookbackKind::Elapsed(duration) => {
            let latest = series.latest()?;
            // A target before the representable range has nothing at or before it.
            let target = latest.timestamp.checked_sub_signed(duration)?;
            series.at_or_before(target)
        }
        LookbackKind::Count(count) => series.positions_back(count),
    }
}

fn ratio(latest: &Observation, past: &Observation) -> Option<f64> {
    if past.price == 0.0 {
        return None;
    }
    Some((latest.price - past.price) / past.price)
}

/// Compute a table over many series. Skipped symbols are left out.
pub fn compute_table<'a, I>(series: I, lookbacks: &LookbackSet, params: &EngineParams) -> MomentumTable
where
    I: IntoIterator<Item = &'a PriceSeries>,
{
    let mut table = MomentumTable::new(lookbacks.names());
    for s in series {
        match compute_momentum(s, lookbacks, params) {
            Some(row) => table.insert(row),
            None => debug!(
                symbol = s.symbol(),
                observations = s.len(),
                min = params.min_observations,
                "skipping symbol: insufficient data"
            ),
        }
    }
    table
}
