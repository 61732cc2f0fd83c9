//! Collection orchestrator: fetches a symbol list with pacing and progress.

use super::provider::{DataError, HistoryRequest, PriceProvider};
use crate::domain::PriceSeries;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Progress callbacks for multi-symbol fetches.
pub trait FetchProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: Result<usize, &DataError>,
    );

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Reports progress through `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        info!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: Result<usize, &DataError>,
    ) {
        if let Err(e) = result {
            warn!(symbol, error = %e, "fetch failed");
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        info!("Fetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Silent progress sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        _result: Result<usize, &DataError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}

/// Outcome of a batch fetch.
///
/// Every requested symbol has an entry in `series`; failed symbols map to
/// an empty series and the reason is kept in `failures`.
#[derive(Debug, Default)]
pub struct CollectedSeries {
    pub series: BTreeMap<String, PriceSeries>,
    pub failures: Vec<(String, DataError)>,
    pub succeeded: usize,
}

impl CollectedSeries {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetch every symbol in order, keeping at least `pacing` between
/// consecutive network requests. Fetches the provider answers from cache
/// are not paced.
///
/// Stops issuing requests once the provider reports itself unavailable;
/// the rest of the symbols are recorded as `CircuitBreakerTripped`.
pub fn collect_series(
    provider: &dyn PriceProvider,
    symbols: &[String],
    request: &HistoryRequest,
    pacing: Duration,
    progress: &dyn FetchProgress,
) -> CollectedSeries {
    let total = symbols.len();
    let mut collected = CollectedSeries::default();
    let mut last_request: Option<Instant> = None;

    for (i, symbol) in symbols.iter().enumerate() {
        if !provider.is_available() {
            for sym in &symbols[i..] {
                collected
                    .series
                    .insert(sym.clone(), PriceSeries::empty(sym.as_str()));
                collected
                    .failures
                    .push((sym.clone(), DataError::CircuitBreakerTripped));
            }
            break;
        }

        if !provider.is_cached(symbol, request) {
            if let Some(wait) = last_request.and_then(|at| pacing.checked_sub(at.elapsed())) {
                std::thread::sleep(wait);
            }
            last_request = Some(Instant::now());
        }

        progress.on_start(symbol, i, total);
        let result = provider.fetch(symbol, request);
        progress.on_complete(symbol, i, total, result.as_ref().map(PriceSeries::len));

        match result {
            Ok(series) => {
                collected.succeeded += 1;
                collected.series.insert(symbol.clone(), series);
            }
            Err(e) => {
                collected
                    .series
                    .insert(symbol.clone(), PriceSeries::empty(symbol.as_str()));
                collected.failures.push((symbol.clone(), e));
            }
        }
    }

    progress.on_batch_complete(collected.succeeded, collected.failures.len(), total);
    collected
}
