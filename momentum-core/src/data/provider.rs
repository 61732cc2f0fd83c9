//! Price provider trait, history requests and structured error types.
//!
//! The PriceProvider trait abstracts over price sources (Yahoo Finance, test
//! fixtures) so the collection loop can be driven by a mock in tests.

use crate::domain::PriceSeries;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error types for collaborator operations.
///
/// These are designed to be displayable in CLI output and logs.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("symbol list unavailable: {0}")]
    SymbolListUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// How far back to request history. Serialized as the provider's range token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryRange {
    #[serde(rename = "5d")]
    Days5,
    #[serde(rename = "1mo")]
    Month1,
    #[serde(rename = "3mo")]
    Months3,
    #[serde(rename = "6mo")]
    Months6,
    #[serde(rename = "1y")]
    Year1,
    #[serde(rename = "2y")]
    Years2,
    #[serde(rename = "5y")]
    Years5,
    #[serde(rename = "10y")]
    Years10,
    #[serde(rename = "max")]
    Max,
}

impl HistoryRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days5 => "5d",
            Self::Month1 => "1mo",
            Self::Months3 => "3mo",
            Self::Months6 => "6mo",
            Self::Year1 => "1y",
            Self::Years2 => "2y",
            Self::Years5 => "5y",
            Self::Years10 => "10y",
            Self::Max => "max",
        }
    }
}

/// Bar interval. Serialized as the provider's interval token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "5m")]
    Minutes5,
    #[serde(rename = "15m")]
    Minutes15,
    #[serde(rename = "30m")]
    Minutes30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1wk")]
    Week1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minutes5 => "5m",
            Self::Minutes15 => "15m",
            Self::Minutes30 => "30m",
            Self::Hour1 => "1h",
            Self::Day1 => "1d",
            Self::Week1 => "1wk",
        }
    }
}

/// A historical window + sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub range: HistoryRange,
    pub interval: Interval,
}

impl HistoryRequest {
    pub fn new(range: HistoryRange, interval: Interval) -> Self {
        Self { range, interval }
    }

    /// One year of hourly bars.
    pub fn hourly_year() -> Self {
        Self::new(HistoryRange::Year1, Interval::Hour1)
    }

    /// Two years of daily bars.
    pub fn daily_two_years() -> Self {
        Self::new(HistoryRange::Years2, Interval::Day1)
    }
}

impl fmt::Display for HistoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.range.as_str(), self.interval.as_str())
    }
}

/// Trait for price providers.
///
/// Implementations handle the specifics of fetching from a particular
/// source. Caching sits above this trait; providers don't know about it.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch a close-price series for a symbol.
    fn fetch(&self, symbol: &str, request: &HistoryRequest) -> Result<PriceSeries, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;

    /// Whether `fetch` would be answered without a network request.
    fn is_cached(&self, _symbol: &str, _request: &HistoryRequest) -> bool {
        false
    }
}

impl<P: PriceProvider + ?Sized> PriceProvider for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str, request: &HistoryRequest) -> Result<PriceSeries, DataError> {
        (**self).fetch(symbol, request)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn is_cached(&self, symbol: &str, request: &HistoryRequest) -> bool {
        (**self).is_cached(symbol, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_match_serde_names() {
        let req = HistoryRequest::hourly_year();
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"range":"1y","interval":"1h"}"#);
        assert_eq!(req.to_string(), "1y @ 1h");
    }

    #[test]
    fn parses_tokens() {
        let req: HistoryRequest =
            serde_json::from_str(r#"{"range":"2y","interval":"1d"}"#).unwrap();
        assert_eq!(req, HistoryRequest::daily_two_years());
    }
}
