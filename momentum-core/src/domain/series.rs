//! PriceSeries: the time-indexed close prices for one symbol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single (timestamp, price) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Rejections from the strict [`PriceSeries::new`] constructor.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("{symbol}: timestamps not strictly increasing at index {index}")]
    OutOfOrder { symbol: String, index: usize },

    #[error("{symbol}: invalid price {price} at index {index}")]
    InvalidPrice {
        symbol: String,
        index: usize,
        price: f64,
    },
}

/// Ordered observations for one symbol.
///
/// Timestamps are strictly increasing. Prices are finite and non-negative;
/// a zero price is representable so the engine's zero guard can see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRecord")]
pub struct PriceSeries {
    symbol: String,
    observations: Vec<Observation>,
}

/// Unvalidated wire form; deserialization goes through [`PriceSeries::new`].
#[derive(Deserialize)]
struct SeriesRecord {
    symbol: String,
    observations: Vec<Observation>,
}

impl TryFrom<SeriesRecord> for PriceSeries {
    type Error = SeriesError;

    fn try_from(record: SeriesRecord) -> Result<Self, Self::Error> {
        Self::new(record.symbol, record.observations)
    }
}

impl PriceSeries {
    /// Build a series, rejecting out-of-order timestamps and bad prices.
    pub fn new(
        symbol: impl Into<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        for (index, obs) in observations.iter().enumerate() {
            if !obs.price.is_finite() || obs.price < 0.0 {
                return Err(SeriesError::InvalidPrice {
                    symbol,
                    index,
                    price: obs.price,
                });
            }
            if index > 0 && observations[index - 1].timestamp >= obs.timestamp {
                return Err(SeriesError::OutOfOrder { symbol, index });
            }
        }
        Ok(Self {
            symbol,
            observations,
        })
    }

    /// Lenient constructor for provider output.
    ///
    /// Drops non-finite and negative prices, sorts by timestamp and keeps
    /// the last sample seen for a repeated timestamp.
    pub fn from_unordered(symbol: impl Into<String>, observations: Vec<Observation>) -> Self {
        let mut observations: Vec<Observation> = observations
            .into_iter()
            .filter(|o| o.price.is_finite() && o.price >= 0.0)
            .collect();

        // Stable sort keeps arrival order within equal timestamps.
        observations.sort_by_key(|o| o.timestamp);

        let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
        for obs in observations {
            match deduped.last_mut() {
                Some(last) if last.timestamp == obs.timestamp => *last = obs,
                _ => deduped.push(obs),
            }
        }

        Self {
            symbol: symbol.into(),
            observations: deduped,
        }
    }

    /// An empty series; what a failed fetch turns into.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            observations: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Most recent observation.
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Most recent observation with `timestamp <= at`.
    pub fn at_or_before(&self, at: DateTime<Utc>) -> Option<&Observation> {
        let idx = self.observations.partition_point(|o| o.timestamp <= at);
        idx.checked_sub(1).map(|i| &self.observations[i])
    }

    /// Observation `positions` steps before the latest one.
    pub fn positions_back(&self, positions: usize) -> Option<&Observation> {
        let last = self.observations.len().checked_sub(1)?;
        last.checked_sub(positions).map(|i| &self.observations[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn obs(hours: i64, price: f64) -> Observation {
        Observation::new(t(hours), price)
    }

    #[test]
    fn strict_constructor_accepts_increasing() {
        let s = PriceSeries::new("SPY", vec![obs(0, 1.0), obs(1, 2.0)]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.symbol(), "SPY");
    }

    #[test]
    fn strict_constructor_rejects_duplicate_timestamp() {
        let err = PriceSeries::new("SPY", vec![obs(0, 1.0), obs(0, 2.0)]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::OutOfOrder {
                symbol: "SPY".into(),
                index: 1
            }
        );
    }

    #[test]
    fn strict_constructor_rejects_nan_and_negative() {
        assert!(PriceSeries::new("X", vec![obs(0, f64::NAN)]).is_err());
        assert!(PriceSeries::new("X", vec![obs(0, -1.0)]).is_err());
    }

    #[test]
    fn zero_price_is_representable() {
        assert!(PriceSeries::new("X", vec![obs(0, 0.0), obs(1, 50.0)]).is_ok());
    }

    #[test]
    fn lenient_constructor_sorts_dedups_and_drops_nan() {
        let s = PriceSeries::from_unordered(
            "X",
            vec![obs(2, 3.0), obs(0, 1.0), obs(1, f64::NAN), obs(2, 4.0)],
        );
        let prices: Vec<f64> = s.observations().iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![1.0, 4.0]);
    }

    #[test]
    fn at_or_before_picks_latest_not_after() {
        let s = PriceSeries::new("X", vec![obs(0, 1.0), obs(5, 2.0), obs(10, 3.0)]).unwrap();
        assert_eq!(s.at_or_before(t(7)).unwrap().price, 2.0);
        assert_eq!(s.at_or_before(t(5)).unwrap().price, 2.0);
        assert!(s.at_or_before(t(-1)).is_none());
    }

    #[test]
    fn positions_back_counts_from_latest() {
        let s = PriceSeries::new("X", vec![obs(0, 1.0), obs(1, 2.0), obs(2, 3.0)]).unwrap();
        assert_eq!(s.positions_back(0).unwrap().price, 3.0);
        assert_eq!(s.positions_back(2).unwrap().price, 1.0);
        assert!(s.positions_back(3).is_none());
        assert!(PriceSeries::empty("X").positions_back(0).is_none());
    }

    #[test]
    fn deserialize_validates_order() {
        let good = PriceSeries::new("X", vec![obs(0, 1.0), obs(1, 2.0)]).unwrap();
        let json = serde_json::to_string(&good).unwrap();
        assert_eq!(serde_json::from_str::<PriceSeries>(&json).unwrap(), good);

        let out_of_order = r#"{"symbol":"X","observations":[
            {"timestamp":"2024-03-01T05:00:00Z","price":1.0},
            {"timestamp":"2024-03-01T01:00:00Z","price":2.0}
        ]}"#;
        let err = serde_json::from_str::<PriceSeries>(out_of_order).unwrap_err();
        assert!(err.to_string().contains("not strictly increasing"), "{err}");
    }
}
