//! Momentum results: one row per symbol, one column per lookback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Momentum for one symbol across all lookbacks.
///
/// `values` maps lookback name to `(latest - reference) / reference`, or
/// `None` when no usable reference observation exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMomentum {
    pub symbol: String,
    /// Timestamp of the latest observation. Unknown for rows loaded from CSV.
    pub as_of: Option<DateTime<Utc>>,
    pub latest_price: Option<f64>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl SymbolMomentum {
    /// Ratio for a lookback; `None` if absent or the column is unknown.
    pub fn value(&self, lookback: &str) -> Option<f64> {
        self.values.get(lookback).copied().flatten()
    }

    /// True when every listed column has a value.
    pub fn is_complete(&self, columns: &[String]) -> bool {
        columns.iter().all(|c| self.value(c).is_some())
    }
}

/// Momentum rows keyed by symbol, with an explicit column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentumTable {
    columns: Vec<String>,
    rows: BTreeMap<String, SymbolMomentum>,
}

impl MomentumTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Insert or replace the row for `row.symbol`.
    pub fn insert(&mut self, row: SymbolMomentum) {
        self.rows.insert(row.symbol.clone(), row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolMomentum> {
        self.rows.get(symbol)
    }

    /// Shorthand for `get(symbol)?.value(lookback)`.
    pub fn value(&self, symbol: &str, lookback: &str) -> Option<f64> {
        self.rows.get(symbol)?.value(lookback)
    }

    /// Rows in symbol order.
    pub fn rows(&self) -> impl Iterator<Item = &SymbolMomentum> {
        self.rows.values()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.rows.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Keep only rows matching the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&SymbolMomentum) -> bool) {
        self.rows.retain(|_, row| keep(row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, w: Option<f64>, m: Option<f64>) -> SymbolMomentum {
        SymbolMomentum {
            symbol: symbol.into(),
            as_of: None,
            latest_price: None,
            values: [("1W".to_string(), w), ("1M".to_string(), m)]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn value_flattens_absent_and_unknown() {
        let r = row("AAPL", Some(0.1), None);
        assert_eq!(r.value("1W"), Some(0.1));
        assert_eq!(r.value("1M"), None);
        assert_eq!(r.value("1Y"), None);
    }

    #[test]
    fn completeness_checks_every_column() {
        let cols = vec!["1W".to_string(), "1M".to_string()];
        assert!(row("A", Some(0.1), Some(0.2)).is_complete(&cols));
        assert!(!row("A", Some(0.1), None).is_complete(&cols));
    }

    #[test]
    fn insert_replaces_by_symbol() {
        let mut t = MomentumTable::new(vec!["1W".into(), "1M".into()]);
        t.insert(row("MSFT", Some(0.1), None));
        t.insert(row("MSFT", Some(0.3), None));
        assert_eq!(t.len(), 1);
        assert_eq!(t.value("MSFT", "1W"), Some(0.3));
        assert!(t.has_column("1M"));
        assert!(!t.has_column("1Y"));
    }
}
