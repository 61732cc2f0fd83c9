//! Ranking and filtering of momentum tables.

use crate::domain::MomentumTable;
use std::cmp::Ordering;

/// Order symbols by their value for `lookback`.
///
/// Symbols with an absent value are dropped. Ties are always broken by
/// symbol name ascending, whichever direction the values are sorted.
pub fn rank(table: &MomentumTable, lookback: &str, ascending: bool) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = table
        .rows()
        .filter_map(|row| row.value(lookback).map(|v| (row.symbol.clone(), v)))
        .collect();

    ranked.sort_by(|a, b| {
        let by_value = if ascending {
            a.1.total_cmp(&b.1)
        } else {
            b.1.total_cmp(&a.1)
        };
        match by_value {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        }
    });

    ranked
}

/// Every symbol: ranked ones first, then those absent for `lookback` by name.
pub fn sorted_symbols(table: &MomentumTable, lookback: &str, ascending: bool) -> Vec<String> {
    let mut order: Vec<String> = rank(table, lookback, ascending)
        .into_iter()
        .map(|(symbol, _)| symbol)
        .collect();
    order.extend(
        table
            .rows()
            .filter(|row| row.value(lookback).is_none())
            .map(|row| row.symbol.clone()),
    );
    order
}

/// Rows whose value for `lookback` is strictly greater than `threshold`.
pub fn filter_min(table: &MomentumTable, lookback: &str, threshold: f64) -> MomentumTable {
    let mut filtered = table.clone();
    filtered.retain(|row| row.value(lookback).is_some_and(|v| v > threshold));
    filtered
}

/// Rows with a value for every column.
pub fn complete_rows(table: &MomentumTable) -> MomentumTable {
    let columns = table.columns().to_vec();
    let mut complete = table.clone();
    complete.retain(|row| row.is_complete(&columns));
    complete
}
