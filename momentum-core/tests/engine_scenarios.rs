//! Scenario tests for the momentum engine.

use chrono::{DateTime, Duration, TimeZone, Utc};
use momentum_core::{
    compute_momentum, compute_table, rank, EngineParams, Lookback, LookbackSet, MomentumTable,
    Observation, PriceSeries, SymbolMomentum,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 13, 30, 0).unwrap()
}

fn hourly(symbol: &str, prices: &[f64]) -> PriceSeries {
    PriceSeries::new(
        symbol,
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Observation::new(t0() + Duration::hours(i as i64), p))
            .collect(),
    )
    .unwrap()
}

fn one(lookback: Lookback) -> LookbackSet {
    LookbackSet::new(vec![lookback]).unwrap()
}

#[test]
fn count_lookback_of_one_compares_to_previous_observation() {
    let s = hourly("AAA", &[100.0, 110.0, 121.0]);
    let row = compute_momentum(&s, &one(Lookback::count("1", 1).unwrap()), &EngineParams::default())
        .unwrap();
    let v = row.value("1").unwrap();
    assert!((v - 0.1).abs() < 1e-12, "got {v}");
}

#[test]
fn single_observation_with_long_count_is_absent() {
    let s = hourly("AAA", &[100.0]);
    let row = compute_momentum(&s, &one(Lookback::count("5", 5).unwrap()), &EngineParams::default())
        .unwrap();
    assert_eq!(row.value("5"), None);
}

#[test]
fn zero_reference_price_is_absent() {
    let s = hourly("AAA", &[0.0, 50.0]);
    let row = compute_momentum(&s, &one(Lookback::count("1", 1).unwrap()), &EngineParams::default())
        .unwrap();
    assert_eq!(row.value("1"), None);
}

#[test]
fn one_week_on_ten_days_of_hourly_bars() {
    // 241 bars: hour 0 ..= hour 240. price = hour + 1.
    let prices: Vec<f64> = (0..=240).map(|h| h as f64 + 1.0).collect();
    let s = hourly("AAA", &prices);
    let lb = Lookback::hours("1W", 24 * 7).unwrap();

    let reference = momentum_core::engine::reference_for(&s, &lb).unwrap();
    assert_eq!(reference.timestamp, t0() + Duration::hours(240 - 168));

    let v = compute_momentum(&s, &one(lb), &EngineParams::default())
        .unwrap()
        .value("1W")
        .unwrap();
    assert_eq!(v, (241.0 - 73.0) / 73.0);
}

#[test]
fn one_week_lands_in_overnight_gap() {
    // Seven regular-session bars per day over ten days; nothing overnight.
    let mut observations = Vec::new();
    for day in 0..10 {
        for bar in 0..7 {
            let ts = t0() + Duration::days(day) + Duration::hours(bar);
            observations.push(Observation::new(ts, (day * 10 + bar + 1) as f64));
        }
    }
    // Last bar is day 9 + 6h. Add one bar at day 9 + 20h (after hours).
    let last_ts = t0() + Duration::days(9) + Duration::hours(20);
    observations.push(Observation::new(last_ts, 200.0));
    let s = PriceSeries::new("GAP", observations).unwrap();

    let lb = Lookback::hours("1W", 24 * 7).unwrap();
    // target = day 2 + 20h → latest bar at or before is day 2 + 6h (price 27).
    let reference = momentum_core::engine::reference_for(&s, &lb).unwrap();
    assert_eq!(reference.timestamp, t0() + Duration::days(2) + Duration::hours(6));
    assert_eq!(reference.price, 27.0);
}

#[test]
fn min_observation_threshold_skips_symbol() {
    let s = hourly("AAA", &vec![100.0; 119]);
    let lbs = LookbackSet::calendar_hours();
    assert!(compute_momentum(&s, &lbs, &EngineParams::with_min_observations(120)).is_none());

    let s = hourly("AAA", &vec![100.0; 120]);
    let row = compute_momentum(&s, &lbs, &EngineParams::with_min_observations(120)).unwrap();
    assert_eq!(row.value("1H"), Some(0.0));
    assert_eq!(row.value("1Y"), None);
}

#[test]
fn calendar_table_over_mixed_universe() {
    let long: Vec<f64> = (0..200).map(|i| 100.0 + i as f64).collect();
    let a = hourly("LONG", &long);
    let b = hourly("SHORT", &[1.0, 2.0, 3.0]);
    let c = PriceSeries::empty("FAILED");

    let table = compute_table(
        [&a, &b, &c],
        &LookbackSet::calendar_hours(),
        &EngineParams::with_min_observations(120),
    );
    assert_eq!(table.symbols(), vec!["LONG"]);
    assert_eq!(table.columns(), &["1H", "1W", "1M", "1Y"].map(String::from));
    assert!(table.value("LONG", "1W").is_some());
    assert!(table.value("LONG", "1M").is_none());
}

#[test]
fn rank_ties_order_by_symbol() {
    let mut table = MomentumTable::new(vec!["1W".into()]);
    for (sym, v) in [("MSFT", 0.05), ("AAPL", 0.05), ("NVDA", 0.30), ("IBM", -0.1)] {
        table.insert(SymbolMomentum {
            symbol: sym.into(),
            as_of: None,
            latest_price: None,
            values: [("1W".to_string(), Some(v))].into_iter().collect(),
        });
    }

    let desc = rank(&table, "1W", false);
    let symbols: Vec<&str> = desc.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(symbols, vec!["NVDA", "AAPL", "MSFT", "IBM"]);

    let asc = rank(&table, "1W", true);
    let symbols: Vec<&str> = asc.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(symbols, vec!["IBM", "AAPL", "MSFT", "NVDA"]);
}

#[test]
fn append_can_move_count_reference_onto_zero_price() {
    let lb = || one(Lookback::count("1", 1).unwrap());
    let before = hourly("AAA", &[10.0, 0.0]);
    let row = compute_momentum(&before, &lb(), &EngineParams::default()).unwrap();
    assert_eq!(row.value("1"), Some(-1.0));

    let after = hourly("AAA", &[10.0, 0.0, 5.0]);
    let row = compute_momentum(&after, &lb(), &EngineParams::default()).unwrap();
    assert_eq!(row.value("1"), None);
}
