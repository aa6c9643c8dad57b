//! Event stream checks. Needs the default `instrument` feature.
#![cfg(feature = "instrument")]

use exchange_core::{Scenario, SimulationConfig, instrument};

const SAMPLE: &str = "\
R R R R R S S S S S
APL:145 MSFT:300 GOOGL:2700
100000 APL:5 MSFT:15 GOOGL:3
";

#[test]
fn one_trade_row_per_transaction() {
    let mut sim = Scenario::parse(SAMPLE)
        .unwrap()
        .into_simulation(40, SimulationConfig::default().with_seed(21))
        .unwrap();

    let (stats, events) = instrument::capture(|| sim.run());

    assert_eq!(events.count("trade") as u64, stats.transactions);
    let trades = events.table("trade").expect("sample run should trade");
    let quantities = trades.i64s("quantity");
    assert!(quantities.iter().all(|&q| q > 0));

    for share in &stats.shares {
        let rows = trades.strs("symbol").iter().filter(|&&s| s == share.symbol).count();
        assert_eq!(rows as u64, share.transactions, "{} trade rows", share.symbol);
    }
}

#[test]
fn one_turn_row_per_book_per_turn() {
    let mut sim = Scenario::parse(SAMPLE)
        .unwrap()
        .into_simulation(15, SimulationConfig::default().with_seed(2))
        .unwrap();

    let (_, events) = instrument::capture(|| sim.run());

    assert_eq!(events.count("turn"), 15 * 3);
    let turns = events.table("turn").unwrap().u64s("turn");
    assert_eq!(turns.iter().max(), Some(&14));
}

#[test]
fn accepted_orders_are_logged_with_ids() {
    let mut sim = Scenario::parse(SAMPLE)
        .unwrap()
        .into_simulation(10, SimulationConfig::default().with_seed(8))
        .unwrap();

    let (stats, events) = instrument::capture(|| sim.run());

    let ids = events.table("order").unwrap().u64s("order_id");
    assert!(!ids.is_empty());
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "order ids increase");

    let expiry_and_cancel = events.count("expiry") + events.count("cancel");
    let counted: u64 = stats.shares.iter().map(|s| s.expired + s.cancelled).sum();
    assert_eq!(expiry_and_cancel as u64, counted);
}

#[test]
fn events_export_to_dataframes() {
    let mut sim = Scenario::parse(SAMPLE)
        .unwrap()
        .into_simulation(20, SimulationConfig::default().with_seed(4))
        .unwrap();

    let (_, events) = instrument::capture(|| sim.run());
    let dfs = events.to_dataframes().unwrap();

    let turns = &dfs["turn"];
    assert_eq!(turns.height(), 20 * 3);
    for column in ["turn", "symbol", "last_price", "fills"] {
        assert!(turns.column(column).is_ok(), "missing column {column}");
    }
}
