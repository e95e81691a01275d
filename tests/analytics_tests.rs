//! Analytics engine over a populated snapshot store

use chrono::NaiveDate;
use mfdash::clock::FixedClock;
use mfdash::db::{HoldingSnapshot, SnapshotStore};
use mfdash::reports::Analytics;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
}

fn snap(fund: &str, on: NaiveDate, qty: Decimal, avg: Decimal, last: Decimal) -> HoldingSnapshot {
    HoldingSnapshot::derive(fund, None, None, qty, avg, last, None, on).unwrap()
}

fn setup(today: NaiveDate) -> (TempDir, SnapshotStore, Analytics) {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::open(dir.path().join("data.db")).unwrap();
    let analytics = Analytics::new(store.clone(), Arc::new(FixedClock(today)));
    (dir, store, analytics)
}

#[test]
fn test_empty_store_yields_empty_results() {
    let (_dir, _store, analytics) = setup(day(30));

    let summary = analytics.summary().unwrap();
    assert_eq!(summary.total_invested, Decimal::ZERO);
    assert_eq!(summary.total_current_value, Decimal::ZERO);
    assert_eq!(summary.total_pnl, Decimal::ZERO);
    assert_eq!(summary.total_return_percentage, None);
    assert_eq!(summary.total_funds, 0);
    assert_eq!(summary.last_updated, None);

    assert!(analytics.current_holdings().unwrap().is_empty());
    assert!(analytics.allocation().unwrap().is_empty());
    assert!(analytics.historical_performance(30).unwrap().is_empty());
    assert!(analytics.top_performers(5).unwrap().is_empty());
    assert!(analytics.bottom_performers(5).unwrap().is_empty());
    assert!(analytics.snapshot_dates().unwrap().is_empty());
}

#[test]
fn test_queries_use_latest_date_only() {
    let (_dir, store, analytics) = setup(day(30));
    store
        .replace_snapshots_for_date(
            day(1),
            &[
                snap("Old", day(1), dec!(1), dec!(10), dec!(10)),
                snap("A", day(1), dec!(1), dec!(10), dec!(10)),
            ],
        )
        .unwrap();
    store
        .replace_snapshots_for_date(
            day(2),
            &[
                snap("A", day(2), dec!(10), dec!(100), dec!(120)),
                snap("B", day(2), dec!(20), dec!(50), dec!(45)),
            ],
        )
        .unwrap();

    let summary = analytics.summary().unwrap();
    assert_eq!(summary.total_funds, 2);
    assert_eq!(summary.total_invested, dec!(2000));
    assert_eq!(summary.total_current_value, dec!(2100));
    assert_eq!(summary.total_pnl, dec!(100));
    assert_eq!(summary.total_return_percentage, Some(dec!(5.00)));
    assert_eq!(summary.last_updated, Some(day(2)));

    let holdings = analytics.current_holdings().unwrap();
    let funds: Vec<&str> = holdings.iter().map(|h| h.fund.as_str()).collect();
    assert_eq!(funds, vec!["A", "B"]);
    assert!(holdings.iter().all(|h| h.fetch_date == day(2)));
}

#[test]
fn test_allocation_sums_to_hundred() {
    let (_dir, store, analytics) = setup(day(30));
    store
        .replace_snapshots_for_date(
            day(5),
            &[
                snap("A", day(5), dec!(3), dec!(10), dec!(11.11)),
                snap("B", day(5), dec!(7), dec!(10), dec!(13.37)),
                snap("C", day(5), dec!(1), dec!(10), dec!(99.99)),
            ],
        )
        .unwrap();

    let allocation = analytics.allocation().unwrap();
    assert_eq!(allocation.len(), 3);
    assert!(allocation.windows(2).all(|w| w[0].value >= w[1].value));

    let total: Decimal = allocation.iter().map(|a| a.percentage).sum();
    assert!((total - dec!(100)).abs() <= dec!(0.05), "total was {}", total);
}

#[test]
fn test_historical_performance_two_dates() {
    let (_dir, store, analytics) = setup(day(30));
    store
        .replace_snapshots_for_date(day(10), &[snap("A", day(10), dec!(10), dec!(100), dec!(100))])
        .unwrap();
    store
        .replace_snapshots_for_date(day(11), &[snap("A", day(11), dec!(10), dec!(100), dec!(110))])
        .unwrap();

    let series = analytics.historical_performance(30).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].date, day(10));
    assert_eq!(series[0].total_value, dec!(1000));
    assert_eq!(series[0].pnl, dec!(0));
    assert_eq!(series[1].date, day(11));
    assert_eq!(series[1].total_value, dec!(1100));
    assert_eq!(series[1].total_invested, dec!(1000));
    assert_eq!(series[1].pnl, dec!(100));
}

#[test]
fn test_historical_performance_respects_window() {
    let (_dir, store, analytics) = setup(day(30));
    for d in [1, 20, 29] {
        store
            .replace_snapshots_for_date(day(d), &[snap("A", day(d), dec!(1), dec!(1), dec!(1))])
            .unwrap();
    }

    let dates: Vec<NaiveDate> = analytics
        .historical_performance(10)
        .unwrap()
        .iter()
        .map(|p| p.date)
        .collect();
    assert_eq!(dates, vec![day(20), day(29)]);
    assert_eq!(analytics.historical_performance(30).unwrap().len(), 3);
}

#[test]
fn test_top_and_bottom_performers() {
    let (_dir, store, analytics) = setup(day(30));
    store
        .replace_snapshots_for_date(
            day(15),
            &[
                snap("Twenty", day(15), dec!(1), dec!(100), dec!(120)),
                snap("MinusFive", day(15), dec!(1), dec!(100), dec!(95)),
                snap("Three", day(15), dec!(1), dec!(100), dec!(103)),
            ],
        )
        .unwrap();

    let top = analytics.top_performers(1).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].fund, "Twenty");
    assert_eq!(top[0].return_percentage, Some(dec!(20.00)));

    let bottom = analytics.bottom_performers(1).unwrap();
    assert_eq!(bottom[0].fund, "MinusFive");
    assert_eq!(bottom[0].return_percentage, Some(dec!(-5.00)));

    assert_eq!(analytics.top_performers(5).unwrap().len(), 3);
}

#[test]
fn test_snapshot_dates_newest_first() {
    let (_dir, store, analytics) = setup(day(30));
    store
        .replace_snapshots_for_date(day(3), &[snap("A", day(3), dec!(1), dec!(1), dec!(1))])
        .unwrap();
    store
        .replace_snapshots_for_date(
            day(4),
            &[
                snap("A", day(4), dec!(1), dec!(1), dec!(1)),
                snap("B", day(4), dec!(1), dec!(1), dec!(1)),
            ],
        )
        .unwrap();

    let dates = analytics.snapshot_dates().unwrap();
    assert_eq!(dates.len(), 2);
    assert_eq!(dates[0].fetch_date, day(4));
    assert_eq!(dates[0].funds, 2);
    assert_eq!(dates[1].fetch_date, day(3));
}
