use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::HoldingSnapshot;

/// Default lookback for the performance series
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Portfolio totals on one snapshot date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub pnl: Decimal,
}

/// Inclusive `[today - days, today]` window
pub fn lookback_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

/// One point per date present in `rows`, oldest first.
///
/// Dates without snapshots produce no point.
pub fn performance_series(rows: &[HoldingSnapshot]) -> Vec<PerformancePoint> {
    let mut by_date: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();

    for row in rows {
        let entry = by_date
            .entry(row.fetch_date)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 += row.current_value;
        entry.1 += row.invested_value;
    }

    by_date
        .into_iter()
        .map(|(date, (total_value, total_invested))| PerformancePoint {
            date,
            total_value,
            total_invested,
            pnl: total_value - total_invested,
        })
        .collect()
}
