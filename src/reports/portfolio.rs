use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;

use crate::db::models::{round_to, MONEY_DP};
use crate::db::HoldingSnapshot;

/// Default length of the top/bottom performer lists
pub const DEFAULT_PERFORMER_LIMIT: usize = 5;

/// Portfolio totals as of the latest snapshot date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_invested: Decimal,
    pub total_current_value: Decimal,
    pub total_pnl: Decimal,
    /// None when nothing is invested
    pub total_return_percentage: Option<Decimal>,
    pub total_funds: usize,
    pub last_updated: Option<NaiveDate>,
}

impl PortfolioSummary {
    pub fn empty() -> Self {
        Self {
            total_invested: Decimal::ZERO,
            total_current_value: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            total_return_percentage: None,
            total_funds: 0,
            last_updated: None,
        }
    }
}

/// Share of the portfolio held in one fund
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationEntry {
    pub fund: String,
    pub value: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performer {
    pub fund: String,
    pub return_percentage: Option<Decimal>,
    pub pnl: Decimal,
    pub current_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Top,
    Bottom,
}

/// Sum one day's rows into a summary
pub fn summarize(rows: &[HoldingSnapshot], as_of: Option<NaiveDate>) -> PortfolioSummary {
    if rows.is_empty() {
        return PortfolioSummary {
            last_updated: as_of,
            ..PortfolioSummary::empty()
        };
    }

    let total_invested: Decimal = rows.iter().map(|r| r.invested_value).sum();
    let total_current_value: Decimal = rows.iter().map(|r| r.current_value).sum();
    let total_pnl = total_current_value - total_invested;

    PortfolioSummary {
        total_invested,
        total_current_value,
        total_pnl,
        total_return_percentage: percentage_of(total_pnl, total_invested),
        total_funds: rows.len(),
        last_updated: as_of,
    }
}

/// Largest positions first; ties keep store order
pub fn sort_by_current_value(mut rows: Vec<HoldingSnapshot>) -> Vec<HoldingSnapshot> {
    rows.sort_by(|a, b| b.current_value.cmp(&a.current_value));
    rows
}

/// Per-fund share of total current value, largest first.
///
/// Empty when the portfolio is worth nothing.
pub fn calculate_allocation(rows: &[HoldingSnapshot]) -> Vec<AllocationEntry> {
    let total: Decimal = rows.iter().map(|r| r.current_value).sum();
    if total <= Decimal::ZERO {
        return Vec::new();
    }

    let mut allocation: Vec<AllocationEntry> = rows
        .iter()
        .map(|r| AllocationEntry {
            fund: r.fund.clone(),
            value: r.current_value,
            percentage: percentage_of(r.current_value, total).unwrap_or(Decimal::ZERO),
        })
        .collect();

    allocation.sort_by(|a, b| b.value.cmp(&a.value));
    allocation
}

/// Best (`Rank::Top`) or worst (`Rank::Bottom`) funds by return.
///
/// Funds whose return is undefined go after every fund with a return in
/// both directions, so they only appear once the defined ones run out.
pub fn rank_performers(rows: &[HoldingSnapshot], rank: Rank, limit: usize) -> Vec<Performer> {
    let mut ranked: Vec<&HoldingSnapshot> = rows.iter().collect();
    ranked.sort_by(|a, b| compare_returns(a.return_percentage, b.return_percentage, rank));

    ranked
        .into_iter()
        .take(limit)
        .map(|r| Performer {
            fund: r.fund.clone(),
            return_percentage: r.return_percentage,
            pnl: r.pnl,
            current_value: r.current_value,
        })
        .collect()
}

fn compare_returns(a: Option<Decimal>, b: Option<Decimal>, rank: Rank) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match rank {
            Rank::Top => y.cmp(&x),
            Rank::Bottom => x.cmp(&y),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `part / whole * 100` at 2 dp, None when `whole` is zero
pub(crate) fn percentage_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    part.checked_div(whole)
        .map(|ratio| round_to(ratio * Decimal::ONE_HUNDRED, MONEY_DP))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn snap(fund: &str, qty: Decimal, avg: Decimal, last: Decimal) -> HoldingSnapshot {
        HoldingSnapshot::derive(fund, None, None, qty, avg, last, None, day()).unwrap()
    }

    #[test]
    fn test_summarize_totals() {
        let rows = vec![
            snap("A", dec!(10), dec!(100), dec!(120)),
            snap("B", dec!(20), dec!(50), dec!(45)),
        ];
        let summary = summarize(&rows, Some(day()));

        assert_eq!(summary.total_invested, dec!(2000));
        assert_eq!(summary.total_current_value, dec!(2100));
        assert_eq!(summary.total_pnl, dec!(100));
        assert_eq!(summary.total_return_percentage, Some(dec!(5.00)));
        assert_eq!(summary.total_funds, 2);
        assert_eq!(summary.last_updated, Some(day()));
    }

    #[test]
    fn test_summarize_empty_is_zero() {
        let summary = summarize(&[], None);
        assert_eq!(summary, PortfolioSummary::empty());
    }

    #[test]
    fn test_summarize_zero_invested_has_no_return() {
        let rows = vec![snap("Free", dec!(2), dec!(0), dec!(10))];
        let summary = summarize(&rows, Some(day()));
        assert_eq!(summary.total_current_value, dec!(20));
        assert_eq!(summary.total_return_percentage, None);
    }

    #[test]
    fn test_allocation_sorted_and_sums_to_hundred() {
        let rows = vec![
            snap("Small", dec!(1), dec!(10), dec!(100)),
            snap("Large", dec!(1), dec!(10), dec!(500)),
            snap("Mid", dec!(1), dec!(10), dec!(400)),
        ];
        let allocation = calculate_allocation(&rows);

        let funds: Vec<&str> = allocation.iter().map(|a| a.fund.as_str()).collect();
        assert_eq!(funds, vec!["Large", "Mid", "Small"]);
        assert_eq!(allocation[0].percentage, dec!(50.00));
        assert_eq!(allocation[1].percentage, dec!(40.00));
        assert_eq!(allocation[2].percentage, dec!(10.00));
    }

    #[test]
    fn test_allocation_rounding_stays_near_hundred() {
        let rows = vec![
            snap("A", dec!(1), dec!(1), dec!(1)),
            snap("B", dec!(1), dec!(1), dec!(1)),
            snap("C", dec!(1), dec!(1), dec!(1)),
        ];
        let allocation = calculate_allocation(&rows);
        assert!(allocation.iter().all(|a| a.percentage == dec!(33.33)));

        let total: Decimal = allocation.iter().map(|a| a.percentage).sum();
        assert!((total - dec!(100)).abs() <= dec!(0.05));
    }

    #[test]
    fn test_allocation_zero_total_is_empty() {
        assert!(calculate_allocation(&[]).is_empty());
        let rows = vec![snap("Gone", dec!(0), dec!(10), dec!(10))];
        assert!(calculate_allocation(&rows).is_empty());
    }

    #[test]
    fn test_rank_performers_top_and_bottom() {
        // returns of 20, -5 and 3 percent
        let rows = vec![
            snap("Twenty", dec!(1), dec!(100), dec!(120)),
            snap("MinusFive", dec!(1), dec!(100), dec!(95)),
            snap("Three", dec!(1), dec!(100), dec!(103)),
        ];

        let top = rank_performers(&rows, Rank::Top, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].fund, "Twenty");
        assert_eq!(top[0].return_percentage, Some(dec!(20.00)));
        assert_eq!(top[0].pnl, dec!(20));
        assert_eq!(top[0].current_value, dec!(120));

        let bottom = rank_performers(&rows, Rank::Bottom, 1);
        assert_eq!(bottom[0].fund, "MinusFive");

        let all_top: Vec<String> = rank_performers(&rows, Rank::Top, 10)
            .into_iter()
            .map(|p| p.fund)
            .collect();
        assert_eq!(all_top, vec!["Twenty", "Three", "MinusFive"]);
    }

    #[test]
    fn test_rank_performers_undefined_returns_sort_last() {
        let rows = vec![
            snap("Undefined", dec!(1), dec!(0), dec!(10)),
            snap("Up", dec!(1), dec!(10), dec!(11)),
            snap("Down", dec!(1), dec!(10), dec!(9)),
        ];

        let top = rank_performers(&rows, Rank::Top, 3);
        assert_eq!(top.last().unwrap().fund, "Undefined");
        assert_eq!(top[0].fund, "Up");

        let bottom = rank_performers(&rows, Rank::Bottom, 3);
        assert_eq!(bottom.last().unwrap().fund, "Undefined");
        assert_eq!(bottom[0].fund, "Down");

        assert!(rank_performers(&rows, Rank::Top, 0).is_empty());
    }

    #[test]
    fn test_sort_by_current_value_descending() {
        let rows = vec![
            snap("Low", dec!(1), dec!(1), dec!(5)),
            snap("High", dec!(1), dec!(1), dec!(50)),
        ];
        let sorted = sort_by_current_value(rows);
        assert_eq!(sorted[0].fund, "High");
        assert_eq!(sorted[1].fund, "Low");
    }
}
