//! Output formatting module for CLI display
//!
//! Analytics results are computed in `reports`; this module only turns them
//! into tables or JSON.

use crate::broker::KiteProfile;
use crate::db::{HoldingSnapshot, SnapshotDate};
use crate::reports::{AllocationEntry, PerformancePoint, Performer, PortfolioSummary, Rank};
use crate::utils::{format_amount, format_currency, format_percentage};
use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

/// Pretty-printed JSON for any report value
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn signed(text: String, value: Decimal) -> ColoredString {
    if value >= Decimal::ZERO {
        text.green()
    } else {
        text.red()
    }
}

fn signed_percentage(value: Option<Decimal>) -> String {
    match value {
        Some(v) => signed(format_percentage(Some(v)), v).to_string(),
        None => format_percentage(None).bright_black().to_string(),
    }
}

fn render(table: &mut Table, right_from: usize) -> String {
    table.with(Style::modern());
    table.modify(Columns::new(right_from..), Alignment::right());
    table.to_string()
}

pub fn format_summary(summary: &PortfolioSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n{} Portfolio Summary\n", "📊".cyan().bold()));
    let as_of = summary
        .last_updated
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());
    output.push_str(&format!("{}\n", format!("As of {}", as_of).bright_black()));
    output.push_str(&format!("{}", "━".repeat(60).bright_black()));

    output.push_str(&format!(
        "\n{:<20} {}",
        "Total Invested:".bold(),
        format_currency(summary.total_invested)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Current Value:".bold(),
        format_currency(summary.total_current_value)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Total P&L:".bold(),
        signed(format_currency(summary.total_pnl), summary.total_pnl)
    ));
    output.push_str(&format!(
        "\n{:<20} {}",
        "Total Return:".bold(),
        signed_percentage(summary.total_return_percentage)
    ));
    output.push_str(&format!(
        "\n{:<20} {}\n",
        "Funds:".bold(),
        summary.total_funds
    ));

    output
}

pub fn format_holdings_table(holdings: &[HoldingSnapshot]) -> String {
    #[derive(Tabled)]
    struct HoldingRow {
        #[tabled(rename = "Fund")]
        fund: String,
        #[tabled(rename = "Folio")]
        folio: String,
        #[tabled(rename = "Units")]
        quantity: String,
        #[tabled(rename = "Avg NAV")]
        average_price: String,
        #[tabled(rename = "NAV")]
        last_price: String,
        #[tabled(rename = "Invested")]
        invested: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "P&L")]
        pnl: String,
        #[tabled(rename = "Return %")]
        return_pct: String,
    }

    let rows: Vec<HoldingRow> = holdings
        .iter()
        .map(|h| HoldingRow {
            fund: h.fund.clone(),
            folio: h.folio.clone().unwrap_or_else(|| "-".to_string()),
            quantity: format!("{:.3}", h.quantity),
            average_price: format_amount(h.average_price),
            last_price: format_amount(h.last_price),
            invested: format_amount(h.invested_value),
            value: format_amount(h.current_value),
            pnl: signed(format_amount(h.pnl), h.pnl).to_string(),
            return_pct: signed_percentage(h.return_percentage),
        })
        .collect();

    let mut output = format!("\n{} Holdings\n\n", "📊".cyan().bold());
    // Fund and Folio stay left-aligned
    output.push_str(&render(&mut Table::new(&rows), 2));
    output.push('\n');
    output
}

pub fn format_allocation_table(allocation: &[AllocationEntry]) -> String {
    #[derive(Tabled)]
    struct AllocationRow {
        #[tabled(rename = "Fund")]
        fund: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Share")]
        share: String,
    }

    let rows: Vec<AllocationRow> = allocation
        .iter()
        .map(|a| AllocationRow {
            fund: a.fund.clone(),
            value: format_amount(a.value),
            share: format!("{:.2}%", a.percentage),
        })
        .collect();

    let mut output = format!("\n{} Allocation\n\n", "🥧".cyan().bold());
    output.push_str(&render(&mut Table::new(&rows), 1));
    output.push('\n');
    output
}

pub fn format_performance_table(series: &[PerformancePoint], days: u32) -> String {
    #[derive(Tabled)]
    struct PointRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Invested")]
        invested: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "P&L")]
        pnl: String,
    }

    let mut output = format!(
        "\n{} Performance (last {} days)\n\n",
        "📈".cyan().bold(),
        days
    );

    if series.is_empty() {
        output.push_str(&format!(
            "{} No snapshots in this window\n",
            "ℹ".blue().bold()
        ));
        return output;
    }

    let rows: Vec<PointRow> = series
        .iter()
        .map(|p| PointRow {
            date: p.date.format("%Y-%m-%d").to_string(),
            invested: format_amount(p.total_invested),
            value: format_amount(p.total_value),
            pnl: signed(format_amount(p.pnl), p.pnl).to_string(),
        })
        .collect();

    output.push_str(&render(&mut Table::new(&rows), 1));

    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        let change = last.total_value - first.total_value;
        output.push_str(&format!(
            "\n{:<20} {}\n",
            "Value change:".bold(),
            signed(format_currency(change), change)
        ));
    }

    output
}

pub fn format_performers_table(performers: &[Performer], rank: Rank) -> String {
    #[derive(Tabled)]
    struct PerformerRow {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "Fund")]
        fund: String,
        #[tabled(rename = "Return %")]
        return_pct: String,
        #[tabled(rename = "P&L")]
        pnl: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let title = match rank {
        Rank::Top => format!("{} Top Performers", "🏆".cyan().bold()),
        Rank::Bottom => format!("{} Bottom Performers", "🔻".cyan().bold()),
    };

    let rows: Vec<PerformerRow> = performers
        .iter()
        .enumerate()
        .map(|(i, p)| PerformerRow {
            position: i + 1,
            fund: p.fund.clone(),
            return_pct: signed_percentage(p.return_percentage),
            pnl: signed(format_amount(p.pnl), p.pnl).to_string(),
            value: format_amount(p.current_value),
        })
        .collect();

    let mut output = format!("\n{}\n\n", title);
    output.push_str(&render(&mut Table::new(&rows), 2));
    output.push('\n');
    output
}

pub fn format_history_table(dates: &[SnapshotDate]) -> String {
    #[derive(Tabled)]
    struct DateRow {
        #[tabled(rename = "Fetch Date")]
        date: String,
        #[tabled(rename = "Funds")]
        funds: i64,
    }

    let rows: Vec<DateRow> = dates
        .iter()
        .map(|d| DateRow {
            date: d.fetch_date.format("%Y-%m-%d").to_string(),
            funds: d.funds,
        })
        .collect();

    let mut output = format!("\n{} Stored Snapshots\n\n", "🗂".cyan().bold());
    output.push_str(&render(&mut Table::new(&rows), 1));
    output.push('\n');
    output
}

pub fn format_profile(profile: &KiteProfile) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    format!(
        "\n{} Kite Profile\n{:<12} {}\n{:<12} {}\n{:<12} {}\n{:<12} {}\n",
        "👤".cyan().bold(),
        "User ID:".bold(),
        profile.user_id,
        "Name:".bold(),
        field(&profile.user_name),
        "Email:".bold(),
        field(&profile.email),
        "Broker:".bold(),
        field(&profile.broker),
    )
}

/// Format empty portfolio message
pub fn format_empty_portfolio() -> String {
    format!(
        "{} No holdings stored yet\nFetch a snapshot first using: {} fetch\n",
        "ℹ".blue().bold(),
        "mfdash".bold()
    )
}
