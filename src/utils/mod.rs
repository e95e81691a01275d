//! Utility functions for formatting
//!
//! Centralized formatting of currency and percentage values so tables and
//! summaries render amounts the same way.

use rust_decimal::Decimal;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "₹ " prefix (Indian Rupee)
    Inr,
    /// No currency symbol (for table cells)
    None,
}

/// Core formatting function with full control over output.
///
/// Uses Indian digit grouping: the last three digits form one group and
/// every group before them has two digits (`12,34,567.89`).
///
/// # Examples
/// ```
/// use mfdash::utils::{format_currency_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234567.891), 0, CurrencySymbol::Inr),
///     "₹ 12,34,567.89"
/// );
///
/// assert_eq!(
///     format_currency_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1,234.00"
/// );
/// ```
pub fn format_currency_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let is_negative = value < Decimal::ZERO;
    let rounded = crate::db::models::round_to(value.abs(), 2);

    let formatted = format!("{:.2}", rounded);
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let grouped = group_indian(integer_part);

    let sign = if is_negative && !rounded.is_zero() { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::Inr => "₹ ",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{}{}.{}", prefix, sign, grouped, decimal_part);

    // Apply width padding (right-align); count chars since ₹ is multi-byte
    let len = result.chars().count();
    if width > len {
        format!("{}{}", " ".repeat(width - len), result)
    } else {
        result
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), last_three)
}

// ============ Convenience functions ============

/// Format as Indian Rupee with symbol: "₹ 1,234.56"
///
/// # Examples
/// ```
/// use mfdash::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "₹ 1,234.56");
/// assert_eq!(format_currency(dec!(-500)), "₹ -500.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::Inr)
}

/// Format number only (no symbol): "1,234.56"
pub fn format_amount(value: Decimal) -> String {
    format_currency_with_width(value, 0, CurrencySymbol::None)
}

/// Format a percentage with sign, or "n/a" when undefined
///
/// # Examples
/// ```
/// use mfdash::utils::format_percentage;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_percentage(Some(dec!(20))), "+20.00%");
/// assert_eq!(format_percentage(Some(dec!(-5.5))), "-5.50%");
/// assert_eq!(format_percentage(None), "n/a");
/// ```
pub fn format_percentage(value: Option<Decimal>) -> String {
    match value {
        Some(v) if v > Decimal::ZERO => format!("+{:.2}%", v),
        Some(v) => format!("{:.2}%", v),
        None => "n/a".to_string(),
    }
}
