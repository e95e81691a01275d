use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Storage precision of `quantity`
pub const QUANTITY_DP: u32 = 3;
/// Storage precision of prices, values and percentages
pub const MONEY_DP: u32 = 2;

/// Round the way a SQL `DECIMAL(p, s)` column does (half away from zero).
pub fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// One mutual-fund holding as reported by the broker for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    pub id: Option<i64>,
    pub tradingsymbol: Option<String>,
    pub folio: Option<String>,
    pub fund: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub last_price: Decimal,
    pub last_price_date: Option<NaiveDate>,
    pub invested_value: Decimal,
    pub current_value: Decimal,
    pub pnl: Decimal,
    /// `None` when nothing was invested (return is undefined)
    pub return_percentage: Option<Decimal>,
    pub fetch_date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
}

impl HoldingSnapshot {
    /// Build a snapshot row, deriving every computed field from
    /// quantity, average price and last price.
    ///
    /// Returns None when a derived value does not fit in a `Decimal`.
    #[allow(clippy::too_many_arguments)]
    pub fn derive(
        fund: impl Into<String>,
        tradingsymbol: Option<String>,
        folio: Option<String>,
        quantity: Decimal,
        average_price: Decimal,
        last_price: Decimal,
        last_price_date: Option<NaiveDate>,
        fetch_date: NaiveDate,
    ) -> Option<Self> {
        let raw_invested = quantity.checked_mul(average_price)?;
        let raw_current = quantity.checked_mul(last_price)?;
        let raw_pnl = raw_current.checked_sub(raw_invested)?;

        let return_percentage = if raw_invested.is_zero() {
            None
        } else {
            let ratio = raw_pnl.checked_div(raw_invested)?;
            Some(round_to(ratio.checked_mul(Decimal::ONE_HUNDRED)?, MONEY_DP))
        };

        let invested_value = round_to(raw_invested, MONEY_DP);
        let current_value = round_to(raw_current, MONEY_DP);

        Some(Self {
            id: None,
            tradingsymbol,
            folio,
            fund: fund.into(),
            quantity: round_to(quantity, QUANTITY_DP),
            average_price: round_to(average_price, MONEY_DP),
            last_price: round_to(last_price, MONEY_DP),
            last_price_date,
            invested_value,
            current_value,
            pnl: current_value.checked_sub(invested_value)?,
            return_percentage,
            fetch_date,
            created_at: None,
        })
    }
}

/// Number of stored rows for one fetch date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotDate {
    pub fetch_date: NaiveDate,
    pub funds: i64,
}
