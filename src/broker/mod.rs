// Broker module - session + holdings collaborator consumed by ingestion

pub mod kite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

pub use kite::{KiteBroker, KiteProfile};

/// A mutual-fund holding exactly as the broker reports it, before any
/// derived values are computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerHolding {
    pub tradingsymbol: Option<String>,
    pub folio: Option<String>,
    pub fund: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub last_price: Decimal,
    pub last_price_date: Option<NaiveDate>,
}

/// Authenticated access to a brokerage account.
///
/// Token refresh and the login flow live outside this trait; an expired
/// session simply reports `false` from `is_session_valid`.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    async fn is_session_valid(&self) -> bool;

    /// Current mutual-fund holdings. An empty vector is a valid answer.
    async fn fetch_current_holdings(&self) -> Result<Vec<BrokerHolding>>;
}
