use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{BrokerHolding, BrokerSession};
use crate::config::BrokerConfig;
use crate::error::ConfigError;

const KITE_API_VERSION: &str = "3";

/// One entry of the `data` array returned by `GET /mf/holdings`
#[derive(Debug, Deserialize)]
struct KiteMfHolding {
    #[serde(default)]
    tradingsymbol: Option<String>,
    #[serde(default)]
    folio: Option<String>,
    fund: String,
    quantity: f64,
    average_price: f64,
    last_price: f64,
    #[serde(default)]
    last_price_date: Option<String>,
}

/// The logged-in user as returned by `GET /user/profile`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KiteProfile {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub broker: Option<String>,
}

/// Kite Connect v3 client for the mutual-fund endpoints
pub struct KiteBroker {
    client: Client,
    base_url: String,
    login_base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl KiteBroker {
    pub fn new(config: &BrokerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("api_key"))?;

        let client = Client::builder()
            .user_agent(concat!("mfdash/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_base_url: config.login_url.clone(),
            api_key,
            access_token: config.access_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    /// URL the user opens to start the Kite login flow.
    ///
    /// Exchanging the resulting request token is not handled here.
    pub fn login_url(&self) -> String {
        format!(
            "{}?v={}&api_key={}",
            self.login_base_url, KITE_API_VERSION, self.api_key
        )
    }

    /// Profile of the user the access token belongs to
    pub async fn profile(&self) -> Result<KiteProfile> {
        let body = self.get_json("/user/profile").await?;
        parse_profile(&body)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| anyhow!("No access token configured"))?;

        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Kite-Version", KITE_API_VERSION)
            .header("Authorization", format!("token {}:{}", self.api_key, token))
            .send()
            .await
            .context(format!("Failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                    anyhow!("Kite rejected the session ({}): {}", status, body)
                }
                _ => anyhow!("Kite returned error status {}: {}", status, body),
            });
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse Kite response")
    }
}

#[async_trait]
impl BrokerSession for KiteBroker {
    async fn is_session_valid(&self) -> bool {
        if self.access_token.is_none() {
            warn!("No Kite access token configured");
            return false;
        }

        match self.profile().await {
            Ok(profile) => {
                debug!("Kite session belongs to {}", profile.user_id);
                true
            }
            Err(e) => {
                debug!("Session validation failed: {:#}", e);
                false
            }
        }
    }

    async fn fetch_current_holdings(&self) -> Result<Vec<BrokerHolding>> {
        info!("Fetching mutual fund holdings from Kite");
        let body = self.get_json("/mf/holdings").await?;
        Ok(parse_mf_holdings(&body))
    }
}

/// Extract holdings from a `/mf/holdings` response body.
///
/// A missing or non-list `data` field, or an entry that does not have the
/// expected shape, is logged and treated as "no holdings" so a transient API
/// quirk does not fail the run.
pub fn parse_mf_holdings(body: &Value) -> Vec<BrokerHolding> {
    let data = match body.get("data") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => {
            warn!("Kite holdings response has no data");
            return Vec::new();
        }
        Some(other) => {
            warn!("Kite holdings data is not a list: {}", other);
            return Vec::new();
        }
    };

    let raw: Vec<KiteMfHolding> = match serde_json::from_value(Value::Array(data.clone())) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Malformed Kite holdings entry, ignoring response: {}", e);
            return Vec::new();
        }
    };

    match raw.into_iter().map(to_broker_holding).collect::<Result<Vec<_>>>() {
        Ok(holdings) => holdings,
        Err(e) => {
            warn!("Malformed Kite holdings value, ignoring response: {:#}", e);
            Vec::new()
        }
    }
}

fn to_broker_holding(raw: KiteMfHolding) -> Result<BrokerHolding> {
    let decimal = |v: f64, field: &str| {
        Decimal::try_from(v).map_err(|e| anyhow!("{} for '{}': {}", field, raw.fund, e))
    };

    Ok(BrokerHolding {
        quantity: decimal(raw.quantity, "quantity")?,
        average_price: decimal(raw.average_price, "average_price")?,
        last_price: decimal(raw.last_price, "last_price")?,
        last_price_date: raw.last_price_date.as_deref().and_then(parse_kite_date),
        tradingsymbol: raw.tradingsymbol.clone().filter(|s| !s.is_empty()),
        folio: raw.folio.clone().filter(|s| !s.is_empty()),
        fund: raw.fund.clone(),
    })
}

/// Extract the profile from a `/user/profile` response body
pub fn parse_profile(body: &Value) -> Result<KiteProfile> {
    let status = body.get("status").and_then(Value::as_str);
    if status != Some("success") {
        return Err(anyhow!("Kite profile request returned status {:?}", status));
    }
    let data = body
        .get("data")
        .cloned()
        .ok_or_else(|| anyhow!("Kite profile response has no data"))?;
    serde_json::from_value(data).context("Malformed Kite profile")
}

/// Kite sends either `2024-06-14` or `2024-06-14 00:00:00`
fn parse_kite_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
