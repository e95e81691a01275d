//! Daily holdings ingestion
//!
//! One run = validate session, fetch holdings, derive values, replace the
//! rows for today. Runs are idempotent: repeating a run for the same day
//! leaves the same rows behind given the same upstream data.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::broker::{BrokerHolding, BrokerSession};
use crate::clock::Clock;
use crate::db::{HoldingSnapshot, SnapshotStore};
use crate::error::IngestError;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub fetch_date: NaiveDate,
    /// Rows written for `fetch_date`; 0 when the broker reported no holdings
    pub stored: usize,
}

pub struct IngestionJob {
    broker: Arc<dyn BrokerSession>,
    store: SnapshotStore,
    clock: Arc<dyn Clock>,
}

impl IngestionJob {
    pub fn new(broker: Arc<dyn BrokerSession>, store: SnapshotStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            broker,
            store,
            clock,
        }
    }

    /// Run once, reporting only success or failure.
    ///
    /// Never returns an error: failures are logged so a scheduler can simply
    /// try again on its next tick.
    pub async fn run_ingestion(&self) -> bool {
        match self.run().await {
            Ok(report) => {
                info!(
                    "Ingestion for {} completed ({} holdings stored)",
                    report.fetch_date, report.stored
                );
                true
            }
            Err(e) => {
                error!("Ingestion failed: {}", e);
                false
            }
        }
    }

    /// Run once with a typed result.
    ///
    /// Any error leaves the store exactly as it was before the call.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        let today = self.clock.today();
        info!("Starting holdings ingestion for {}", today);

        if !self.broker.is_session_valid().await {
            return Err(IngestError::Unauthenticated);
        }

        let holdings = self
            .broker
            .fetch_current_holdings()
            .await
            .map_err(|e| IngestError::UpstreamUnavailable(format!("{:#}", e)))?;

        if holdings.is_empty() {
            warn!("Broker reported no mutual fund holdings; store left unchanged");
            return Ok(IngestReport {
                fetch_date: today,
                stored: 0,
            });
        }

        info!("Found {} mutual fund holdings", holdings.len());
        let rows = enrich_holdings(&holdings, today)?;

        let stored = self
            .store
            .replace_snapshots_for_date(today, &rows)
            .map_err(|e| IngestError::StoreWriteFailure(format!("{:#}", e)))?;

        Ok(IngestReport {
            fetch_date: today,
            stored,
        })
    }
}

/// Turn broker holdings into snapshot rows for `fetch_date`.
///
/// Fails on the first holding whose derived values overflow.
pub fn enrich_holdings(
    holdings: &[BrokerHolding],
    fetch_date: NaiveDate,
) -> Result<Vec<HoldingSnapshot>, IngestError> {
    holdings
        .iter()
        .map(|h| {
            HoldingSnapshot::derive(
                h.fund.clone(),
                h.tradingsymbol.clone(),
                h.folio.clone(),
                h.quantity,
                h.average_price,
                h.last_price,
                h.last_price_date,
                fetch_date,
            )
            .ok_or_else(|| IngestError::MalformedHolding(h.fund.clone()))
        })
        .collect()
}
