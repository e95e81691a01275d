// Reports module - analytics over stored holding snapshots

pub mod performance;
pub mod portfolio;

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::db::{HoldingSnapshot, SnapshotDate, SnapshotStore};

pub use performance::{PerformancePoint, DEFAULT_LOOKBACK_DAYS};
pub use portfolio::{AllocationEntry, Performer, PortfolioSummary, Rank, DEFAULT_PERFORMER_LIMIT};

/// Read-side queries served to the dashboard.
///
/// Everything is computed from the rows of the latest fetch date unless a
/// window is requested. An empty store yields empty/zero results; only
/// store failures are errors.
pub struct Analytics {
    store: SnapshotStore,
    clock: Arc<dyn Clock>,
}

impl Analytics {
    pub fn new(store: SnapshotStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn latest_rows(&self) -> Result<Option<(chrono::NaiveDate, Vec<HoldingSnapshot>)>> {
        match self.store.max_date()? {
            Some(date) => Ok(Some((date, self.store.rows_for_date(date)?))),
            None => {
                debug!("No snapshots stored yet");
                Ok(None)
            }
        }
    }

    pub fn summary(&self) -> Result<PortfolioSummary> {
        Ok(match self.latest_rows()? {
            Some((date, rows)) => portfolio::summarize(&rows, Some(date)),
            None => PortfolioSummary::empty(),
        })
    }

    pub fn current_holdings(&self) -> Result<Vec<HoldingSnapshot>> {
        Ok(match self.latest_rows()? {
            Some((_, rows)) => portfolio::sort_by_current_value(rows),
            None => Vec::new(),
        })
    }

    pub fn allocation(&self) -> Result<Vec<AllocationEntry>> {
        Ok(match self.latest_rows()? {
            Some((_, rows)) => portfolio::calculate_allocation(&rows),
            None => Vec::new(),
        })
    }

    /// Daily totals over the last `days` days, oldest first
    pub fn historical_performance(&self, days: u32) -> Result<Vec<PerformancePoint>> {
        let (start, end) = performance::lookback_window(self.clock.today(), days);
        let rows = self.store.rows_in_range(start, end)?;
        Ok(performance::performance_series(&rows))
    }

    pub fn top_performers(&self, limit: usize) -> Result<Vec<Performer>> {
        self.performers(Rank::Top, limit)
    }

    pub fn bottom_performers(&self, limit: usize) -> Result<Vec<Performer>> {
        self.performers(Rank::Bottom, limit)
    }

    fn performers(&self, rank: Rank, limit: usize) -> Result<Vec<Performer>> {
        Ok(match self.latest_rows()? {
            Some((_, rows)) => portfolio::rank_performers(&rows, rank, limit),
            None => Vec::new(),
        })
    }

    /// Stored fetch dates, newest first
    pub fn snapshot_dates(&self) -> Result<Vec<SnapshotDate>> {
        self.store.snapshot_dates()
    }
}
