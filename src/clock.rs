//! Source of "today" for ingestion runs and lookback windows

use chrono::{NaiveDate, Utc};

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Calendar date in UTC, matching the broker's end-of-day batch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always reports the same date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
