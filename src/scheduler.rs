//! Ingestion schedule
//!
//! Schedules are standard five-field cron expressions
//! (`minute hour day-of-month month day-of-week`) evaluated in UTC. Fields
//! accept `*`, values, ranges, lists, steps and three-letter month/day names.
//! When both day fields are restricted a day matching either one fires, as
//! in Vixie cron.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::ingest::IngestionJob;

/// How far ahead `next_after` looks; covers Feb 29 schedules across a
/// skipped leap year.
const MAX_SEARCH_DAYS: u32 = 366 * 8;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Allowed values of one cron field as a bit set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CronField {
    bits: u64,
    /// False when the field starts with `*`
    restricted: bool,
}

impl CronField {
    /// `names[i]` stands for `min + i`
    fn parse(field: &str, min: u32, max: u32, names: &[&str]) -> Option<Self> {
        let mut bits = 0u64;

        for part in field.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => (range, Some(step.parse::<u32>().ok()?)),
                None => (part, None),
            };
            if step == Some(0) {
                return None;
            }

            let (start, end) = if range == "*" {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                (parse_value(a, min, names)?, parse_value(b, min, names)?)
            } else {
                let v = parse_value(range, min, names)?;
                // `5/15` means every 15 starting at 5
                if step.is_some() {
                    (v, max)
                } else {
                    (v, v)
                }
            };

            if start < min || end > max || start > end {
                return None;
            }

            let step = step.unwrap_or(1);
            let mut v = start;
            while v <= end {
                bits |= 1 << v;
                v += step;
            }
        }

        Some(Self {
            bits,
            restricted: !field.starts_with('*'),
        })
    }

    fn matches(&self, value: u32) -> bool {
        value < 64 && self.bits & (1 << value) != 0
    }
}

fn parse_value(s: &str, min: u32, names: &[&str]) -> Option<u32> {
    if let Ok(v) = s.parse::<u32>() {
        return Some(v);
    }
    let lower = s.to_ascii_lowercase();
    names
        .iter()
        .position(|n| *n == lower)
        .map(|i| min + i as u32)
}

/// A parsed cron expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    minutes: CronField,
    hours: CronField,
    days_of_month: CronField,
    months: CronField,
    days_of_week: CronField,
}

impl CronSchedule {
    /// Every day at `hour:minute` UTC
    pub fn daily(hour: u32, minute: u32) -> Result<Self, ConfigError> {
        format!("{} {} * * *", minute, hour).parse()
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        if !self.months.matches(date.month()) {
            return false;
        }
        let dom = self.days_of_month.matches(date.day());
        let dow = self
            .days_of_week
            .matches(date.weekday().num_days_from_sunday());

        if self.days_of_month.restricted && self.days_of_week.restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// First matching minute strictly after `now`, or None if the expression
    /// never fires (e.g. `0 0 30 2 *`).
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let floor = now.with_second(0)?.with_nanosecond(0)?;
        let start = floor + Duration::minutes(1);

        let mut date = start.date_naive();
        let (mut from_hour, mut from_minute) = (start.hour(), start.minute());

        for _ in 0..=MAX_SEARCH_DAYS {
            if self.day_matches(date) {
                for hour in (from_hour..24).filter(|h| self.hours.matches(*h)) {
                    let first_minute = if hour == from_hour { from_minute } else { 0 };
                    if let Some(minute) = (first_minute..60).find(|m| self.minutes.matches(*m)) {
                        return date.and_hms_opt(hour, minute, 0).map(|dt| dt.and_utc());
                    }
                }
            }
            date = date.succ_opt()?;
            from_hour = 0;
            from_minute = 0;
        }

        None
    }
}

impl FromStr for CronSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidSchedule(s.to_string());

        let fields: Vec<&str> = s.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(invalid());
        };

        let mut days_of_week = CronField::parse(dow, 0, 7, &DAY_NAMES).ok_or_else(invalid)?;
        // 7 is Sunday too
        if days_of_week.matches(7) {
            days_of_week.bits = (days_of_week.bits & !(1 << 7)) | 1;
        }

        let schedule = Self {
            expression: fields.join(" "),
            minutes: CronField::parse(minute, 0, 59, &[]).ok_or_else(invalid)?,
            hours: CronField::parse(hour, 0, 23, &[]).ok_or_else(invalid)?,
            days_of_month: CronField::parse(dom, 1, 31, &[]).ok_or_else(invalid)?,
            months: CronField::parse(month, 1, 12, &MONTH_NAMES).ok_or_else(invalid)?,
            days_of_week,
        };

        let reference = NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(invalid)?;
        if schedule.next_after(reference).is_none() {
            return Err(invalid());
        }

        Ok(schedule)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cron '{}' (UTC)", self.expression)
    }
}

/// Run `job` at every instant of `schedule` until `shutdown` resolves.
///
/// A failed run is only logged; the next tick is an independent attempt.
pub async fn run_scheduled<F>(job: &IngestionJob, schedule: &CronSchedule, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    info!("Scheduler started ({})", schedule);

    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            warn!("{} has no upcoming run; scheduler stopping", schedule);
            break;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!("Next ingestion run at {}", next.format("%Y-%m-%d %H:%M UTC"));

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                if !job.run_ingestion().await {
                    warn!("Scheduled ingestion failed; will retry at the next tick");
                }
            }
            _ = &mut shutdown => {
                info!("Scheduler stopped");
                break;
            }
        }
    }
}
