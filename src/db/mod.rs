// Database module - SQLite snapshot store

pub mod models;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub use models::{HoldingSnapshot, SnapshotDate};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SNAPSHOT_COLUMNS: &str = "id, tradingsymbol, folio, fund, quantity, average_price, last_price,
     last_price_date, invested_value, current_value, pnl, return_percentage,
     fetch_date, created_at";

/// Get the default database path (~/.mfdash/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let app_dir = PathBuf::from(home).join(".mfdash");

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&app_dir).context("Failed to create .mfdash directory")?;

    Ok(app_dir.join("data.db"))
}

/// Open database connection
///
/// WAL lets readers keep seeing the last committed snapshot set while an
/// ingestion run holds the write lock.
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    conn.busy_timeout(BUSY_TIMEOUT)
        .context("Failed to set busy timeout")?;
    let _mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .context("Failed to enable WAL journal")?;

    Ok(conn)
}

/// Initialize the database with schema
///
/// Safe to run on every startup; all statements are `IF NOT EXISTS`.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create database directory {:?}", parent))?;
        }
    }

    let conn = open_db(Some(path))?;

    let schema_sql = include_str!("schema.sql");
    conn.execute_batch(schema_sql)
        .context("Failed to execute schema")?;

    debug!("Database schema ready");
    Ok(())
}

/// Replace every snapshot row for `date` with `rows` in one transaction.
///
/// If any insert fails the transaction is rolled back and the rows that
/// existed for `date` before the call are left untouched.
pub fn replace_snapshots_for_date(
    conn: &mut Connection,
    date: NaiveDate,
    rows: &[HoldingSnapshot],
) -> Result<usize> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("Failed to begin snapshot transaction")?;

    let removed = tx
        .execute("DELETE FROM holdings WHERE fetch_date = ?1", params![date])
        .context("Failed to delete existing snapshots")?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO holdings (
                tradingsymbol, folio, fund, quantity, average_price, last_price,
                last_price_date, invested_value, current_value, pnl,
                return_percentage, fetch_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;

        for row in rows {
            stmt.execute(params![
                row.tradingsymbol,
                row.folio,
                row.fund,
                row.quantity.to_string(),
                row.average_price.to_string(),
                row.last_price.to_string(),
                row.last_price_date,
                row.invested_value.to_string(),
                row.current_value.to_string(),
                row.pnl.to_string(),
                row.return_percentage.as_ref().map(|d| d.to_string()),
                date,
            ])
            .context(format!("Failed to insert snapshot for fund '{}'", row.fund))?;
        }
    }

    tx.commit().context("Failed to commit snapshots")?;

    debug!(
        "Replaced snapshots for {}: removed {}, inserted {}",
        date,
        removed,
        rows.len()
    );
    Ok(rows.len())
}

/// Latest fetch date in the store, or None when nothing was ingested yet
pub fn get_max_fetch_date(conn: &Connection) -> Result<Option<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT MAX(fetch_date) FROM holdings")?;

    // MAX() returns a single row with NULL when table is empty; map NULL to None
    let result: Option<Option<NaiveDate>> = stmt.query_row([], |row| row.get(0)).optional()?;

    Ok(result.flatten())
}

/// All snapshot rows for one fetch date
pub fn get_snapshots_for_date(conn: &Connection, date: NaiveDate) -> Result<Vec<HoldingSnapshot>> {
    let sql = format!(
        "SELECT {} FROM holdings WHERE fetch_date = ?1 ORDER BY id ASC",
        SNAPSHOT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(params![date], snapshot_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Snapshot rows with `start <= fetch_date <= end`, oldest first
pub fn get_snapshots_in_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<HoldingSnapshot>> {
    let sql = format!(
        "SELECT {} FROM holdings
         WHERE fetch_date >= ?1 AND fetch_date <= ?2
         ORDER BY fetch_date ASC, id ASC",
        SNAPSHOT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(params![start, end], snapshot_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Every fetch date with its row count, newest first
pub fn get_snapshot_dates(conn: &Connection) -> Result<Vec<SnapshotDate>> {
    let mut stmt = conn.prepare(
        "SELECT fetch_date, COUNT(*) FROM holdings GROUP BY fetch_date ORDER BY fetch_date DESC",
    )?;

    let dates = stmt
        .query_map([], |row| {
            Ok(SnapshotDate {
                fetch_date: row.get(0)?,
                funds: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(dates)
}

fn snapshot_from_row(row: &rusqlite::Row) -> Result<HoldingSnapshot, rusqlite::Error> {
    Ok(HoldingSnapshot {
        id: Some(row.get(0)?),
        tradingsymbol: row.get(1)?,
        folio: row.get(2)?,
        fund: row.get(3)?,
        quantity: get_decimal_value(row, 4)?,
        average_price: get_decimal_value(row, 5)?,
        last_price: get_decimal_value(row, 6)?,
        last_price_date: row.get(7)?,
        invested_value: get_decimal_value(row, 8)?,
        current_value: get_decimal_value(row, 9)?,
        pnl: get_decimal_value(row, 10)?,
        return_percentage: get_optional_decimal_value(row, 11)?,
        fetch_date: row.get(12)?,
        created_at: row.get(13)?,
    })
}

/// Helper to read Decimal from SQLite (handles INTEGER, REAL and TEXT)
pub fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    get_optional_decimal_value(row, idx)?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(idx, "decimal".to_string(), rusqlite::types::Type::Null)
    })
}

/// Helper to read optional Decimal from SQLite
fn get_optional_decimal_value(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<Option<Decimal>, rusqlite::Error> {
    use rusqlite::types::{Type, ValueRef};

    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?;
            Decimal::from_str(s)
                .map(Some)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        }
        ValueRef::Integer(i) => Ok(Some(Decimal::from(i))),
        ValueRef::Real(f) => Decimal::try_from(f)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Real, Box::new(e))),
        ValueRef::Blob(_) => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            Type::Blob,
        )),
    }
}

/// Handle to the snapshot database, constructed once and shared by the
/// ingestion job and the analytics engine.
///
/// Every call opens its own connection, so concurrent callers are isolated
/// by SQLite transactions rather than by in-process locks.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    db_path: PathBuf,
}

impl SnapshotStore {
    /// Create the schema if needed and return a store bound to `db_path`
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        init_database(Some(db_path.clone()))?;
        Ok(Self { db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        open_db(Some(self.db_path.clone()))
    }

    pub fn replace_snapshots_for_date(
        &self,
        date: NaiveDate,
        rows: &[HoldingSnapshot],
    ) -> Result<usize> {
        let mut conn = self.connect()?;
        replace_snapshots_for_date(&mut conn, date, rows)
    }

    pub fn max_date(&self) -> Result<Option<NaiveDate>> {
        get_max_fetch_date(&self.connect()?)
    }

    pub fn rows_for_date(&self, date: NaiveDate) -> Result<Vec<HoldingSnapshot>> {
        get_snapshots_for_date(&self.connect()?, date)
    }

    pub fn rows_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<HoldingSnapshot>> {
        get_snapshots_in_range(&self.connect()?, start, end)
    }

    pub fn snapshot_dates(&self) -> Result<Vec<SnapshotDate>> {
        get_snapshot_dates(&self.connect()?)
    }
}
