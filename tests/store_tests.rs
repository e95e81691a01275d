//! Snapshot store behaviour across connections

use chrono::NaiveDate;
use mfdash::db::{HoldingSnapshot, SnapshotStore};
use rust_decimal_macros::dec;
use std::thread;
use tempfile::TempDir;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 2).unwrap()
}

fn rows(count: usize) -> Vec<HoldingSnapshot> {
    (0..count)
        .map(|i| {
            HoldingSnapshot::derive(
                format!("Fund {}", i),
                None,
                None,
                dec!(1),
                dec!(10),
                dec!(11),
                None,
                day(),
            ).unwrap()
        })
        .collect()
}

#[test]
fn test_reopening_keeps_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("data.db");

    let store = SnapshotStore::open(&path).unwrap();
    assert_eq!(store.path(), path.as_path());
    store.replace_snapshots_for_date(day(), &rows(2)).unwrap();
    drop(store);

    let reopened = SnapshotStore::open(&path).unwrap();
    assert_eq!(reopened.max_date().unwrap(), Some(day()));
    assert_eq!(reopened.rows_for_date(day()).unwrap().len(), 2);
}

#[test]
fn test_readers_never_see_partial_replace() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::open(dir.path().join("data.db")).unwrap();
    store.replace_snapshots_for_date(day(), &rows(2)).unwrap();

    let writer_store = store.clone();
    let writer = thread::spawn(move || {
        for i in 0..40 {
            let count = if i % 2 == 0 { 5 } else { 2 };
            writer_store
                .replace_snapshots_for_date(day(), &rows(count))
                .unwrap();
        }
    });

    let reader_store = store.clone();
    let reader = thread::spawn(move || {
        for _ in 0..40 {
            let seen = reader_store.rows_for_date(day()).unwrap().len();
            assert!(seen == 2 || seen == 5, "saw partial replace with {} rows", seen);
        }
    });

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(store.rows_for_date(day()).unwrap().len(), 2);
}
