//! mfdash - mutual fund holdings dashboard
//!
//! Pulls mutual fund holdings from Kite Connect once a day, keeps every
//! day's snapshot in SQLite and serves portfolio analytics over them.

pub mod broker;
pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod ingest;
pub mod reports;
pub mod scheduler;
pub mod utils;
