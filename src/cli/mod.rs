use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::reports::{DEFAULT_LOOKBACK_DAYS, DEFAULT_PERFORMER_LIMIT};

pub mod formatters;

#[derive(Parser)]
#[command(name = "mfdash")]
#[command(version, about = "Mutual fund dashboard backed by daily Kite Connect snapshots")]
#[command(
    long_about = "Fetch your Zerodha mutual fund holdings once a day, keep every day's snapshot, and report portfolio summary, allocation, performance trend and best/worst funds."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Path to the TOML config file (default: ~/.mfdash/config.toml)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch holdings now and store today's snapshot
    Fetch,

    /// Run the daily fetch on the configured schedule until interrupted
    Schedule,

    /// Portfolio totals as of the latest snapshot
    Summary,

    /// Latest holdings, largest positions first
    Holdings,

    /// Share of portfolio value per fund
    Allocation,

    /// Daily portfolio value over a lookback window
    Performance {
        /// Number of days to look back
        #[arg(short, long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
        days: u32,
    },

    /// Best performing funds by return
    Top {
        /// Number of funds to show
        #[arg(short, long, default_value_t = DEFAULT_PERFORMER_LIMIT)]
        limit: usize,
    },

    /// Worst performing funds by return
    Bottom {
        /// Number of funds to show
        #[arg(short, long, default_value_t = DEFAULT_PERFORMER_LIMIT)]
        limit: usize,
    },

    /// List stored snapshot dates
    History,

    /// Broker session helpers
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Check whether the configured access token is still valid
    Validate,
    /// Print the Kite login URL
    LoginUrl,
    /// Show the Kite user the access token belongs to
    Profile,
}
