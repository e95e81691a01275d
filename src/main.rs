use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mfdash::cli::Cli;
use mfdash::clock::SystemClock;
use mfdash::config::Config;
use mfdash::db::SnapshotStore;
use mfdash::dispatcher::{dispatch_command, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;
    let store = SnapshotStore::open(config.database_path()?)?;
    debug!("Using snapshot database {}", store.path().display());

    let ctx = AppContext {
        config,
        store,
        clock: Arc::new(SystemClock),
    };

    dispatch_command(cli.command, &ctx, cli.json).await
}
