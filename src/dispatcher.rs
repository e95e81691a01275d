//! Command dispatcher that routes parsed clap commands to the ingestion job,
//! the broker session helpers and the analytics queries.

use anyhow::{bail, Result};
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use crate::broker::{BrokerSession, KiteBroker};
use crate::cli::formatters;
use crate::cli::{Commands, SessionCommands};
use crate::clock::Clock;
use crate::config::Config;
use crate::db::SnapshotStore;
use crate::ingest::IngestionJob;
use crate::reports::{Analytics, Rank};
use crate::scheduler;

/// Everything a command needs, built once at startup
pub struct AppContext {
    pub config: Config,
    pub store: SnapshotStore,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    fn analytics(&self) -> Analytics {
        Analytics::new(self.store.clone(), Arc::clone(&self.clock))
    }

    fn broker(&self) -> Result<Arc<KiteBroker>> {
        Ok(Arc::new(KiteBroker::new(&self.config.broker)?))
    }

    fn ingestion_job(&self) -> Result<IngestionJob> {
        Ok(IngestionJob::new(
            self.broker()?,
            self.store.clone(),
            Arc::clone(&self.clock),
        ))
    }
}

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, ctx: &AppContext, json_output: bool) -> Result<()> {
    match command {
        Commands::Fetch => dispatch_fetch(ctx, json_output).await,
        Commands::Schedule => dispatch_schedule(ctx).await,
        Commands::Summary => dispatch_summary(ctx, json_output),
        Commands::Holdings => dispatch_holdings(ctx, json_output),
        Commands::Allocation => dispatch_allocation(ctx, json_output),
        Commands::Performance { days } => dispatch_performance(ctx, days, json_output),
        Commands::Top { limit } => dispatch_performers(ctx, Rank::Top, limit, json_output),
        Commands::Bottom { limit } => dispatch_performers(ctx, Rank::Bottom, limit, json_output),
        Commands::History => dispatch_history(ctx, json_output),
        Commands::Session { action } => dispatch_session(action, ctx, json_output).await,
    }
}

async fn dispatch_fetch(ctx: &AppContext, json_output: bool) -> Result<()> {
    let job = ctx.ingestion_job()?;

    match job.run().await {
        Ok(report) => {
            if json_output {
                let payload = serde_json::json!({
                    "success": true,
                    "fetch_date": report.fetch_date,
                    "stored": report.stored,
                });
                println!("{}", formatters::to_json(&payload));
            } else if report.stored == 0 {
                println!(
                    "{} Broker reported no holdings; nothing stored for {}",
                    "ℹ".blue().bold(),
                    report.fetch_date
                );
            } else {
                println!(
                    "{} Stored {} holdings for {}",
                    "✓".green().bold(),
                    report.stored,
                    report.fetch_date
                );
            }
            Ok(())
        }
        Err(e) => {
            if json_output {
                let payload = serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                });
                println!("{}", formatters::to_json(&payload));
            }
            bail!("Fetch failed: {}", e)
        }
    }
}

async fn dispatch_schedule(ctx: &AppContext) -> Result<()> {
    let schedule = ctx.config.cron_schedule()?;
    let job = ctx.ingestion_job()?;

    println!(
        "{} Fetching holdings on {} (Ctrl-C to stop)",
        "⏰".cyan().bold(),
        schedule
    );

    scheduler::run_scheduled(&job, &schedule, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    })
    .await;

    Ok(())
}

fn dispatch_summary(ctx: &AppContext, json_output: bool) -> Result<()> {
    let summary = ctx.analytics().summary()?;

    if json_output {
        println!("{}", formatters::to_json(&summary));
    } else {
        print!("{}", formatters::format_summary(&summary));
        if summary.last_updated.is_none() {
            print!("\n{}", formatters::format_empty_portfolio());
        }
    }
    Ok(())
}

fn dispatch_holdings(ctx: &AppContext, json_output: bool) -> Result<()> {
    let holdings = ctx.analytics().current_holdings()?;

    if json_output {
        println!("{}", formatters::to_json(&holdings));
    } else if holdings.is_empty() {
        print!("{}", formatters::format_empty_portfolio());
    } else {
        print!("{}", formatters::format_holdings_table(&holdings));
    }
    Ok(())
}

fn dispatch_allocation(ctx: &AppContext, json_output: bool) -> Result<()> {
    let allocation = ctx.analytics().allocation()?;

    if json_output {
        println!("{}", formatters::to_json(&allocation));
    } else if allocation.is_empty() {
        print!("{}", formatters::format_empty_portfolio());
    } else {
        print!("{}", formatters::format_allocation_table(&allocation));
    }
    Ok(())
}

fn dispatch_performance(ctx: &AppContext, days: u32, json_output: bool) -> Result<()> {
    info!("Calculating performance over the last {} days", days);
    let series = ctx.analytics().historical_performance(days)?;

    if json_output {
        println!("{}", formatters::to_json(&series));
    } else {
        print!("{}", formatters::format_performance_table(&series, days));
    }
    Ok(())
}

fn dispatch_performers(ctx: &AppContext, rank: Rank, limit: usize, json_output: bool) -> Result<()> {
    let analytics = ctx.analytics();
    let performers = match rank {
        Rank::Top => analytics.top_performers(limit)?,
        Rank::Bottom => analytics.bottom_performers(limit)?,
    };

    if json_output {
        println!("{}", formatters::to_json(&performers));
    } else if performers.is_empty() {
        print!("{}", formatters::format_empty_portfolio());
    } else {
        print!("{}", formatters::format_performers_table(&performers, rank));
    }
    Ok(())
}

fn dispatch_history(ctx: &AppContext, json_output: bool) -> Result<()> {
    let dates = ctx.analytics().snapshot_dates()?;

    if json_output {
        println!("{}", formatters::to_json(&dates));
    } else if dates.is_empty() {
        print!("{}", formatters::format_empty_portfolio());
    } else {
        print!("{}", formatters::format_history_table(&dates));
    }
    Ok(())
}

async fn dispatch_session(action: SessionCommands, ctx: &AppContext, json_output: bool) -> Result<()> {
    let broker = ctx.broker()?;

    match action {
        SessionCommands::Validate => {
            let valid = broker.is_session_valid().await;
            if json_output {
                println!("{}", formatters::to_json(&serde_json::json!({ "valid": valid })));
            } else if valid {
                println!("{} Kite session is valid", "✓".green().bold());
            } else {
                println!(
                    "{} Kite session is not valid; log in again using: {} session login-url",
                    "✗".red().bold(),
                    "mfdash".bold()
                );
            }
            Ok(())
        }
        SessionCommands::LoginUrl => {
            let url = broker.login_url();
            if json_output {
                println!("{}", formatters::to_json(&serde_json::json!({ "login_url": url })));
            } else {
                println!("{}", url);
            }
            Ok(())
        }
        SessionCommands::Profile => {
            let profile = broker.profile().await?;
            if json_output {
                println!("{}", formatters::to_json(&profile));
            } else {
                print!("{}", formatters::format_profile(&profile));
            }
            Ok(())
        }
    }
}
