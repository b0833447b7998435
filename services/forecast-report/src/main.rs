//! KMA forecast report service.
//!
//! For each configured location:
//! - Resolves the grid cell (lookup table or Lambert projection)
//! - Picks the forecast run and the target hours
//! - Fetches every (hour, variable) sample on a small worker pool
//! - Writes the hourly rows as JSON and prints a markdown summary

mod cli;
mod config;
mod runner;

use anyhow::{bail, Result};
use clap::Parser;
use grid_fetcher::{FetcherConfig, GridFetcher, RetryPolicy};
use timeseries::{AggregatorConfig, SeriesAggregator};
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cli::Args;
use config::{ReportConfig, Settings};
use runner::Runner;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let file_config = match &args.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    let settings = Settings::resolve(&args, file_config)?;

    info!(
        source = %settings.source,
        targets = settings.targets.len(),
        policy = ?settings.policy,
        once = settings.once,
        "Starting forecast report"
    );

    let mut fetcher_config = FetcherConfig::from_env(settings.source);
    fetcher_config.retry = RetryPolicy {
        max_attempts: settings.max_retries.max(1),
        ..RetryPolicy::default()
    };
    if !fetcher_config.credential.is_set() {
        warn!(
            env = settings.source.key_env(),
            "API key not set; requests will fail"
        );
    }

    let fetcher = GridFetcher::from_config(&fetcher_config)?;
    let retry = fetcher.retry_policy();
    info!(
        source = fetcher.source_name(),
        max_attempts = retry.max_attempts,
        retry_delay_ms = retry.delay.as_millis() as u64,
        "Grid fetcher ready"
    );

    let aggregator = SeriesAggregator::new(
        fetcher,
        AggregatorConfig {
            max_concurrent: settings.max_concurrent,
            ..AggregatorConfig::default()
        },
    )?;

    let table = Runner::load_table(&settings)?;
    let once = settings.once;
    let runner = Runner::new(settings, aggregator, table);

    if once {
        let summary = runner.run_once().await?;
        println!("{}", summary.markdown());

        if summary.all_failed() {
            error!("Every location failed");
            bail!("no location produced data");
        }
    } else {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        // Handle Ctrl+C
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            shutdown_tx_clone.send(()).ok();
        });

        runner.run_forever(shutdown_tx.subscribe()).await?;
    }

    Ok(())
}
