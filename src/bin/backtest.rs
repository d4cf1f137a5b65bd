//! Backtest entry point.
//!
//! Generates a seeded synthetic feed, replays it through the full
//! detection and execution pipeline, and prints the resulting metrics as
//! JSON on stdout. All knobs come from config files and `POLYWATCH__*`
//! environment variables.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use polywatch::config::AppConfig;
use polywatch::datagen;
use polywatch::runner::BacktestRunner;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    info!(config = %config.digest(), "Configuration loaded");

    let (start_date, end_date) = config.window()?;

    let feed = datagen::generate(&config.datagen_config());

    let mut runner = BacktestRunner::new(
        config.backtest.min_confidence,
        config.simulator_config(),
        config.cooldown_config(),
    );
    let metrics = runner.run(&feed.markets, &feed.events, start_date, end_date)?;

    let progress = runner.progress();
    info!(
        trades = progress.trades_processed,
        signals = progress.signals_found,
        executed = progress.trades_executed,
        final_capital = metrics.final_capital,
        "Run finished"
    );

    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}
