//! Backtest Runner - chronological replay orchestrator
//!
//! Drives one full backtest: register markets, replay the feed in time
//! order, fold each trade into the ledgers, run detection, execute
//! signals, evaluate exits, then score the closed positions. One event is
//! fully processed before the next is considered, so a given feed and
//! seed always produce identical results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analytics::{BacktestMetrics, PerformanceAnalyzer};
use crate::markets::MarketLedger;
use crate::signals::{CooldownConfig, SignalEngine};
use crate::simulator::{PositionSimulator, SimulatorConfig};
use crate::types::{FeedEvent, MarketRecord};
use crate::wallets::WalletLedger;

const PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("backtest window is empty: {start} to {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("feed is out of time order at event {index}")]
    UnsortedFeed { index: usize },
}

/// Incremental counters exposed for progress logging
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunProgress {
    pub trades_processed: u64,
    pub resolutions_processed: u64,
    pub trades_skipped: u64,
    pub signals_found: u64,
    pub trades_executed: u64,
}

/// Owns the full component set for one deterministic backtest run
pub struct BacktestRunner {
    starting_capital: f64,
    wallets: WalletLedger,
    markets: MarketLedger,
    engine: SignalEngine,
    simulator: PositionSimulator,
    progress: RunProgress,
}

impl BacktestRunner {
    pub fn new(
        min_confidence: f64,
        simulator_config: SimulatorConfig,
        cooldown_config: CooldownConfig,
    ) -> Self {
        let starting_capital = simulator_config.starting_capital;
        info!(starting_capital, min_confidence, "Backtest runner initialized");
        Self {
            starting_capital,
            wallets: WalletLedger::new(),
            markets: MarketLedger::new(),
            engine: SignalEngine::new(min_confidence, cooldown_config),
            simulator: PositionSimulator::new(simulator_config),
            progress: RunProgress::default(),
        }
    }

    /// Replay a time-ascending feed over a date window and score the result.
    ///
    /// Events outside the window are skipped; an out-of-order feed is an
    /// error because replay determinism depends on chronological order.
    pub fn run(
        &mut self,
        market_records: &[MarketRecord],
        feed: &[FeedEvent],
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<BacktestMetrics, RunError> {
        if end_date <= start_date {
            return Err(RunError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }

        info!(
            start = %start_date.date_naive(),
            end = %end_date.date_naive(),
            markets = market_records.len(),
            events = feed.len(),
            "Starting backtest"
        );

        for record in market_records {
            self.markets.register(record);
        }

        let mut last_timestamp: Option<DateTime<Utc>> = None;
        for (index, event) in feed.iter().enumerate() {
            let timestamp = event.timestamp();
            if last_timestamp.is_some_and(|last| timestamp < last) {
                return Err(RunError::UnsortedFeed { index });
            }
            last_timestamp = Some(timestamp);

            if timestamp < start_date || timestamp > end_date {
                continue;
            }

            match event {
                FeedEvent::Trade(trade) => {
                    // A trade against an unregistered market leaves every
                    // ledger untouched.
                    if !self.markets.is_registered(trade.market_id) {
                        warn!(market_id = trade.market_id, "Trade for unknown market, skipping");
                        self.progress.trades_skipped += 1;
                        continue;
                    }

                    self.wallets.record_trade(trade);
                    self.markets.record_trade(trade);

                    let signals = self.engine.process_trade(trade, &self.wallets, &self.markets);
                    self.progress.signals_found += signals.len() as u64;
                    for signal in signals {
                        if self.simulator.execute_signal(signal, &self.markets).is_some() {
                            self.progress.trades_executed += 1;
                        }
                    }

                    self.simulator.check_exits(&self.markets, trade.timestamp);

                    self.progress.trades_processed += 1;
                    if self.progress.trades_processed % PROGRESS_INTERVAL == 0 {
                        let equity = self.simulator.current_equity(&self.markets);
                        info!(
                            trades = self.progress.trades_processed,
                            signals = self.progress.signals_found,
                            executed = self.progress.trades_executed,
                            equity,
                            pnl = equity - self.starting_capital,
                            "Replay progress"
                        );
                    }
                }
                FeedEvent::Resolution(resolution) => {
                    self.markets
                        .resolve(resolution.market_id, resolution.resolution_price);
                    self.wallets
                        .record_resolution(resolution.market_id, resolution.winning_side);
                    self.simulator.check_exits(&self.markets, resolution.timestamp);
                    self.progress.resolutions_processed += 1;
                }
            }
        }

        info!("Closing remaining open positions");
        self.simulator.close_all(&self.markets, end_date);

        let analyzer = PerformanceAnalyzer::new(
            self.simulator.closed_positions(),
            self.starting_capital,
            start_date,
            end_date,
        );
        let metrics = analyzer.calculate_metrics();

        info!(
            total_trades = metrics.total_trades,
            win_rate = metrics.win_rate,
            total_pnl = metrics.total_pnl,
            sharpe = metrics.sharpe_ratio,
            max_drawdown_pct = metrics.max_drawdown_pct,
            "Backtest complete"
        );

        Ok(metrics)
    }

    pub fn progress(&self) -> RunProgress {
        self.progress
    }

    pub fn simulator(&self) -> &PositionSimulator {
        &self.simulator
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }
}
