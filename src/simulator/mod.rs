//! Position Simulator - paper execution of signals with risk limits
//!
//! Turns detected signals into simulated positions with Kelly-capped
//! sizing, stop-loss/take-profit management, slippage and fees. Slippage
//! is drawn from a seeded RNG so a run is reproducible bit for bit.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::markets::MarketLedger;
use crate::types::{ExitReason, Position, Side, Signal};

/// Risk and execution parameters
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Initial bankroll in USD
    pub starting_capital: f64,
    pub max_concurrent_positions: usize,
    /// Maximum position size as percent of initial capital
    pub max_position_size_pct: f64,
    /// Maximum open exposure to one market as percent of initial capital
    pub max_market_exposure_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_hold_hours: f64,
    /// Fee charged on each side, percent of position size
    pub trading_fee_pct: f64,
    /// (min, max) slippage in basis points
    pub slippage_bps: (f64, f64),
    pub min_position_usd: f64,
    pub slippage_seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            starting_capital: 5_000.0,
            max_concurrent_positions: 5,
            max_position_size_pct: 10.0,
            max_market_exposure_pct: 30.0,
            stop_loss_pct: 15.0,
            take_profit_pct: 25.0,
            max_hold_hours: 48.0,
            trading_fee_pct: 2.0,
            slippage_bps: (10.0, 30.0),
            min_position_usd: 10.0,
            slippage_seed: 42,
        }
    }
}

/// Execution counters for the end-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorStats {
    pub signals_received: u64,
    pub signals_executed: u64,
    pub signals_rejected: u64,
    pub execution_rate: f64,
    pub open_positions: usize,
    pub closed_positions: usize,
    pub capital: f64,
}

enum SlippageSide {
    Entry,
    Exit,
}

/// Simulates position entry, management and exit against replayed markets
pub struct PositionSimulator {
    config: SimulatorConfig,
    capital: f64,
    open_positions: Vec<Position>,
    closed_positions: Vec<Position>,
    rng: StdRng,
    next_position_id: u64,
    signals_received: u64,
    signals_executed: u64,
    signals_rejected: u64,
}

impl PositionSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.slippage_seed);
        let capital = config.starting_capital;
        Self {
            config,
            capital,
            open_positions: Vec::new(),
            closed_positions: Vec::new(),
            rng,
            next_position_id: 1,
            signals_received: 0,
            signals_executed: 0,
            signals_rejected: 0,
        }
    }

    /// Try to open a position for a signal. Returns the new position id, or
    /// None when a risk check rejected it (not an error).
    pub fn execute_signal(&mut self, signal: Signal, markets: &MarketLedger) -> Option<u64> {
        self.signals_received += 1;

        if !self.can_take_position(&signal) {
            self.signals_rejected += 1;
            return None;
        }

        let size = self.position_size(&signal);
        if size < self.config.min_position_usd {
            self.signals_rejected += 1;
            debug!(size, "Position size below minimum, rejected");
            return None;
        }

        if markets.get(signal.market_id).is_none() {
            self.signals_rejected += 1;
            return None;
        }

        let entry_price = self.apply_slippage(signal.entry_price, SlippageSide::Entry);
        let shares = size / entry_price;

        let total_cost = size * (1.0 + self.config.trading_fee_pct / 100.0);
        self.capital -= total_cost;

        let id = self.next_position_id;
        self.next_position_id += 1;

        let position = Position {
            id,
            market_id: signal.market_id,
            entry_time: signal.timestamp,
            entry_price,
            side: signal.recommended_side,
            size,
            shares,
            is_open: true,
            exit_time: None,
            exit_price: None,
            exit_reason: None,
            pnl: 0.0,
            pnl_pct: 0.0,
            signal,
        };

        debug!(
            position_id = id,
            signal_type = %position.signal.signal_type,
            side = %position.side,
            entry_price,
            size,
            capital = self.capital,
            "Position opened"
        );

        self.open_positions.push(position);
        self.signals_executed += 1;
        Some(id)
    }

    /// Evaluate the exit ladder for every open position. Called after each
    /// trade event so exits react to the latest prices.
    pub fn check_exits(&mut self, markets: &MarketLedger, now: DateTime<Utc>) {
        let mut i = 0;
        while i < self.open_positions.len() {
            let position = &self.open_positions[i];
            let Some(market) = markets.get(position.market_id) else {
                i += 1;
                continue;
            };

            if market.is_resolved {
                let price = market.resolution_price.unwrap_or(market.current_price);
                let position = self.open_positions.remove(i);
                self.close_position(position, price, now, ExitReason::Resolved);
                continue;
            }

            let current_price = market.current_price;
            let pnl_pct = position.unrealized_pnl_pct(current_price);
            let hours_held = (now - position.entry_time).num_seconds() as f64 / 3600.0;
            let hours_to_close = market.hours_until_close(now);

            let reason = if pnl_pct <= -self.config.stop_loss_pct {
                Some(ExitReason::StopLoss)
            } else if pnl_pct >= self.config.take_profit_pct {
                Some(ExitReason::TakeProfit)
            } else if hours_held >= self.config.max_hold_hours && pnl_pct < 5.0 {
                Some(ExitReason::TimeDecay)
            } else if hours_to_close.is_some_and(|h| h < 6.0) && pnl_pct < 5.0 {
                Some(ExitReason::MarketClosing)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    let position = self.open_positions.remove(i);
                    self.close_position(position, current_price, now, reason);
                }
                None => i += 1,
            }
        }
    }

    /// Force-close everything at each market's last known price. Used when
    /// the replay runs out of feed.
    pub fn close_all(&mut self, markets: &MarketLedger, now: DateTime<Utc>) {
        while let Some(position) = self.open_positions.pop() {
            let price = markets
                .get(position.market_id)
                .map_or(position.entry_price, |m| m.current_price);
            self.close_position(position, price, now, ExitReason::BacktestEnd);
        }
    }

    fn close_position(
        &mut self,
        mut position: Position,
        exit_price: f64,
        now: DateTime<Utc>,
        reason: ExitReason,
    ) {
        let exit_price = self.apply_slippage(exit_price, SlippageSide::Exit);

        let gross_pnl = match position.side {
            Side::Yes => position.shares * exit_price - position.size,
            Side::No => position.size - position.shares * exit_price,
        };
        let exit_fees = position.size * (self.config.trading_fee_pct / 100.0);
        let net_pnl = gross_pnl - exit_fees;

        position.is_open = false;
        position.exit_time = Some(now);
        position.exit_price = Some(exit_price);
        position.exit_reason = Some(reason);
        position.pnl = net_pnl;
        position.pnl_pct = net_pnl / position.size * 100.0;

        self.capital += position.size + net_pnl;

        debug!(
            position_id = position.id,
            reason = %reason,
            exit_price,
            pnl = net_pnl,
            pnl_pct = position.pnl_pct,
            capital = self.capital,
            "Position closed"
        );

        self.closed_positions.push(position);
    }

    fn can_take_position(&self, signal: &Signal) -> bool {
        if self.open_positions.len() >= self.config.max_concurrent_positions {
            debug!("Max concurrent positions reached");
            return false;
        }

        let estimated_size = self.config.starting_capital * signal.recommended_fraction;
        if estimated_size > self.capital * 0.5 {
            debug!("Insufficient capital for position");
            return false;
        }

        let market_exposure: f64 = self
            .open_positions
            .iter()
            .filter(|p| p.market_id == signal.market_id)
            .map(|p| p.size)
            .sum();
        let max_exposure =
            self.config.starting_capital * (self.config.max_market_exposure_pct / 100.0);
        if market_exposure + estimated_size > max_exposure {
            debug!(market_id = signal.market_id, "Max market exposure reached");
            return false;
        }

        true
    }

    fn position_size(&self, signal: &Signal) -> f64 {
        let kelly_size = self.config.starting_capital * signal.recommended_fraction;
        let max_size = self.config.starting_capital * (self.config.max_position_size_pct / 100.0);
        // Keep a 20% capital reserve.
        kelly_size.min(max_size).min(self.capital * 0.8)
    }

    fn apply_slippage(&mut self, price: f64, side: SlippageSide) -> f64 {
        let (min_bps, max_bps) = self.config.slippage_bps;
        let bps = if max_bps > min_bps {
            self.rng.gen_range(min_bps..=max_bps)
        } else {
            min_bps
        };
        let slippage = bps / 10_000.0;
        match side {
            // Pay more to enter, receive less to exit.
            SlippageSide::Entry => price * (1.0 + slippage),
            SlippageSide::Exit => price * (1.0 - slippage),
        }
    }

    /// Capital plus unrealized P&L over open positions
    pub fn current_equity(&self, markets: &MarketLedger) -> f64 {
        let mut equity = self.capital;
        for position in &self.open_positions {
            let Some(market) = markets.get(position.market_id) else {
                continue;
            };
            let unrealized = match position.side {
                Side::Yes => position.shares * market.current_price - position.size,
                Side::No => position.size - position.shares * market.current_price,
            };
            equity += unrealized;
        }
        equity
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open_positions
    }

    pub fn closed_positions(&self) -> &[Position] {
        &self.closed_positions
    }

    pub fn stats(&self) -> SimulatorStats {
        let execution_rate = if self.signals_received == 0 {
            0.0
        } else {
            self.signals_executed as f64 / self.signals_received as f64
        };
        SimulatorStats {
            signals_received: self.signals_received,
            signals_executed: self.signals_executed,
            signals_rejected: self.signals_rejected,
            execution_rate,
            open_positions: self.open_positions.len(),
            closed_positions: self.closed_positions.len(),
            capital: self.capital,
        }
    }
}
