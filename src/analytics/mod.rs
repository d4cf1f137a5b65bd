//! Performance Analyzer - metrics over the closed-position collection
//!
//! A pure function of closed positions: nothing here mutates simulator or
//! ledger state, so the same positions always produce the same report.
//! Degenerate inputs (no trades, zero variance) yield zeroed metrics
//! rather than errors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::types::{ExitReason, Position, SignalType};

/// Aggregate metrics for one signal type
#[derive(Debug, Clone, Serialize)]
pub struct SignalPerformance {
    pub count: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub avg_pnl_pct: f64,
    pub avg_confidence: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

/// Full backtest result record
#[derive(Debug, Clone, Serialize)]
pub struct BacktestMetrics {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,

    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub monthly_roi: f64,
    pub final_capital: f64,

    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,

    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub avg_hold_hours: f64,

    pub signal_performance: HashMap<SignalType, SignalPerformance>,
    pub exit_reasons: HashMap<ExitReason, usize>,

    pub days_traded: i64,
    pub months_traded: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Computes win rate, returns, Sharpe, drawdown and per-signal breakdowns
pub struct PerformanceAnalyzer<'a> {
    positions: &'a [Position],
    starting_capital: f64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl<'a> PerformanceAnalyzer<'a> {
    pub fn new(
        positions: &'a [Position],
        starting_capital: f64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        info!(
            trades = positions.len(),
            start = %start_date.date_naive(),
            end = %end_date.date_naive(),
            "Performance analyzer initialized"
        );
        Self {
            positions,
            starting_capital,
            start_date,
            end_date,
        }
    }

    pub fn calculate_metrics(&self) -> BacktestMetrics {
        if self.positions.is_empty() {
            return self.empty_metrics();
        }

        let total_trades = self.positions.len();
        let wins: Vec<&Position> = self.positions.iter().filter(|p| p.pnl > 0.0).collect();
        let losses: Vec<&Position> = self.positions.iter().filter(|p| p.pnl <= 0.0).collect();

        let win_rate = wins.len() as f64 / total_trades as f64;

        let total_pnl: f64 = self.positions.iter().map(|p| p.pnl).sum();
        let total_return_pct = total_pnl / self.starting_capital * 100.0;

        let days_traded = (self.end_date - self.start_date).num_days();
        let months_traded = days_traded as f64 / 30.44;
        let monthly_roi = if months_traded > 0.0 {
            total_return_pct / months_traded
        } else {
            0.0
        };

        let gross_profit: f64 = wins.iter().map(|p| p.pnl).sum();
        let gross_loss: f64 = losses.iter().map(|p| p.pnl).sum::<f64>().abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        };

        let avg_hold_hours = mean(self.positions.iter().filter_map(|p| {
            p.exit_time
                .map(|exit| (exit - p.entry_time).num_seconds() as f64 / 3600.0)
        }));

        BacktestMetrics {
            total_trades,
            wins: wins.len(),
            losses: losses.len(),
            win_rate,
            total_pnl,
            total_return_pct,
            monthly_roi,
            final_capital: self.starting_capital + total_pnl,
            sharpe_ratio: self.sharpe_ratio(),
            max_drawdown_pct: self.max_drawdown_pct(),
            avg_win: mean(wins.iter().map(|p| p.pnl)),
            avg_loss: mean(losses.iter().map(|p| p.pnl)),
            avg_win_pct: mean(wins.iter().map(|p| p.pnl_pct)),
            avg_loss_pct: mean(losses.iter().map(|p| p.pnl_pct)),
            largest_win: wins.iter().map(|p| p.pnl).fold(0.0, f64::max),
            largest_loss: losses.iter().map(|p| p.pnl).fold(0.0, f64::min),
            profit_factor,
            avg_hold_hours,
            signal_performance: self.signal_performance(),
            exit_reasons: self.exit_reasons(),
            days_traded,
            months_traded,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Annualized Sharpe over per-trade returns (pnl/size), assuming ~250
    /// trading days. Zero with fewer than two trades or zero variance.
    fn sharpe_ratio(&self) -> f64 {
        let returns: Vec<f64> = self.positions.iter().map(|p| p.pnl / p.size).collect();
        if returns.len() < 2 {
            return 0.0;
        }

        let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance = returns
            .iter()
            .map(|r| (r - mean_return).powi(2))
            .sum::<f64>()
            / returns.len() as f64;
        let std_return = variance.sqrt();

        if std_return == 0.0 {
            return 0.0;
        }
        mean_return / std_return * 250.0_f64.sqrt()
    }

    /// Deepest percentage dip of the equity curve below its running peak,
    /// with P&L applied in exit-time order.
    fn max_drawdown_pct(&self) -> f64 {
        if self.positions.is_empty() {
            return 0.0;
        }

        let mut ordered: Vec<&Position> = self.positions.iter().collect();
        ordered.sort_by_key(|p| p.exit_time);

        let mut equity = self.starting_capital;
        let mut peak = equity;
        let mut max_drawdown = 0.0f64;

        for position in ordered {
            equity += position.pnl;
            if equity > peak {
                peak = equity;
            }
            let drawdown = (equity - peak) / peak * 100.0;
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
            }
        }

        max_drawdown.abs()
    }

    fn signal_performance(&self) -> HashMap<SignalType, SignalPerformance> {
        let mut performance = HashMap::new();

        for signal_type in SignalType::ALL {
            let type_positions: Vec<&Position> = self
                .positions
                .iter()
                .filter(|p| p.signal.signal_type == signal_type)
                .collect();
            if type_positions.is_empty() {
                continue;
            }

            let wins: Vec<&&Position> =
                type_positions.iter().filter(|p| p.pnl > 0.0).collect();

            performance.insert(
                signal_type,
                SignalPerformance {
                    count: type_positions.len(),
                    win_rate: wins.len() as f64 / type_positions.len() as f64,
                    total_pnl: type_positions.iter().map(|p| p.pnl).sum(),
                    avg_pnl: mean(type_positions.iter().map(|p| p.pnl)),
                    avg_pnl_pct: mean(type_positions.iter().map(|p| p.pnl_pct)),
                    avg_confidence: mean(type_positions.iter().map(|p| p.signal.confidence)),
                    largest_win: wins.iter().map(|p| p.pnl).fold(0.0, f64::max),
                    largest_loss: type_positions.iter().map(|p| p.pnl).fold(0.0, f64::min),
                },
            );
        }

        performance
    }

    fn exit_reasons(&self) -> HashMap<ExitReason, usize> {
        let mut counts = HashMap::new();
        for position in self.positions {
            if let Some(reason) = position.exit_reason {
                *counts.entry(reason).or_insert(0) += 1;
            }
        }
        counts
    }

    fn empty_metrics(&self) -> BacktestMetrics {
        let days_traded = (self.end_date - self.start_date).num_days();
        BacktestMetrics {
            total_trades: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            total_pnl: 0.0,
            total_return_pct: 0.0,
            monthly_roi: 0.0,
            final_capital: self.starting_capital,
            sharpe_ratio: 0.0,
            max_drawdown_pct: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            avg_win_pct: 0.0,
            avg_loss_pct: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            profit_factor: 0.0,
            avg_hold_hours: 0.0,
            signal_performance: HashMap::new(),
            exit_reasons: HashMap::new(),
            days_traded,
            months_traded: days_traded as f64 / 30.44,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, Signal, SignalMetadata, TradeRole};
    use chrono::{Duration, TimeZone};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, day, 12, 0, 0).unwrap()
    }

    fn position(signal_type: SignalType, pnl: f64, size: f64, exit_day: u32) -> Position {
        let entry_time = ts(exit_day) - Duration::hours(24);
        Position {
            id: u64::from(exit_day),
            signal: Signal {
                signal_type,
                market_id: 1,
                wallet_address: None,
                timestamp: entry_time,
                confidence: 0.70,
                recommended_side: Side::Yes,
                entry_price: 0.50,
                recommended_fraction: 0.10,
                reasoning: String::new(),
                metadata: SignalMetadata::FreshAccount {
                    account_age_hours: 1.0,
                    trade_size: size,
                    total_trades: 1,
                    role: TradeRole::Maker,
                },
            },
            market_id: 1,
            entry_time,
            entry_price: 0.50,
            side: Side::Yes,
            size,
            shares: size / 0.50,
            is_open: false,
            exit_time: Some(ts(exit_day)),
            exit_price: Some(0.55),
            exit_reason: Some(ExitReason::TakeProfit),
            pnl,
            pnl_pct: pnl / size * 100.0,
        }
    }

    #[test]
    fn empty_positions_yield_zeroed_metrics() {
        let analyzer = PerformanceAnalyzer::new(&[], 5_000.0, ts(1), ts(30));
        let metrics = analyzer.calculate_metrics();
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown_pct, 0.0);
        assert_eq!(metrics.final_capital, 5_000.0);
    }

    #[test]
    fn win_rate_and_returns() {
        let positions = vec![
            position(SignalType::FreshAccount, 100.0, 500.0, 2),
            position(SignalType::FreshAccount, -50.0, 500.0, 3),
            position(SignalType::VolumeSpike, 200.0, 500.0, 4),
            position(SignalType::VolumeSpike, 150.0, 500.0, 5),
        ];
        let analyzer = PerformanceAnalyzer::new(&positions, 5_000.0, ts(1), ts(30));
        let metrics = analyzer.calculate_metrics();

        assert_eq!(metrics.total_trades, 4);
        assert_eq!(metrics.wins, 3);
        assert_eq!(metrics.losses, 1);
        assert!((metrics.win_rate - 0.75).abs() < 1e-12);
        assert!((metrics.total_pnl - 400.0).abs() < 1e-9);
        assert!((metrics.total_return_pct - 8.0).abs() < 1e-9);
        assert!((metrics.final_capital - 5_400.0).abs() < 1e-9);
        assert!((metrics.profit_factor - 9.0).abs() < 1e-9);
        assert!(metrics.sharpe_ratio > 0.0);
    }

    #[test]
    fn drawdown_follows_exit_order() {
        // Win first, then two losses: peak 5100, trough 4800.
        let positions = vec![
            position(SignalType::FreshAccount, 100.0, 500.0, 2),
            position(SignalType::FreshAccount, -200.0, 500.0, 3),
            position(SignalType::FreshAccount, -100.0, 500.0, 4),
        ];
        let analyzer = PerformanceAnalyzer::new(&positions, 5_000.0, ts(1), ts(30));
        let metrics = analyzer.calculate_metrics();

        let expected = (5_100.0 - 4_800.0) / 5_100.0 * 100.0;
        assert!((metrics.max_drawdown_pct - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_variance_returns_zero_sharpe() {
        let positions = vec![
            position(SignalType::FreshAccount, 50.0, 500.0, 2),
            position(SignalType::FreshAccount, 50.0, 500.0, 3),
        ];
        let analyzer = PerformanceAnalyzer::new(&positions, 5_000.0, ts(1), ts(30));
        assert_eq!(analyzer.calculate_metrics().sharpe_ratio, 0.0);
    }

    #[test]
    fn per_signal_breakdown_scopes_by_type() {
        let positions = vec![
            position(SignalType::FreshAccount, 100.0, 500.0, 2),
            position(SignalType::VolumeSpike, -50.0, 500.0, 3),
        ];
        let analyzer = PerformanceAnalyzer::new(&positions, 5_000.0, ts(1), ts(30));
        let metrics = analyzer.calculate_metrics();

        let fresh = &metrics.signal_performance[&SignalType::FreshAccount];
        assert_eq!(fresh.count, 1);
        assert!((fresh.win_rate - 1.0).abs() < 1e-12);

        let spike = &metrics.signal_performance[&SignalType::VolumeSpike];
        assert_eq!(spike.count, 1);
        assert_eq!(spike.win_rate, 0.0);

        assert!(!metrics
            .signal_performance
            .contains_key(&SignalType::ProvenWinner));
        assert_eq!(metrics.exit_reasons[&ExitReason::TakeProfit], 2);
    }
}
