//! Wallet Ledger - incremental per-wallet trading statistics
//!
//! Tracks every wallet seen on the feed during replay. Metrics accumulate
//! monotonically; wallets are never evicted within a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::info;

use crate::types::{Side, TradeEvent, TradeRole};

/// Cap on per-wallet trade history retained for recent-window queries.
const TRADE_HISTORY_CAP: usize = 100;

/// Win/loss tag assigned once the trade's market resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Win,
    Loss,
}

/// One side of a fill, as seen by a single wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTradeRecord {
    pub timestamp: DateTime<Utc>,
    pub market_id: u64,
    pub side: Side,
    pub price: f64,
    pub usd_amount: f64,
    pub role: TradeRole,
    /// Set by `record_resolution` when the market settles
    pub outcome: Option<TradeOutcome>,
}

/// Trading metrics for a single wallet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletMetrics {
    pub address: String,
    pub first_trade: Option<DateTime<Utc>>,
    pub last_trade: Option<DateTime<Utc>>,
    pub total_trades: u64,
    pub wins: u32,
    pub losses: u32,
    /// Realized profit across resolved trades (USD, can be negative)
    pub total_profit: f64,
    pub total_volume: f64,
    pub avg_bet_size: f64,
    pub largest_bet: f64,
    /// Last 100 trade records, oldest evicted first
    pub trade_history: VecDeque<WalletTradeRecord>,
}

impl WalletMetrics {
    fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ..Default::default()
        }
    }

    /// Trades with a settled outcome
    pub fn resolved_trades(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win rate over resolved trades (0 when nothing has resolved)
    pub fn win_rate(&self) -> f64 {
        let resolved = self.resolved_trades();
        if resolved == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(resolved)
    }

    /// Account age in hours relative to the current replay time.
    ///
    /// Measured against `as_of`, not the wallet's own last trade, so dormant
    /// wallets still age between trades.
    pub fn account_age_hours(&self, as_of: DateTime<Utc>) -> f64 {
        match self.first_trade {
            Some(first) => (as_of - first).num_seconds() as f64 / 3600.0,
            None => 0.0,
        }
    }

    /// Win rate over the last `n` history entries (counting only entries
    /// tagged with an outcome as wins; 0 when the window is empty).
    pub fn recent_win_rate(&self, n: usize) -> f64 {
        let len = self.trade_history.len();
        if len == 0 || n == 0 {
            return 0.0;
        }
        let start = len.saturating_sub(n);
        let window = len - start;
        let wins = self
            .trade_history
            .iter()
            .skip(start)
            .filter(|r| r.outcome == Some(TradeOutcome::Win))
            .count();
        wins as f64 / window as f64
    }

    fn record(&mut self, rec: WalletTradeRecord) {
        if self.first_trade.is_none() {
            self.first_trade = Some(rec.timestamp);
        }
        self.last_trade = Some(rec.timestamp);

        self.total_trades += 1;
        self.total_volume += rec.usd_amount;
        if rec.usd_amount > self.largest_bet {
            self.largest_bet = rec.usd_amount;
        }
        self.avg_bet_size = self.total_volume / self.total_trades as f64;

        if self.trade_history.len() == TRADE_HISTORY_CAP {
            self.trade_history.pop_front();
        }
        self.trade_history.push_back(rec);
    }
}

/// Tracks all wallet trading activity during backtest replay
#[derive(Debug, Default)]
pub struct WalletLedger {
    wallets: HashMap<String, WalletMetrics>,
    total_trades_processed: u64,
}

impl WalletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create wallet metrics for an address (zero-valued on first access)
    pub fn get_or_create(&mut self, address: &str) -> &mut WalletMetrics {
        self.wallets
            .entry(address.to_string())
            .or_insert_with(|| WalletMetrics::new(address))
    }

    pub fn get(&self, address: &str) -> Option<&WalletMetrics> {
        self.wallets.get(address)
    }

    /// Update both maker and taker metrics from a fill
    pub fn record_trade(&mut self, trade: &TradeEvent) {
        for role in [TradeRole::Maker, TradeRole::Taker] {
            let rec = WalletTradeRecord {
                timestamp: trade.timestamp,
                market_id: trade.market_id,
                side: trade.direction(role),
                price: trade.price,
                usd_amount: trade.usd_amount,
                role,
                outcome: None,
            };
            self.get_or_create(trade.wallet(role)).record(rec);
        }

        self.total_trades_processed += 1;
        if self.total_trades_processed % 10_000 == 0 {
            info!(
                trades = self.total_trades_processed,
                wallets = self.wallets.len(),
                "Wallet ledger progress"
            );
        }
    }

    /// Tag historical trades in a settled market with win/loss outcomes and
    /// accumulate realized profit. Already-tagged records are left untouched,
    /// so resolving the same market twice is a no-op.
    pub fn record_resolution(&mut self, market_id: u64, winning_side: Side) {
        for wallet in self.wallets.values_mut() {
            let mut wins = 0u32;
            let mut losses = 0u32;
            let mut profit = 0.0f64;

            for rec in wallet
                .trade_history
                .iter_mut()
                .filter(|r| r.market_id == market_id && r.outcome.is_none())
            {
                if rec.side == winning_side {
                    rec.outcome = Some(TradeOutcome::Win);
                    wins += 1;
                    profit += rec.usd_amount * (1.0 - rec.price);
                } else {
                    rec.outcome = Some(TradeOutcome::Loss);
                    losses += 1;
                    profit -= rec.usd_amount * rec.price;
                }
            }

            wallet.wins += wins;
            wallet.losses += losses;
            wallet.total_profit += profit;
        }
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    pub fn trades_processed(&self) -> u64 {
        self.total_trades_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, hour, 0, 0).unwrap()
    }

    fn make_trade(hour: u32, maker: &str, taker: &str, amount: f64) -> TradeEvent {
        TradeEvent {
            timestamp: ts(hour),
            market_id: 1,
            maker: maker.to_string(),
            taker: taker.to_string(),
            maker_direction: Side::Yes,
            price: 0.50,
            usd_amount: amount,
        }
    }

    #[test]
    fn avg_bet_size_matches_volume_over_count() {
        let mut ledger = WalletLedger::new();
        for (hour, amount) in [(0, 100.0), (1, 250.0), (2, 1000.0), (3, 37.5)] {
            ledger.record_trade(&make_trade(hour, "0xw", "0xother", amount));
        }
        let w = ledger.get("0xw").unwrap();
        assert_eq!(w.total_trades, 4);
        assert!((w.avg_bet_size - w.total_volume / w.total_trades as f64).abs() < 1e-12);
        assert!((w.largest_bet - 1000.0).abs() < 1e-12);
    }

    #[test]
    fn history_is_bounded_to_cap() {
        let mut ledger = WalletLedger::new();
        for i in 0..300 {
            ledger.record_trade(&make_trade(i % 24, "0xw", "0xother", 50.0));
        }
        let w = ledger.get("0xw").unwrap();
        assert_eq!(w.trade_history.len(), TRADE_HISTORY_CAP);
        assert_eq!(w.total_trades, 300);
    }

    #[test]
    fn account_age_uses_replay_time() {
        let mut ledger = WalletLedger::new();
        ledger.record_trade(&make_trade(0, "0xw", "0xother", 50.0));
        // Dormant wallet still ages relative to replay time.
        let age = ledger.get("0xw").unwrap().account_age_hours(ts(10));
        assert!((age - 10.0).abs() < 1e-9);
    }

    #[test]
    fn resolution_tags_outcomes_once() {
        let mut ledger = WalletLedger::new();
        ledger.record_trade(&make_trade(0, "0xwinner", "0xloser", 200.0));
        ledger.record_resolution(1, Side::Yes);
        ledger.record_resolution(1, Side::Yes); // idempotent

        let winner = ledger.get("0xwinner").unwrap();
        assert_eq!(winner.wins, 1);
        assert_eq!(winner.losses, 0);
        assert!((winner.total_profit - 200.0 * 0.5).abs() < 1e-9);
        assert!((winner.win_rate() - 1.0).abs() < 1e-12);

        let loser = ledger.get("0xloser").unwrap();
        assert_eq!(loser.losses, 1);
        assert!((loser.total_profit + 200.0 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn recent_win_rate_counts_tagged_wins_in_window() {
        let mut ledger = WalletLedger::new();
        for hour in 0..5 {
            ledger.record_trade(&make_trade(hour, "0xw", "0xother", 100.0));
        }
        // Wallet took YES on all five; YES wins.
        ledger.record_resolution(1, Side::Yes);
        let w = ledger.get("0xw").unwrap();
        assert!((w.recent_win_rate(5) - 1.0).abs() < 1e-12);
        // Untagged window reports zero.
        assert_eq!(WalletMetrics::new("0xfresh").recent_win_rate(5), 0.0);
    }
}
