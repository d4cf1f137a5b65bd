//! Market Ledger - per-market price, volume and flow state
//!
//! Mirrors the wallet ledger on the market axis. Price history and hourly
//! volume are kept in bounded rings so memory stays flat over long feeds.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::warn;

use crate::types::{MarketRecord, Side, TradeEvent};

const PRICE_HISTORY_CAP: usize = 1000;
const HOURLY_BUCKET_CAP: usize = 24;
const RECENT_TRADE_CAP: usize = 100;

/// Raw trade retained for cluster and flow analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketTradeRecord {
    pub timestamp: DateTime<Utc>,
    pub maker: String,
    pub taker: String,
    pub maker_direction: Side,
    pub price: f64,
    pub usd_amount: f64,
}

/// Volume accumulated within one wall-clock hour
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HourlyBucket {
    /// Start of the hour containing the bucketed trades
    pub hour: DateTime<Utc>,
    pub volume: f64,
}

/// Live state for a single market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInfo {
    pub id: u64,
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub current_price: f64,
    pub total_volume: f64,
    pub is_resolved: bool,
    pub resolution_price: Option<f64>,
    /// Last 1000 (timestamp, price) samples, oldest evicted first
    pub price_history: VecDeque<(DateTime<Utc>, f64)>,
    /// Volume per hour, capped to the 24 most recent buckets
    pub hourly_volume: VecDeque<HourlyBucket>,
    /// Last 100 raw trades for cluster/flow queries
    pub recent_trades: VecDeque<MarketTradeRecord>,
}

impl MarketInfo {
    fn new(record: &MarketRecord) -> Self {
        Self {
            id: record.id,
            question: record.question.clone(),
            created_at: record.created_at,
            close_time: record.close_time,
            current_price: 0.0,
            total_volume: 0.0,
            is_resolved: false,
            resolution_price: None,
            price_history: VecDeque::new(),
            hourly_volume: VecDeque::new(),
            recent_trades: VecDeque::new(),
        }
    }

    /// Volume in the most recent hour bucket (0 before any trade)
    pub fn current_hour_volume(&self) -> f64 {
        self.hourly_volume.back().map_or(0.0, |b| b.volume)
    }

    /// Mean volume over retained hourly buckets (0 when empty)
    pub fn avg_hourly_volume(&self) -> f64 {
        if self.hourly_volume.is_empty() {
            return 0.0;
        }
        let total: f64 = self.hourly_volume.iter().map(|b| b.volume).sum();
        total / self.hourly_volume.len() as f64
    }

    /// Relative price change versus the last sample at or before `as_of - 1h`.
    /// Returns 0 when no such sample exists or the reference price is 0.
    pub fn price_change_1h(&self, as_of: DateTime<Utc>) -> f64 {
        let cutoff = as_of - Duration::hours(1);
        let reference = self
            .price_history
            .iter()
            .rev()
            .find(|(ts, _)| *ts <= cutoff)
            .map(|(_, price)| *price);
        match reference {
            Some(p) if p > 0.0 => (self.current_price - p) / p,
            _ => 0.0,
        }
    }

    /// Hours until the scheduled close, clamped at 0. None when the market
    /// has no close time or has not traded yet.
    pub fn hours_until_close(&self, as_of: DateTime<Utc>) -> Option<f64> {
        if self.price_history.is_empty() {
            return None;
        }
        let close = self.close_time?;
        let hours = (close - as_of).num_seconds() as f64 / 3600.0;
        Some(hours.max(0.0))
    }
}

fn hour_floor(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Registry of all markets seen during replay
#[derive(Debug, Default)]
pub struct MarketLedger {
    markets: HashMap<u64, MarketInfo>,
}

impl MarketLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market. No-op if the id is already known.
    pub fn register(&mut self, record: &MarketRecord) {
        self.markets
            .entry(record.id)
            .or_insert_with(|| MarketInfo::new(record));
    }

    pub fn get(&self, market_id: u64) -> Option<&MarketInfo> {
        self.markets.get(&market_id)
    }

    pub fn is_registered(&self, market_id: u64) -> bool {
        self.markets.contains_key(&market_id)
    }

    /// Fold one trade into price, volume and flow state. Trades against
    /// unknown markets are logged and ignored (the feed may reference
    /// markets filtered out upstream).
    pub fn record_trade(&mut self, trade: &TradeEvent) {
        let Some(market) = self.markets.get_mut(&trade.market_id) else {
            warn!(market_id = trade.market_id, "Trade for unknown market, skipping");
            return;
        };

        market.current_price = trade.price;
        market.total_volume += trade.usd_amount;

        if market.price_history.len() == PRICE_HISTORY_CAP {
            market.price_history.pop_front();
        }
        market.price_history.push_back((trade.timestamp, trade.price));

        let hour = hour_floor(trade.timestamp);
        match market.hourly_volume.back_mut() {
            Some(bucket) if bucket.hour == hour => bucket.volume += trade.usd_amount,
            _ => {
                if market.hourly_volume.len() == HOURLY_BUCKET_CAP {
                    market.hourly_volume.pop_front();
                }
                market.hourly_volume.push_back(HourlyBucket {
                    hour,
                    volume: trade.usd_amount,
                });
            }
        }

        if market.recent_trades.len() == RECENT_TRADE_CAP {
            market.recent_trades.pop_front();
        }
        market.recent_trades.push_back(MarketTradeRecord {
            timestamp: trade.timestamp,
            maker: trade.maker.clone(),
            taker: trade.taker.clone(),
            maker_direction: trade.maker_direction,
            price: trade.price,
            usd_amount: trade.usd_amount,
        });
    }

    /// Mark a market as resolved and pin its price at the resolution price.
    pub fn resolve(&mut self, market_id: u64, resolution_price: f64) {
        let Some(market) = self.markets.get_mut(&market_id) else {
            warn!(market_id, "Resolution for unknown market, skipping");
            return;
        };
        market.is_resolved = true;
        market.resolution_price = Some(resolution_price);
        market.current_price = resolution_price;
    }

    pub fn market_count(&self) -> usize {
        self.markets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, day, hour, min, 0).unwrap()
    }

    fn market_record() -> MarketRecord {
        MarketRecord {
            id: 1,
            question: "Will it happen?".to_string(),
            created_at: ts(1, 0, 0),
            close_time: Some(ts(10, 0, 0)),
            volume: 0.0,
        }
    }

    fn trade_at(when: DateTime<Utc>, price: f64, amount: f64) -> TradeEvent {
        TradeEvent {
            timestamp: when,
            market_id: 1,
            maker: "0xmaker".to_string(),
            taker: "0xtaker".to_string(),
            maker_direction: Side::Yes,
            price,
            usd_amount: amount,
        }
    }

    #[test]
    fn rings_stay_bounded() {
        let mut ledger = MarketLedger::new();
        ledger.register(&market_record());
        for i in 0..2000u32 {
            let when = ts(1, 0, 0) + Duration::minutes(i64::from(i));
            ledger.record_trade(&trade_at(when, 0.5, 100.0));
        }
        let m = ledger.get(1).unwrap();
        assert_eq!(m.price_history.len(), PRICE_HISTORY_CAP);
        assert!(m.hourly_volume.len() <= HOURLY_BUCKET_CAP);
        assert_eq!(m.recent_trades.len(), RECENT_TRADE_CAP);
        assert!((m.total_volume - 200_000.0).abs() < 1e-6);
    }

    #[test]
    fn hourly_buckets_split_on_hour_change() {
        let mut ledger = MarketLedger::new();
        ledger.register(&market_record());
        ledger.record_trade(&trade_at(ts(1, 9, 10), 0.5, 100.0));
        ledger.record_trade(&trade_at(ts(1, 9, 50), 0.5, 200.0));
        ledger.record_trade(&trade_at(ts(1, 10, 5), 0.5, 400.0));

        let m = ledger.get(1).unwrap();
        assert_eq!(m.hourly_volume.len(), 2);
        assert!((m.current_hour_volume() - 400.0).abs() < 1e-9);
        assert!((m.avg_hourly_volume() - 350.0).abs() < 1e-9);
    }

    #[test]
    fn price_change_1h_uses_sample_before_cutoff() {
        let mut ledger = MarketLedger::new();
        ledger.register(&market_record());
        ledger.record_trade(&trade_at(ts(1, 8, 0), 0.40, 100.0));
        ledger.record_trade(&trade_at(ts(1, 10, 0), 0.50, 100.0));

        let m = ledger.get(1).unwrap();
        // Reference is the 08:00 sample at price 0.40.
        assert!((m.price_change_1h(ts(1, 10, 0)) - 0.25).abs() < 1e-9);
        // No sample one hour before the first trade.
        assert_eq!(m.price_change_1h(ts(1, 8, 30)), 0.0);
    }

    #[test]
    fn hours_until_close_requires_trades_and_close_time() {
        let mut ledger = MarketLedger::new();
        ledger.register(&market_record());
        assert_eq!(ledger.get(1).unwrap().hours_until_close(ts(1, 0, 0)), None);

        ledger.record_trade(&trade_at(ts(9, 12, 0), 0.5, 100.0));
        let m = ledger.get(1).unwrap();
        assert!((m.hours_until_close(ts(9, 12, 0)).unwrap() - 12.0).abs() < 1e-9);
        // Clamped at zero after the close time.
        assert_eq!(m.hours_until_close(ts(11, 0, 0)), Some(0.0));
    }

    #[test]
    fn unknown_market_trade_is_ignored() {
        let mut ledger = MarketLedger::new();
        let mut trade = trade_at(ts(1, 0, 0), 0.5, 100.0);
        trade.market_id = 99;
        ledger.record_trade(&trade);
        assert_eq!(ledger.market_count(), 0);
    }

    #[test]
    fn resolve_pins_price() {
        let mut ledger = MarketLedger::new();
        ledger.register(&market_record());
        ledger.record_trade(&trade_at(ts(1, 0, 0), 0.6, 100.0));
        ledger.resolve(1, 1.0);
        let m = ledger.get(1).unwrap();
        assert!(m.is_resolved);
        assert_eq!(m.resolution_price, Some(1.0));
        assert!((m.current_price - 1.0).abs() < 1e-12);
    }
}
