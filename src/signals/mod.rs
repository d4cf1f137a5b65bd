//! Signal Engine - runs the five detection algorithms on every trade
//!
//! Detectors are pure functions of the trade and the two ledgers, gated by
//! a minimum-confidence threshold and per-type cooldowns:
//!
//! 1. Fresh account: new wallet (< 7 days) makes a large bet
//! 2. Proven winner: high win-rate wallet makes an unusually large bet
//! 3. Volume spike: 5x hourly volume with little price movement
//! 4. Wallet clustering: several fresh wallets betting the same side
//! 5. Perfect timing: wallet consistently enters before resolution

mod cooldown;
mod fresh_account;
mod perfect_timing;
mod proven_winner;
mod sizing;
mod volume_spike;
mod wallet_clustering;

pub use cooldown::{CooldownConfig, CooldownMap, DedupKey};
pub use sizing::kelly_fraction;

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::markets::MarketLedger;
use crate::types::{Signal, SignalType, TradeEvent};
use crate::wallets::WalletLedger;

/// Aggregate detection counters for the end-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct SignalStats {
    pub total_signals: u64,
    pub by_type: HashMap<SignalType, u64>,
    pub avg_confidence: f64,
}

/// Runs all five detectors against the replay, tracking cooldowns and counts
pub struct SignalEngine {
    min_confidence: f64,
    cooldowns: CooldownMap,
    total_signals: u64,
    by_type: HashMap<SignalType, u64>,
    confidence_sum: f64,
}

impl SignalEngine {
    pub fn new(min_confidence: f64, cooldowns: CooldownConfig) -> Self {
        Self {
            min_confidence,
            cooldowns: CooldownMap::new(cooldowns),
            total_signals: 0,
            by_type: HashMap::new(),
            confidence_sum: 0.0,
        }
    }

    /// Run every detector against one trade. Ledgers must already have the
    /// trade folded in. Returns the union of firings, possibly empty.
    pub fn process_trade(
        &mut self,
        trade: &TradeEvent,
        wallets: &WalletLedger,
        markets: &MarketLedger,
    ) -> Vec<Signal> {
        let mut signals = Vec::new();

        type Detector = fn(
            &TradeEvent,
            &WalletLedger,
            &MarketLedger,
            &mut CooldownMap,
            f64,
        ) -> Option<Signal>;
        const DETECTORS: [Detector; 5] = [
            fresh_account::detect,
            proven_winner::detect,
            volume_spike::detect,
            wallet_clustering::detect,
            perfect_timing::detect,
        ];

        for detect in DETECTORS {
            if let Some(signal) = detect(
                trade,
                wallets,
                markets,
                &mut self.cooldowns,
                self.min_confidence,
            ) {
                debug!(
                    signal_type = %signal.signal_type,
                    market_id = signal.market_id,
                    confidence = signal.confidence,
                    side = %signal.recommended_side,
                    "Signal detected"
                );
                self.total_signals += 1;
                *self.by_type.entry(signal.signal_type).or_insert(0) += 1;
                self.confidence_sum += signal.confidence;
                signals.push(signal);
            }
        }

        signals
    }

    pub fn total_signals(&self) -> u64 {
        self.total_signals
    }

    pub fn stats(&self) -> SignalStats {
        let avg_confidence = if self.total_signals == 0 {
            0.0
        } else {
            self.confidence_sum / self.total_signals as f64
        };
        SignalStats {
            total_signals: self.total_signals,
            by_type: self.by_type.clone(),
            avg_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketRecord, Side};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn ts(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, hour, min, 0).unwrap()
    }

    fn setup_market(markets: &mut MarketLedger, close_in_days: i64) {
        markets.register(&MarketRecord {
            id: 1,
            question: "Will the event occur?".to_string(),
            created_at: ts(0, 0) - Duration::days(30),
            close_time: Some(ts(0, 0) + Duration::days(close_in_days)),
            volume: 0.0,
        });
    }

    fn trade(when: DateTime<Utc>, maker: &str, taker: &str, price: f64, usd: f64) -> TradeEvent {
        TradeEvent {
            timestamp: when,
            market_id: 1,
            maker: maker.to_string(),
            taker: taker.to_string(),
            maker_direction: Side::Yes,
            price,
            usd_amount: usd,
        }
    }

    fn apply(
        wallets: &mut WalletLedger,
        markets: &mut MarketLedger,
        engine: &mut SignalEngine,
        t: &TradeEvent,
    ) -> Vec<Signal> {
        wallets.record_trade(t);
        markets.record_trade(t);
        engine.process_trade(t, wallets, markets)
    }

    #[test]
    fn fresh_account_fires_on_first_large_bet() {
        let mut wallets = WalletLedger::new();
        let mut markets = MarketLedger::new();
        let mut engine = SignalEngine::new(0.65, CooldownConfig::default());
        setup_market(&mut markets, 30);

        let t = trade(ts(1, 0), "0xfresh", "0xcounter", 0.40, 5_000.0);
        let signals = apply(&mut wallets, &mut markets, &mut engine, &t);

        let sig = signals
            .iter()
            .find(|s| s.signal_type == SignalType::FreshAccount)
            .expect("fresh account signal");
        assert!(sig.confidence >= 0.70);
        assert!(sig.recommended_fraction <= 0.10);
        assert_eq!(sig.recommended_side, Side::Yes);
        assert_eq!(sig.wallet_address.as_deref(), Some("0xfresh"));
    }

    #[test]
    fn fresh_account_respects_cooldown() {
        let mut wallets = WalletLedger::new();
        let mut markets = MarketLedger::new();
        let mut engine = SignalEngine::new(0.65, CooldownConfig::default());
        setup_market(&mut markets, 30);

        let first = apply(
            &mut wallets,
            &mut markets,
            &mut engine,
            &trade(ts(1, 0), "0xfresh", "0xa", 0.40, 5_000.0),
        );
        assert!(first
            .iter()
            .any(|s| s.signal_type == SignalType::FreshAccount));

        // Same wallet and market two hours later stays silent (24h window).
        let second = apply(
            &mut wallets,
            &mut markets,
            &mut engine,
            &trade(ts(3, 0), "0xfresh", "0xb", 0.41, 5_000.0),
        );
        assert!(!second
            .iter()
            .any(|s| s.signal_type == SignalType::FreshAccount
                && s.wallet_address.as_deref() == Some("0xfresh")));
    }

    #[test]
    fn volume_spike_fires_in_confidence_band() {
        let mut wallets = WalletLedger::new();
        let mut markets = MarketLedger::new();
        // High threshold off; we inspect the raw confidence band.
        let mut engine = SignalEngine::new(0.58, CooldownConfig::default());
        setup_market(&mut markets, 30);

        // Build ten quiet hours of ~$1,000 at a stable price. The hourly
        // average includes the spike bucket itself, so the burst has to
        // clear 5x the diluted mean.
        for hour in 0..10u32 {
            for i in 0..4u32 {
                let t = trade(
                    ts(hour, i * 10),
                    &format!("0xm{hour}{i}"),
                    &format!("0xt{hour}{i}"),
                    0.50,
                    250.0,
                );
                apply(&mut wallets, &mut markets, &mut engine, &t);
            }
        }

        // Then a $10,000 burst in hour 10 at ~2% price change.
        let mut spike = Vec::new();
        for i in 0..5u32 {
            let t = trade(
                ts(10, i * 2),
                &format!("0xs{i}"),
                &format!("0xu{i}"),
                0.51,
                2_000.0,
            );
            spike.extend(apply(&mut wallets, &mut markets, &mut engine, &t));
        }

        let sig = spike
            .iter()
            .find(|s| s.signal_type == SignalType::VolumeSpike)
            .expect("volume spike signal");
        assert!(sig.confidence >= 0.58 && sig.confidence <= 0.80);
        assert!(sig.wallet_address.is_none());
    }

    #[test]
    fn quiet_market_produces_no_signals() {
        let mut wallets = WalletLedger::new();
        let mut markets = MarketLedger::new();
        let mut engine = SignalEngine::new(0.65, CooldownConfig::default());
        setup_market(&mut markets, 30);

        // Small steady trades from seasoned-looking wallets.
        for hour in 0..20u32 {
            let t = trade(ts(hour % 24, 0), "0xreg1", "0xreg2", 0.50, 200.0);
            let signals = apply(&mut wallets, &mut markets, &mut engine, &t);
            assert!(signals.is_empty(), "unexpected signal at hour {hour}");
        }
        assert_eq!(engine.total_signals(), 0);
    }

    #[test]
    fn clustering_prefers_stronger_side() {
        let mut wallets = WalletLedger::new();
        let mut markets = MarketLedger::new();
        let mut engine = SignalEngine::new(0.55, CooldownConfig::default());
        setup_market(&mut markets, 30);

        // Six fresh NO makers with $60K combined inside the 12h window. Use
        // sub-$1000 fills so FreshAccount stays quiet.
        let mut signals = Vec::new();
        for i in 0..6u32 {
            let mut t = trade(
                ts(2, i * 5),
                &format!("0xno{i}"),
                &format!("0xcp{i}"),
                0.45,
                999.0,
            );
            t.maker_direction = Side::No;
            signals.extend(apply(&mut wallets, &mut markets, &mut engine, &t));
        }
        // Pad volume under the same wallets to clear the $25K floor.
        for i in 0..6u32 {
            let mut t = trade(
                ts(3, i * 5),
                &format!("0xno{i}"),
                &format!("0xcq{i}"),
                0.44,
                950.0,
            );
            t.maker_direction = Side::No;
            signals.extend(apply(&mut wallets, &mut markets, &mut engine, &t));
        }
        for i in 0..24u32 {
            let mut t = trade(
                ts(4, (i * 2) % 60),
                &format!("0xno{}", i % 6),
                &format!("0xcr{i}"),
                0.44,
                950.0,
            );
            t.maker_direction = Side::No;
            signals.extend(apply(&mut wallets, &mut markets, &mut engine, &t));
        }

        let sig = signals
            .iter()
            .find(|s| s.signal_type == SignalType::WalletClustering)
            .expect("clustering signal");
        assert_eq!(sig.recommended_side, Side::No);
        assert!(sig.confidence >= 0.55 && sig.confidence <= 0.75);
    }
}
