//! Per-type signal cooldowns to prevent detector flooding.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::types::SignalType;

/// Cooldown window per detector, in hours
#[derive(Debug, Clone, Deserialize)]
pub struct CooldownConfig {
    pub fresh_account_hours: f64,
    pub proven_winner_hours: f64,
    pub volume_spike_hours: f64,
    pub wallet_clustering_hours: f64,
    pub perfect_timing_hours: f64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            fresh_account_hours: 24.0,
            proven_winner_hours: 12.0,
            volume_spike_hours: 4.0,
            wallet_clustering_hours: 6.0,
            perfect_timing_hours: 12.0,
        }
    }
}

impl CooldownConfig {
    fn window_hours(&self, signal_type: SignalType) -> f64 {
        match signal_type {
            SignalType::FreshAccount => self.fresh_account_hours,
            SignalType::ProvenWinner => self.proven_winner_hours,
            SignalType::VolumeSpike => self.volume_spike_hours,
            SignalType::WalletClustering => self.wallet_clustering_hours,
            SignalType::PerfectTiming => self.perfect_timing_hours,
        }
    }
}

/// What a cooldown window is scoped to. Wallet-centric detectors key on the
/// wallet plus the market it traded; market-wide detectors key on the market.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Wallet { wallet: String, market_id: u64 },
    Market(u64),
}

/// Last-fired timestamps per `(type, dedup key)` pair.
///
/// At most one unresolved window exists per pair; a new firing overwrites
/// the previous timestamp.
#[derive(Debug, Default)]
pub struct CooldownMap {
    config: CooldownConfig,
    last_fired: HashMap<(SignalType, DedupKey), DateTime<Utc>>,
}

impl CooldownMap {
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            config,
            last_fired: HashMap::new(),
        }
    }

    /// True while `now` is within the type's window since the last firing.
    pub fn is_active(&self, signal_type: SignalType, key: &DedupKey, now: DateTime<Utc>) -> bool {
        match self.last_fired.get(&(signal_type, key.clone())) {
            Some(last) => {
                let elapsed_hours = (now - *last).num_seconds() as f64 / 3600.0;
                elapsed_hours < self.config.window_hours(signal_type)
            }
            None => false,
        }
    }

    /// Record a firing, starting a fresh window for the pair.
    pub fn record(&mut self, signal_type: SignalType, key: DedupKey, now: DateTime<Utc>) {
        self.last_fired.insert((signal_type, key), now);
    }
}
