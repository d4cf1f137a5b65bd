//! Wallet clustering detector.
//!
//! Market-wide signal for a burst of mostly-fresh wallets piling onto the
//! same side within a 12h window. Both sides are scored and the stronger
//! cluster wins; ties go YES.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::markets::MarketLedger;
use crate::signals::cooldown::{CooldownMap, DedupKey};
use crate::signals::sizing::kelly_fraction;
use crate::types::{Side, Signal, SignalMetadata, SignalType, TradeEvent};
use crate::wallets::WalletLedger;

const CLUSTER_WINDOW_HOURS: i64 = 12;
const FRESH_AGE_HOURS: f64 = 48.0;

struct ClusterScore {
    confidence: f64,
    wallet_count: usize,
    fresh_count: usize,
    fresh_ratio: f64,
    volume: f64,
}

fn score_cluster(
    members: &HashSet<&str>,
    volume: f64,
    wallets: &WalletLedger,
    now: DateTime<Utc>,
) -> Option<ClusterScore> {
    if members.len() < 3 || volume < 25_000.0 {
        return None;
    }

    let fresh_count = members
        .iter()
        .filter(|addr| {
            wallets
                .get(addr)
                .map_or(true, |w| w.account_age_hours(now) < FRESH_AGE_HOURS)
        })
        .count();
    let fresh_ratio = fresh_count as f64 / members.len() as f64;
    if fresh_count < 2 || fresh_ratio < 0.5 {
        return None;
    }

    let mut confidence: f64 = 0.55;

    if members.len() >= 6 {
        confidence += 0.10;
    } else if members.len() >= 5 {
        confidence += 0.07;
    } else if members.len() >= 4 {
        confidence += 0.04;
    }

    if volume > 100_000.0 {
        confidence += 0.10;
    } else if volume > 50_000.0 {
        confidence += 0.07;
    } else if volume > 35_000.0 {
        confidence += 0.04;
    }

    if fresh_ratio >= 0.8 {
        confidence += 0.05;
    }

    Some(ClusterScore {
        confidence: confidence.min(0.75),
        wallet_count: members.len(),
        fresh_count,
        fresh_ratio,
        volume,
    })
}

pub(super) fn detect(
    trade: &TradeEvent,
    wallets: &WalletLedger,
    markets: &MarketLedger,
    cooldowns: &mut CooldownMap,
    min_confidence: f64,
) -> Option<Signal> {
    let market = markets.get(trade.market_id)?;
    if market.recent_trades.is_empty() {
        return None;
    }
    let now = trade.timestamp;

    let key = DedupKey::Market(trade.market_id);
    if cooldowns.is_active(SignalType::WalletClustering, &key, now) {
        return None;
    }

    let cutoff = now - Duration::hours(CLUSTER_WINDOW_HOURS);
    let window: Vec<_> = market
        .recent_trades
        .iter()
        .filter(|t| t.timestamp >= cutoff)
        .collect();
    if window.len() < 3 {
        return None;
    }

    // Group maker wallets and volume by the side they took.
    let mut yes_wallets: HashSet<&str> = HashSet::new();
    let mut no_wallets: HashSet<&str> = HashSet::new();
    let mut yes_volume = 0.0;
    let mut no_volume = 0.0;
    for t in &window {
        match t.maker_direction {
            Side::Yes => {
                yes_wallets.insert(t.maker.as_str());
                yes_volume += t.usd_amount;
            }
            Side::No => {
                no_wallets.insert(t.maker.as_str());
                no_volume += t.usd_amount;
            }
        }
    }

    let yes_score = score_cluster(&yes_wallets, yes_volume, wallets, now);
    let no_score = score_cluster(&no_wallets, no_volume, wallets, now);

    let (side, score) = match (yes_score, no_score) {
        (Some(y), Some(n)) if n.confidence > y.confidence => (Side::No, n),
        (Some(y), _) => (Side::Yes, y),
        (None, Some(n)) => (Side::No, n),
        (None, None) => return None,
    };

    if score.confidence < min_confidence {
        return None;
    }

    cooldowns.record(SignalType::WalletClustering, key, now);

    Some(Signal {
        signal_type: SignalType::WalletClustering,
        market_id: trade.market_id,
        wallet_address: None,
        timestamp: now,
        confidence: score.confidence,
        recommended_side: side,
        entry_price: trade.price,
        recommended_fraction: kelly_fraction(score.confidence),
        reasoning: format!(
            "Wallet cluster: {} wallets ({} new, {:.0}% fresh) bet {side} with \
             ${:.0} combined volume",
            score.wallet_count,
            score.fresh_count,
            score.fresh_ratio * 100.0,
            score.volume
        ),
        metadata: SignalMetadata::WalletClustering {
            wallet_count: score.wallet_count,
            fresh_wallet_count: score.fresh_count,
            fresh_ratio: score.fresh_ratio,
            combined_volume: score.volume,
        },
    })
}
