//! Volume spike detector.
//!
//! Market-wide signal for a 5x+ hourly volume spike with little price
//! movement, the footprint of quiet accumulation before news. Direction
//! follows net trade flow over the market's recent-trade ring.

use crate::markets::MarketLedger;
use crate::signals::cooldown::{CooldownMap, DedupKey};
use crate::signals::sizing::kelly_fraction;
use crate::types::{Side, Signal, SignalMetadata, SignalType, TradeEvent};
use crate::wallets::WalletLedger;

pub(super) fn detect(
    trade: &TradeEvent,
    _wallets: &WalletLedger,
    markets: &MarketLedger,
    cooldowns: &mut CooldownMap,
    min_confidence: f64,
) -> Option<Signal> {
    let market = markets.get(trade.market_id)?;
    let now = trade.timestamp;

    let key = DedupKey::Market(trade.market_id);
    if cooldowns.is_active(SignalType::VolumeSpike, &key, now) {
        return None;
    }

    let current_hour_volume = market.current_hour_volume();
    let avg_hourly_volume = market.avg_hourly_volume();
    let price_change = market.price_change_1h(now).abs();

    if !(avg_hourly_volume > 0.0
        && current_hour_volume > 5.0 * avg_hourly_volume
        && price_change < 0.10
        && current_hour_volume > 2_000.0)
    {
        return None;
    }

    let spike_ratio = current_hour_volume / avg_hourly_volume;

    let mut confidence: f64 = 0.58;

    if spike_ratio > 20.0 {
        confidence += 0.15;
    } else if spike_ratio > 10.0 {
        confidence += 0.10;
    } else if spike_ratio > 7.0 {
        confidence += 0.05;
    }

    if price_change < 0.03 {
        confidence += 0.07;
    } else if price_change < 0.05 {
        confidence += 0.03;
    }

    confidence = confidence.min(0.80);
    if confidence < min_confidence {
        return None;
    }

    // Net flow over the retained ring decides direction; ties go YES.
    let mut yes_volume = 0.0;
    let mut no_volume = 0.0;
    for t in &market.recent_trades {
        match t.maker_direction {
            Side::Yes => yes_volume += t.usd_amount,
            Side::No => no_volume += t.usd_amount,
        }
    }
    let recommended_side = if yes_volume >= no_volume {
        Side::Yes
    } else {
        Side::No
    };

    cooldowns.record(SignalType::VolumeSpike, key, now);

    Some(Signal {
        signal_type: SignalType::VolumeSpike,
        market_id: trade.market_id,
        wallet_address: None,
        timestamp: now,
        confidence,
        recommended_side,
        entry_price: trade.price,
        recommended_fraction: kelly_fraction(confidence),
        reasoning: format!(
            "Volume spike: ${current_hour_volume:.0} current hour vs \
             ${avg_hourly_volume:.0} avg ({spike_ratio:.1}x) with only \
             {:.1}% price change",
            price_change * 100.0
        ),
        metadata: SignalMetadata::VolumeSpike {
            current_hour_volume,
            avg_hourly_volume,
            spike_ratio,
            price_change,
            yes_volume,
            no_volume,
        },
    })
}
