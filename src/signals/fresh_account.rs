//! Fresh account detector.
//!
//! A young wallet (under 7 days) with few lifetime trades placing a $1K+
//! bet. Both maker and taker sides are examined.

use crate::markets::MarketLedger;
use crate::signals::cooldown::{CooldownMap, DedupKey};
use crate::signals::sizing::kelly_fraction;
use crate::types::{Signal, SignalMetadata, SignalType, TradeEvent, TradeRole};
use crate::wallets::WalletLedger;

pub(super) fn detect(
    trade: &TradeEvent,
    wallets: &WalletLedger,
    markets: &MarketLedger,
    cooldowns: &mut CooldownMap,
    min_confidence: f64,
) -> Option<Signal> {
    let market = markets.get(trade.market_id)?;
    let trade_size = trade.usd_amount;
    let now = trade.timestamp;

    for role in [TradeRole::Maker, TradeRole::Taker] {
        let address = trade.wallet(role);
        let Some(wallet) = wallets.get(address) else {
            continue;
        };

        // total_trades already includes this fill; the ledgers fold a trade
        // in before detection runs.
        let age_hours = wallet.account_age_hours(now);
        if !(age_hours < 168.0 && trade_size >= 1000.0 && wallet.total_trades <= 5) {
            continue;
        }

        let key = DedupKey::Wallet {
            wallet: address.to_string(),
            market_id: trade.market_id,
        };
        if cooldowns.is_active(SignalType::FreshAccount, &key, now) {
            continue;
        }

        let mut confidence: f64 = 0.70;

        if age_hours < 12.0 {
            confidence += 0.15;
        } else if age_hours < 24.0 {
            confidence += 0.10;
        } else if age_hours < 72.0 {
            confidence += 0.05;
        }

        if trade_size >= 25_000.0 {
            confidence += 0.10;
        } else if trade_size >= 10_000.0 {
            confidence += 0.07;
        } else if trade_size >= 5_000.0 {
            confidence += 0.04;
        }

        if wallet.total_trades <= 1 {
            confidence += 0.05;
        }

        if let Some(hours_to_close) = market.hours_until_close(now) {
            if hours_to_close < 72.0 {
                confidence += 0.05;
            }
        }

        confidence = confidence.min(0.95);
        if confidence < min_confidence {
            continue;
        }

        cooldowns.record(SignalType::FreshAccount, key, now);

        return Some(Signal {
            signal_type: SignalType::FreshAccount,
            market_id: trade.market_id,
            wallet_address: Some(address.to_string()),
            timestamp: now,
            confidence,
            recommended_side: trade.direction(role),
            entry_price: trade.price,
            recommended_fraction: kelly_fraction(confidence),
            reasoning: format!(
                "Fresh account ({age_hours:.1}h old) with {} trades placed ${trade_size:.0} bet",
                wallet.total_trades
            ),
            metadata: SignalMetadata::FreshAccount {
                account_age_hours: age_hours,
                trade_size,
                total_trades: wallet.total_trades,
                role,
            },
        });
    }

    None
}
