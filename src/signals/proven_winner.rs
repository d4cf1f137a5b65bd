//! Proven winner detector.
//!
//! A wallet with a 65%+ resolved win rate and positive lifetime profit
//! stepping up to at least twice its average bet size.

use crate::markets::MarketLedger;
use crate::signals::cooldown::{CooldownMap, DedupKey};
use crate::signals::sizing::kelly_fraction;
use crate::types::{Signal, SignalMetadata, SignalType, TradeEvent, TradeRole};
use crate::wallets::WalletLedger;

pub(super) fn detect(
    trade: &TradeEvent,
    wallets: &WalletLedger,
    _markets: &MarketLedger,
    cooldowns: &mut CooldownMap,
    min_confidence: f64,
) -> Option<Signal> {
    let trade_size = trade.usd_amount;
    let now = trade.timestamp;

    for role in [TradeRole::Maker, TradeRole::Taker] {
        let address = trade.wallet(role);
        let Some(wallet) = wallets.get(address) else {
            continue;
        };

        let resolved_trades = wallet.resolved_trades();
        let win_rate = wallet.win_rate();
        if !(resolved_trades >= 10
            && win_rate >= 0.65
            && wallet.avg_bet_size > 0.0
            && trade_size >= 2.0 * wallet.avg_bet_size
            && wallet.total_profit > 0.0)
        {
            continue;
        }

        let key = DedupKey::Wallet {
            wallet: address.to_string(),
            market_id: trade.market_id,
        };
        if cooldowns.is_active(SignalType::ProvenWinner, &key, now) {
            continue;
        }

        let mut confidence: f64 = 0.60;

        if win_rate >= 0.80 {
            confidence += 0.15;
        } else if win_rate >= 0.75 {
            confidence += 0.10;
        } else if win_rate >= 0.70 {
            confidence += 0.05;
        }

        if resolved_trades >= 50 {
            confidence += 0.05;
        } else if resolved_trades >= 25 {
            confidence += 0.03;
        }

        let size_ratio = trade_size / wallet.avg_bet_size;
        if size_ratio >= 5.0 {
            confidence += 0.07;
        } else if size_ratio >= 3.0 {
            confidence += 0.04;
        }

        if wallet.total_profit >= 10_000.0 {
            confidence += 0.05;
        } else if wallet.total_profit >= 1_000.0 {
            confidence += 0.03;
        }

        confidence = confidence.min(0.85);
        if confidence < min_confidence {
            continue;
        }

        cooldowns.record(SignalType::ProvenWinner, key, now);

        return Some(Signal {
            signal_type: SignalType::ProvenWinner,
            market_id: trade.market_id,
            wallet_address: Some(address.to_string()),
            timestamp: now,
            confidence,
            recommended_side: trade.direction(role),
            entry_price: trade.price,
            recommended_fraction: kelly_fraction(confidence),
            reasoning: format!(
                "Proven winner ({:.1}% win rate, {resolved_trades} resolved trades, \
                 ${:.0} profit) bet ${trade_size:.0} ({size_ratio:.1}x avg)",
                win_rate * 100.0,
                wallet.total_profit
            ),
            metadata: SignalMetadata::ProvenWinner {
                win_rate,
                resolved_trades,
                total_profit: wallet.total_profit,
                trade_size,
                avg_bet_size: wallet.avg_bet_size,
                size_ratio,
            },
        });
    }

    None
}
