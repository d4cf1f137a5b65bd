//! Perfect timing detector.
//!
//! Two branches per wallet: with enough resolved trades, a resolution-based
//! streak check; otherwise a heuristic for conviction bets placed shortly
//! before a market closes. The resolution branch takes precedence whenever
//! its data requirement is met, even if its win-rate gates then fail.

use crate::markets::MarketLedger;
use crate::signals::cooldown::{CooldownMap, DedupKey};
use crate::signals::sizing::kelly_fraction;
use crate::types::{Signal, SignalMetadata, SignalType, TradeEvent, TradeRole};
use crate::wallets::WalletLedger;

const RECENT_WINDOW: usize = 5;

pub(super) fn detect(
    trade: &TradeEvent,
    wallets: &WalletLedger,
    markets: &MarketLedger,
    cooldowns: &mut CooldownMap,
    min_confidence: f64,
) -> Option<Signal> {
    let trade_size = trade.usd_amount;
    let now = trade.timestamp;
    let market = markets.get(trade.market_id);

    for role in [TradeRole::Maker, TradeRole::Taker] {
        let address = trade.wallet(role);
        let Some(wallet) = wallets.get(address) else {
            continue;
        };
        if wallet.total_trades < 5 {
            continue;
        }

        let key = DedupKey::Wallet {
            wallet: address.to_string(),
            market_id: trade.market_id,
        };
        if cooldowns.is_active(SignalType::PerfectTiming, &key, now) {
            continue;
        }

        let resolved_trades = wallet.resolved_trades();
        let recent_win_rate = wallet.recent_win_rate(RECENT_WINDOW);
        let overall_win_rate = wallet.win_rate();
        let has_resolution_data = resolved_trades >= 3;

        let hours_until_close = market.and_then(|m| m.hours_until_close(now));
        let is_near_close = hours_until_close.is_some_and(|h| (6.0..=48.0).contains(&h));
        let is_large_bet = wallet.avg_bet_size > 0.0 && trade_size >= 1.5 * wallet.avg_bet_size;
        let is_high_volume = wallet.total_volume >= 5_000.0;

        let confidence = if has_resolution_data {
            if !(recent_win_rate >= 0.60 && overall_win_rate >= 0.60) {
                continue;
            }
            let mut c: f64 = 0.60;

            if recent_win_rate >= 1.0 {
                c += 0.15;
            } else if recent_win_rate >= 0.80 {
                c += 0.10;
            } else {
                c += 0.05;
            }

            if overall_win_rate >= 0.80 {
                c += 0.05;
            } else if overall_win_rate >= 0.70 {
                c += 0.03;
            }

            if resolved_trades >= 15 {
                c += 0.05;
            }
            if is_large_bet {
                c += 0.05;
            }

            c.min(0.85)
        } else if is_near_close && is_large_bet && is_high_volume {
            let mut c: f64 = 0.60;

            // hours_until_close is Some whenever is_near_close holds.
            let hours_left = hours_until_close.unwrap_or(48.0);
            if hours_left <= 12.0 {
                c += 0.10;
            } else if hours_left <= 24.0 {
                c += 0.05;
            }

            if trade_size >= 5_000.0 {
                c += 0.05;
            } else if trade_size >= 2_000.0 {
                c += 0.03;
            }

            if wallet.total_trades >= 15 {
                c += 0.03;
            }

            c.min(0.80)
        } else {
            continue;
        };

        if confidence < min_confidence {
            continue;
        }

        cooldowns.record(SignalType::PerfectTiming, key, now);

        let mut reasoning = format!(
            "Perfect timing: {:.0}% recent win rate, {:.1}% overall, {} trades, ${trade_size:.0} bet",
            recent_win_rate * 100.0,
            overall_win_rate * 100.0,
            wallet.total_trades
        );
        if is_near_close {
            if let Some(h) = hours_until_close {
                reasoning.push_str(&format!(", market closes in {h:.0}h"));
            }
        }

        return Some(Signal {
            signal_type: SignalType::PerfectTiming,
            market_id: trade.market_id,
            wallet_address: Some(address.to_string()),
            timestamp: now,
            confidence,
            recommended_side: trade.direction(role),
            entry_price: trade.price,
            recommended_fraction: kelly_fraction(confidence),
            reasoning,
            metadata: SignalMetadata::PerfectTiming {
                recent_win_rate,
                overall_win_rate,
                total_trades: wallet.total_trades,
                trade_size,
                resolved_trades,
                has_resolution_data,
                hours_until_close,
            },
        });
    }

    None
}
