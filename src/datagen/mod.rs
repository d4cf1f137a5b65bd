//! Synthetic feed generation for framework validation.
//!
//! Produces a seeded, reproducible market registry and trade feed with
//! three wallet populations: a handful of "insider" wallets that bet big,
//! fresh wallets created mid-period, and a broad base of regular wallets.
//!
//! Clean mode emits only regular-wallet noise shaped to stay under every
//! detector threshold: bets below the $1K fresh-account floor, per-market
//! hourly volume below the $2K spike floor, no resolutions, and no trades
//! within 48h of a market's close.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::types::{FeedEvent, MarketRecord, ResolutionEvent, Side, TradeEvent};

#[derive(Debug, Clone)]
pub struct DatagenConfig {
    pub n_markets: usize,
    pub n_trades: usize,
    pub seed: u64,
    /// Probability a trade's maker is an insider wallet
    pub insider_weight: f64,
    /// Probability a trade's maker is a fresh wallet
    pub fresh_weight: f64,
    /// Emit only regular-wallet noise, guaranteed below every detector gate
    pub clean: bool,
}

impl Default for DatagenConfig {
    fn default() -> Self {
        Self {
            n_markets: 100,
            n_trades: 10_000,
            seed: 7,
            insider_weight: 0.02,
            fresh_weight: 0.05,
            clean: false,
        }
    }
}

/// A generated registry and time-ascending event feed
#[derive(Debug)]
pub struct SyntheticFeed {
    pub markets: Vec<MarketRecord>,
    pub events: Vec<FeedEvent>,
}

struct InsiderWallet {
    address: String,
    avg_bet: f64,
}

fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap()
}

fn random_side(rng: &mut StdRng) -> Side {
    if rng.gen_bool(0.5) {
        Side::Yes
    } else {
        Side::No
    }
}

pub fn generate(config: &DatagenConfig) -> SyntheticFeed {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let markets = generate_markets(config, &mut rng);
    let mut events = if config.clean {
        generate_clean_trades(config, &markets, &mut rng)
    } else {
        generate_trades(config, &markets, &mut rng)
    };

    if !config.clean {
        for market in &markets {
            if let Some(close_time) = market.close_time {
                let winning_side = random_side(&mut rng);
                events.push(FeedEvent::Resolution(ResolutionEvent {
                    timestamp: close_time,
                    market_id: market.id,
                    winning_side,
                    resolution_price: match winning_side {
                        Side::Yes => 1.0,
                        Side::No => 0.0,
                    },
                }));
            }
        }
    }

    events.sort_by_key(FeedEvent::timestamp);

    info!(
        markets = markets.len(),
        events = events.len(),
        seed = config.seed,
        clean = config.clean,
        "Synthetic feed generated"
    );

    SyntheticFeed { markets, events }
}

fn generate_markets(config: &DatagenConfig, rng: &mut StdRng) -> Vec<MarketRecord> {
    (0..config.n_markets)
        .map(|i| {
            let created_at = base_date() + Duration::days(rng.gen_range(0..120));
            // Clean mode needs enough lifetime to keep trades clear of the
            // 48h-to-close window.
            let lifetime_days = if config.clean {
                rng.gen_range(10..=30)
            } else {
                rng.gen_range(1..=30)
            };
            let close_time = created_at + Duration::days(lifetime_days);
            MarketRecord {
                id: i as u64,
                question: format!("Test Market {i}"),
                created_at,
                close_time: Some(close_time),
                volume: rng.gen_range(10_000.0..1_000_000.0),
            }
        })
        .collect()
}

fn generate_trades(
    config: &DatagenConfig,
    markets: &[MarketRecord],
    rng: &mut StdRng,
) -> Vec<FeedEvent> {
    let insiders: Vec<InsiderWallet> = (0..10)
        .map(|i| InsiderWallet {
            address: format!("insider_{i}"),
            avg_bet: rng.gen_range(10_000.0..50_000.0),
        })
        .collect();
    let fresh: Vec<String> = (0..20).map(|i| format!("fresh_{i}")).collect();
    let regular: Vec<String> = (0..100).map(|i| format!("wallet_{i}")).collect();

    let mut events = Vec::with_capacity(config.n_trades);
    for _ in 0..config.n_trades {
        let market = &markets[rng.gen_range(0..markets.len())];
        let close_time = market.close_time.unwrap_or(market.created_at);
        let span_secs = (close_time - market.created_at).num_seconds().max(1);
        let timestamp = market.created_at + Duration::seconds(rng.gen_range(0..span_secs));

        let roll: f64 = rng.gen();
        let (maker, usd_amount) = if roll < config.insider_weight {
            let insider = &insiders[rng.gen_range(0..insiders.len())];
            let size = insider.avg_bet * rng.gen_range(0.5..2.0);
            (insider.address.clone(), size)
        } else if roll < config.insider_weight + config.fresh_weight {
            let wallet = fresh[rng.gen_range(0..fresh.len())].clone();
            // Fresh accounts occasionally make outsized bets.
            let size = if rng.gen_bool(0.2) {
                rng.gen_range(10_000.0..50_000.0)
            } else {
                rng.gen_range(100.0..5_000.0)
            };
            (wallet, size)
        } else {
            let wallet = regular[rng.gen_range(0..regular.len())].clone();
            (wallet, rng.gen_range(100.0..10_000.0))
        };

        events.push(FeedEvent::Trade(TradeEvent {
            timestamp,
            market_id: market.id,
            maker,
            taker: regular[rng.gen_range(0..regular.len())].clone(),
            maker_direction: random_side(rng),
            price: rng.gen_range(0.1..0.9),
            usd_amount,
        }));
    }

    events
}

/// Evenly spaced, small-sized regular trades. Spacing of at least 30
/// minutes caps any market hour at two trades of $400, well under the
/// volume-spike floor; trades past the 49h-to-close cutoff are dropped.
fn generate_clean_trades(
    config: &DatagenConfig,
    markets: &[MarketRecord],
    rng: &mut StdRng,
) -> Vec<FeedEvent> {
    let regular: Vec<String> = (0..100).map(|i| format!("wallet_{i}")).collect();
    let per_market = (config.n_trades / markets.len().max(1)).max(1);

    let mut events = Vec::with_capacity(config.n_trades);
    for market in markets {
        let close_time = market.close_time.unwrap_or(market.created_at);
        let window_end = close_time - Duration::hours(49);
        let span_secs = (window_end - market.created_at).num_seconds();
        if span_secs <= 0 {
            continue;
        }
        let spacing_secs = (span_secs / per_market as i64).max(1800);

        // Per-market random walk keeps prices smooth.
        let mut price: f64 = rng.gen_range(0.3..0.7);

        for slot in 0..per_market {
            let offset = spacing_secs * slot as i64;
            if offset > span_secs {
                break;
            }
            price = (price + rng.gen_range(-0.01..0.01)).clamp(0.05, 0.95);

            events.push(FeedEvent::Trade(TradeEvent {
                timestamp: market.created_at + Duration::seconds(offset),
                market_id: market.id,
                maker: regular[rng.gen_range(0..regular.len())].clone(),
                taker: regular[rng.gen_range(0..regular.len())].clone(),
                maker_direction: random_side(rng),
                price,
                usd_amount: rng.gen_range(100.0..400.0),
            }));
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_is_reproducible() {
        let config = DatagenConfig::default();
        let a = generate(&config);
        let b = generate(&config);
        assert_eq!(a.events.len(), b.events.len());
        let (FeedEvent::Trade(ta), FeedEvent::Trade(tb)) = (&a.events[0], &b.events[0]) else {
            panic!("expected trades first");
        };
        assert_eq!(ta.maker, tb.maker);
        assert_eq!(ta.usd_amount.to_bits(), tb.usd_amount.to_bits());
    }

    #[test]
    fn feed_is_time_ascending() {
        let feed = generate(&DatagenConfig::default());
        for pair in feed.events.windows(2) {
            assert!(pair[0].timestamp() <= pair[1].timestamp());
        }
    }

    #[test]
    fn clean_feed_stays_under_detector_gates() {
        let config = DatagenConfig {
            clean: true,
            ..DatagenConfig::default()
        };
        let feed = generate(&config);
        assert!(!feed.events.is_empty());
        for event in &feed.events {
            match event {
                FeedEvent::Trade(t) => {
                    assert!(t.usd_amount < 1_000.0);
                    assert!(t.maker.starts_with("wallet_"));
                }
                FeedEvent::Resolution(_) => panic!("clean feed must not resolve markets"),
            }
        }
    }

    #[test]
    fn dirty_feed_contains_insider_bets_and_resolutions() {
        let feed = generate(&DatagenConfig::default());
        let has_insider = feed.events.iter().any(|e| {
            matches!(e, FeedEvent::Trade(t) if t.maker.starts_with("insider_"))
        });
        let has_resolution = feed
            .events
            .iter()
            .any(|e| matches!(e, FeedEvent::Resolution(_)));
        assert!(has_insider);
        assert!(has_resolution);
    }
}
