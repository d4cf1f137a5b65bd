//! Core types used throughout PolyWatch
//!
//! Defines common data structures for trade events, signals, and positions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a binary prediction market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// The taker always holds the opposite side of the maker.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    /// Parse from feed text
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "YES" | "Y" | "UP" => Some(Side::Yes),
            "NO" | "N" | "DOWN" => Some(Side::No),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// Role a wallet played in a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeRole {
    Maker,
    Taker,
}

impl fmt::Display for TradeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeRole::Maker => write!(f, "maker"),
            TradeRole::Taker => write!(f, "taker"),
        }
    }
}

/// A single fill from the historical trade feed.
///
/// The feed guarantees non-decreasing timestamps; the taker side is the
/// implied opposite of `maker_direction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Fill timestamp (feed order key)
    pub timestamp: DateTime<Utc>,
    /// Market this fill belongs to
    pub market_id: u64,
    /// Maker wallet address
    pub maker: String,
    /// Taker wallet address
    pub taker: String,
    /// Side the maker ended up holding
    pub maker_direction: Side,
    /// Fill price in (0, 1)
    pub price: f64,
    /// Notional in USD
    pub usd_amount: f64,
}

impl TradeEvent {
    pub fn taker_direction(&self) -> Side {
        self.maker_direction.opposite()
    }

    /// Wallet address for a given role
    pub fn wallet(&self, role: TradeRole) -> &str {
        match role {
            TradeRole::Maker => &self.maker,
            TradeRole::Taker => &self.taker,
        }
    }

    /// Side held by a given role
    pub fn direction(&self, role: TradeRole) -> Side {
        match role {
            TradeRole::Maker => self.maker_direction,
            TradeRole::Taker => self.taker_direction(),
        }
    }
}

/// A market settling, delivered out-of-band in the same time-ascending feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionEvent {
    pub timestamp: DateTime<Utc>,
    pub market_id: u64,
    /// Side that paid out
    pub winning_side: Side,
    /// Final settlement price (typically 0.0 or 1.0)
    pub resolution_price: f64,
}

/// One entry of the replay feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeedEvent {
    Trade(TradeEvent),
    Resolution(ResolutionEvent),
}

impl FeedEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            FeedEvent::Trade(t) => t.timestamp,
            FeedEvent::Resolution(r) => r.timestamp,
        }
    }
}

/// Market registry row from the ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: u64,
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    /// Lifetime volume reported by the registry (used for upstream filtering)
    pub volume: f64,
}

/// The five detection algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    FreshAccount,
    ProvenWinner,
    VolumeSpike,
    WalletClustering,
    PerfectTiming,
}

impl SignalType {
    pub const ALL: [SignalType; 5] = [
        SignalType::FreshAccount,
        SignalType::ProvenWinner,
        SignalType::VolumeSpike,
        SignalType::WalletClustering,
        SignalType::PerfectTiming,
    ];
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::FreshAccount => write!(f, "fresh_account"),
            SignalType::ProvenWinner => write!(f, "proven_winner"),
            SignalType::VolumeSpike => write!(f, "volume_spike"),
            SignalType::WalletClustering => write!(f, "wallet_clustering"),
            SignalType::PerfectTiming => write!(f, "perfect_timing"),
        }
    }
}

/// Detector-specific payload carried by a signal.
///
/// One variant per detector so each payload is statically checked instead of
/// an open-ended map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalMetadata {
    FreshAccount {
        account_age_hours: f64,
        trade_size: f64,
        total_trades: u64,
        role: TradeRole,
    },
    ProvenWinner {
        win_rate: f64,
        resolved_trades: u32,
        total_profit: f64,
        trade_size: f64,
        avg_bet_size: f64,
        size_ratio: f64,
    },
    VolumeSpike {
        current_hour_volume: f64,
        avg_hourly_volume: f64,
        spike_ratio: f64,
        price_change: f64,
        yes_volume: f64,
        no_volume: f64,
    },
    WalletClustering {
        wallet_count: usize,
        fresh_wallet_count: usize,
        fresh_ratio: f64,
        combined_volume: f64,
    },
    PerfectTiming {
        recent_win_rate: f64,
        overall_win_rate: f64,
        total_trades: u64,
        trade_size: f64,
        resolved_trades: u32,
        has_resolution_data: bool,
        hours_until_close: Option<f64>,
    },
}

/// A detected trading signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Detector that fired
    pub signal_type: SignalType,
    /// Market the signal applies to
    pub market_id: u64,
    /// Wallet that triggered it (None for market-wide signals)
    pub wallet_address: Option<String>,
    /// Detection timestamp (replay time)
    pub timestamp: DateTime<Utc>,
    /// Heuristic confidence in [0, 1]
    pub confidence: f64,
    /// Side to follow
    pub recommended_side: Side,
    /// Reference entry price at detection
    pub entry_price: f64,
    /// Fractional-Kelly bankroll fraction in [0, 0.10]
    pub recommended_fraction: f64,
    /// Human-readable explanation for the report
    pub reasoning: String,
    /// Detector-specific payload
    pub metadata: SignalMetadata,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Resolved,
    StopLoss,
    TakeProfit,
    TimeDecay,
    MarketClosing,
    BacktestEnd,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Resolved => write!(f, "resolved"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TakeProfit => write!(f, "take_profit"),
            ExitReason::TimeDecay => write!(f, "time_decay"),
            ExitReason::MarketClosing => write!(f, "market_closing"),
            ExitReason::BacktestEnd => write!(f, "backtest_end"),
        }
    }
}

/// An open or closed simulated position.
///
/// Owns the signal that spawned it so later ledger mutations cannot change
/// the record of why it was entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Sequential id within a run (deterministic, unlike a random uuid)
    pub id: u64,
    pub signal: Signal,
    pub market_id: u64,
    pub entry_time: DateTime<Utc>,
    /// Entry price after slippage
    pub entry_price: f64,
    pub side: Side,
    /// USD committed
    pub size: f64,
    /// size / entry_price
    pub shares: f64,
    pub is_open: bool,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    /// Net realized P&L in USD (after exit fees)
    pub pnl: f64,
    /// Net realized P&L as a percentage of size
    pub pnl_pct: f64,
}

impl Position {
    /// Unrealized P&L percentage at `current_price`, before fees/slippage.
    pub fn unrealized_pnl_pct(&self, current_price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        match self.side {
            Side::Yes => ((current_price - self.entry_price) / self.entry_price) * 100.0,
            Side::No => ((self.entry_price - current_price) / self.entry_price) * 100.0,
        }
    }
}
