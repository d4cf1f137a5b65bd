//! Configuration management for PolyWatch
//!
//! Loads from YAML/TOML files + environment variables via .env

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::datagen::DatagenConfig;
use crate::signals::CooldownConfig;
use crate::simulator::SimulatorConfig;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backtest: BacktestCfg,
    pub risk: RiskCfg,
    pub cooldowns: CooldownCfg,
    pub datagen: DatagenCfg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestCfg {
    /// Initial bankroll in USDC
    pub starting_capital: f64,
    /// Minimum signal confidence threshold (0.0 - 1.0)
    pub min_confidence: f64,
    /// Seed for the slippage RNG (fixed seed -> byte-identical runs)
    pub slippage_seed: u64,
    /// Replay window start (YYYY-MM-DD)
    pub start_date: String,
    /// Replay window end (YYYY-MM-DD)
    pub end_date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskCfg {
    /// Maximum simultaneously open positions
    pub max_concurrent_positions: usize,
    /// Maximum position size as % of initial capital
    pub max_position_size_pct: f64,
    /// Maximum exposure to a single market as % of initial capital
    pub max_market_exposure_pct: f64,
    /// Stop loss threshold in percent
    pub stop_loss_pct: f64,
    /// Take profit threshold in percent
    pub take_profit_pct: f64,
    /// Maximum hold duration in hours
    pub max_hold_hours: f64,
    /// Round-trip fee rate in percent per side
    pub trading_fee_pct: f64,
    /// Slippage range in basis points
    pub slippage_bps_min: f64,
    pub slippage_bps_max: f64,
    /// Smallest position worth opening, in USD
    pub min_position_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CooldownCfg {
    pub fresh_account_hours: f64,
    pub proven_winner_hours: f64,
    pub volume_spike_hours: f64,
    pub wallet_clustering_hours: f64,
    pub perfect_timing_hours: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatagenCfg {
    pub n_markets: usize,
    pub n_trades: usize,
    pub seed: u64,
    /// Probability weights for wallet selection
    pub insider_weight: f64,
    pub fresh_weight: f64,
    /// Emit only regular-wallet noise (no insider patterns)
    pub clean: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Backtest defaults
            .set_default("backtest.starting_capital", 5000.0)?
            .set_default("backtest.min_confidence", 0.65)?
            .set_default("backtest.slippage_seed", 42)?
            .set_default("backtest.start_date", "2025-08-01")?
            .set_default("backtest.end_date", "2026-02-01")?
            // Risk defaults
            .set_default("risk.max_concurrent_positions", 5)?
            .set_default("risk.max_position_size_pct", 10.0)?
            .set_default("risk.max_market_exposure_pct", 30.0)?
            .set_default("risk.stop_loss_pct", 15.0)?
            .set_default("risk.take_profit_pct", 25.0)?
            .set_default("risk.max_hold_hours", 48.0)?
            .set_default("risk.trading_fee_pct", 2.0)?
            .set_default("risk.slippage_bps_min", 10.0)?
            .set_default("risk.slippage_bps_max", 30.0)?
            .set_default("risk.min_position_usd", 10.0)?
            // Cooldown defaults (hours)
            .set_default("cooldowns.fresh_account_hours", 24.0)?
            .set_default("cooldowns.proven_winner_hours", 12.0)?
            .set_default("cooldowns.volume_spike_hours", 4.0)?
            .set_default("cooldowns.wallet_clustering_hours", 6.0)?
            .set_default("cooldowns.perfect_timing_hours", 12.0)?
            // Synthetic feed defaults
            .set_default("datagen.n_markets", 100)?
            .set_default("datagen.n_trades", 10000)?
            .set_default("datagen.seed", 7)?
            .set_default("datagen.insider_weight", 0.02)?
            .set_default("datagen.fresh_weight", 0.05)?
            .set_default("datagen.clean", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (POLYWATCH_*)
            .add_source(Environment::with_prefix("POLYWATCH").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Parse the replay window into UTC instants (midnight-aligned)
    pub fn window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let parse = |s: &str| -> Result<DateTime<Utc>> {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))?;
            Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default()))
        };
        Ok((parse(&self.backtest.start_date)?, parse(&self.backtest.end_date)?))
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "capital=${:.0} min_conf={:.2} seed={} window={}..{}",
            self.backtest.starting_capital,
            self.backtest.min_confidence,
            self.backtest.slippage_seed,
            self.backtest.start_date,
            self.backtest.end_date
        )
    }

    /// Simulator settings as the domain config the simulator consumes
    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            starting_capital: self.backtest.starting_capital,
            max_concurrent_positions: self.risk.max_concurrent_positions,
            max_position_size_pct: self.risk.max_position_size_pct,
            max_market_exposure_pct: self.risk.max_market_exposure_pct,
            stop_loss_pct: self.risk.stop_loss_pct,
            take_profit_pct: self.risk.take_profit_pct,
            max_hold_hours: self.risk.max_hold_hours,
            trading_fee_pct: self.risk.trading_fee_pct,
            slippage_bps: (self.risk.slippage_bps_min, self.risk.slippage_bps_max),
            min_position_usd: self.risk.min_position_usd,
            slippage_seed: self.backtest.slippage_seed,
        }
    }

    /// Cooldown settings as the domain config the signal engine consumes
    pub fn cooldown_config(&self) -> CooldownConfig {
        CooldownConfig {
            fresh_account_hours: self.cooldowns.fresh_account_hours,
            proven_winner_hours: self.cooldowns.proven_winner_hours,
            volume_spike_hours: self.cooldowns.volume_spike_hours,
            wallet_clustering_hours: self.cooldowns.wallet_clustering_hours,
            perfect_timing_hours: self.cooldowns.perfect_timing_hours,
        }
    }

    /// Synthetic feed settings as the domain config datagen consumes
    pub fn datagen_config(&self) -> DatagenConfig {
        DatagenConfig {
            n_markets: self.datagen.n_markets,
            n_trades: self.datagen.n_trades,
            seed: self.datagen.seed,
            insider_weight: self.datagen.insider_weight,
            fresh_weight: self.datagen.fresh_weight,
            clean: self.datagen.clean,
        }
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
