//! PolyWatch Library
//!
//! Deterministic backtesting engine for insider-style behavior on
//! prediction-market trade feeds.

pub mod analytics;
pub mod config;
pub mod datagen;
pub mod markets;
pub mod runner;
pub mod signals;
pub mod simulator;
pub mod types;
pub mod wallets;
