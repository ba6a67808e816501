//! Strategy Layer - Basis Mean Reversion with Z-Score Gating
//!
//! Tracks the futures/spot basis per symbol and trades statistical dislocations:
//! - Rolling basis statistics over a configurable lookback window
//! - Z-score threshold gating for entry signals
//! - Volatility floor and liquidity filters for noise reduction
//! - Convergence and stop-loss exits

pub mod params;
pub mod basis_stats;
pub mod signal_generator;

pub use params::{StrategyConfig, RiskConfig, ConfigError};
pub use basis_stats::{BasisStatisticsTracker, BasisStats, BasisObservation};
pub use signal_generator::{SignalGenerator, EntryFilter};
