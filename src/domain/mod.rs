//! Domain Layer - Core business logic for the basis arbitrage engine
//!
//! This module contains pure domain types and logic with no I/O.
//! All external interactions happen through the ports layer.

pub mod market;
pub mod instrument;
pub mod signal;
pub mod position;
pub mod trade;
pub mod ledger;
pub mod metrics;
pub mod session;
pub mod risk;

pub use market::{MarketSnapshot, SnapshotError};
pub use instrument::{InstrumentSpec, Universe, UniverseError};
pub use signal::{ArbitrageSignal, Direction};
pub use position::{ArbitragePosition, PositionError};
pub use trade::{ArbitrageTradeResult, ExitReason};
pub use ledger::{PositionLedger, LedgerError};
pub use metrics::{StrategyMetrics, DirectionStats, PortfolioRisk};
pub use session::{MarketSession, MarketPhase, SessionError};
pub use risk::{RiskGate, EntryBlock};
