//! basis-arb - Spot/Futures Basis Arbitrage Engine Library
//!
//! Statistical arbitrage between a spot instrument and its futures contract:
//! rolling basis statistics, z-score gated entries, convergence exits and
//! mandatory time-based unwinds.
//!
//! # Modules
//!
//! - `domain`: Core business logic (MarketSnapshot, ArbitragePosition, PositionLedger, RiskGate)
//! - `ports`: Trait abstractions (MarketDataPort, ExecutionPort)
//! - `strategy`: Signal generation (BasisStatisticsTracker, SignalGenerator)
//! - `adapters`: External implementations (SnapshotBuffer, SimulatedFeed, PaperExecution, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Strategy cycle, runner and performance summary

pub mod domain;
pub mod ports;
pub mod strategy;
pub mod adapters;
pub mod config;
pub mod application;
