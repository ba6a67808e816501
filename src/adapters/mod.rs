//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Market Data: snapshot handoff buffer and simulated paper feed
//! - Paper: in-process execution that fills at observed prices
//! - CLI: Command-line interface definitions

pub mod cli;
pub mod market_data;
pub mod paper;

pub use cli::CliApp;
pub use market_data::{SnapshotBuffer, SimulatedFeed, SimulatedInstrument};
pub use paper::PaperExecution;
