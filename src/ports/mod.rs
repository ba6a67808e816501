//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Market data feeds (latest spot/futures snapshots)
//! - Order execution (opening and flattening both legs)

pub mod market_data;
pub mod execution;

pub use market_data::MarketDataPort;
pub use execution::{ExecutionPort, ExecutionError, Fill};
