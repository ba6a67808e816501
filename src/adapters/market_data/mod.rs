//! Market Data Adapters
//!
//! - `SnapshotBuffer`: locked latest-snapshot handoff implementing `MarketDataPort`
//! - `SimulatedFeed`: random-walk quote generator for paper mode

pub mod snapshot_buffer;
pub mod simulated_feed;

pub use snapshot_buffer::SnapshotBuffer;
pub use simulated_feed::{SimulatedFeed, SimulatedInstrument};
