use crate::domain::market::MarketSnapshot;

/// Market data port trait
///
/// Implementations hand the strategy loop the latest known snapshot per symbol.
/// The read must not block on I/O; ingestion runs elsewhere and only the
/// handoff buffer is shared.
pub trait MarketDataPort: Send + Sync {
    /// Latest snapshot for every symbol that has quoted at least once
    fn latest_snapshots(&self) -> Vec<MarketSnapshot>;

    /// Check connection status
    fn is_connected(&self) -> bool;
}
