//! Snapshot Buffer
//!
//! Locked handoff between the ingestion side (any thread) and the strategy
//! loop. Holds only the newest snapshot per symbol.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::market::MarketSnapshot;
use crate::ports::market_data::MarketDataPort;

#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    latest: Arc<RwLock<HashMap<String, MarketSnapshot>>>,
    connected: Arc<AtomicBool>,
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self {
            latest: Arc::new(RwLock::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Store a snapshot unless a newer one for the symbol is already held
    pub fn publish(&self, snapshot: MarketSnapshot) {
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        match latest.get(snapshot.symbol()) {
            Some(held) if held.timestamp() > snapshot.timestamp() => {
                tracing::debug!("{}: dropping out-of-order snapshot", snapshot.symbol());
            }
            _ => {
                latest.insert(snapshot.symbol().to_string(), snapshot);
            }
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.latest.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataPort for SnapshotBuffer {
    fn latest_snapshots(&self) -> Vec<MarketSnapshot> {
        let latest = self.latest.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshots: Vec<MarketSnapshot> = latest.values().cloned().collect();
        snapshots.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        snapshots
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
