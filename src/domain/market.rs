//! Market Snapshot
//!
//! One spot/futures quote pair for a symbol at a point in time. Construction is
//! the validation boundary: a snapshot that exists has positive, finite prices
//! and a finite basis, so nothing downstream re-checks for NaN.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("Empty symbol")]
    EmptySymbol,
    #[error("{symbol}: invalid spot price {price}")]
    InvalidSpotPrice { symbol: String, price: f64 },
    #[error("{symbol}: invalid futures price {price}")]
    InvalidFuturesPrice { symbol: String, price: f64 },
}

/// Latest spot and futures quote for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    symbol: String,
    spot_price: f64,
    futures_price: f64,
    spot_volume: u64,
    futures_volume: u64,
    days_to_expiry: i64,
    timestamp: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(
        symbol: impl Into<String>,
        spot_price: f64,
        futures_price: f64,
        spot_volume: u64,
        futures_volume: u64,
        days_to_expiry: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(SnapshotError::EmptySymbol);
        }
        if !spot_price.is_finite() || spot_price <= 0.0 {
            return Err(SnapshotError::InvalidSpotPrice { symbol, price: spot_price });
        }
        if !futures_price.is_finite() || futures_price <= 0.0 {
            return Err(SnapshotError::InvalidFuturesPrice { symbol, price: futures_price });
        }

        Ok(Self {
            symbol,
            spot_price,
            futures_price,
            spot_volume,
            futures_volume,
            days_to_expiry,
            timestamp,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn spot_price(&self) -> f64 {
        self.spot_price
    }

    pub fn futures_price(&self) -> f64 {
        self.futures_price
    }

    pub fn spot_volume(&self) -> u64 {
        self.spot_volume
    }

    pub fn futures_volume(&self) -> u64 {
        self.futures_volume
    }

    pub fn days_to_expiry(&self) -> i64 {
        self.days_to_expiry
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Futures minus spot
    pub fn basis(&self) -> f64 {
        self.futures_price - self.spot_price
    }

    /// Basis as a percentage of spot
    pub fn basis_pct(&self) -> f64 {
        basis_pct(self.spot_price, self.futures_price)
    }

    /// Futures volume over spot volume, 0 when spot printed nothing
    pub fn volume_ratio(&self) -> f64 {
        if self.spot_volume == 0 {
            return 0.0;
        }
        self.futures_volume as f64 / self.spot_volume as f64
    }

    pub fn total_volume(&self) -> u64 {
        self.spot_volume.saturating_add(self.futures_volume)
    }
}

/// Basis percentage with the spot guard applied (0 when spot is not positive)
pub fn basis_pct(spot_price: f64, futures_price: f64) -> f64 {
    if spot_price <= 0.0 {
        return 0.0;
    }
    (futures_price - spot_price) / spot_price * 100.0
}
