//! Basis Statistics Tracker
//!
//! Rolling per-symbol statistics over basis-percentage observations.
//!
//! Z-Score Formula: z = (latest_basis_pct - rolling_mean) / rolling_std
//!
//! The latest observation is scored against the `basis_lookback` observations
//! that precede it. Moments are recomputed from that reference window on every
//! read (population mean and std). History is kept at a larger fixed capacity
//! so the lookback can change without losing data.

use chrono::{DateTime, Utc};
use statrs::statistics::Statistics;
use std::collections::{HashMap, VecDeque};

use crate::strategy::params::StrategyConfig;

/// One basis reading for a symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisObservation {
    pub basis_pct: f64,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of rolling statistics for a symbol
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BasisStats {
    /// True iff the reference window holds `basis_lookback` points
    pub has_sufficient_data: bool,
    /// Points in the reference window (capped at the lookback)
    pub data_points: usize,
    pub mean: f64,
    pub std: f64,
    /// 0 without sufficient data or when std is at or under the volatility floor
    pub z_score: f64,
    pub min: f64,
    pub max: f64,
    /// Most recent observation the z-score was computed from
    pub latest: f64,
}

impl BasisStats {
    /// All fields finite; anything else is treated as no data
    pub fn is_well_formed(&self) -> bool {
        [self.mean, self.std, self.z_score, self.min, self.max, self.latest]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Check if z-score indicates futures rich (above positive threshold)
    pub fn is_overpriced(&self, threshold: f64) -> bool {
        self.z_score > threshold
    }

    /// Check if z-score indicates futures cheap (below negative threshold)
    pub fn is_underpriced(&self, threshold: f64) -> bool {
        self.z_score < -threshold
    }
}

/// Bounded basis history per symbol
#[derive(Debug, Clone)]
pub struct BasisStatisticsTracker {
    lookback: usize,
    min_std: f64,
    capacity: usize,
    history: HashMap<String, VecDeque<BasisObservation>>,
}

impl BasisStatisticsTracker {
    pub fn new(config: &StrategyConfig) -> Self {
        Self::with_capacity(config.basis_lookback, config.min_basis_std, config.history_capacity())
    }

    pub fn with_capacity(lookback: usize, min_std: f64, capacity: usize) -> Self {
        Self {
            lookback,
            min_std,
            capacity: capacity.max(lookback + 1),
            history: HashMap::new(),
        }
    }

    /// Append an observation, evicting the oldest at capacity
    pub fn record(&mut self, symbol: &str, basis_pct: f64, timestamp: DateTime<Utc>) {
        let capacity = self.capacity;
        let buffer = self
            .history
            .entry(symbol.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        if buffer.len() == capacity {
            buffer.pop_front();
        }
        buffer.push_back(BasisObservation { basis_pct, timestamp });
    }

    /// Statistics of the latest observation against the `lookback` before it
    pub fn stats(&self, symbol: &str) -> BasisStats {
        let Some((latest, buffer)) = self
            .history
            .get(symbol)
            .and_then(|buffer| buffer.back().map(|last| (last.basis_pct, buffer)))
        else {
            return BasisStats::default();
        };

        let preceding = buffer.len() - 1;
        let skip = preceding.saturating_sub(self.lookback);
        let window: Vec<f64> = buffer
            .iter()
            .take(preceding)
            .skip(skip)
            .map(|o| o.basis_pct)
            .collect();

        if window.is_empty() {
            return BasisStats { latest, ..BasisStats::default() };
        }

        let mean = Statistics::mean(window.iter());
        let std = Statistics::population_std_dev(window.iter());
        let min = window.iter().copied().fold(f64::INFINITY, f64::min);
        let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let has_sufficient_data = window.len() >= self.lookback;
        let z_score = if has_sufficient_data && std > self.min_std {
            (latest - mean) / std
        } else {
            0.0
        };

        BasisStats {
            has_sufficient_data,
            data_points: window.len(),
            mean,
            std,
            z_score,
            min,
            max,
            latest,
        }
    }

    /// Observations retained for a symbol
    pub fn history_len(&self, symbol: &str) -> usize {
        self.history.get(symbol).map_or(0, VecDeque::len)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Check if a symbol has a full reference window behind its latest point
    pub fn is_ready(&self, symbol: &str) -> bool {
        self.history_len(symbol) > self.lookback
    }

    /// Oldest retained observation (for testing/debugging)
    pub fn oldest(&self, symbol: &str) -> Option<&BasisObservation> {
        self.history.get(symbol).and_then(VecDeque::front)
    }

    pub fn newest(&self, symbol: &str) -> Option<&BasisObservation> {
        self.history.get(symbol).and_then(VecDeque::back)
    }
}
