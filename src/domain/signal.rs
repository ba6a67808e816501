use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which leg is bought and which is sold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Futures underpriced relative to its history (z below the negative threshold)
    LongFuturesShortSpot,
    /// Futures overpriced relative to its history (z above the positive threshold)
    ShortFuturesLongSpot,
}

impl Direction {
    /// Sign applied to the quantity of the spot leg
    pub fn spot_sign(&self) -> i64 {
        match self {
            Direction::LongFuturesShortSpot => -1,
            Direction::ShortFuturesLongSpot => 1,
        }
    }

    /// Sign applied to the quantity of the futures leg
    pub fn futures_sign(&self) -> i64 {
        -self.spot_sign()
    }

    /// True when a narrowing basis makes money for this direction
    pub fn profits_from_narrowing(&self) -> bool {
        matches!(self, Direction::ShortFuturesLongSpot)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LongFuturesShortSpot => write!(f, "LONG_FUTURES_SHORT_SPOT"),
            Direction::ShortFuturesLongSpot => write!(f, "SHORT_FUTURES_LONG_SPOT"),
        }
    }
}

/// Request to open a basis position, consumed once by the strategy cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageSignal {
    pub symbol: String,
    pub direction: Direction,
    pub entry_spot_price: f64,
    pub entry_futures_price: f64,
    pub entry_basis_pct: f64,
    /// Absolute basis at which z returns to zero
    pub target_basis: f64,
    pub stop_basis: f64,
    pub lot_size: u32,
    /// Number of lots, always at least 1
    pub quantity: u32,
    pub confidence: f64,
    pub z_score: f64,
    pub days_to_expiry: i64,
    pub timestamp: DateTime<Utc>,
}

impl ArbitrageSignal {
    pub fn entry_basis(&self) -> f64 {
        self.entry_futures_price - self.entry_spot_price
    }

    /// Units per leg (lots times lot size)
    pub fn units(&self) -> i64 {
        i64::from(self.lot_size) * i64::from(self.quantity)
    }

    /// Confidence from the z-score magnitude, saturating at |z| = 3
    pub fn calculate_confidence(z_score: f64) -> f64 {
        (z_score.abs() / 3.0).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_leg_signs_are_opposite() {
        for direction in [Direction::LongFuturesShortSpot, Direction::ShortFuturesLongSpot] {
            assert_eq!(direction.spot_sign(), -direction.futures_sign());
        }
        assert_eq!(Direction::ShortFuturesLongSpot.spot_sign(), 1);
        assert_eq!(Direction::LongFuturesShortSpot.futures_sign(), 1);
    }

    #[test]
    fn test_confidence_calculation() {
        assert_relative_eq!(ArbitrageSignal::calculate_confidence(0.0), 0.0);
        assert_relative_eq!(ArbitrageSignal::calculate_confidence(1.5), 0.5);
        assert_relative_eq!(ArbitrageSignal::calculate_confidence(-2.4), 0.8, epsilon = 1e-12);
        assert_relative_eq!(ArbitrageSignal::calculate_confidence(3.0), 1.0);
        assert_relative_eq!(ArbitrageSignal::calculate_confidence(7.5), 1.0);
    }

    #[test]
    fn test_display_direction() {
        assert_eq!(Direction::LongFuturesShortSpot.to_string(), "LONG_FUTURES_SHORT_SPOT");
        assert_eq!(
            serde_json::to_string(&Direction::ShortFuturesLongSpot).unwrap(),
            "\"SHORT_FUTURES_LONG_SPOT\""
        );
    }
}
