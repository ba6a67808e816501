//! Arbitrage Position
//!
//! A hedged pair: one leg long, the other short, equal units on both sides.
//! P&L is recomputed from entry and current prices on every mark so nothing
//! accumulates between ticks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::market::basis_pct;
use crate::domain::signal::{ArbitrageSignal, Direction};
use crate::ports::execution::Fill;

#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("Invalid quantity: {0} lots")]
    InvalidQuantity(u32),
    #[error("Invalid lot size: {0}")]
    InvalidLotSize(u32),
    #[error("Invalid fill price: spot {spot}, futures {futures}")]
    InvalidFillPrice { spot: f64, futures: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ArbitragePosition {
    pub symbol: String,
    pub sector: String,
    pub direction: Direction,
    pub lot_size: u32,
    /// Signed units, positive for long
    pub spot_qty: i64,
    pub futures_qty: i64,

    pub entry_spot_price: f64,
    pub entry_futures_price: f64,
    pub entry_basis: f64,
    pub entry_basis_pct: f64,
    pub entry_z_score: f64,
    pub entry_time: DateTime<Utc>,
    pub days_to_expiry_at_entry: i64,

    pub target_basis: f64,
    pub stop_basis: f64,
    pub current_stop_basis: f64,

    pub current_spot_price: f64,
    pub current_futures_price: f64,
    pub current_basis: f64,
    pub current_basis_pct: f64,
    pub days_to_expiry: i64,

    pub spot_pnl: f64,
    pub futures_pnl: f64,
    pub unrealized_pnl: f64,

    pub max_favorable_basis: f64,
    pub max_adverse_basis: f64,
}

/// P&L of one leg given a signed quantity
pub fn leg_pnl(entry_price: f64, current_price: f64, signed_qty: i64) -> f64 {
    (current_price - entry_price) * signed_qty as f64
}

impl ArbitragePosition {
    /// Build a position from a signal and the execution fill that confirmed it
    pub fn from_fill(
        signal: &ArbitrageSignal,
        sector: &str,
        fill: &Fill,
    ) -> Result<Self, PositionError> {
        if signal.quantity == 0 {
            return Err(PositionError::InvalidQuantity(signal.quantity));
        }
        if signal.lot_size == 0 {
            return Err(PositionError::InvalidLotSize(signal.lot_size));
        }
        if !fill.is_valid() {
            return Err(PositionError::InvalidFillPrice {
                spot: fill.spot_price,
                futures: fill.futures_price,
            });
        }

        let units = signal.units();
        let entry_basis = fill.futures_price - fill.spot_price;

        Ok(Self {
            symbol: signal.symbol.clone(),
            sector: sector.to_string(),
            direction: signal.direction,
            lot_size: signal.lot_size,
            spot_qty: signal.direction.spot_sign() * units,
            futures_qty: signal.direction.futures_sign() * units,
            entry_spot_price: fill.spot_price,
            entry_futures_price: fill.futures_price,
            entry_basis,
            entry_basis_pct: basis_pct(fill.spot_price, fill.futures_price),
            entry_z_score: signal.z_score,
            entry_time: fill.timestamp,
            days_to_expiry_at_entry: signal.days_to_expiry,
            target_basis: signal.target_basis,
            stop_basis: signal.stop_basis,
            current_stop_basis: signal.stop_basis,
            current_spot_price: fill.spot_price,
            current_futures_price: fill.futures_price,
            current_basis: entry_basis,
            current_basis_pct: basis_pct(fill.spot_price, fill.futures_price),
            days_to_expiry: signal.days_to_expiry,
            spot_pnl: 0.0,
            futures_pnl: 0.0,
            unrealized_pnl: 0.0,
            max_favorable_basis: entry_basis,
            max_adverse_basis: entry_basis,
        })
    }

    /// Mark the position to the latest prices
    pub fn update_current_prices(&mut self, spot_price: f64, futures_price: f64) {
        self.current_spot_price = spot_price;
        self.current_futures_price = futures_price;
        self.current_basis = futures_price - spot_price;
        self.current_basis_pct = basis_pct(spot_price, futures_price);

        self.spot_pnl = leg_pnl(self.entry_spot_price, spot_price, self.spot_qty);
        self.futures_pnl = leg_pnl(self.entry_futures_price, futures_price, self.futures_qty);
        self.unrealized_pnl = self.spot_pnl + self.futures_pnl;

        if self.direction.profits_from_narrowing() {
            self.max_favorable_basis = self.max_favorable_basis.min(self.current_basis);
            self.max_adverse_basis = self.max_adverse_basis.max(self.current_basis);
        } else {
            self.max_favorable_basis = self.max_favorable_basis.max(self.current_basis);
            self.max_adverse_basis = self.max_adverse_basis.min(self.current_basis);
        }
    }

    pub fn update_days_to_expiry(&mut self, days_to_expiry: i64) {
        self.days_to_expiry = days_to_expiry;
    }

    /// Gross notional of both legs at entry prices
    pub fn entry_notional(&self) -> f64 {
        (self.entry_spot_price * self.spot_qty as f64).abs()
            + (self.entry_futures_price * self.futures_qty as f64).abs()
    }

    /// Unrealized loss as a percentage of entry notional (0 when in profit)
    pub fn loss_pct(&self) -> f64 {
        let notional = self.entry_notional();
        if self.unrealized_pnl >= 0.0 || notional <= 0.0 {
            return 0.0;
        }
        self.unrealized_pnl.abs() / notional * 100.0
    }

    pub fn lots(&self) -> u32 {
        if self.lot_size == 0 {
            return 0;
        }
        (self.spot_qty.unsigned_abs() / u64::from(self.lot_size)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn signal(direction: Direction) -> ArbitrageSignal {
        ArbitrageSignal {
            symbol: "RELIANCE".to_string(),
            direction,
            entry_spot_price: 2000.0,
            entry_futures_price: 2010.0,
            entry_basis_pct: 0.5,
            target_basis: 4.0,
            stop_basis: 10.05,
            lot_size: 250,
            quantity: 2,
            confidence: 1.0,
            z_score: 3.0,
            days_to_expiry: 20,
            timestamp: Utc::now(),
        }
    }

    fn fill() -> Fill {
        Fill { spot_price: 2000.0, futures_price: 2010.0, timestamp: Utc::now() }
    }

    #[test]
    fn test_quantities_opposite_and_equal() {
        let pos = ArbitragePosition::from_fill(&signal(Direction::ShortFuturesLongSpot), "ENERGY", &fill()).unwrap();
        assert_eq!(pos.spot_qty, 500);
        assert_eq!(pos.futures_qty, -500);
        assert_eq!(pos.lots(), 2);

        let pos = ArbitragePosition::from_fill(&signal(Direction::LongFuturesShortSpot), "ENERGY", &fill()).unwrap();
        assert_eq!(pos.spot_qty, -500);
        assert_eq!(pos.futures_qty, 500);
    }

    #[test]
    fn test_update_with_entry_prices_is_flat() {
        let mut pos = ArbitragePosition::from_fill(&signal(Direction::ShortFuturesLongSpot), "ENERGY", &fill()).unwrap();
        pos.update_current_prices(2000.0, 2010.0);
        assert_eq!(pos.unrealized_pnl, 0.0);
        assert_eq!(pos.max_favorable_basis, pos.entry_basis);
        assert_eq!(pos.max_adverse_basis, pos.entry_basis);
    }

    #[test]
    fn test_pnl_is_sum_of_legs() {
        let mut pos = ArbitragePosition::from_fill(&signal(Direction::ShortFuturesLongSpot), "ENERGY", &fill()).unwrap();
        // Basis narrows from 10 to 4: long spot +5, short futures +1
        pos.update_current_prices(2005.0, 2009.0);
        assert_relative_eq!(pos.spot_pnl, 2500.0);
        assert_relative_eq!(pos.futures_pnl, 500.0);
        assert_relative_eq!(pos.unrealized_pnl, pos.spot_pnl + pos.futures_pnl);
        assert_relative_eq!(pos.unrealized_pnl, 3000.0);
    }

    #[test]
    fn test_extremes_track_direction() {
        let mut pos = ArbitragePosition::from_fill(&signal(Direction::ShortFuturesLongSpot), "ENERGY", &fill()).unwrap();
        pos.update_current_prices(2000.0, 2014.0);
        pos.update_current_prices(2000.0, 2003.0);
        assert_relative_eq!(pos.max_favorable_basis, 3.0);
        assert_relative_eq!(pos.max_adverse_basis, 14.0);

        let mut pos = ArbitragePosition::from_fill(&signal(Direction::LongFuturesShortSpot), "ENERGY", &fill()).unwrap();
        pos.update_current_prices(2000.0, 2014.0);
        pos.update_current_prices(2000.0, 2003.0);
        assert_relative_eq!(pos.max_favorable_basis, 14.0);
        assert_relative_eq!(pos.max_adverse_basis, 3.0);
    }

    #[test]
    fn test_loss_pct() {
        let mut pos = ArbitragePosition::from_fill(&signal(Direction::LongFuturesShortSpot), "ENERGY", &fill()).unwrap();
        assert_relative_eq!(pos.entry_notional(), 500.0 * 2000.0 + 500.0 * 2010.0);
        // Basis narrows against a long-futures position
        pos.update_current_prices(2000.0, 2000.0);
        assert!(pos.unrealized_pnl < 0.0);
        assert_relative_eq!(pos.loss_pct(), 5000.0 / pos.entry_notional() * 100.0);
    }

    #[test]
    fn test_rejects_bad_fill() {
        let bad = Fill { spot_price: f64::NAN, futures_price: 2010.0, timestamp: Utc::now() };
        let result = ArbitragePosition::from_fill(&signal(Direction::LongFuturesShortSpot), "ENERGY", &bad);
        assert!(matches!(result, Err(PositionError::InvalidFillPrice { .. })));
    }

    #[test]
    fn test_rejects_zero_lots() {
        let mut sig = signal(Direction::LongFuturesShortSpot);
        sig.quantity = 0;
        let result = ArbitragePosition::from_fill(&sig, "ENERGY", &fill());
        assert_eq!(result.unwrap_err(), PositionError::InvalidQuantity(0));
    }
}
