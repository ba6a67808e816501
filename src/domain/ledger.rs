//! Position Ledger
//!
//! Owns every open basis position (at most one per symbol) and the append-only
//! history of completed round trips. Closing is the only way a position leaves
//! the book.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::position::{ArbitragePosition, PositionError};
use crate::domain::signal::ArbitrageSignal;
use crate::domain::trade::{ArbitrageTradeResult, ExitReason};
use crate::ports::execution::Fill;

/// Orchestration faults. Any of these means the caller skipped a membership check.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Position already open for {0}")]
    PositionExists(String),

    #[error("No open position for {0}")]
    NoOpenPosition(String),

    #[error("Cannot build position: {0}")]
    InvalidPosition(#[from] PositionError),
}

#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: BTreeMap<String, ArbitragePosition>,
    history: Vec<ArbitrageTradeResult>,
    commission_per_trade: f64,
}

impl PositionLedger {
    pub fn new(commission_per_trade: f64) -> Self {
        Self {
            positions: BTreeMap::new(),
            history: Vec::new(),
            commission_per_trade,
        }
    }

    /// Open a position from a confirmed fill
    pub fn open(
        &mut self,
        signal: &ArbitrageSignal,
        sector: &str,
        fill: &Fill,
    ) -> Result<&ArbitragePosition, LedgerError> {
        if self.positions.contains_key(&signal.symbol) {
            return Err(LedgerError::PositionExists(signal.symbol.clone()));
        }

        let position = ArbitragePosition::from_fill(signal, sector, fill)?;
        tracing::info!(
            "Opened {} {} | {} lot(s) x {} | spot {:.2} fut {:.2} | basis {:.3}%",
            position.symbol,
            position.direction,
            position.lots(),
            position.lot_size,
            position.entry_spot_price,
            position.entry_futures_price,
            position.entry_basis_pct
        );

        let slot = self.positions.entry(signal.symbol.clone()).or_insert(position);
        Ok(slot)
    }

    /// Mark an open position to the latest prices
    pub fn update(
        &mut self,
        symbol: &str,
        spot_price: f64,
        futures_price: f64,
    ) -> Result<&ArbitragePosition, LedgerError> {
        let position = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| LedgerError::NoOpenPosition(symbol.to_string()))?;
        position.update_current_prices(spot_price, futures_price);
        Ok(position)
    }

    pub fn update_days_to_expiry(&mut self, symbol: &str, days_to_expiry: i64) -> Result<(), LedgerError> {
        let position = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| LedgerError::NoOpenPosition(symbol.to_string()))?;
        position.update_days_to_expiry(days_to_expiry);
        Ok(())
    }

    /// Settle and remove a position, appending the result to history
    pub fn close(
        &mut self,
        symbol: &str,
        exit_spot_price: f64,
        exit_futures_price: f64,
        reason: ExitReason,
        at: DateTime<Utc>,
    ) -> Result<&ArbitrageTradeResult, LedgerError> {
        let position = self
            .positions
            .remove(symbol)
            .ok_or_else(|| LedgerError::NoOpenPosition(symbol.to_string()))?;

        let result = ArbitrageTradeResult::from_position(
            &position,
            exit_spot_price,
            exit_futures_price,
            reason,
            at,
            self.commission_per_trade,
        );
        tracing::info!("Closed {}", result);

        self.history.push(result);
        let last = self.history.len() - 1;
        Ok(&self.history[last])
    }

    pub fn get(&self, symbol: &str) -> Option<&ArbitragePosition> {
        self.positions.get(symbol)
    }

    pub fn is_open(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Open positions in symbol order
    pub fn positions(&self) -> impl Iterator<Item = &ArbitragePosition> {
        self.positions.values()
    }

    pub fn open_symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    pub fn history(&self) -> &[ArbitrageTradeResult] {
        &self.history
    }

    pub fn total_realized_pnl(&self) -> f64 {
        self.history.iter().map(|t| t.net_pnl).sum()
    }

    pub fn total_unrealized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.unrealized_pnl).sum()
    }

    /// Realized net P&L of trades that exited at or after `since`
    pub fn realized_pnl_since(&self, since: DateTime<Utc>) -> f64 {
        self.history
            .iter()
            .filter(|t| t.exit_time >= since)
            .map(|t| t.net_pnl)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Direction;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn signal(symbol: &str, direction: Direction) -> ArbitrageSignal {
        ArbitrageSignal {
            symbol: symbol.to_string(),
            direction,
            entry_spot_price: 1000.0,
            entry_futures_price: 1010.0,
            entry_basis_pct: 1.0,
            target_basis: 5.0,
            stop_basis: 10.1,
            lot_size: 100,
            quantity: 2,
            confidence: 1.0,
            z_score: 3.0,
            days_to_expiry: 15,
            timestamp: Utc::now(),
        }
    }

    fn fill(spot: f64, futures: f64) -> Fill {
        Fill { spot_price: spot, futures_price: futures, timestamp: Utc::now() }
    }

    #[test]
    fn test_open_then_update_at_entry_is_flat_pnl() {
        let mut ledger = PositionLedger::new(0.0);
        ledger
            .open(&signal("INFY", Direction::ShortFuturesLongSpot), "IT", &fill(1000.0, 1010.0))
            .unwrap();

        let position = ledger.update("INFY", 1000.0, 1010.0).unwrap();
        assert_eq!(position.unrealized_pnl, 0.0);
        assert_eq!(position.spot_qty, 200);
        assert_eq!(position.futures_qty, -200);
    }

    #[test]
    fn test_second_open_rejected() {
        let mut ledger = PositionLedger::new(0.0);
        let sig = signal("INFY", Direction::ShortFuturesLongSpot);
        ledger.open(&sig, "IT", &fill(1000.0, 1010.0)).unwrap();

        let err = ledger.open(&sig, "IT", &fill(1001.0, 1012.0)).unwrap_err();
        assert_eq!(err, LedgerError::PositionExists("INFY".to_string()));
        // original entry untouched
        assert_eq!(ledger.get("INFY").unwrap().entry_spot_price, 1000.0);
        assert_eq!(ledger.open_count(), 1);
    }

    #[test]
    fn test_close_missing_position() {
        let mut ledger = PositionLedger::new(0.0);
        assert_eq!(
            ledger.close("TCS", 1.0, 1.0, ExitReason::SquareOff, Utc::now()).unwrap_err(),
            LedgerError::NoOpenPosition("TCS".to_string())
        );
        assert!(ledger.update("TCS", 1.0, 1.0).is_err());
    }

    #[test]
    fn test_close_moves_position_to_history() {
        let mut ledger = PositionLedger::new(20.0);
        ledger
            .open(&signal("INFY", Direction::ShortFuturesLongSpot), "IT", &fill(1000.0, 1010.0))
            .unwrap();

        // basis narrows from 10 to 4: spot +2 * 200, futures +(-4) * -200
        let result = ledger
            .close("INFY", 1002.0, 1006.0, ExitReason::BasisConvergence, Utc::now())
            .unwrap()
            .clone();

        assert_relative_eq!(result.spot_pnl, 400.0);
        assert_relative_eq!(result.futures_pnl, 800.0);
        assert_relative_eq!(result.net_pnl, 1180.0);
        assert!(!ledger.is_open("INFY"));
        assert_eq!(ledger.history().len(), 1);
        assert_relative_eq!(ledger.total_realized_pnl(), 1180.0);
    }

    #[test]
    fn test_reopen_after_close() {
        let mut ledger = PositionLedger::new(0.0);
        let sig = signal("INFY", Direction::LongFuturesShortSpot);
        ledger.open(&sig, "IT", &fill(1000.0, 1010.0)).unwrap();
        ledger.close("INFY", 1000.0, 1010.0, ExitReason::StopLoss, Utc::now()).unwrap();
        assert!(ledger.open(&sig, "IT", &fill(1000.0, 1010.0)).is_ok());
    }

    #[test]
    fn test_realized_pnl_since() {
        let mut ledger = PositionLedger::new(0.0);
        let now = Utc::now();
        let sig = signal("INFY", Direction::LongFuturesShortSpot);

        ledger.open(&sig, "IT", &fill(1000.0, 1010.0)).unwrap();
        ledger
            .close("INFY", 1000.0, 1005.0, ExitReason::SquareOff, now - Duration::days(1))
            .unwrap();
        ledger.open(&sig, "IT", &fill(1000.0, 1010.0)).unwrap();
        ledger.close("INFY", 1000.0, 1012.0, ExitReason::BasisConvergence, now).unwrap();

        // yesterday: -5 * 200; today: +2 * 200
        assert_relative_eq!(ledger.total_realized_pnl(), -600.0);
        assert_relative_eq!(ledger.realized_pnl_since(now - Duration::hours(1)), 400.0);
    }

    #[test]
    fn test_invalid_fill_rejected() {
        let mut ledger = PositionLedger::new(0.0);
        let result = ledger.open(&signal("INFY", Direction::LongFuturesShortSpot), "IT", &fill(0.0, 1010.0));
        assert!(matches!(result, Err(LedgerError::InvalidPosition(_))));
        assert_eq!(ledger.open_count(), 0);
    }
}
