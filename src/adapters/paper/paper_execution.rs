use chrono::Utc;

use crate::domain::position::ArbitragePosition;
use crate::domain::signal::{ArbitrageSignal, Direction};
use crate::domain::trade::ExitReason;
use crate::ports::execution::{ExecutionError, ExecutionPort, Fill};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKind {
    Open(Direction),
    Close(ExitReason),
}

/// One simulated two-leg order
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub symbol: String,
    pub kind: OrderKind,
    pub lots: u32,
    pub spot_price: f64,
    pub futures_price: f64,
}

#[derive(Debug, Default)]
pub struct PaperExecution {
    orders: Vec<PaperOrder>,
    reject_entries: bool,
    reject_exits: bool,
}

impl PaperExecution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every entry (exercises the FLAT-on-rejection path)
    pub fn rejecting_entries(mut self) -> Self {
        self.reject_entries = true;
        self
    }

    /// Refuse every exit (exercises the retry path)
    pub fn rejecting_exits(mut self) -> Self {
        self.reject_exits = true;
        self
    }

    pub fn set_reject_exits(&mut self, reject: bool) {
        self.reject_exits = reject;
    }

    pub fn orders(&self) -> &[PaperOrder] {
        &self.orders
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl ExecutionPort for PaperExecution {
    fn open_position(&mut self, signal: &ArbitrageSignal) -> Result<Fill, ExecutionError> {
        if self.reject_entries {
            return Err(ExecutionError::Rejected {
                symbol: signal.symbol.clone(),
                reason: "paper entries disabled".to_string(),
            });
        }

        tracing::info!(
            "PAPER TRADE - OPEN {} {} | {} lot(s) | spot {:.2} fut {:.2}",
            signal.symbol,
            signal.direction,
            signal.quantity,
            signal.entry_spot_price,
            signal.entry_futures_price
        );
        self.orders.push(PaperOrder {
            symbol: signal.symbol.clone(),
            kind: OrderKind::Open(signal.direction),
            lots: signal.quantity,
            spot_price: signal.entry_spot_price,
            futures_price: signal.entry_futures_price,
        });

        Ok(Fill {
            spot_price: signal.entry_spot_price,
            futures_price: signal.entry_futures_price,
            timestamp: signal.timestamp,
        })
    }

    fn close_position(
        &mut self,
        position: &ArbitragePosition,
        reason: ExitReason,
    ) -> Result<Fill, ExecutionError> {
        if self.reject_exits {
            return Err(ExecutionError::Rejected {
                symbol: position.symbol.clone(),
                reason: "paper exits disabled".to_string(),
            });
        }

        tracing::info!(
            "PAPER TRADE - CLOSE {} [{}] | unrealized {:.2}",
            position.symbol,
            reason,
            position.unrealized_pnl
        );
        self.orders.push(PaperOrder {
            symbol: position.symbol.clone(),
            kind: OrderKind::Close(reason),
            lots: position.lots(),
            spot_price: position.current_spot_price,
            futures_price: position.current_futures_price,
        });

        Ok(Fill {
            spot_price: position.current_spot_price,
            futures_price: position.current_futures_price,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> ArbitrageSignal {
        ArbitrageSignal {
            symbol: "ICICIBANK".to_string(),
            direction: Direction::LongFuturesShortSpot,
            entry_spot_price: 1200.0,
            entry_futures_price: 1201.0,
            entry_basis_pct: 0.083,
            target_basis: 3.0,
            stop_basis: 0.99,
            lot_size: 700,
            quantity: 2,
            confidence: 0.9,
            z_score: -2.7,
            days_to_expiry: 12,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_fills_at_signal_prices() {
        let mut paper = PaperExecution::new();
        let sig = signal();
        let fill = paper.open_position(&sig).unwrap();

        assert_eq!(fill.spot_price, 1200.0);
        assert_eq!(fill.futures_price, 1201.0);
        assert_eq!(fill.timestamp, sig.timestamp);
        assert_eq!(paper.order_count(), 1);
        assert_eq!(paper.orders()[0].kind, OrderKind::Open(Direction::LongFuturesShortSpot));
    }

    #[test]
    fn test_close_fills_at_current_marks() {
        let mut paper = PaperExecution::new();
        let sig = signal();
        let fill = paper.open_position(&sig).unwrap();
        let mut position = ArbitragePosition::from_fill(&sig, "BANKING", &fill).unwrap();
        position.update_current_prices(1190.0, 1195.0);

        let exit = paper.close_position(&position, ExitReason::BasisConvergence).unwrap();
        assert_eq!(exit.spot_price, 1190.0);
        assert_eq!(exit.futures_price, 1195.0);
        assert_eq!(paper.orders()[1].lots, 2);
    }

    #[test]
    fn test_rejections() {
        let mut paper = PaperExecution::new().rejecting_entries();
        assert!(matches!(paper.open_position(&signal()), Err(ExecutionError::Rejected { .. })));
        assert_eq!(paper.order_count(), 0);
    }
}
