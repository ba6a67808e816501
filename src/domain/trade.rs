use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::position::{leg_pnl, ArbitragePosition};
use crate::domain::signal::Direction;

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    BasisConvergence,
    StopLoss,
    SquareOff,
    ExpiryExit,
}

impl ExitReason {
    /// Time-based exits that run regardless of the z-score
    pub fn is_mandatory(&self) -> bool {
        matches!(self, ExitReason::SquareOff | ExitReason::ExpiryExit)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::BasisConvergence => write!(f, "BASIS_CONVERGENCE"),
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
            ExitReason::SquareOff => write!(f, "SQUARE_OFF"),
            ExitReason::ExpiryExit => write!(f, "EXPIRY_EXIT"),
        }
    }
}

/// Completed round trip, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageTradeResult {
    pub symbol: String,
    pub sector: String,
    pub direction: Direction,

    pub entry_spot_price: f64,
    pub entry_futures_price: f64,
    pub entry_basis: f64,
    pub exit_spot_price: f64,
    pub exit_futures_price: f64,
    pub exit_basis: f64,

    pub quantity: u32,
    pub lot_size: u32,

    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    /// Minutes between entry and exit
    pub holding_period: f64,
    pub days_to_expiry_at_entry: i64,
    pub days_to_expiry_at_exit: i64,

    pub spot_pnl: f64,
    pub futures_pnl: f64,
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,

    pub basis_change: f64,
    pub basis_change_pct: f64,

    pub exit_reason: ExitReason,
    pub max_favorable_basis: f64,
    pub max_adverse_basis: f64,
}

impl ArbitrageTradeResult {
    /// Settle a position at the given exit prices
    pub fn from_position(
        position: &ArbitragePosition,
        exit_spot_price: f64,
        exit_futures_price: f64,
        exit_reason: ExitReason,
        exit_time: DateTime<Utc>,
        commission: f64,
    ) -> Self {
        let spot_pnl = leg_pnl(position.entry_spot_price, exit_spot_price, position.spot_qty);
        let futures_pnl = leg_pnl(position.entry_futures_price, exit_futures_price, position.futures_qty);
        let gross_pnl = spot_pnl + futures_pnl;

        let exit_basis = exit_futures_price - exit_spot_price;
        let basis_change = exit_basis - position.entry_basis;
        let basis_change_pct = if position.entry_basis != 0.0 {
            basis_change / position.entry_basis * 100.0
        } else {
            0.0
        };

        let holding_period = (exit_time - position.entry_time).num_milliseconds() as f64 / 60_000.0;

        Self {
            symbol: position.symbol.clone(),
            sector: position.sector.clone(),
            direction: position.direction,
            entry_spot_price: position.entry_spot_price,
            entry_futures_price: position.entry_futures_price,
            entry_basis: position.entry_basis,
            exit_spot_price,
            exit_futures_price,
            exit_basis,
            quantity: position.lots(),
            lot_size: position.lot_size,
            entry_time: position.entry_time,
            exit_time,
            holding_period,
            days_to_expiry_at_entry: position.days_to_expiry_at_entry,
            days_to_expiry_at_exit: position.days_to_expiry,
            spot_pnl,
            futures_pnl,
            gross_pnl,
            commission,
            net_pnl: gross_pnl - commission,
            basis_change,
            basis_change_pct,
            exit_reason,
            max_favorable_basis: position.max_favorable_basis,
            max_adverse_basis: position.max_adverse_basis,
        }
    }

    pub fn is_win(&self) -> bool {
        self.net_pnl > 0.0
    }
}

impl fmt::Display for ArbitrageTradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{} closed ({}): net {:.2}, basis {:.2} -> {:.2}",
            self.symbol,
            self.direction,
            self.quantity,
            self.exit_reason,
            self.net_pnl,
            self.entry_basis,
            self.exit_basis
        )
    }
}
