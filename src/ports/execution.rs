use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::position::ArbitragePosition;
use crate::domain::signal::ArbitrageSignal;
use crate::domain::trade::ExitReason;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Order rejected for {symbol}: {reason}")]
    Rejected { symbol: String, reason: String },
    #[error("Partial fill on {symbol}: one leg did not complete")]
    LegFailed { symbol: String },
    #[error("Execution unavailable: {0}")]
    Unavailable(String),
}

/// Fill confirmation for both legs, authoritative for subsequent P&L
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub spot_price: f64,
    pub futures_price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    pub fn is_valid(&self) -> bool {
        self.spot_price.is_finite()
            && self.futures_price.is_finite()
            && self.spot_price > 0.0
            && self.futures_price > 0.0
    }
}

/// Order-management collaborator. Calls are synchronous and the returned fill
/// is treated as the truth, so the decision engine never waits on transport.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionPort {
    /// Place both legs of a new basis position
    fn open_position(&mut self, signal: &ArbitrageSignal) -> Result<Fill, ExecutionError>;

    /// Flatten both legs of an existing position
    fn close_position(
        &mut self,
        position: &ArbitragePosition,
        reason: ExitReason,
    ) -> Result<Fill, ExecutionError>;
}
