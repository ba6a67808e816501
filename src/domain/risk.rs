//! Risk Gate
//!
//! Portfolio-level admission control for new entries plus the mandatory,
//! time-based exits that run before any statistical exit check.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::position::ArbitragePosition;
use crate::domain::session::{MarketPhase, MarketSession};
use crate::domain::trade::ExitReason;
use crate::strategy::params::StrategyConfig;

/// Reason new entries are refused this cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EntryBlock {
    MaxPositions { open: usize, max: usize },
    DailyLossLimit { daily_pnl: f64, limit: f64 },
    OutsideEntryWindow(MarketPhase),
}

impl EntryBlock {
    /// Same kind of block, ignoring the numbers
    pub fn same_kind(&self, other: &EntryBlock) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for EntryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryBlock::MaxPositions { open, max } => {
                write!(f, "position cap reached ({}/{})", open, max)
            }
            EntryBlock::DailyLossLimit { daily_pnl, limit } => {
                write!(f, "daily loss limit hit (P&L {:.2}, limit -{:.2})", daily_pnl, limit)
            }
            EntryBlock::OutsideEntryWindow(phase) => write!(f, "outside entry window ({:?})", phase),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskGate {
    max_positions: usize,
    max_daily_loss: f64,
    days_before_expiry_to_exit: i64,
    session: MarketSession,
}

impl RiskGate {
    pub fn new(config: &StrategyConfig, session: MarketSession) -> Self {
        Self {
            max_positions: config.risk.max_positions,
            max_daily_loss: config.max_daily_loss(),
            days_before_expiry_to_exit: config.risk.days_before_expiry_to_exit,
            session,
        }
    }

    pub fn session(&self) -> &MarketSession {
        &self.session
    }

    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    pub fn max_daily_loss(&self) -> f64 {
        self.max_daily_loss
    }

    pub fn max_positions_reached(&self, open_count: usize) -> bool {
        open_count >= self.max_positions
    }

    pub fn daily_loss_limit_hit(&self, daily_pnl: f64) -> bool {
        daily_pnl < -self.max_daily_loss
    }

    /// Decide whether any new entry may be taken this cycle
    pub fn admit(&self, open_count: usize, daily_pnl: f64, now: DateTime<Utc>) -> Result<(), EntryBlock> {
        if !self.session.entries_allowed(now) {
            return Err(EntryBlock::OutsideEntryWindow(self.session.phase(now)));
        }
        if self.daily_loss_limit_hit(daily_pnl) {
            return Err(EntryBlock::DailyLossLimit { daily_pnl, limit: self.max_daily_loss });
        }
        if self.max_positions_reached(open_count) {
            return Err(EntryBlock::MaxPositions { open: open_count, max: self.max_positions });
        }
        Ok(())
    }

    /// Inside the pre-expiry exit buffer, where no position may be held
    pub fn too_close_to_expiry(&self, days_to_expiry: i64) -> bool {
        days_to_expiry <= self.days_before_expiry_to_exit
    }

    pub fn remaining_capacity(&self, open_count: usize) -> usize {
        self.max_positions.saturating_sub(open_count)
    }

    /// Time-based exits: square-off first, then expiry proximity
    pub fn mandatory_exit(&self, position: &ArbitragePosition, now: DateTime<Utc>) -> Option<ExitReason> {
        if self.session.is_square_off(now) {
            return Some(ExitReason::SquareOff);
        }
        if self.too_close_to_expiry(position.days_to_expiry) {
            return Some(ExitReason::ExpiryExit);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{ArbitrageSignal, Direction};
    use crate::ports::execution::Fill;
    use chrono::{FixedOffset, TimeZone};

    fn ist(hour: u32, minute: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(330 * 60)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 14, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn gate() -> RiskGate {
        // 3% of 100_000
        RiskGate::new(&StrategyConfig::default(), MarketSession::default())
    }

    fn position(days_to_expiry: i64) -> ArbitragePosition {
        let signal = ArbitrageSignal {
            symbol: "HDFCBANK".to_string(),
            direction: Direction::ShortFuturesLongSpot,
            entry_spot_price: 1600.0,
            entry_futures_price: 1606.0,
            entry_basis_pct: 0.375,
            target_basis: 2.0,
            stop_basis: 6.06,
            lot_size: 550,
            quantity: 1,
            confidence: 0.8,
            z_score: 2.4,
            days_to_expiry,
            timestamp: ist(10, 0),
        };
        let fill = Fill { spot_price: 1600.0, futures_price: 1606.0, timestamp: ist(10, 0) };
        ArbitragePosition::from_fill(&signal, "BANKING", &fill).unwrap()
    }

    #[test]
    fn test_admits_inside_window() {
        assert_eq!(gate().admit(0, 0.0, ist(10, 0)), Ok(()));
    }

    #[test]
    fn test_position_cap() {
        let gate = gate();
        assert!(gate.admit(4, 0.0, ist(10, 0)).is_ok());
        assert_eq!(gate.admit(5, 0.0, ist(10, 0)), Err(EntryBlock::MaxPositions { open: 5, max: 5 }));
        assert_eq!(gate.remaining_capacity(3), 2);
        assert_eq!(gate.remaining_capacity(7), 0);
    }

    #[test]
    fn test_daily_loss_limit_is_strict() {
        let gate = gate();
        assert!(gate.admit(0, -3000.0, ist(10, 0)).is_ok());
        assert!(matches!(
            gate.admit(0, -3000.01, ist(10, 0)),
            Err(EntryBlock::DailyLossLimit { .. })
        ));
    }

    #[test]
    fn test_entry_cutoff() {
        let gate = gate();
        assert!(gate.admit(0, 0.0, ist(14, 59)).is_ok());
        assert_eq!(
            gate.admit(0, 0.0, ist(15, 0)),
            Err(EntryBlock::OutsideEntryWindow(MarketPhase::EntryCutoff))
        );
        assert_eq!(
            gate.admit(0, 0.0, ist(8, 30)),
            Err(EntryBlock::OutsideEntryWindow(MarketPhase::PreMarket))
        );
    }

    #[test]
    fn test_square_off_precedes_expiry() {
        let gate = gate();
        assert_eq!(gate.mandatory_exit(&position(2), ist(15, 15)), Some(ExitReason::SquareOff));
        assert_eq!(gate.mandatory_exit(&position(2), ist(11, 0)), Some(ExitReason::ExpiryExit));
        assert_eq!(gate.mandatory_exit(&position(3), ist(11, 0)), Some(ExitReason::ExpiryExit));
        assert_eq!(gate.mandatory_exit(&position(4), ist(11, 0)), None);
    }

    #[test]
    fn test_block_kind() {
        let a = EntryBlock::DailyLossLimit { daily_pnl: -4000.0, limit: 3000.0 };
        let b = EntryBlock::DailyLossLimit { daily_pnl: -4500.0, limit: 3000.0 };
        assert!(a.same_kind(&b));
        assert!(!a.same_kind(&EntryBlock::MaxPositions { open: 5, max: 5 }));
    }
}
