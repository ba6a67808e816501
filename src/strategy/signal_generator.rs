//! Signal Generator
//!
//! Turns a market snapshot plus rolling basis statistics into entry signals
//! and statistical exit decisions.
//!
//! Entry filters, all must pass:
//! 1. full reference window
//! 2. basis std above the volatility floor
//! 3. futures/spot volume ratio at or above the minimum
//! 4. combined volume at or above the minimum
//! 5. |z| strictly above the entry threshold
//!
//! z below -threshold means futures are cheap (long futures, short spot);
//! z above +threshold means futures are rich (short futures, long spot).

use std::fmt;

use crate::domain::market::MarketSnapshot;
use crate::domain::position::ArbitragePosition;
use crate::domain::signal::{ArbitrageSignal, Direction};
use crate::domain::trade::ExitReason;
use crate::strategy::basis_stats::BasisStats;
use crate::strategy::params::StrategyConfig;

/// Why a snapshot did not produce an entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryFilter {
    InsufficientData { data_points: usize },
    MalformedStats,
    LowVolatility { std: f64 },
    LowVolumeRatio { ratio: f64 },
    LowTotalVolume { volume: u64 },
    InsideThreshold { z_score: f64 },
    InvalidLotSize,
}

impl fmt::Display for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryFilter::InsufficientData { data_points } => write!(f, "warming up ({} points)", data_points),
            EntryFilter::MalformedStats => write!(f, "non-finite statistics"),
            EntryFilter::LowVolatility { std } => write!(f, "basis too quiet (std {:.4})", std),
            EntryFilter::LowVolumeRatio { ratio } => write!(f, "volume ratio {:.2} too low", ratio),
            EntryFilter::LowTotalVolume { volume } => write!(f, "total volume {} too low", volume),
            EntryFilter::InsideThreshold { z_score } => write!(f, "z {:.2} inside threshold", z_score),
            EntryFilter::InvalidLotSize => write!(f, "invalid lot size"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: StrategyConfig,
}

impl SignalGenerator {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Run the entry filters and pick a direction
    pub fn screen(&self, snapshot: &MarketSnapshot, stats: &BasisStats) -> Result<Direction, EntryFilter> {
        if !stats.has_sufficient_data {
            return Err(EntryFilter::InsufficientData { data_points: stats.data_points });
        }
        if !stats.is_well_formed() {
            return Err(EntryFilter::MalformedStats);
        }
        if stats.std <= self.config.min_basis_std {
            return Err(EntryFilter::LowVolatility { std: stats.std });
        }

        let ratio = snapshot.volume_ratio();
        if ratio < self.config.min_volume_ratio {
            return Err(EntryFilter::LowVolumeRatio { ratio });
        }
        if snapshot.total_volume() < self.config.min_total_volume {
            return Err(EntryFilter::LowTotalVolume { volume: snapshot.total_volume() });
        }

        let threshold = self.config.entry_zscore_threshold;
        if stats.is_underpriced(threshold) {
            Ok(Direction::LongFuturesShortSpot)
        } else if stats.is_overpriced(threshold) {
            Ok(Direction::ShortFuturesLongSpot)
        } else {
            Err(EntryFilter::InsideThreshold { z_score: stats.z_score })
        }
    }

    /// Produce an entry signal, or None when any filter declines
    pub fn evaluate_entry(
        &self,
        snapshot: &MarketSnapshot,
        stats: &BasisStats,
        lot_size: u32,
    ) -> Option<ArbitrageSignal> {
        if lot_size == 0 {
            tracing::debug!("{}: {}", snapshot.symbol(), EntryFilter::InvalidLotSize);
            return None;
        }

        let direction = match self.screen(snapshot, stats) {
            Ok(direction) => direction,
            Err(filter) => {
                tracing::debug!("{}: no entry, {}", snapshot.symbol(), filter);
                return None;
            }
        };

        let spot_price = snapshot.spot_price();
        let entry_basis = snapshot.basis();

        let signal = ArbitrageSignal {
            symbol: snapshot.symbol().to_string(),
            direction,
            entry_spot_price: spot_price,
            entry_futures_price: snapshot.futures_price(),
            entry_basis_pct: snapshot.basis_pct(),
            target_basis: stats.mean / 100.0 * spot_price,
            stop_basis: self.stop_basis(direction, entry_basis),
            lot_size,
            quantity: self.quantity_lots(spot_price, lot_size),
            confidence: ArbitrageSignal::calculate_confidence(stats.z_score),
            z_score: stats.z_score,
            days_to_expiry: snapshot.days_to_expiry(),
            timestamp: snapshot.timestamp(),
        };

        tracing::info!(
            "Arbitrage signal: {} {} | basis {:.3}% | z {:.2} | confidence {:.2} | {} lot(s)",
            signal.symbol,
            signal.direction,
            signal.entry_basis_pct,
            signal.z_score,
            signal.confidence,
            signal.quantity
        );

        Some(signal)
    }

    /// Lots per leg, never below one
    pub fn quantity_lots(&self, spot_price: f64, lot_size: u32) -> u32 {
        if spot_price <= 0.0 || lot_size == 0 {
            return 1;
        }
        let units = self.config.capital_per_leg() / spot_price;
        let lots = (units / f64::from(lot_size)).floor();
        (lots as u32).max(1)
    }

    /// Basis level that corresponds to an adverse move of `stop_loss_pct`
    pub fn stop_basis(&self, direction: Direction, entry_basis: f64) -> f64 {
        let offset = entry_basis.abs() * self.config.stop_loss_pct / 100.0;
        if direction.profits_from_narrowing() {
            entry_basis + offset
        } else {
            entry_basis - offset
        }
    }

    /// Statistical exits for an already marked position.
    ///
    /// Convergence is checked first and wins when both apply. The stop-loss
    /// check depends only on P&L so it still fires when statistics are unusable.
    pub fn check_exit(&self, position: &ArbitragePosition, stats: &BasisStats) -> Option<ExitReason> {
        if stats.has_sufficient_data
            && stats.is_well_formed()
            && stats.z_score.abs() < self.config.exit_zscore_threshold
        {
            return Some(ExitReason::BasisConvergence);
        }

        if position.unrealized_pnl < 0.0 && position.loss_pct() >= self.config.stop_loss_pct {
            return Some(ExitReason::StopLoss);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::execution::Fill;
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn generator() -> SignalGenerator {
        let mut config = StrategyConfig::default();
        config.capital_per_leg_pct = 50.0;
        config.min_volume_ratio = 0.5;
        config.min_total_volume = 1_000;
        SignalGenerator::new(config)
    }

    fn snapshot(spot: f64, futures: f64) -> MarketSnapshot {
        MarketSnapshot::new("RELIANCE", spot, futures, 10_000, 8_000, 20, Utc::now()).unwrap()
    }

    fn stats(z_score: f64) -> BasisStats {
        BasisStats {
            has_sufficient_data: true,
            data_points: 50,
            mean: 0.10,
            std: 0.05,
            z_score,
            min: 0.0,
            max: 0.2,
            latest: 0.10 + z_score * 0.05,
        }
    }

    #[test]
    fn test_direction_from_z_sign() {
        let gen = generator();
        let snap = snapshot(2000.0, 2005.0);
        assert_eq!(gen.screen(&snap, &stats(3.0)), Ok(Direction::ShortFuturesLongSpot));
        assert_eq!(gen.screen(&snap, &stats(-3.0)), Ok(Direction::LongFuturesShortSpot));
    }

    #[test]
    fn test_threshold_is_strict() {
        let gen = generator();
        let snap = snapshot(2000.0, 2005.0);
        assert!(matches!(gen.screen(&snap, &stats(2.0)), Err(EntryFilter::InsideThreshold { .. })));
        assert!(matches!(gen.screen(&snap, &stats(-2.0)), Err(EntryFilter::InsideThreshold { .. })));
        assert!(gen.screen(&snap, &stats(2.0001)).is_ok());
    }

    #[test]
    fn test_insufficient_data_declines() {
        let gen = generator();
        let mut s = stats(5.0);
        s.has_sufficient_data = false;
        assert!(gen.evaluate_entry(&snapshot(2000.0, 2005.0), &s, 250).is_none());
    }

    #[test]
    fn test_quiet_basis_declines() {
        let gen = generator();
        let mut s = stats(5.0);
        s.std = gen.config().min_basis_std;
        assert!(matches!(
            gen.screen(&snapshot(2000.0, 2005.0), &s),
            Err(EntryFilter::LowVolatility { .. })
        ));
    }

    #[test]
    fn test_liquidity_filters() {
        let gen = generator();
        let thin_futures = MarketSnapshot::new("RELIANCE", 2000.0, 2005.0, 10_000, 100, 20, Utc::now()).unwrap();
        assert!(matches!(gen.screen(&thin_futures, &stats(3.0)), Err(EntryFilter::LowVolumeRatio { .. })));

        let tiny = MarketSnapshot::new("RELIANCE", 2000.0, 2005.0, 400, 400, 20, Utc::now()).unwrap();
        assert!(matches!(gen.screen(&tiny, &stats(3.0)), Err(EntryFilter::LowTotalVolume { volume: 800 })));
    }

    #[test]
    fn test_malformed_stats_fail_closed() {
        let gen = generator();
        let mut s = stats(3.0);
        s.mean = f64::NAN;
        assert!(gen.evaluate_entry(&snapshot(2000.0, 2005.0), &s, 250).is_none());
    }

    #[test]
    fn test_position_sizing() {
        let gen = generator();
        // 50_000 per leg / 2000 = 25 units, 25 / 250 floors to 0, clamped to 1
        assert_eq!(gen.quantity_lots(2000.0, 250), 1);
        // 50_000 / 100 = 500 units, 500 / 50 = 10 lots
        assert_eq!(gen.quantity_lots(100.0, 50), 10);
        assert_eq!(gen.quantity_lots(101.0, 50), 9);
    }

    #[test]
    fn test_signal_fields() {
        let gen = generator();
        let snap = snapshot(2000.0, 2005.0);
        let signal = gen.evaluate_entry(&snap, &stats(3.0), 250).unwrap();

        assert_eq!(signal.direction, Direction::ShortFuturesLongSpot);
        assert_eq!(signal.quantity, 1);
        assert_relative_eq!(signal.confidence, 1.0);
        // mean 0.10% of 2000 = 2.0 absolute basis
        assert_relative_eq!(signal.target_basis, 2.0, epsilon = 1e-9);
        // entry basis 5, widening stop of 1%
        assert_relative_eq!(signal.stop_basis, 5.05, epsilon = 1e-9);
        assert_eq!(signal.days_to_expiry, 20);
    }

    #[test]
    fn test_stop_basis_direction() {
        let gen = generator();
        assert_relative_eq!(gen.stop_basis(Direction::LongFuturesShortSpot, 5.0), 4.95, epsilon = 1e-9);
        assert_relative_eq!(gen.stop_basis(Direction::ShortFuturesLongSpot, -5.0), -4.95, epsilon = 1e-9);
        assert_relative_eq!(gen.stop_basis(Direction::LongFuturesShortSpot, -5.0), -5.05, epsilon = 1e-9);
    }

    fn open_position(direction: Direction) -> ArbitragePosition {
        let gen = generator();
        let snap = snapshot(2000.0, 2005.0);
        let z = if direction == Direction::ShortFuturesLongSpot { 3.0 } else { -3.0 };
        let signal = gen.evaluate_entry(&snap, &stats(z), 250).unwrap();
        let fill = Fill { spot_price: 2000.0, futures_price: 2005.0, timestamp: Utc::now() };
        ArbitragePosition::from_fill(&signal, "ENERGY", &fill).unwrap()
    }

    #[test]
    fn test_convergence_exit() {
        let gen = generator();
        let position = open_position(Direction::ShortFuturesLongSpot);
        assert_eq!(gen.check_exit(&position, &stats(0.4)), Some(ExitReason::BasisConvergence));
        assert_eq!(gen.check_exit(&position, &stats(-0.49)), Some(ExitReason::BasisConvergence));
        assert_eq!(gen.check_exit(&position, &stats(0.5)), None);
    }

    #[test]
    fn test_stop_loss_exit() {
        let gen = generator();
        let mut position = open_position(Direction::LongFuturesShortSpot);
        // notional 250 * 2000 + 250 * 2005 = 1_001_250; loss of 1% needs ~10_012.5
        position.update_current_prices(2040.0, 2005.0);
        assert!(position.loss_pct() < 1.0);
        assert_eq!(gen.check_exit(&position, &stats(1.5)), None);

        position.update_current_prices(2045.0, 2005.0);
        assert!(position.loss_pct() >= 1.0);
        assert_eq!(gen.check_exit(&position, &stats(1.5)), Some(ExitReason::StopLoss));
    }

    #[test]
    fn test_convergence_wins_over_stop() {
        let gen = generator();
        let mut position = open_position(Direction::LongFuturesShortSpot);
        position.update_current_prices(2100.0, 2005.0);
        assert_eq!(gen.check_exit(&position, &stats(0.1)), Some(ExitReason::BasisConvergence));
    }

    #[test]
    fn test_stop_fires_without_statistics() {
        let gen = generator();
        let mut position = open_position(Direction::LongFuturesShortSpot);
        position.update_current_prices(2100.0, 2005.0);
        assert_eq!(gen.check_exit(&position, &BasisStats::default()), Some(ExitReason::StopLoss));
    }
}
