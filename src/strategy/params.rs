//! Strategy Parameters
//!
//! Configuration structs for the basis arbitrage strategy.
//! Defaults target liquid NSE single-stock futures quoted every few seconds.

use serde::{Deserialize, Serialize};

/// Floor for the observation history, whatever the lookback
pub const MIN_HISTORY_CAPACITY: usize = 200;

/// Main strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Number of basis observations in the rolling window
    pub basis_lookback: usize,
    /// |z| must exceed this to enter
    pub entry_zscore_threshold: f64,
    /// |z| below this closes with BASIS_CONVERGENCE
    pub exit_zscore_threshold: f64,
    /// Volatility floor for the basis % (z is 0 at or below it)
    pub min_basis_std: f64,
    /// Minimum futures volume / spot volume
    pub min_volume_ratio: f64,
    /// Minimum combined spot + futures volume
    pub min_total_volume: u64,
    /// Loss as % of entry notional that forces STOP_LOSS, also sizes the stop basis
    pub stop_loss_pct: f64,
    /// Capital allocated to each leg as % of portfolio
    pub capital_per_leg_pct: f64,
    /// Portfolio value in account currency
    pub portfolio_value: f64,
    /// Flat cost charged per round trip
    pub commission_per_trade: f64,
    /// Risk management settings
    pub risk: RiskConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            basis_lookback: 50,
            entry_zscore_threshold: 2.0,
            exit_zscore_threshold: 0.5,
            min_basis_std: 0.01,
            min_volume_ratio: 0.1,
            min_total_volume: 1_000,
            stop_loss_pct: 1.0,
            capital_per_leg_pct: 10.0,
            portfolio_value: 100_000.0,
            commission_per_trade: 0.0,
            risk: RiskConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Create a new config with custom entry threshold
    pub fn with_entry_threshold(mut self, threshold: f64) -> Self {
        self.entry_zscore_threshold = threshold;
        self
    }

    /// Create a new config with custom lookback window
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.basis_lookback = lookback;
        self
    }

    /// Observations retained per symbol
    pub fn history_capacity(&self) -> usize {
        (self.basis_lookback * 3).max(MIN_HISTORY_CAPACITY)
    }

    /// Capital allocated to one leg
    pub fn capital_per_leg(&self) -> f64 {
        self.portfolio_value * self.capital_per_leg_pct / 100.0
    }

    /// Absolute daily realized loss that blocks new entries
    pub fn max_daily_loss(&self) -> f64 {
        self.portfolio_value * self.risk.max_daily_loss_pct / 100.0
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.basis_lookback < 2 {
            return Err(ConfigError::InvalidLookback(self.basis_lookback));
        }
        if !(self.entry_zscore_threshold > 0.0 && self.entry_zscore_threshold <= 10.0) {
            return Err(ConfigError::InvalidEntryThreshold(self.entry_zscore_threshold));
        }
        if !(self.exit_zscore_threshold >= 0.0 && self.exit_zscore_threshold < self.entry_zscore_threshold) {
            return Err(ConfigError::InvalidExitThreshold(self.exit_zscore_threshold, self.entry_zscore_threshold));
        }
        if !(self.min_basis_std >= 0.0) {
            return Err(ConfigError::InvalidVolatilityFloor(self.min_basis_std));
        }
        if !(self.min_volume_ratio >= 0.0) {
            return Err(ConfigError::InvalidVolumeRatio(self.min_volume_ratio));
        }
        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct <= 50.0) {
            return Err(ConfigError::InvalidStopLoss(self.stop_loss_pct));
        }
        if !(self.capital_per_leg_pct > 0.0 && self.capital_per_leg_pct <= 100.0) {
            return Err(ConfigError::InvalidCapitalPerLeg(self.capital_per_leg_pct));
        }
        if !(self.portfolio_value > 0.0 && self.portfolio_value.is_finite()) {
            return Err(ConfigError::InvalidPortfolioValue(self.portfolio_value));
        }
        if !(self.commission_per_trade >= 0.0) {
            return Err(ConfigError::InvalidCommission(self.commission_per_trade));
        }
        self.risk.validate()?;
        Ok(())
    }
}

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum concurrent open positions
    pub max_positions: usize,
    /// Maximum daily realized loss as percentage of portfolio
    pub max_daily_loss_pct: f64,
    /// Force EXPIRY_EXIT once days to expiry drops to this
    pub days_before_expiry_to_exit: i64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_positions: 5,
            max_daily_loss_pct: 3.0,
            days_before_expiry_to_exit: 3,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_positions == 0 {
            return Err(ConfigError::InvalidMaxPositions(self.max_positions));
        }
        if !(self.max_daily_loss_pct > 0.0 && self.max_daily_loss_pct <= 100.0) {
            return Err(ConfigError::InvalidDailyLoss(self.max_daily_loss_pct));
        }
        if self.days_before_expiry_to_exit < 0 {
            return Err(ConfigError::InvalidExpiryBuffer(self.days_before_expiry_to_exit));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid basis lookback: {0} (minimum 2)")]
    InvalidLookback(usize),
    #[error("Invalid entry z-threshold: {0} (must be 0 < z <= 10)")]
    InvalidEntryThreshold(f64),
    #[error("Invalid exit z-threshold: {0} (must be 0 <= exit < entry {1})")]
    InvalidExitThreshold(f64, f64),
    #[error("Invalid basis volatility floor: {0} (must be >= 0)")]
    InvalidVolatilityFloor(f64),
    #[error("Invalid volume ratio: {0} (must be >= 0)")]
    InvalidVolumeRatio(f64),
    #[error("Invalid stop loss: {0}% (must be 0 < loss <= 50)")]
    InvalidStopLoss(f64),
    #[error("Invalid capital per leg: {0}% (must be 0 < pct <= 100)")]
    InvalidCapitalPerLeg(f64),
    #[error("Invalid portfolio value: {0}")]
    InvalidPortfolioValue(f64),
    #[error("Invalid commission: {0}")]
    InvalidCommission(f64),
    #[error("Invalid max positions: {0} (minimum 1)")]
    InvalidMaxPositions(usize),
    #[error("Invalid max daily loss: {0}% (must be 0 < loss <= 100)")]
    InvalidDailyLoss(f64),
    #[error("Invalid expiry exit buffer: {0} days")]
    InvalidExpiryBuffer(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.basis_lookback, 50);
        assert_eq!(config.entry_zscore_threshold, 2.0);
        assert_eq!(config.exit_zscore_threshold, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = StrategyConfig::default()
            .with_entry_threshold(2.5)
            .with_lookback(30);
        assert_eq!(config.entry_zscore_threshold, 2.5);
        assert_eq!(config.basis_lookback, 30);
    }

    #[test]
    fn test_history_capacity() {
        assert_eq!(StrategyConfig::default().with_lookback(20).history_capacity(), 200);
        assert_eq!(StrategyConfig::default().with_lookback(100).history_capacity(), 300);
    }

    #[test]
    fn test_derived_amounts() {
        let mut config = StrategyConfig::default();
        config.capital_per_leg_pct = 50.0;
        assert_eq!(config.capital_per_leg(), 50_000.0);
        assert_eq!(config.max_daily_loss(), 3_000.0);
    }

    #[test]
    fn test_invalid_lookback() {
        let config = StrategyConfig::default().with_lookback(1);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLookback(1))));
    }

    #[test]
    fn test_exit_must_be_inside_entry() {
        let mut config = StrategyConfig::default();
        config.exit_zscore_threshold = 2.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidExitThreshold(_, _))));
    }

    #[test]
    fn test_nan_thresholds_rejected() {
        let mut config = StrategyConfig::default();
        config.entry_zscore_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_risk_config_validation() {
        let mut risk = RiskConfig::default();
        assert!(risk.validate().is_ok());

        risk.max_positions = 0;
        assert_eq!(risk.validate(), Err(ConfigError::InvalidMaxPositions(0)));
    }
}
