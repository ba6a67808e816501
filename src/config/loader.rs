//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/paper.toml.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::domain::instrument::{InstrumentSpec, Universe};
use crate::domain::session::{parse_date, parse_hhmm, MarketSession, DEFAULT_UTC_OFFSET_MINUTES};
use crate::strategy::params::{RiskConfig, StrategyConfig};

/// Main configuration structure matching config/paper.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub strategy: StrategySection,
    pub risk: RiskSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub logging: LoggingSection,
    pub instruments: Vec<InstrumentSection>,
}

/// Strategy configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    /// Basis observations in the rolling window
    pub basis_lookback: usize,
    /// |z| must exceed this to enter
    pub entry_zscore_threshold: f64,
    /// |z| below this closes on convergence
    pub exit_zscore_threshold: f64,
    /// Basis % std floor below which the basis is too quiet to trade
    pub min_basis_std: f64,
    /// Futures volume / spot volume
    pub min_volume_ratio: f64,
    /// Spot + futures volume
    pub min_total_volume: u64,
    /// Unrealized loss as % of leg notional
    pub stop_loss_pct: f64,
    /// Capital per leg as % of portfolio
    pub capital_per_leg_pct: f64,
    pub portfolio_value: f64,
    #[serde(default)]
    pub commission_per_trade: f64,
}

impl StrategySection {
    /// Portfolio value with environment variable override
    /// Checks BASIS_ARB_PORTFOLIO_VALUE env var first, falls back to config value
    pub fn get_portfolio_value(&self) -> f64 {
        std::env::var("BASIS_ARB_PORTFOLIO_VALUE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.portfolio_value)
    }
}

/// Risk management configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSection {
    pub max_positions: usize,
    /// Daily realized loss limit as % of portfolio
    pub max_daily_loss_pct: f64,
    pub days_before_expiry_to_exit: i64,
}

/// Exchange session configuration section ("HH:MM" local times)
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    pub market_open: String,
    pub market_close: String,
    pub entry_cutoff: String,
    pub square_off_time: String,
    pub utc_offset_minutes: i32,
    /// "YYYY-MM-DD" dates with no trading
    #[serde(default)]
    pub holidays: Vec<String>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            market_open: "09:15".to_string(),
            market_close: "15:30".to_string(),
            entry_cutoff: "15:00".to_string(),
            square_off_time: "15:15".to_string(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            holidays: Vec::new(),
        }
    }
}

/// Loop timing section
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    pub tick_interval_secs: u64,
    /// Log a performance summary every N cycles (0 = never)
    pub summary_every_cycles: u64,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            summary_every_cycles: 60,
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// One tradable spot/futures pair
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentSection {
    pub symbol: String,
    pub lot_size: u32,
    #[serde(default = "default_sector")]
    pub sector: String,
    /// Futures expiry, "YYYY-MM-DD"
    pub expiry: String,
    /// Starting spot price for the paper feed
    pub spot_price: f64,
    /// Starting basis % for the paper feed
    #[serde(default = "default_basis_pct")]
    pub basis_pct: f64,
}

fn default_sector() -> String {
    "UNCLASSIFIED".to_string()
}

fn default_basis_pct() -> f64 {
    0.1
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        StrategyConfig::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        self.session()?;
        self.universe()?;

        for instrument in &self.instruments {
            if !(instrument.spot_price > 0.0 && instrument.spot_price.is_finite()) {
                return Err(ConfigError::ValidationError(format!(
                    "{}: spot_price must be > 0, got {}",
                    instrument.symbol, instrument.spot_price
                )));
            }
        }

        if self.runtime.tick_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_secs must be > 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging level must be one of {:?}, got {}",
                LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }

    pub fn session(&self) -> Result<MarketSession, ConfigError> {
        let invalid = |e: crate::domain::session::SessionError| ConfigError::ValidationError(e.to_string());
        let s = &self.session;

        let holidays = s
            .holidays
            .iter()
            .map(|d| parse_date(d))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        MarketSession::new(
            parse_hhmm(&s.market_open).map_err(invalid)?,
            parse_hhmm(&s.market_close).map_err(invalid)?,
            parse_hhmm(&s.entry_cutoff).map_err(invalid)?,
            parse_hhmm(&s.square_off_time).map_err(invalid)?,
            s.utc_offset_minutes,
            holidays,
        )
        .map_err(invalid)
    }

    pub fn instrument_specs(&self) -> Result<Vec<InstrumentSpec>, ConfigError> {
        self.instruments
            .iter()
            .map(|i| {
                let expiry = parse_date(&i.expiry).map_err(|e| {
                    ConfigError::ValidationError(format!("{}: {}", i.symbol, e))
                })?;
                Ok(InstrumentSpec {
                    symbol: i.symbol.clone(),
                    lot_size: i.lot_size,
                    sector: i.sector.clone(),
                    expiry,
                })
            })
            .collect()
    }

    pub fn universe(&self) -> Result<Universe, ConfigError> {
        Universe::new(self.instrument_specs()?).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

// Conversion from Config to StrategyConfig
impl From<&Config> for StrategyConfig {
    fn from(config: &Config) -> Self {
        StrategyConfig {
            basis_lookback: config.strategy.basis_lookback,
            entry_zscore_threshold: config.strategy.entry_zscore_threshold,
            exit_zscore_threshold: config.strategy.exit_zscore_threshold,
            min_basis_std: config.strategy.min_basis_std,
            min_volume_ratio: config.strategy.min_volume_ratio,
            min_total_volume: config.strategy.min_total_volume,
            stop_loss_pct: config.strategy.stop_loss_pct,
            capital_per_leg_pct: config.strategy.capital_per_leg_pct,
            portfolio_value: config.strategy.get_portfolio_value(),
            commission_per_trade: config.strategy.commission_per_trade,
            risk: RiskConfig {
                max_positions: config.risk.max_positions,
                max_daily_loss_pct: config.risk.max_daily_loss_pct,
                days_before_expiry_to_exit: config.risk.days_before_expiry_to_exit,
            },
        }
    }
}
