//! Instrument Universe
//!
//! Contract metadata for each spot/futures pair the strategy may trade.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UniverseError {
    #[error("Duplicate instrument: {0}")]
    Duplicate(String),
    #[error("{0}: lot size must be positive")]
    ZeroLotSize(String),
    #[error("Empty instrument universe")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub lot_size: u32,
    pub sector: String,
    /// Futures contract expiry date (exchange local)
    pub expiry: NaiveDate,
}

impl InstrumentSpec {
    /// Calendar days from `today` until expiry, negative once expired
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry - today).num_days()
    }
}

/// Ordered set of tradable instruments keyed by symbol
#[derive(Debug, Clone, Default)]
pub struct Universe {
    instruments: BTreeMap<String, InstrumentSpec>,
}

impl Universe {
    pub fn new(specs: Vec<InstrumentSpec>) -> Result<Self, UniverseError> {
        if specs.is_empty() {
            return Err(UniverseError::Empty);
        }
        let mut instruments = BTreeMap::new();
        for spec in specs {
            if spec.lot_size == 0 {
                return Err(UniverseError::ZeroLotSize(spec.symbol));
            }
            if instruments.contains_key(&spec.symbol) {
                return Err(UniverseError::Duplicate(spec.symbol));
            }
            instruments.insert(spec.symbol.clone(), spec);
        }
        Ok(Self { instruments })
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentSpec> {
        self.instruments.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.instruments.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentSpec> {
        self.instruments.values()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(symbol: &str, lot_size: u32) -> InstrumentSpec {
        InstrumentSpec {
            symbol: symbol.to_string(),
            lot_size,
            sector: "IT".to_string(),
            expiry: NaiveDate::from_ymd_opt(2026, 10, 29).unwrap(),
        }
    }

    #[test]
    fn test_days_to_expiry() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(spec("TCS", 125).days_to_expiry(today), 15);
        let after = NaiveDate::from_ymd_opt(2026, 10, 30).unwrap();
        assert_eq!(spec("TCS", 125).days_to_expiry(after), -1);
    }

    #[test]
    fn test_universe_rejects_duplicates() {
        let result = Universe::new(vec![spec("TCS", 125), spec("TCS", 125)]);
        assert_eq!(result.unwrap_err(), UniverseError::Duplicate("TCS".to_string()));
    }

    #[test]
    fn test_universe_rejects_zero_lot() {
        let result = Universe::new(vec![spec("INFY", 0)]);
        assert_eq!(result.unwrap_err(), UniverseError::ZeroLotSize("INFY".to_string()));
    }

    #[test]
    fn test_universe_is_sorted() {
        let universe = Universe::new(vec![spec("TCS", 125), spec("INFY", 300)]).unwrap();
        let symbols: Vec<&str> = universe.symbols().collect();
        assert_eq!(symbols, vec!["INFY", "TCS"]);
        assert_eq!(universe.get("INFY").map(|s| s.lot_size), Some(300));
        assert!(!universe.contains("HDFCBANK"));
    }
}
