//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    Config, ConfigError, InstrumentSection, LoggingSection, RuntimeSection, SessionSection,
    load_config,
};
