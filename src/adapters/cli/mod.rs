//! CLI Adapter
//!
//! Command-line interface for the basis arbitrage engine.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, RunCmd, CheckConfigCmd};

/// Parse the command line
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}
