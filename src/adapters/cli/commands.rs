//! CLI Command Definitions
//!
//! Argument parsing for the basis arbitrage engine.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// basis-arb - Spot/Futures Basis Arbitrage Engine
#[derive(Parser, Debug)]
#[command(
    name = "basis-arb",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Spot/Futures Basis Arbitrage Engine",
    long_about = "basis-arb tracks the futures/spot basis of each configured pair, enters when \
                  its z-score breaks out of the rolling window and exits on convergence, stop \
                  loss, expiry proximity or the daily square-off."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the strategy loop
    Run(RunCmd),

    /// Validate a configuration file and print the effective parameters
    CheckConfig(CheckConfigCmd),

    /// Print an empty performance summary as JSON
    SummarySchema,
}

/// Start strategy loop
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/paper.toml")]
    pub config: PathBuf,

    /// Run in paper trading mode (simulated feed and fills)
    #[arg(short, long)]
    pub paper: bool,

    /// Stop after this many cycles
    #[arg(long, value_name = "N")]
    pub max_cycles: Option<u64>,
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct CheckConfigCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/paper.toml")]
    pub config: PathBuf,
}
