//! basis-arb - Spot/Futures Basis Arbitrage Engine
//!
//! Paper-trades the basis between spot and futures using z-score gating.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing_subscriber::{fmt, EnvFilter};

use basis_arb::adapters::cli::{self, CheckConfigCmd, Command, RunCmd};
use basis_arb::adapters::market_data::{SimulatedFeed, SimulatedInstrument, SnapshotBuffer};
use basis_arb::adapters::paper::PaperExecution;
use basis_arb::application::{PerformanceSummary, StrategyCycle, StrategyRunner};
use basis_arb::config::{load_config, Config};
use basis_arb::strategy::StrategyConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let app = cli::init();

    match app.command {
        Command::Run(cmd) => run_command(cmd, app.verbose, app.debug).await,
        Command::CheckConfig(cmd) => {
            init_logging(app.verbose, app.debug, "warn")?;
            check_config_command(cmd)
        }
        Command::SummarySchema => summary_schema_command(),
    }
}

/// Flags win over the configured level; RUST_LOG wins over both
fn init_logging(verbose: bool, debug: bool, configured: &str) -> Result<()> {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        configured
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

fn load(path: &std::path::Path) -> Result<Config> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    load_config(&expanded).with_context(|| format!("Failed to load configuration from {}", expanded))
}

async fn run_command(cmd: RunCmd, verbose: bool, debug: bool) -> Result<()> {
    if !cmd.paper {
        bail!("Live execution is not available. Re-run with --paper to trade against the simulated feed.");
    }

    let config = load(&cmd.config)?;
    init_logging(verbose, debug, &config.logging.level)?;
    tracing::info!("Starting basis-arb...");
    tracing::warn!("PAPER TRADING MODE - simulated feed, no real orders");

    let strategy_config = StrategyConfig::from(&config);
    let session = config.session()?;
    let universe = config.universe()?;
    let tick_interval = Duration::from_secs(config.runtime.tick_interval_secs);

    let instruments: Vec<SimulatedInstrument> = config
        .instrument_specs()?
        .into_iter()
        .zip(config.instruments.iter())
        .map(|(spec, section)| SimulatedInstrument {
            spec,
            spot_price: section.spot_price,
            basis_pct: section.basis_pct,
        })
        .collect();

    let buffer = SnapshotBuffer::new();
    let feed = SimulatedFeed::new(instruments, buffer.clone(), session.clone(), tick_interval).spawn();

    let cycle = StrategyCycle::new(strategy_config, session, universe, PaperExecution::new())
        .context("Failed to build strategy cycle")?;
    let runner = StrategyRunner::new(cycle, Arc::new(buffer))
        .with_tick_interval(tick_interval)
        .with_summary_every(config.runtime.summary_every_cycles);

    // Setup Ctrl+C handler
    let r = runner.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        r.stop().await;
    });

    if let Some(max_cycles) = cmd.max_cycles {
        let r = runner.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick_interval).await;
                if r.status().await.cycles >= max_cycles {
                    r.stop().await;
                    break;
                }
            }
        });
    }

    let outcome = runner.run().await;
    feed.abort();

    let summary = runner.summary(Utc::now()).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    outcome.context("Strategy runner stopped on an invariant violation")?;
    tracing::info!("basis-arb stopped");
    Ok(())
}

fn check_config_command(cmd: CheckConfigCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let strategy_config = StrategyConfig::from(&config);
    let session = config.session()?;
    let universe = config.universe()?;
    let now = Utc::now();
    let today = session.local_date(now);

    println!("Configuration OK: {}", cmd.config.display());
    println!("{}", serde_json::to_string_pretty(&strategy_config)?);
    println!();
    println!("Session phase now: {:?}", session.phase(now));
    println!("Entry cutoff: {} | Square-off: {}", session.entry_cutoff(), session.square_off_time());
    println!("Capital per leg: {:.2}", strategy_config.capital_per_leg());
    println!("Daily loss limit: {:.2}", strategy_config.max_daily_loss());
    println!();
    println!("Instruments ({}):", universe.len());
    for spec in universe.iter() {
        println!(
            "  {:<12} lot {:>6} | {:<14} | expiry {} ({} days)",
            spec.symbol,
            spec.lot_size,
            spec.sector,
            spec.expiry,
            spec.days_to_expiry(today)
        );
    }
    Ok(())
}

fn summary_schema_command() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&PerformanceSummary::default())?);
    Ok(())
}
