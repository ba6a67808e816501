//! Strategy Cycle
//!
//! One synchronous, run-to-completion pass over the latest snapshots:
//! 1. record basis observations and compute statistics
//! 2. mark open positions and apply exits (mandatory first, then statistical)
//! 3. if the risk gate admits, open the strongest signals up to capacity
//! 4. rebuild metrics from trade history
//!
//! Exits never depend on the gate, so a blocked engine can still reduce risk.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::ledger::{LedgerError, PositionLedger};
use crate::domain::market::MarketSnapshot;
use crate::domain::metrics::{PortfolioRisk, StrategyMetrics};
use crate::domain::instrument::Universe;
use crate::domain::risk::{EntryBlock, RiskGate};
use crate::domain::session::MarketSession;
use crate::domain::signal::ArbitrageSignal;
use crate::domain::trade::ExitReason;
use crate::ports::execution::ExecutionPort;
use crate::strategy::basis_stats::{BasisStatisticsTracker, BasisStats};
use crate::strategy::params::{ConfigError, StrategyConfig};
use crate::strategy::signal_generator::SignalGenerator;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Invalid strategy configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger invariant violated: {0}")]
    Ledger(#[from] LedgerError),
}

/// What happened during one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub snapshots_processed: usize,
    /// Snapshots for symbols outside the configured universe
    pub unknown_symbols: Vec<String>,
    pub exits: Vec<(String, ExitReason)>,
    /// Exits the execution side refused; retried next cycle
    pub failed_exits: Vec<(String, ExitReason)>,
    pub signals: usize,
    pub entries: Vec<String>,
    pub rejected_entries: Vec<String>,
    pub blocked: Option<EntryBlock>,
}

pub struct StrategyCycle<E: ExecutionPort> {
    config: StrategyConfig,
    generator: SignalGenerator,
    tracker: BasisStatisticsTracker,
    ledger: PositionLedger,
    gate: RiskGate,
    universe: Universe,
    execution: E,
    metrics: StrategyMetrics,
    current_stats: BTreeMap<String, BasisStats>,
    current_basis_pct: BTreeMap<String, f64>,
    last_block: Option<EntryBlock>,
    cycles: u64,
}

impl<E: ExecutionPort> StrategyCycle<E> {
    pub fn new(
        config: StrategyConfig,
        session: MarketSession,
        universe: Universe,
        execution: E,
    ) -> Result<Self, CycleError> {
        config.validate()?;

        Ok(Self {
            generator: SignalGenerator::new(config.clone()),
            tracker: BasisStatisticsTracker::new(&config),
            ledger: PositionLedger::new(config.commission_per_trade),
            gate: RiskGate::new(&config, session),
            universe,
            execution,
            metrics: StrategyMetrics::default(),
            current_stats: BTreeMap::new(),
            current_basis_pct: BTreeMap::new(),
            last_block: None,
            cycles: 0,
            config,
        })
    }

    /// Run one full decision pass
    pub fn run_cycle(
        &mut self,
        snapshots: &[MarketSnapshot],
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::default();
        let latest = self.ingest(snapshots, &mut report);

        self.process_exits(&latest, now, &mut report)?;
        self.process_entries(&latest, now, &mut report)?;

        self.metrics = StrategyMetrics::from_trades(self.ledger.history());
        self.cycles += 1;
        Ok(report)
    }

    /// Keep the last snapshot per known symbol and feed the statistics tracker
    fn ingest<'a>(
        &mut self,
        snapshots: &'a [MarketSnapshot],
        report: &mut CycleReport,
    ) -> BTreeMap<String, &'a MarketSnapshot> {
        let mut latest: BTreeMap<String, &MarketSnapshot> = BTreeMap::new();
        for snapshot in snapshots {
            if !self.universe.contains(snapshot.symbol()) {
                if !report.unknown_symbols.iter().any(|s| s == snapshot.symbol()) {
                    report.unknown_symbols.push(snapshot.symbol().to_string());
                }
                continue;
            }
            latest.insert(snapshot.symbol().to_string(), snapshot);
        }

        for (symbol, snapshot) in &latest {
            report.snapshots_processed += 1;

            // A snapshot that is not newer than the last observation is a
            // repeat of the latest known quote and must not weigh twice.
            let fresh = self
                .tracker
                .newest(symbol)
                .map_or(true, |obs| snapshot.timestamp() > obs.timestamp);
            if fresh {
                self.tracker.record(symbol, snapshot.basis_pct(), snapshot.timestamp());
            }

            let stats = self.tracker.stats(symbol);
            if !self.tracker.is_ready(symbol) {
                tracing::debug!(
                    "{}: warming up {}/{}",
                    symbol,
                    stats.data_points,
                    self.tracker.lookback()
                );
            }
            self.current_stats.insert(symbol.clone(), stats);
            self.current_basis_pct.insert(symbol.clone(), snapshot.basis_pct());
        }

        latest
    }

    fn process_exits(
        &mut self,
        latest: &BTreeMap<String, &MarketSnapshot>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<(), CycleError> {
        for symbol in self.ledger.open_symbols() {
            let snapshot = latest.get(&symbol).copied();
            if let Some(snapshot) = snapshot {
                self.ledger
                    .update(&symbol, snapshot.spot_price(), snapshot.futures_price())?;
                self.ledger.update_days_to_expiry(&symbol, snapshot.days_to_expiry())?;
            } else if let Some(spec) = self.universe.get(&symbol) {
                // no quote this cycle: the contract calendar still moves
                let today = self.gate.session().local_date(now);
                self.ledger.update_days_to_expiry(&symbol, spec.days_to_expiry(today))?;
            }

            let Some(position) = self.ledger.get(&symbol) else {
                return Err(LedgerError::NoOpenPosition(symbol).into());
            };

            // Statistical exits need a fresh quote; mandatory ones never wait for one
            let reason = self.gate.mandatory_exit(position, now).or_else(|| {
                snapshot.and_then(|_| {
                    let stats = self.current_stats.get(&symbol).copied().unwrap_or_default();
                    self.generator.check_exit(position, &stats)
                })
            });
            let Some(reason) = reason else {
                continue;
            };

            match self.execution.close_position(position, reason) {
                Ok(fill) if fill.is_valid() => {
                    let result = self.ledger.close(
                        &symbol,
                        fill.spot_price,
                        fill.futures_price,
                        reason,
                        now,
                    )?;
                    tracing::info!(
                        "Exit {} [{}] net P&L {:.2}",
                        symbol,
                        reason,
                        result.net_pnl
                    );
                    report.exits.push((symbol, reason));
                }
                Ok(fill) => {
                    tracing::warn!(
                        "Exit {} [{}] returned an unusable fill (spot {}, fut {}); keeping position",
                        symbol,
                        reason,
                        fill.spot_price,
                        fill.futures_price
                    );
                    report.failed_exits.push((symbol, reason));
                }
                Err(e) => {
                    tracing::warn!("Exit {} [{}] failed: {}; retrying next cycle", symbol, reason, e);
                    report.failed_exits.push((symbol, reason));
                }
            }
        }
        Ok(())
    }

    fn process_entries(
        &mut self,
        latest: &BTreeMap<String, &MarketSnapshot>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<(), CycleError> {
        let daily_pnl = self.daily_pnl(now);
        let open_count = self.ledger.open_count();

        if let Err(block) = self.gate.admit(open_count, daily_pnl, now) {
            let changed = self.last_block.map_or(true, |last| !last.same_kind(&block));
            if changed {
                tracing::info!("New entries blocked: {}", block);
            }
            self.last_block = Some(block);
            report.blocked = Some(block);
            return Ok(());
        }
        if let Some(last) = self.last_block.take() {
            tracing::info!("New entries re-enabled (was: {})", last);
        }

        let mut candidates: Vec<(ArbitrageSignal, String)> = Vec::new();
        for (symbol, snapshot) in latest {
            if self.ledger.is_open(symbol) {
                continue;
            }
            let Some(spec) = self.universe.get(symbol) else {
                continue;
            };
            if self.gate.too_close_to_expiry(snapshot.days_to_expiry()) {
                continue;
            }
            let stats = self.current_stats.get(symbol).copied().unwrap_or_default();
            if let Some(signal) = self.generator.evaluate_entry(snapshot, &stats, spec.lot_size) {
                candidates.push((signal, spec.sector.clone()));
            }
        }
        report.signals = candidates.len();

        candidates.sort_by(|(a, _), (b, _)| {
            b.z_score
                .abs()
                .total_cmp(&a.z_score.abs())
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        let capacity = self.gate.remaining_capacity(open_count);
        for (signal, sector) in candidates.into_iter().take(capacity) {
            match self.execution.open_position(&signal) {
                Ok(fill) if fill.is_valid() => {
                    self.ledger.open(&signal, &sector, &fill)?;
                    report.entries.push(signal.symbol);
                }
                Ok(fill) => {
                    tracing::warn!(
                        "Entry {} returned an unusable fill (spot {}, fut {}); staying flat",
                        signal.symbol,
                        fill.spot_price,
                        fill.futures_price
                    );
                    report.rejected_entries.push(signal.symbol);
                }
                Err(e) => {
                    tracing::warn!("Entry {} rejected: {}", signal.symbol, e);
                    report.rejected_entries.push(signal.symbol);
                }
            }
        }
        Ok(())
    }

    /// Realized P&L of trades closed since the start of the current session day
    pub fn daily_pnl(&self, now: DateTime<Utc>) -> f64 {
        self.ledger.realized_pnl_since(self.gate.session().day_start(now))
    }

    pub fn portfolio_risk(&self) -> PortfolioRisk {
        PortfolioRisk::from_positions(self.ledger.positions(), self.config.portfolio_value)
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn tracker(&self) -> &BasisStatisticsTracker {
        &self.tracker
    }

    pub fn gate(&self) -> &RiskGate {
        &self.gate
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn metrics(&self) -> &StrategyMetrics {
        &self.metrics
    }

    pub fn execution(&self) -> &E {
        &self.execution
    }

    pub fn execution_mut(&mut self) -> &mut E {
        &mut self.execution
    }

    /// Statistics computed in the most recent cycle, by symbol
    pub fn current_stats(&self) -> &BTreeMap<String, BasisStats> {
        &self.current_stats
    }

    pub fn current_basis_pct(&self) -> &BTreeMap<String, f64> {
        &self.current_basis_pct
    }

    pub fn last_block(&self) -> Option<EntryBlock> {
        self.last_block
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
