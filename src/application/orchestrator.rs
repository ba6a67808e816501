//! Strategy Runner
//!
//! Drives the strategy cycle on a fixed interval. Reads the latest snapshots
//! from the market data port, runs one cycle, and logs a periodic summary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::application::strategy_cycle::{CycleError, CycleReport, StrategyCycle};
use crate::application::summary::PerformanceSummary;
use crate::ports::execution::ExecutionPort;
use crate::ports::market_data::MarketDataPort;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Cycle failed: {0}")]
    Cycle(#[from] CycleError),
}

/// Status snapshot of the runner
#[derive(Debug, Clone)]
pub struct RunnerStatus {
    pub is_running: bool,
    pub cycles: u64,
    pub open_positions: usize,
    pub total_trades: usize,
    pub daily_pnl: f64,
    pub entries_blocked: Option<String>,
}

pub struct StrategyRunner<E: ExecutionPort> {
    cycle: Arc<RwLock<StrategyCycle<E>>>,
    market_data: Arc<dyn MarketDataPort>,
    is_running: Arc<RwLock<bool>>,
    tick_interval: Duration,
    summary_every: u64,
}

impl<E: ExecutionPort + Send + Sync> StrategyRunner<E> {
    pub fn new(cycle: StrategyCycle<E>, market_data: Arc<dyn MarketDataPort>) -> Self {
        Self {
            cycle: Arc::new(RwLock::new(cycle)),
            market_data,
            is_running: Arc::new(RwLock::new(false)),
            tick_interval: Duration::from_secs(5),
            summary_every: 60,
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Log a performance summary every `cycles` cycles (0 disables)
    pub fn with_summary_every(mut self, cycles: u64) -> Self {
        self.summary_every = cycles;
        self
    }

    /// Run until stopped. A ledger invariant violation ends the loop with an error.
    pub async fn run(&self) -> Result<(), RunnerError> {
        *self.is_running.write().await = true;

        tracing::info!(
            "Starting strategy runner - tick interval: {:?}",
            self.tick_interval
        );

        while *self.is_running.read().await {
            if let Err(e) = self.tick(Utc::now()).await {
                tracing::error!("Stopping: {}", e);
                *self.is_running.write().await = false;
                self.summary(Utc::now()).await.log();
                return Err(e);
            }
            tokio::time::sleep(self.tick_interval).await;
        }

        self.summary(Utc::now()).await.log();
        tracing::info!("Strategy runner stopped");
        Ok(())
    }

    /// Execute one cycle against the latest snapshots.
    ///
    /// A disconnected feed still gets a cycle with no quotes so square-off and
    /// expiry exits are attempted on the last marks.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<CycleReport, RunnerError> {
        let snapshots = if self.market_data.is_connected() {
            self.market_data.latest_snapshots()
        } else {
            tracing::warn!("Market data disconnected, running mandatory exits only");
            Vec::new()
        };
        let mut cycle = self.cycle.write().await;
        let report = cycle.run_cycle(&snapshots, now)?;

        if !report.exits.is_empty() || !report.entries.is_empty() {
            tracing::info!(
                "Cycle {}: {} exit(s), {} entr(ies), {} open",
                cycle.cycles(),
                report.exits.len(),
                report.entries.len(),
                cycle.ledger().open_count()
            );
        }

        if self.summary_every > 0 && cycle.cycles() % self.summary_every == 0 {
            PerformanceSummary::capture(&cycle, now).log();
        }
        Ok(report)
    }

    /// Stop the loop after the current cycle
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        tracing::info!("Stop signal sent to strategy runner");
    }

    pub async fn summary(&self, now: DateTime<Utc>) -> PerformanceSummary {
        let cycle = self.cycle.read().await;
        PerformanceSummary::capture(&cycle, now)
    }

    pub async fn status(&self) -> RunnerStatus {
        let cycle = self.cycle.read().await;
        let now = Utc::now();
        RunnerStatus {
            is_running: *self.is_running.read().await,
            cycles: cycle.cycles(),
            open_positions: cycle.ledger().open_count(),
            total_trades: cycle.metrics().total_trades,
            daily_pnl: cycle.daily_pnl(now),
            entries_blocked: cycle.last_block().map(|b| b.to_string()),
        }
    }
}

// Clones share the cycle and the running flag
impl<E: ExecutionPort> Clone for StrategyRunner<E> {
    fn clone(&self) -> Self {
        Self {
            cycle: Arc::clone(&self.cycle),
            market_data: Arc::clone(&self.market_data),
            is_running: Arc::clone(&self.is_running),
            tick_interval: self.tick_interval,
            summary_every: self.summary_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::market_data::SnapshotBuffer;
    use crate::adapters::paper::PaperExecution;
    use crate::domain::instrument::{InstrumentSpec, Universe};
    use crate::domain::market::MarketSnapshot;
    use crate::domain::session::MarketSession;
    use crate::strategy::params::StrategyConfig;
    use crate::domain::trade::ExitReason;
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    fn axis_snapshot(basis_pct: f64, at: DateTime<Utc>) -> MarketSnapshot {
        MarketSnapshot::new("AXISBANK", 1000.0, 1000.0 * (1.0 + basis_pct / 100.0), 9_000, 6_000, 15, at).unwrap()
    }

    fn create_test_runner(buffer: SnapshotBuffer) -> StrategyRunner<PaperExecution> {
        let universe = Universe::new(vec![InstrumentSpec {
            symbol: "AXISBANK".to_string(),
            lot_size: 625,
            sector: "BANKING".to_string(),
            expiry: NaiveDate::from_ymd_opt(2026, 10, 29).unwrap(),
        }])
        .unwrap();
        let cycle = StrategyCycle::new(
            StrategyConfig::default(),
            MarketSession::default(),
            universe,
            PaperExecution::new(),
        )
        .unwrap();
        StrategyRunner::new(cycle, Arc::new(buffer)).with_tick_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_runner_creation() {
        let runner = create_test_runner(SnapshotBuffer::new());
        let status = runner.status().await;

        assert!(!status.is_running);
        assert_eq!(status.cycles, 0);
        assert_eq!(status.open_positions, 0);
    }

    #[tokio::test]
    async fn test_tick_reads_buffer() {
        let buffer = SnapshotBuffer::new();
        let runner = create_test_runner(buffer.clone());
        buffer.publish(MarketSnapshot::new("AXISBANK", 1100.0, 1103.0, 9_000, 6_000, 15, Utc::now()).unwrap());

        let report = runner.tick(Utc::now()).await.unwrap();
        assert_eq!(report.snapshots_processed, 1);
        assert_eq!(runner.status().await.cycles, 1);
    }

    #[tokio::test]
    async fn test_stop_graceful() {
        let runner = create_test_runner(SnapshotBuffer::new());
        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        runner.stop().await;
        let result = handle.await.unwrap();

        assert!(result.is_ok());
        assert!(!runner.status().await.is_running);
        assert!(runner.status().await.cycles >= 1);
    }

    #[tokio::test]
    async fn test_disconnected_feed_still_runs_cycles() {
        let buffer = SnapshotBuffer::new();
        buffer.set_connected(false);
        let runner = create_test_runner(buffer);
        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run().await })
        };

        tokio::time::sleep(Duration::from_millis(40)).await;
        runner.stop().await;
        handle.await.unwrap().unwrap();
        assert!(runner.status().await.cycles >= 1);
    }

    #[tokio::test]
    async fn test_disconnected_feed_squares_off_open_positions() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let mut at = ist.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap().with_timezone(&Utc);

        let buffer = SnapshotBuffer::new();
        let runner = create_test_runner(buffer.clone());
        for i in 0..50 {
            let basis = if i % 2 == 0 { 0.05 } else { 0.15 };
            buffer.publish(axis_snapshot(basis, at));
            runner.tick(at).await.unwrap();
            at += chrono::Duration::seconds(5);
        }
        buffer.publish(axis_snapshot(0.25, at));
        let report = runner.tick(at).await.unwrap();
        assert_eq!(report.entries, vec!["AXISBANK".to_string()]);

        buffer.set_connected(false);
        let late = ist.with_ymd_and_hms(2026, 10, 14, 15, 20, 0).unwrap().with_timezone(&Utc);
        let report = runner.tick(late).await.unwrap();

        assert_eq!(report.snapshots_processed, 0);
        assert_eq!(report.exits, vec![("AXISBANK".to_string(), ExitReason::SquareOff)]);
        assert_eq!(runner.status().await.open_positions, 0);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let runner1 = create_test_runner(SnapshotBuffer::new());
        let runner2 = runner1.clone();
        runner1.tick(Utc::now()).await.unwrap();
        assert_eq!(runner2.status().await.cycles, 1);
    }
}
