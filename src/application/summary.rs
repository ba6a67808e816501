//! Performance Summary
//!
//! Read-only projection of the engine state for logs and JSON output.

use chrono::{DateTime, Utc};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::application::strategy_cycle::StrategyCycle;
use crate::domain::metrics::{PortfolioRisk, StrategyMetrics};
use crate::domain::signal::Direction;
use crate::ports::execution::ExecutionPort;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolState {
    pub symbol: String,
    pub basis_pct: f64,
    pub z_score: f64,
    pub has_sufficient_data: bool,
    pub data_points: usize,
    pub position: Option<Direction>,
    pub unrealized_pnl: f64,
}

/// Cross-symbol view of the basis and the portfolio limits
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketState {
    pub symbols_tracked: usize,
    pub avg_basis_pct: f64,
    pub basis_pct_std: f64,
    pub max_positions_reached: bool,
    pub daily_loss_limit_hit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub timestamp: DateTime<Utc>,
    pub cycles: u64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_pnl: f64,
    pub daily_pnl: f64,
    pub active_positions: usize,
    pub max_positions: usize,
    pub win_rate: f64,
    pub entries_blocked: Option<String>,
    pub metrics: StrategyMetrics,
    pub portfolio: PortfolioRisk,
    pub market: MarketState,
    pub symbols: Vec<SymbolState>,
}

impl PerformanceSummary {
    pub fn capture<E: ExecutionPort>(cycle: &StrategyCycle<E>, now: DateTime<Utc>) -> Self {
        let ledger = cycle.ledger();
        let gate = cycle.gate();
        let daily_pnl = cycle.daily_pnl(now);
        let realized_pnl = ledger.total_realized_pnl();
        let unrealized_pnl = ledger.total_unrealized_pnl();

        let symbols: Vec<SymbolState> = cycle
            .current_stats()
            .iter()
            .map(|(symbol, stats)| {
                let position = ledger.get(symbol);
                SymbolState {
                    symbol: symbol.clone(),
                    basis_pct: cycle.current_basis_pct().get(symbol).copied().unwrap_or(0.0),
                    z_score: stats.z_score,
                    has_sufficient_data: stats.has_sufficient_data,
                    data_points: stats.data_points,
                    position: position.map(|p| p.direction),
                    unrealized_pnl: position.map_or(0.0, |p| p.unrealized_pnl),
                }
            })
            .collect();

        let basis: Vec<f64> = cycle.current_basis_pct().values().copied().collect();
        let (avg_basis_pct, basis_pct_std) = if basis.is_empty() {
            (0.0, 0.0)
        } else {
            (Statistics::mean(basis.iter()), Statistics::population_std_dev(basis.iter()))
        };

        let metrics = cycle.metrics().clone();
        Self {
            timestamp: now,
            cycles: cycle.cycles(),
            realized_pnl,
            unrealized_pnl,
            total_pnl: realized_pnl + unrealized_pnl,
            daily_pnl,
            active_positions: ledger.open_count(),
            max_positions: gate.max_positions(),
            win_rate: metrics.win_rate,
            entries_blocked: cycle.last_block().map(|b| b.to_string()),
            metrics,
            portfolio: cycle.portfolio_risk(),
            market: MarketState {
                symbols_tracked: basis.len(),
                avg_basis_pct,
                basis_pct_std,
                max_positions_reached: gate.max_positions_reached(ledger.open_count()),
                daily_loss_limit_hit: gate.daily_loss_limit_hit(daily_pnl),
            },
            symbols,
        }
    }

    pub fn log(&self) {
        tracing::info!("=== Performance Summary (cycle {}) ===", self.cycles);
        tracing::info!(
            "P&L: total {:.2} | realized {:.2} | unrealized {:.2} | today {:.2}",
            self.total_pnl,
            self.realized_pnl,
            self.unrealized_pnl,
            self.daily_pnl
        );
        tracing::info!(
            "Positions: {}/{} | Trades: {} | Win rate: {:.1}% | Max DD: {:.2}",
            self.active_positions,
            self.max_positions,
            self.metrics.total_trades,
            self.win_rate,
            self.metrics.max_drawdown
        );
        if let Some(block) = &self.entries_blocked {
            tracing::info!("Entries blocked: {}", block);
        }
        for state in &self.symbols {
            tracing::info!(
                "  {:<12} basis {:>7.3}% | z {:>6.2} | {}",
                state.symbol,
                state.basis_pct,
                state.z_score,
                state.position.map_or_else(|| "FLAT".to_string(), |d| d.to_string())
            );
        }
    }
}
