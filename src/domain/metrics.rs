//! Strategy Metrics
//!
//! Aggregates are rebuilt from the complete trade history on every call so
//! they can never drift from what the ledger recorded.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::position::ArbitragePosition;
use crate::domain::signal::Direction;
use crate::domain::trade::{ArbitrageTradeResult, ExitReason};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectionStats {
    pub trades: usize,
    pub wins: usize,
    /// Percentage, 0 when no trades
    pub win_rate: f64,
    pub net_pnl: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategyMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Net P&L exactly zero; neither a win nor a loss
    pub breakeven_trades: usize,
    /// Percentage of trades with positive net P&L
    pub win_rate: f64,
    pub total_gross_pnl: f64,
    pub total_net_pnl: f64,
    pub total_commission: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_pnl_per_trade: f64,
    pub avg_holding_minutes: f64,
    /// Average basis move in the position's favor, absolute units
    pub avg_basis_captured: f64,
    /// Largest peak-to-trough fall of the cumulative net P&L curve
    pub max_drawdown: f64,
    pub long_futures: DirectionStats,
    pub short_futures: DirectionStats,
    pub exits_by_reason: BTreeMap<ExitReason, usize>,
}

/// Basis move in favor of the position: narrowing for short futures, widening for long futures
pub fn basis_captured(trade: &ArbitrageTradeResult) -> f64 {
    trade.basis_change * trade.direction.futures_sign() as f64
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

impl StrategyMetrics {
    pub fn from_trades(trades: &[ArbitrageTradeResult]) -> Self {
        let mut metrics = StrategyMetrics::default();
        if trades.is_empty() {
            return metrics;
        }

        let mut cumulative = 0.0_f64;
        let mut peak = 0.0_f64;
        let mut holding_sum = 0.0;
        let mut captured_sum = 0.0;

        for trade in trades {
            metrics.total_trades += 1;
            metrics.total_gross_pnl += trade.gross_pnl;
            metrics.total_net_pnl += trade.net_pnl;
            metrics.total_commission += trade.commission;
            holding_sum += trade.holding_period;
            captured_sum += basis_captured(trade);

            if trade.is_win() {
                metrics.winning_trades += 1;
                metrics.gross_profit += trade.net_pnl;
            } else if trade.net_pnl < 0.0 {
                metrics.losing_trades += 1;
                metrics.gross_loss += trade.net_pnl;
            } else {
                metrics.breakeven_trades += 1;
            }

            let side = match trade.direction {
                Direction::LongFuturesShortSpot => &mut metrics.long_futures,
                Direction::ShortFuturesLongSpot => &mut metrics.short_futures,
            };
            side.trades += 1;
            side.net_pnl += trade.net_pnl;
            if trade.is_win() {
                side.wins += 1;
            }

            *metrics.exits_by_reason.entry(trade.exit_reason).or_insert(0) += 1;

            cumulative += trade.net_pnl;
            peak = peak.max(cumulative);
            metrics.max_drawdown = metrics.max_drawdown.max(peak - cumulative);
        }

        let n = metrics.total_trades as f64;
        metrics.win_rate = pct(metrics.winning_trades, metrics.total_trades);
        metrics.avg_pnl_per_trade = metrics.total_net_pnl / n;
        metrics.avg_holding_minutes = holding_sum / n;
        metrics.avg_basis_captured = captured_sum / n;
        metrics.long_futures.win_rate = pct(metrics.long_futures.wins, metrics.long_futures.trades);
        metrics.short_futures.win_rate = pct(metrics.short_futures.wins, metrics.short_futures.trades);

        metrics
    }

    pub fn exits_for(&self, reason: ExitReason) -> usize {
        self.exits_by_reason.get(&reason).copied().unwrap_or(0)
    }
}

/// Capital at work across open positions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioRisk {
    pub open_positions: usize,
    /// Sum of both legs' entry notional
    pub capital_deployed: f64,
    pub capital_usage_pct: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pct: f64,
    pub avg_capital_per_position: f64,
}

impl PortfolioRisk {
    pub fn from_positions<'a>(
        positions: impl IntoIterator<Item = &'a ArbitragePosition>,
        portfolio_value: f64,
    ) -> Self {
        let mut risk = PortfolioRisk::default();
        for position in positions {
            risk.open_positions += 1;
            risk.capital_deployed += position.entry_notional();
            risk.unrealized_pnl += position.unrealized_pnl;
        }

        if portfolio_value > 0.0 {
            risk.capital_usage_pct = risk.capital_deployed / portfolio_value * 100.0;
        }
        if risk.capital_deployed > 0.0 {
            risk.unrealized_pct = risk.unrealized_pnl / risk.capital_deployed * 100.0;
        }
        if risk.open_positions > 0 {
            risk.avg_capital_per_position = risk.capital_deployed / risk.open_positions as f64;
        }
        risk
    }
}
