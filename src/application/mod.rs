pub mod strategy_cycle;
pub mod orchestrator;
pub mod summary;

pub use strategy_cycle::{StrategyCycle, CycleReport, CycleError};
pub use orchestrator::{StrategyRunner, RunnerError, RunnerStatus};
pub use summary::{PerformanceSummary, MarketState, SymbolState};
