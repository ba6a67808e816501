//! Paper Execution Adapter
//!
//! Fills both legs instantly at the prices the engine saw. Nothing leaves
//! the process.

mod paper_execution;

pub use paper_execution::{PaperExecution, PaperOrder, OrderKind};
