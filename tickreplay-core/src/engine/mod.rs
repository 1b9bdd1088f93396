//! Backtesting engine: clock, order log, execution, and the tick loop.

pub mod clock;
pub mod error;
pub mod execution;
pub mod loop_runner;
pub mod order_log;
pub mod state;

pub use clock::SimulationClock;
pub use error::SimError;
pub use execution::{Attempt, AttemptRecord, Books, CostModel, ExecutionEngine, Rejection};
pub use loop_runner::{RunOutcome, Simulator};
pub use order_log::{Journal, JournalError, OrderLog, OrderLogError};
pub use state::{
    CommissionSchedule, Diagnostics, EquityPoint, HaltReason, RunReport, RunStats, SimConfig,
};
