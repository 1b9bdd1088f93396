//! Run orchestration: wires config, market data and a strategy into the
//! simulator and collects the result.
//!
//! Two entry points:
//! - `run_from_config()`: loads data as configured, then runs. Used by the CLI.
//! - `run_with_data()`: takes a pre-loaded table. No data I/O.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tickreplay_core::data::DataSource;
use tickreplay_core::domain::{ClosedLot, Lot, Order, Timestamp};
use tickreplay_core::engine::{EquityPoint, HaltReason, Journal, JournalError, RunStats};
use tickreplay_core::{SimError, Simulator};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{load_data, LoadError, LoadedData};
use crate::strategies::{create_strategy, StrategyError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimError),
}

/// Current schema version for persisted results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: RunConfig,
    pub strategy: String,
    pub data_source: DataSource,
    pub dataset_hash: String,
    pub halt_reason: HaltReason,
    pub final_timestamp: Timestamp,
    pub stats: RunStats,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub total_commission: f64,
    pub total_impact: f64,
    /// Net signed shares per symbol, flat symbols omitted.
    pub final_shares: BTreeMap<String, i64>,
    pub open_lots: BTreeMap<String, Vec<Lot>>,
    pub closed_lots: Vec<ClosedLot>,
    pub realized_pnl: f64,
    /// Every order placed, in submission order.
    pub orders: Vec<Order>,
    /// Empty unless mark-to-market diagnostics were on.
    pub equity_curve: Vec<EquityPoint>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunResult {
    /// Orders that never received a fill.
    pub fn unfilled_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| !o.is_filled())
    }
}

/// Load data as configured and run. When `journal` is set, order events are
/// appended to that file as JSONL while the run progresses.
pub fn run_from_config(config: &RunConfig, journal: Option<&Path>) -> Result<RunResult, RunError> {
    let loaded = load_data(&config.data, config.start_time)?;
    run_with_data(config, &loaded, journal)
}

/// Run against pre-loaded data.
pub fn run_with_data(
    config: &RunConfig,
    loaded: &LoadedData,
    journal: Option<&Path>,
) -> Result<RunResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let universe: Vec<String> = loaded.table.symbols().map(str::to_string).collect();
    let mut strategy = create_strategy(&config.strategy, &universe)?;

    let mut sim = Simulator::new(config.to_sim_config(), &loaded.table)?;
    if let Some(path) = journal {
        sim = sim.with_journal(Journal::open(path)?);
    }

    tracing::info!(
        run_id = %run_id,
        strategy = strategy.name(),
        symbols = universe.len(),
        "run started"
    );
    let strategy_name = strategy.name().to_string();
    let outcome = sim.run(strategy.as_mut())?;

    let final_shares = outcome
        .portfolio
        .holdings()
        .filter(|&(_, n)| n != 0)
        .map(|(s, n)| (s.to_string(), n))
        .collect();
    let open_lots = outcome
        .positions
        .symbols()
        .map(|s| (s.to_string(), outcome.positions.lots(s).cloned().collect()))
        .collect();

    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        strategy: strategy_name,
        data_source: loaded.source,
        dataset_hash: loaded.dataset_hash.clone(),
        halt_reason: outcome.report.halt_reason,
        final_timestamp: outcome.report.final_timestamp,
        stats: outcome.report.stats,
        initial_cash: outcome.portfolio.initial_cash(),
        final_cash: outcome.portfolio.cash(),
        total_commission: outcome.portfolio.total_commission(),
        total_impact: outcome.portfolio.total_impact(),
        final_shares,
        open_lots,
        closed_lots: outcome.positions.closed().to_vec(),
        realized_pnl: outcome.positions.realized_pnl(),
        orders: outcome.orders,
        equity_curve: outcome.report.equity_curve,
    })
}
