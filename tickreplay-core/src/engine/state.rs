//! Simulation configuration and run report types.

use crate::domain::Timestamp;
use crate::engine::error::SimError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Commission schedule: per-share rate with a floor per filled order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CommissionSchedule {
    pub per_share: f64,
    pub minimum: f64,
}

/// Diagnostics toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Per-tick state dump and per-skip reasons.
    pub noisy: bool,
    /// Per-tick and whole-run timings.
    pub timers: bool,
    /// Mark-to-market report on every tick.
    pub mtm: bool,
}

/// Immutable configuration for one simulation, built once before the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub initial_cash: f64,
    pub commission: CommissionSchedule,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Clock advance per tick, in seconds.
    pub interval: i64,
    /// Impact fraction charged for consuming a full day's volume.
    pub max_market_effect: f64,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl SimConfig {
    pub fn new(initial_cash: f64, start_time: Timestamp, end_time: Timestamp, interval: i64) -> Self {
        Self {
            initial_cash,
            commission: CommissionSchedule::default(),
            start_time,
            end_time,
            interval,
            max_market_effect: 0.0,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_commission(mut self, per_share: f64, minimum: f64) -> Self {
        self.commission = CommissionSchedule { per_share, minimum };
        self
    }

    pub fn with_max_market_effect(mut self, max_market_effect: f64) -> Self {
        self.max_market_effect = max_market_effect;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let non_negative = [
            ("initial_cash", self.initial_cash),
            ("commission.per_share", self.commission.per_share),
            ("commission.minimum", self.commission.minimum),
            ("max_market_effect", self.max_market_effect),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.interval <= 0 {
            return Err(SimError::InvalidConfig(format!(
                "interval must be positive, got {}",
                self.interval
            )));
        }
        if self.end_time <= self.start_time {
            return Err(SimError::InvalidConfig(format!(
                "end_time {} must be after start_time {}",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}

/// Why the tick loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// The clock reached the configured end time.
    ReachedEnd,
    /// The clock caught up with wall-clock now.
    CaughtUpToNow,
    /// No data timestamp remains after the clock.
    DataExhausted,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::ReachedEnd => f.write_str("reached end time"),
            HaltReason::CaughtUpToNow => f.write_str("caught up to wall-clock now"),
            HaltReason::DataExhausted => f.write_str("market data exhausted"),
        }
    }
}

/// Mark-to-market value at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub ticks: u64,
    pub orders_placed: u64,
    pub fills: u64,
    pub capped_orders: u64,
    pub expired_unfilled: u64,
    /// Skipped fill attempts keyed by rejection kind.
    pub skips: BTreeMap<String, u64>,
}

impl RunStats {
    pub fn record_skip(&mut self, kind: &str) {
        *self.skips.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn total_skips(&self) -> u64 {
        self.skips.values().sum()
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub halt_reason: HaltReason,
    /// Clock time when the loop stopped.
    pub final_timestamp: Timestamp,
    pub stats: RunStats,
    /// Populated only when the `mtm` toggle is on.
    pub equity_curve: Vec<EquityPoint>,
}
