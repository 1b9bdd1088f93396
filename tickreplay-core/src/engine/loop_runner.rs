//! The tick loop.
//!
//! Each tick runs five steps:
//! 1. Execute due orders at the current data timestamp
//! 2. Ask the strategy for trade commands
//! 3. Stamp each command with the next execution timestamp and log it
//! 4. Optionally mark the portfolio to market
//! 5. Advance the clock by the interval
//!
//! The loop stops when the clock reaches the end time, catches up with
//! wall-clock now, or runs past the last data timestamp.

use crate::data::MarketData;
use crate::domain::{Order, Portfolio, PositionBook, Timestamp, TradeCommand};
use crate::engine::clock::SimulationClock;
use crate::engine::error::SimError;
use crate::engine::execution::{Attempt, Books, CostModel, ExecutionEngine};
use crate::engine::order_log::{Journal, OrderLog};
use crate::engine::state::{EquityPoint, HaltReason, RunReport, RunStats, SimConfig};
use crate::profiling::{ProfileScope, TimingSummary};
use crate::strategy::{Strategy, StrategyView};
use std::time::Instant;

fn system_now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

/// Everything a finished run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub portfolio: Portfolio,
    pub positions: PositionBook,
    pub orders: Vec<Order>,
}

/// Drives one backtest over borrowed market data.
///
/// The simulator exclusively owns the ledger, position book and order log
/// for the length of the run. Dropping it on any path, including an error
/// mid-run, releases the order journal.
pub struct Simulator<'d, D: MarketData> {
    config: SimConfig,
    data: &'d D,
    engine: ExecutionEngine,
    clock: SimulationClock,
    portfolio: Portfolio,
    positions: PositionBook,
    orders: OrderLog,
    stats: RunStats,
    equity_curve: Vec<EquityPoint>,
    tick_timing: TimingSummary,
    wall_clock: fn() -> Timestamp,
}

impl<'d, D: MarketData> Simulator<'d, D> {
    pub fn new(config: SimConfig, data: &'d D) -> Result<Self, SimError> {
        config.validate()?;
        if data.timestamps().is_empty() {
            return Err(SimError::NoData);
        }
        let clock = SimulationClock::new(data.timestamps(), config.start_time, config.interval);
        Ok(Self {
            engine: ExecutionEngine::new(CostModel::from_config(&config)),
            portfolio: Portfolio::new(config.initial_cash),
            positions: PositionBook::new(),
            orders: OrderLog::new(),
            stats: RunStats::default(),
            equity_curve: Vec::new(),
            tick_timing: TimingSummary::default(),
            wall_clock: system_now,
            clock,
            config,
            data,
        })
    }

    /// Mirror order placements and fills to a JSONL journal.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.orders = OrderLog::with_journal(journal);
        self
    }

    /// Replace the wall-clock source used for the "caught up to now" halt.
    pub fn with_wall_clock(mut self, wall_clock: fn() -> Timestamp) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    pub fn orders(&self) -> &OrderLog {
        &self.orders
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Why the loop should stop now, if it should.
    pub fn halt_reason(&self) -> Option<HaltReason> {
        let now = self.clock.now();
        if now >= self.config.end_time {
            Some(HaltReason::ReachedEnd)
        } else if now >= (self.wall_clock)() {
            Some(HaltReason::CaughtUpToNow)
        } else if !self.clock.has_future_data() {
            Some(HaltReason::DataExhausted)
        } else {
            None
        }
    }

    /// Run one full tick.
    pub fn step<S: Strategy + ?Sized>(&mut self, strategy: &mut S) -> Result<(), SimError> {
        let started = self.config.diagnostics.timers.then(Instant::now);
        let now = self.clock.now();

        self.execute_due()?;

        let commands = {
            let view = StrategyView {
                portfolio: &self.portfolio,
                positions: &self.positions,
                timestamp: now,
                data_timestamp: self.clock.current_data_timestamp(),
                market: self.data,
            };
            strategy.on_tick(&view)
        };
        self.place(commands)?;

        if self.config.diagnostics.mtm {
            self.mark_to_market();
        }
        if self.config.diagnostics.noisy {
            self.dump_state();
        }

        self.stats.ticks += 1;
        self.clock.advance();
        if let Some(started) = started {
            self.tick_timing.record(started.elapsed());
        }
        Ok(())
    }

    /// Attempt every due order against the current data timestamp.
    pub fn execute_due(&mut self) -> Result<(), SimError> {
        let now = self.clock.now();
        if let Some(exec_ts) = self.clock.current_data_timestamp() {
            let mut books = Books {
                orders: &mut self.orders,
                portfolio: &mut self.portfolio,
                positions: &mut self.positions,
            };
            let records = self.engine.execute_due(now, exec_ts, self.data, &mut books)?;
            for record in records {
                if record.capped {
                    self.stats.capped_orders += 1;
                }
                match record.outcome {
                    Attempt::Filled(_) => self.stats.fills += 1,
                    Attempt::Skipped(reason) => self.stats.record_skip(reason.kind()),
                }
            }
        }
        self.stats.expired_unfilled += self.orders.prune(now) as u64;
        Ok(())
    }

    /// Turn trade commands into orders stamped with the next execution
    /// timestamp.
    pub fn place(&mut self, commands: Vec<TradeCommand>) -> Result<(), SimError> {
        if commands.is_empty() {
            return Ok(());
        }
        let Some(exec_ts) = self.clock.execution_timestamp() else {
            tracing::debug!(
                ts = self.clock.now(),
                dropped = commands.len(),
                "no execution timestamp left, dropping commands"
            );
            return Ok(());
        };
        for command in commands {
            let id = self.orders.next_id();
            let order = command.into_order(id, exec_ts)?;
            tracing::debug!(ts = self.clock.now(), order = %order, "order placed");
            self.orders.append(order)?;
            self.stats.orders_placed += 1;
        }
        Ok(())
    }

    fn mark_to_market(&mut self) {
        let now = self.clock.now();
        let (value, unpriced) = match self.clock.current_data_timestamp() {
            Some(data_ts) => self.portfolio.mtm_value(self.data, data_ts),
            None => (
                self.portfolio.cash(),
                self.portfolio.holdings().map(|(s, _)| s.to_string()).collect(),
            ),
        };
        for symbol in unpriced {
            tracing::debug!(ts = now, symbol = %symbol, "no close for mark-to-market");
        }
        tracing::info!(ts = now, value, "| {now} {value:.2} |");
        self.equity_curve.push(EquityPoint {
            timestamp: now,
            value,
        });
    }

    fn dump_state(&self) {
        let holdings: Vec<String> = self
            .portfolio
            .holdings()
            .map(|(s, n)| format!("{s}:{n}"))
            .collect();
        tracing::debug!(
            ts = self.clock.now(),
            cash = self.portfolio.cash(),
            holdings = %holdings.join(","),
            open_orders = self.orders.open_count(),
            "tick state"
        );
    }

    /// Run until a halt condition holds, then release the order log.
    pub fn run<S: Strategy + ?Sized>(mut self, strategy: &mut S) -> Result<RunOutcome, SimError> {
        let _run = ProfileScope::new("run", self.config.diagnostics.timers);
        tracing::info!(
            strategy = strategy.name(),
            start = self.config.start_time,
            end = self.config.end_time,
            interval = self.config.interval,
            cash = self.config.initial_cash,
            "simulation started"
        );

        let halt_reason = loop {
            if let Some(reason) = self.halt_reason() {
                break reason;
            }
            self.step(strategy)?;
        };

        let final_timestamp = self.clock.now();
        tracing::info!(
            reason = %halt_reason,
            ts = final_timestamp,
            ticks = self.stats.ticks,
            fills = self.stats.fills,
            skips = self.stats.total_skips(),
            cash = self.portfolio.cash(),
            "simulation complete"
        );
        if self.config.diagnostics.timers && self.tick_timing.count > 0 {
            tracing::info!(
                ticks = self.tick_timing.count,
                mean_us = self.tick_timing.mean().as_micros() as u64,
                max_us = self.tick_timing.max.as_micros() as u64,
                "tick timings"
            );
        }

        let Self {
            portfolio,
            positions,
            orders,
            stats,
            equity_curve,
            ..
        } = self;
        Ok(RunOutcome {
            report: RunReport {
                halt_reason,
                final_timestamp,
                stats,
                equity_curve,
            },
            portfolio,
            positions,
            orders: orders.into_orders()?,
        })
    }
}
