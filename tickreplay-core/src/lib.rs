//! tickreplay core: order model, execution engine, simulation clock and tick loop.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (orders, fills, trade commands, ledger, lot book)
//! - Market data trait and an in-memory price table
//! - Execution engine: reference prices, volume cap, impact and commission
//! - Order log with optional JSONL journal
//! - Forward-only simulation clock and the tick loop

pub mod data;
pub mod domain;
pub mod engine;
pub mod profiling;
pub mod strategy;

pub use engine::{HaltReason, RunOutcome, SimConfig, SimError, Simulator};
pub use strategy::{Strategy, StrategyView};
