//! tickreplay runner: everything around a single simulation.
//!
//! This crate builds on `tickreplay-core` to provide:
//! - Layered TOML configuration with a content-addressed run ID
//! - CSV price loading with a deterministic synthetic fallback
//! - Built-in strategies selected by name
//! - JSON and CSV result export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod strategies;

pub use config::{ConfigError, RunConfig, RunId};
pub use data_loader::{load_csv, load_data, LoadError, LoadedData};
pub use export::{load_artifacts, save_artifacts};
pub use runner::{run_from_config, run_with_data, RunError, RunResult, SCHEMA_VERSION};
pub use strategies::{create_strategy, StrategyError, STRATEGY_NAMES};
