//! tickreplay CLI: run a simulation or inspect a resolved config.
//!
//! Commands:
//! - `run`: execute a simulation from a TOML config and save artifacts
//! - `check-config`: print the resolved config and its run ID

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tickreplay_core::data::DataSource;
use tickreplay_runner::{run_from_config, save_artifacts, RunConfig, RunResult, STRATEGY_NAMES};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tickreplay", about = "tickreplay: discrete-event backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a simulation from a TOML config file.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Defaults file layered beneath the config file.
        #[arg(long)]
        defaults: Option<PathBuf>,

        /// Override `[strategy] name`.
        #[arg(long)]
        strategy: Option<String>,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Append order events to this JSONL file as they happen.
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Log every skipped fill and per-tick state.
        #[arg(long, default_value_t = false)]
        noisy: bool,
    },
    /// Print the resolved config and its run ID without running.
    CheckConfig {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Defaults file layered beneath the config file.
        #[arg(long)]
        defaults: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            defaults,
            strategy,
            output_dir,
            journal,
            noisy,
        } => run_cmd(RunArgs {
            config,
            defaults,
            strategy,
            output_dir,
            journal,
            noisy,
        }),
        Commands::CheckConfig { config, defaults } => {
            init_tracing(false);
            check_config_cmd(config, defaults)
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins; otherwise `noisy`
/// selects debug over info.
fn init_tracing(noisy: bool) {
    let default = if noisy { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

struct RunArgs {
    config: PathBuf,
    defaults: Option<PathBuf>,
    strategy: Option<String>,
    output_dir: PathBuf,
    journal: Option<PathBuf>,
    noisy: bool,
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let mut config = RunConfig::load(&args.config, args.defaults.as_deref())
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if args.noisy {
        config.diagnostics.noisy = true;
    }
    init_tracing(config.diagnostics.noisy);
    if let Some(name) = args.strategy {
        tracing::info!(from = %config.strategy.name, to = %name, "strategy overridden");
        config.strategy.name = name;
    }

    let result = run_from_config(&config, args.journal.as_deref()).with_context(|| {
        format!(
            "run of strategy '{}' failed (built-ins: {})",
            config.strategy.name,
            STRATEGY_NAMES.join(", ")
        )
    })?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, &args.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn check_config_cmd(config: PathBuf, defaults: Option<PathBuf>) -> Result<()> {
    let resolved = RunConfig::load(&config, defaults.as_deref())
        .with_context(|| format!("failed to load {}", config.display()))?;
    print!("{}", resolved.to_toml()?);
    println!();
    println!("# run_id = {}", resolved.run_id()?);
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!();
    println!("=== Run Result ===");
    println!("Run ID:         {}", result.run_id);
    println!("Strategy:       {}", result.strategy);
    println!("Data:           {} ({})", result.data_source, &result.dataset_hash[..12]);
    println!(
        "Halted:         {} at {}",
        result.halt_reason, result.final_timestamp
    );
    println!("Ticks:          {}", result.stats.ticks);
    println!();
    println!("--- Orders ---");
    println!("Placed:         {}", result.stats.orders_placed);
    println!("Filled:         {}", result.stats.fills);
    println!("Capped:         {}", result.stats.capped_orders);
    println!("Expired:        {}", result.stats.expired_unfilled);
    println!("Unfilled:       {}", result.unfilled_orders().count());
    for (reason, count) in &result.stats.skips {
        println!("Skipped ({reason}): {count}");
    }
    println!();
    println!("--- Ledger ---");
    println!("Initial Cash:   {:.2}", result.initial_cash);
    println!("Final Cash:     {:.2}", result.final_cash);
    println!("Commission:     {:.2}", result.total_commission);
    println!("Impact:         {:.2}", result.total_impact);
    println!("Realized P&L:   {:.2}", result.realized_pnl);
    for (symbol, shares) in &result.final_shares {
        println!("Holding:        {symbol} {shares}");
    }
    if let Some(last) = result.equity_curve.last() {
        println!("Final Equity:   {:.2}", last.value);
    }
    if result.data_source == DataSource::Synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
