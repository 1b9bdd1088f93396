//! Built-in strategies and the factory that builds them from config.
//!
//! | name              | behaviour                                            |
//! |-------------------|------------------------------------------------------|
//! | `noop`            | never trades                                         |
//! | `buy_and_hold`    | BUY `shares` of every symbol once                    |
//! | `round_trip`      | every `period` ticks, BUY when flat, SELL when long  |
//! | `short_and_cover` | every `period` ticks, SHORT when flat, COVER when short |
//! | `random`          | seeded random BUY/SELL commands with random kinds    |
//!
//! Every strategy trades the `symbols` param, or every symbol in the loaded
//! data when that param is absent.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tickreplay_core::data::PriceField;
use tickreplay_core::domain::{CloseMethod, OrderKind, TradeCommand, DEFAULT_ORDER_DURATION};
use tickreplay_core::{Strategy, StrategyView};

use crate::config::StrategyConfig;

/// Errors from strategy construction.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid parameter '{param}' for strategy '{strategy}': {reason}")]
    InvalidParam {
        strategy: String,
        param: String,
        reason: String,
    },

    #[error("strategy '{0}' has no symbols to trade")]
    NoSymbols(String),
}

/// Names accepted by [`create_strategy`].
pub const STRATEGY_NAMES: [&str; 5] = [
    "noop",
    "buy_and_hold",
    "round_trip",
    "short_and_cover",
    "random",
];

// ─── Param helpers ───────────────────────────────────────────────────

struct Params<'a> {
    strategy: &'a str,
    values: &'a BTreeMap<String, toml::Value>,
}

impl Params<'_> {
    fn invalid(&self, param: &str, reason: impl Into<String>) -> StrategyError {
        StrategyError::InvalidParam {
            strategy: self.strategy.to_string(),
            param: param.to_string(),
            reason: reason.into(),
        }
    }

    fn u64(&self, name: &str, default: u64) -> Result<u64, StrategyError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(toml::Value::Integer(n)) => {
                u64::try_from(*n).map_err(|_| self.invalid(name, "must be non-negative"))
            }
            Some(other) => Err(self.invalid(name, format!("expected an integer, got {other}"))),
        }
    }

    fn i64(&self, name: &str, default: i64) -> Result<i64, StrategyError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(toml::Value::Integer(n)) => Ok(*n),
            Some(other) => Err(self.invalid(name, format!("expected an integer, got {other}"))),
        }
    }

    fn f64(&self, name: &str, default: f64) -> Result<f64, StrategyError> {
        match self.values.get(name) {
            None => Ok(default),
            Some(toml::Value::Float(x)) => Ok(*x),
            Some(toml::Value::Integer(n)) => Ok(*n as f64),
            Some(other) => Err(self.invalid(name, format!("expected a number, got {other}"))),
        }
    }

    fn str(&self, name: &str) -> Result<Option<&str>, StrategyError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid(name, format!("expected a string, got {other}"))),
        }
    }

    fn symbols(&self, universe: &[String]) -> Result<Vec<String>, StrategyError> {
        let symbols = match self.values.get("symbols") {
            None => universe.to_vec(),
            Some(toml::Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid("symbols", "expected strings"))
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(self.invalid("symbols", format!("expected an array, got {other}")))
            }
        };
        if symbols.is_empty() {
            return Err(StrategyError::NoSymbols(self.strategy.to_string()));
        }
        Ok(symbols)
    }

    /// Order settings shared by the deterministic strategies.
    fn order_template(&self) -> Result<OrderTemplate, StrategyError> {
        let kind = match self.str("kind")? {
            None => OrderKind::MarketOpen,
            Some(name) => {
                let limit = self
                    .values
                    .get("limit_price")
                    .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|n| n as f64)));
                OrderKind::from_parts(name, limit).map_err(|e| self.invalid("kind", e.to_string()))?
            }
        };
        let close_method = match self.str("close_method")? {
            None => CloseMethod::default(),
            Some(name) => name
                .parse::<CloseMethod>()
                .map_err(|e| self.invalid("close_method", e.to_string()))?,
        };
        let shares = self.u64("shares", 100)?;
        if shares == 0 {
            return Err(self.invalid("shares", "must be positive"));
        }
        Ok(OrderTemplate {
            shares,
            kind,
            duration: self.i64("duration", DEFAULT_ORDER_DURATION)?,
            close_method,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct OrderTemplate {
    shares: u64,
    kind: OrderKind,
    duration: i64,
    close_method: CloseMethod,
}

impl OrderTemplate {
    fn command(&self, command: TradeCommand) -> TradeCommand {
        command
            .with_kind(self.kind)
            .with_duration(self.duration)
            .with_close_method(self.close_method)
    }
}

// ─── Factory ─────────────────────────────────────────────────────────

/// Build a strategy from its config. `universe` is the set of symbols in the
/// loaded data, used when the config names none.
pub fn create_strategy(
    config: &StrategyConfig,
    universe: &[String],
) -> Result<Box<dyn Strategy>, StrategyError> {
    let params = Params {
        strategy: &config.name,
        values: &config.params,
    };
    match config.name.as_str() {
        "noop" => Ok(Box::new(Noop)),
        "buy_and_hold" => Ok(Box::new(BuyAndHold {
            symbols: params.symbols(universe)?,
            template: params.order_template()?,
            placed: false,
        })),
        "round_trip" => Ok(Box::new(RoundTrip {
            symbols: params.symbols(universe)?,
            template: params.order_template()?,
            period: positive_period(&params)?,
            short: false,
            ticks: 0,
        })),
        "short_and_cover" => Ok(Box::new(RoundTrip {
            symbols: params.symbols(universe)?,
            template: params.order_template()?,
            period: positive_period(&params)?,
            short: true,
            ticks: 0,
        })),
        "random" => {
            let probability = params.f64("probability", 0.2)?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(params.invalid("probability", "must lie in [0, 1]"));
            }
            let max_shares = params.u64("max_shares", 100)?;
            if max_shares == 0 {
                return Err(params.invalid("max_shares", "must be positive"));
            }
            let seed = params.u64("seed", 0)?;
            Ok(Box::new(RandomTrader {
                symbols: params.symbols(universe)?,
                rng: StdRng::from_seed(*blake3::hash(&seed.to_le_bytes()).as_bytes()),
                probability,
                max_shares,
            }))
        }
        other => Err(StrategyError::UnknownStrategy(other.to_string())),
    }
}

fn positive_period(params: &Params<'_>) -> Result<u64, StrategyError> {
    let period = params.u64("period", 5)?;
    if period == 0 {
        return Err(params.invalid("period", "must be positive"));
    }
    Ok(period)
}

// ─── Strategies ──────────────────────────────────────────────────────

/// Never trades.
#[derive(Debug, Clone, Copy)]
pub struct Noop;

impl Strategy for Noop {
    fn name(&self) -> &str {
        "noop"
    }

    fn on_tick(&mut self, _view: &StrategyView<'_>) -> Vec<TradeCommand> {
        Vec::new()
    }
}

#[derive(Debug)]
struct BuyAndHold {
    symbols: Vec<String>,
    template: OrderTemplate,
    placed: bool,
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn on_tick(&mut self, _view: &StrategyView<'_>) -> Vec<TradeCommand> {
        if std::mem::replace(&mut self.placed, true) {
            return Vec::new();
        }
        self.symbols
            .iter()
            .map(|s| self.template.command(TradeCommand::buy(s, self.template.shares)))
            .collect()
    }
}

/// Opens a position when flat and closes it when held, every `period`
/// ticks. Long side trades BUY/SELL, short side SHORT/COVER.
#[derive(Debug)]
struct RoundTrip {
    symbols: Vec<String>,
    template: OrderTemplate,
    period: u64,
    short: bool,
    ticks: u64,
}

impl Strategy for RoundTrip {
    fn name(&self) -> &str {
        if self.short {
            "short_and_cover"
        } else {
            "round_trip"
        }
    }

    fn on_tick(&mut self, view: &StrategyView<'_>) -> Vec<TradeCommand> {
        let tick = self.ticks;
        self.ticks += 1;
        if tick % self.period != 0 {
            return Vec::new();
        }

        let mut commands = Vec::new();
        for symbol in &self.symbols {
            let held = view.portfolio.shares(symbol);
            let command = match (self.short, held) {
                (false, 0) => TradeCommand::buy(symbol, self.template.shares),
                (false, n) if n > 0 => TradeCommand::sell(symbol, n.unsigned_abs()),
                (true, 0) => TradeCommand::short(symbol, self.template.shares),
                (true, n) if n < 0 => TradeCommand::cover(symbol, n.unsigned_abs()),
                _ => continue,
            };
            commands.push(self.template.command(command));
        }
        commands
    }
}

/// Random BUY/SELL commands, reproducible for a given seed.
#[derive(Debug)]
struct RandomTrader {
    symbols: Vec<String>,
    rng: StdRng,
    probability: f64,
    max_shares: u64,
}

impl RandomTrader {
    fn random_kind(&mut self, view: &StrategyView<'_>, symbol: &str) -> OrderKind {
        match self.rng.gen_range(0..4) {
            0 => OrderKind::MarketOpen,
            1 => OrderKind::MarketClose,
            2 => OrderKind::Vwap,
            _ => {
                let close = view
                    .data_timestamp
                    .and_then(|ts| view.market.price(ts, symbol, PriceField::AdjClose));
                match close {
                    Some(close) if close > 0.0 => OrderKind::Limit {
                        limit_price: close * self.rng.gen_range(0.97..1.03),
                    },
                    _ => OrderKind::MarketOpen,
                }
            }
        }
    }
}

impl Strategy for RandomTrader {
    fn name(&self) -> &str {
        "random"
    }

    fn on_tick(&mut self, view: &StrategyView<'_>) -> Vec<TradeCommand> {
        let mut commands = Vec::new();
        for i in 0..self.symbols.len() {
            if !self.rng.gen_bool(self.probability) {
                continue;
            }
            let symbol = self.symbols[i].clone();
            let shares = self.rng.gen_range(1..=self.max_shares);
            let kind = self.random_kind(view, &symbol);
            let command = if self.rng.gen_bool(0.5) {
                TradeCommand::buy(symbol, shares)
            } else {
                TradeCommand::sell(symbol, shares)
            };
            commands.push(command.with_kind(kind));
        }
        commands
    }
}
