//! Trade commands, the proposals a strategy emits on each tick.
//!
//! A command carries no timestamp: the simulator stamps it with the next
//! execution timestamp when turning it into an [`Order`].

use super::ids::OrderId;
use super::order::{CloseMethod, Direction, Order, OrderKind, OrderSpecError};
use super::Timestamp;
use serde::{Deserialize, Serialize};

/// Default validity window for commands that don't set one (one day).
pub const DEFAULT_ORDER_DURATION: i64 = 86_400;

/// A proposed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCommand {
    pub symbol: String,
    pub direction: Direction,
    pub shares: u64,
    pub kind: OrderKind,
    #[serde(default = "default_duration")]
    pub duration: i64,
    #[serde(default)]
    pub close_method: CloseMethod,
}

fn default_duration() -> i64 {
    DEFAULT_ORDER_DURATION
}

impl TradeCommand {
    pub fn new(symbol: impl Into<String>, direction: Direction, shares: u64) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            shares,
            kind: OrderKind::MarketOpen,
            duration: DEFAULT_ORDER_DURATION,
            close_method: CloseMethod::default(),
        }
    }

    pub fn buy(symbol: impl Into<String>, shares: u64) -> Self {
        Self::new(symbol, Direction::Buy, shares)
    }

    pub fn sell(symbol: impl Into<String>, shares: u64) -> Self {
        Self::new(symbol, Direction::Sell, shares)
    }

    pub fn short(symbol: impl Into<String>, shares: u64) -> Self {
        Self::new(symbol, Direction::Short, shares)
    }

    pub fn cover(symbol: impl Into<String>, shares: u64) -> Self {
        Self::new(symbol, Direction::Cover, shares)
    }

    pub fn with_kind(mut self, kind: OrderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_close_method(mut self, close_method: CloseMethod) -> Self {
        self.close_method = close_method;
        self
    }

    /// Turn the command into an unfilled order stamped at `submitted_at`.
    pub fn into_order(self, id: OrderId, submitted_at: Timestamp) -> Result<Order, OrderSpecError> {
        let order = Order {
            id,
            symbol: self.symbol,
            direction: self.direction,
            kind: self.kind,
            shares: self.shares,
            original_shares: self.shares,
            close_method: self.close_method,
            submitted_at,
            duration: self.duration,
            fill: None,
        };
        order.validate()?;
        Ok(order)
    }
}
