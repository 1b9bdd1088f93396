//! Order types: direction, kind, lot-close method, and the order record.
//!
//! An order is created once from a strategy's trade command, then mutated at
//! most twice by the execution engine: the volume cap may shrink its requested
//! shares, and a successful fill attaches a [`Fill`]. Orders are never deleted.

use super::fill::Fill;
use super::ids::OrderId;
use super::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors for orders the engine cannot execute.
///
/// These are configuration-level mistakes (a strategy emitting an unknown
/// kind, a limit order without a usable price) and terminate the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderSpecError {
    #[error("unknown direction '{0}' (expected buy, sell, short or cover)")]
    UnknownDirection(String),

    #[error("unknown order kind '{0}' (expected moo, moc, limit or vwap)")]
    UnknownKind(String),

    #[error("unknown close method '{0}' (expected lifo or fifo)")]
    UnknownCloseMethod(String),

    #[error("limit order requires a finite positive limit price, got {0}")]
    InvalidLimitPrice(f64),

    #[error("limit order for {0} is missing its limit price")]
    MissingLimitPrice(String),

    #[error("order duration must be non-negative, got {0}")]
    NegativeDuration(i64),
}

/// What the order asks the broker to do.
///
/// Four tasks map onto two physical operations: BUY and SHORT increase
/// exposure, SELL and COVER decrease it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "BUY")]
    Buy,
    #[serde(alias = "SELL")]
    Sell,
    #[serde(alias = "SHORT")]
    Short,
    #[serde(alias = "COVER")]
    Cover,
}

impl Direction {
    /// BUY and SHORT open or extend a position.
    pub fn is_increasing(self) -> bool {
        matches!(self, Direction::Buy | Direction::Short)
    }

    /// Signed share delta applied to the ledger for `shares` filled.
    ///
    /// BUY +n, SHORT -n, SELL -n, COVER +n.
    pub fn signed_shares(self, shares: u64) -> i64 {
        let n = i64::try_from(shares).unwrap_or(i64::MAX);
        match self {
            Direction::Buy | Direction::Cover => n,
            Direction::Sell | Direction::Short => -n,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Short => "SHORT",
            Direction::Cover => "COVER",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = OrderSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            "short" => Ok(Direction::Short),
            "cover" => Ok(Direction::Cover),
            _ => Err(OrderSpecError::UnknownDirection(s.to_string())),
        }
    }
}

/// How the execution price is determined. The limit price lives only on the
/// variant that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderKind {
    /// Adjusted open of the execution day.
    #[serde(alias = "moo")]
    MarketOpen,
    /// Adjusted close of the execution day.
    #[serde(alias = "moc")]
    MarketClose,
    /// The limit price itself, provided it lies within the day's low/high.
    Limit { limit_price: f64 },
    /// Mean of adjusted open, close, high and low.
    Vwap,
}

impl OrderKind {
    /// Build a kind from its short name and an optional limit price.
    ///
    /// Accepts `moo`, `moc`, `limit`, `vwap` and the long snake-case names.
    pub fn from_parts(name: &str, limit_price: Option<f64>) -> Result<Self, OrderSpecError> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "moo" | "market_open" | "market-open" => OrderKind::MarketOpen,
            "moc" | "market_close" | "market-close" => OrderKind::MarketClose,
            "vwap" => OrderKind::Vwap,
            "limit" => {
                let price = limit_price
                    .ok_or_else(|| OrderSpecError::MissingLimitPrice(name.to_string()))?;
                OrderKind::Limit { limit_price: price }
            }
            _ => return Err(OrderSpecError::UnknownKind(name.to_string())),
        };
        kind.validate()?;
        Ok(kind)
    }

    /// Reject kind-specific parameters the engine cannot price.
    pub fn validate(&self) -> Result<(), OrderSpecError> {
        match *self {
            OrderKind::Limit { limit_price } if !(limit_price.is_finite() && limit_price > 0.0) => {
                Err(OrderSpecError::InvalidLimitPrice(limit_price))
            }
            _ => Ok(()),
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            OrderKind::MarketOpen => "moo",
            OrderKind::MarketClose => "moc",
            OrderKind::Limit { .. } => "limit",
            OrderKind::Vwap => "vwap",
        }
    }

    pub fn limit_price(&self) -> Option<f64> {
        match *self {
            OrderKind::Limit { limit_price } => Some(limit_price),
            _ => None,
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Limit { limit_price } => write!(f, "limit@{limit_price:.4}"),
            other => f.write_str(other.short_name()),
        }
    }
}

/// Which open lots a decreasing trade consumes first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseMethod {
    /// Most recently opened lot first.
    #[default]
    #[serde(alias = "LIFO")]
    Lifo,
    /// Oldest lot first.
    #[serde(alias = "FIFO")]
    Fifo,
}

impl fmt::Display for CloseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseMethod::Lifo => f.write_str("LIFO"),
            CloseMethod::Fifo => f.write_str("FIFO"),
        }
    }
}

impl FromStr for CloseMethod {
    type Err = OrderSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lifo" => Ok(CloseMethod::Lifo),
            "fifo" => Ok(CloseMethod::Fifo),
            _ => Err(OrderSpecError::UnknownCloseMethod(s.to_string())),
        }
    }
}

/// A single order in the order log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub kind: OrderKind,
    /// Requested shares. Reduced in place when the day's volume caps a fill
    /// attempt; the reduced value is what later attempts see.
    pub shares: u64,
    /// Shares as originally requested, never rewritten.
    pub original_shares: u64,
    pub close_method: CloseMethod,
    /// The execution timestamp stamped at submission.
    pub submitted_at: Timestamp,
    /// Validity window in seconds after `submitted_at`.
    pub duration: i64,
    pub fill: Option<Fill>,
}

impl Order {
    /// Last clock time at which this order may still execute.
    pub fn expires_at(&self) -> Timestamp {
        self.submitted_at.saturating_add(self.duration)
    }

    pub fn is_filled(&self) -> bool {
        self.fill.is_some()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at() < now
    }

    /// Due for execution: submitted strictly before `now`, not yet expired,
    /// not yet filled.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.submitted_at < now && !self.is_expired(now) && !self.is_filled()
    }

    /// Validate the kind-specific and lifetime fields.
    pub fn validate(&self) -> Result<(), OrderSpecError> {
        self.kind.validate()?;
        if self.duration < 0 {
            return Err(OrderSpecError::NegativeDuration(self.duration));
        }
        Ok(())
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} as {} ({}), placed {} valid until {}",
            self.id,
            self.direction,
            self.shares,
            self.symbol,
            self.kind,
            self.close_method,
            self.submitted_at,
            self.expires_at()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(submitted_at: Timestamp, duration: i64) -> Order {
        Order {
            id: OrderId(1),
            symbol: "SPY".into(),
            direction: Direction::Buy,
            kind: OrderKind::MarketOpen,
            shares: 100,
            original_shares: 100,
            close_method: CloseMethod::Lifo,
            submitted_at,
            duration,
            fill: None,
        }
    }

    #[test]
    fn due_window_is_half_open_on_submission() {
        let o = order(100, 50);
        assert!(!o.is_due(100)); // not strictly after submission
        assert!(o.is_due(101));
        assert!(o.is_due(150)); // expiry bound is inclusive
        assert!(!o.is_due(151));
        assert!(o.is_expired(151));
    }

    #[test]
    fn filled_order_is_never_due() {
        let mut o = order(100, 50);
        o.fill = Some(Fill {
            timestamp: 100,
            quantity: 100,
            price: 10.0,
            cash_delta: -1000.0,
            commission: 0.0,
            impact_cost: 0.0,
        });
        assert!(!o.is_due(120));
    }

    #[test]
    fn direction_signs() {
        assert_eq!(Direction::Buy.signed_shares(5), 5);
        assert_eq!(Direction::Short.signed_shares(5), -5);
        assert_eq!(Direction::Sell.signed_shares(5), -5);
        assert_eq!(Direction::Cover.signed_shares(5), 5);
        assert!(Direction::Buy.is_increasing());
        assert!(Direction::Short.is_increasing());
        assert!(!Direction::Sell.is_increasing());
        assert!(!Direction::Cover.is_increasing());
    }

    #[test]
    fn parse_names_case_insensitively() {
        assert_eq!("BUY".parse::<Direction>().unwrap(), Direction::Buy);
        assert_eq!(" cover ".parse::<Direction>().unwrap(), Direction::Cover);
        assert_eq!("Fifo".parse::<CloseMethod>().unwrap(), CloseMethod::Fifo);
        assert!(matches!(
            "hold".parse::<Direction>(),
            Err(OrderSpecError::UnknownDirection(_))
        ));
    }

    #[test]
    fn kind_from_parts() {
        assert_eq!(OrderKind::from_parts("moo", None).unwrap(), OrderKind::MarketOpen);
        assert_eq!(OrderKind::from_parts("MOC", None).unwrap(), OrderKind::MarketClose);
        assert_eq!(OrderKind::from_parts("vwap", Some(3.0)).unwrap(), OrderKind::Vwap);
        assert_eq!(
            OrderKind::from_parts("limit", Some(12.5)).unwrap(),
            OrderKind::Limit { limit_price: 12.5 }
        );
        assert!(matches!(
            OrderKind::from_parts("limit", None),
            Err(OrderSpecError::MissingLimitPrice(_))
        ));
        assert!(matches!(
            OrderKind::from_parts("limit", Some(f64::NAN)),
            Err(OrderSpecError::InvalidLimitPrice(_))
        ));
        assert!(matches!(
            OrderKind::from_parts("stop", None),
            Err(OrderSpecError::UnknownKind(_))
        ));
    }

    #[test]
    fn negative_duration_is_invalid() {
        let o = order(100, -1);
        assert_eq!(o.validate(), Err(OrderSpecError::NegativeDuration(-1)));
    }

    #[test]
    fn order_serialization_roundtrip() {
        let mut o = order(100, 50);
        o.kind = OrderKind::Limit { limit_price: 101.5 };
        o.close_method = CloseMethod::Fifo;
        let json = serde_json::to_string(&o).unwrap();
        let deser: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(o, deser);
    }
}
