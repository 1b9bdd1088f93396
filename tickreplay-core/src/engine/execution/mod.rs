//! Execution engine: prices due orders and commits their fills.
//!
//! The execution engine is stateless apart from its cost model. It borrows
//! the order log, ledger and position book for the duration of a scan and
//! either commits a fill to all three or leaves them untouched. The single
//! exception is the volume-cap rewrite, which persists even when the attempt
//! is then rejected.

pub mod cost_model;
pub mod fill_price;
pub mod liquidity;

pub use cost_model::CostModel;
pub use fill_price::{reference_price, PriceUnavailable};
pub use liquidity::VolumeCap;

use crate::data::{MarketData, PriceField};
use crate::domain::{Direction, Fill, OrderId, Portfolio, PositionBook, Timestamp};
use crate::engine::error::SimError;
use crate::engine::order_log::{OrderLog, OrderLogError};
use thiserror::Error;

/// Why a fill attempt was skipped. The order stays pending.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("no {0} available")]
    MissingPrice(PriceField),

    #[error("no volume available")]
    MissingVolume,

    #[error("zero traded volume")]
    ZeroVolume,

    #[error("limit {limit} outside day range [{low}, {high}]")]
    LimitOutOfRange { limit: f64, low: f64, high: f64 },

    #[error("order requests no shares")]
    NoShares,

    #[error("holding {held} shares conflicts with {direction}")]
    ConflictingPosition { direction: Direction, held: i64 },

    #[error("need {required} shares, hold {held}")]
    InsufficientShares { required: i64, held: i64 },

    #[error("need {required:.2} cash, have {available:.2}")]
    InsufficientCash { required: f64, available: f64 },
}

impl Rejection {
    /// Stable label for run counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::MissingPrice(_) | Rejection::MissingVolume | Rejection::ZeroVolume => {
                "data_unavailable"
            }
            Rejection::LimitOutOfRange { .. } => "limit_out_of_range",
            Rejection::NoShares => "no_shares",
            Rejection::ConflictingPosition { .. } => "conflicting_position",
            Rejection::InsufficientShares { .. } => "insufficient_shares",
            Rejection::InsufficientCash { .. } => "insufficient_cash",
        }
    }
}

impl From<PriceUnavailable> for Rejection {
    fn from(e: PriceUnavailable) -> Self {
        match e {
            PriceUnavailable::Missing(field) => Rejection::MissingPrice(field),
            PriceUnavailable::LimitOutOfRange { limit, low, high } => {
                Rejection::LimitOutOfRange { limit, low, high }
            }
        }
    }
}

/// Outcome of one fill attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Filled(Fill),
    Skipped(Rejection),
}

/// Per-order result of a due-order scan.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub order_id: OrderId,
    pub symbol: String,
    pub capped: bool,
    pub outcome: Attempt,
}

/// Mutable state a scan reads and commits to.
pub struct Books<'a> {
    pub orders: &'a mut OrderLog,
    pub portfolio: &'a mut Portfolio,
    pub positions: &'a mut PositionBook,
}

/// The execution engine.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    cost: CostModel,
}

impl ExecutionEngine {
    pub fn new(cost: CostModel) -> Self {
        Self { cost }
    }

    /// Attempt every order due at `now`, in submission order.
    ///
    /// Fills are priced at `exec_ts`, the latest data timestamp at or before
    /// `now`. A rejected order never stops the scan; later orders see the
    /// state left by earlier fills in the same scan.
    pub fn execute_due(
        &self,
        now: Timestamp,
        exec_ts: Timestamp,
        data: &dyn MarketData,
        books: &mut Books<'_>,
    ) -> Result<Vec<AttemptRecord>, SimError> {
        let due = books.orders.due_ids(now);
        let mut records = Vec::with_capacity(due.len());
        for id in due {
            let record = self.attempt(id, exec_ts, data, books)?;
            match &record.outcome {
                Attempt::Filled(fill) => tracing::debug!(
                    ts = exec_ts,
                    symbol = %record.symbol,
                    order = %id,
                    shares = fill.quantity,
                    price = fill.price,
                    "order filled"
                ),
                Attempt::Skipped(reason) => tracing::debug!(
                    ts = exec_ts,
                    symbol = %record.symbol,
                    order = %id,
                    reason = %reason,
                    "fill skipped"
                ),
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Attempt to fill a single order at `exec_ts`.
    ///
    /// Checks run in this order: requested shares, long/short conflict,
    /// reference price, volume (with the cap written back), share
    /// sufficiency for decreasing trades, then cash. Purchases (BUY, SHORT,
    /// COVER) must afford price, impact and commission; a SELL only needs its
    /// proceeds to cover the commission. Nothing but the cap is
    /// mutated unless every check passes.
    pub fn attempt(
        &self,
        id: OrderId,
        exec_ts: Timestamp,
        data: &dyn MarketData,
        books: &mut Books<'_>,
    ) -> Result<AttemptRecord, SimError> {
        let order = books
            .orders
            .get(id)
            .ok_or(OrderLogError::OrderNotFound(id))?
            .clone();
        order.validate()?;

        let mut record = AttemptRecord {
            order_id: id,
            symbol: order.symbol.clone(),
            capped: false,
            outcome: Attempt::Skipped(Rejection::NoShares),
        };

        if order.shares == 0 {
            return Ok(record);
        }

        let held = books.portfolio.shares(&order.symbol);
        let conflict = match order.direction {
            Direction::Buy => held < 0,
            Direction::Short => held > 0,
            Direction::Sell | Direction::Cover => false,
        };
        if conflict {
            record.outcome = Attempt::Skipped(Rejection::ConflictingPosition {
                direction: order.direction,
                held,
            });
            return Ok(record);
        }

        let price = match reference_price(data, exec_ts, &order.symbol, &order.kind) {
            Ok(p) => p,
            Err(e) => {
                record.outcome = Attempt::Skipped(e.into());
                return Ok(record);
            }
        };

        let volume = match data.volume(&order.symbol, exec_ts) {
            Some(0) => {
                record.outcome = Attempt::Skipped(Rejection::ZeroVolume);
                return Ok(record);
            }
            Some(v) => v,
            None => {
                record.outcome = Attempt::Skipped(Rejection::MissingVolume);
                return Ok(record);
            }
        };

        let cap = liquidity::constrain(order.shares, volume);
        if cap.capped {
            books.orders.cap_shares(id, cap.shares)?;
            record.capped = true;
        }
        let filled = cap.shares;
        let quantity = order.direction.signed_shares(filled);

        if !order.direction.is_increasing()
            && !books.portfolio.has_sufficient_shares(&order.symbol, -quantity)
        {
            record.outcome = Attempt::Skipped(Rejection::InsufficientShares {
                required: -quantity,
                held,
            });
            return Ok(record);
        }

        let commission = self.cost.commission(filled);
        // A sale only needs its proceeds to cover the commission.
        let required = match order.direction {
            Direction::Sell => commission - filled as f64 * price,
            _ => self.cost.affordability_cost(filled, price, volume),
        };
        let available = books.portfolio.cash();
        if required > available {
            record.outcome = Attempt::Skipped(Rejection::InsufficientCash {
                required,
                available,
            });
            return Ok(record);
        }

        let fill = Fill {
            timestamp: exec_ts,
            quantity,
            price,
            cash_delta: -(quantity as f64) * price,
            commission,
            impact_cost: self.cost.impact_cost(filled, price, volume),
        };

        if order.direction.is_increasing() {
            books
                .positions
                .open_lot(&order.symbol, quantity, price, exec_ts)?;
            books.orders.record_fill(id, fill.clone())?;
            books.portfolio.apply_buy(&order.symbol, &fill);
        } else {
            books.positions.close_lots(
                &order.symbol,
                filled,
                order.close_method,
                price,
                exec_ts,
            )?;
            books.orders.record_fill(id, fill.clone())?;
            books.portfolio.apply_sell(&order.symbol, &fill);
        }

        record.outcome = Attempt::Filled(fill);
        Ok(record)
    }
}
