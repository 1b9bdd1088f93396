//! The strategy seam: one synchronous call per tick returning trade commands.

use crate::data::MarketData;
use crate::domain::{Portfolio, PositionBook, Timestamp, TradeCommand};

/// Read-only view handed to a strategy on each tick.
pub struct StrategyView<'a> {
    pub portfolio: &'a Portfolio,
    pub positions: &'a PositionBook,
    /// Current clock time.
    pub timestamp: Timestamp,
    /// Latest data timestamp at or before the clock, if any.
    pub data_timestamp: Option<Timestamp>,
    pub market: &'a dyn MarketData,
}

/// A trading strategy.
///
/// Strategies see state as of the current tick, after due orders executed.
/// Commands they return become orders that execute no earlier than the next
/// data timestamp.
pub trait Strategy {
    fn name(&self) -> &str {
        "anonymous"
    }

    fn on_tick(&mut self, view: &StrategyView<'_>) -> Vec<TradeCommand>;
}

impl<F> Strategy for F
where
    F: FnMut(&StrategyView<'_>) -> Vec<TradeCommand>,
{
    fn on_tick(&mut self, view: &StrategyView<'_>) -> Vec<TradeCommand> {
        self(view)
    }
}
