//! Domain types for tickreplay

pub mod command;
pub mod fill;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod position;

pub use command::{TradeCommand, DEFAULT_ORDER_DURATION};
pub use fill::Fill;
pub use ids::{IdGen, OrderId};
pub use order::{CloseMethod, Direction, Order, OrderKind, OrderSpecError};
pub use portfolio::Portfolio;
pub use position::{ClosedLot, Lot, PositionBook, PositionError};

/// Simulation time: integer seconds on the data's own epoch.
pub type Timestamp = i64;
