//! Fatal engine errors. Per-order skips are not errors; see `Rejection`.

use crate::domain::{OrderSpecError, PositionError};
use crate::engine::order_log::{JournalError, OrderLogError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unsupported order: {0}")]
    UnsupportedOrder(#[from] OrderSpecError),

    #[error("order log error: {0}")]
    OrderLog(#[from] OrderLogError),

    #[error("position book out of step with ledger: {0}")]
    Position(#[from] PositionError),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("market data has no timestamps")]
    NoData,
}
