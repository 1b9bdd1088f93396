//! Lot-level position tracking.
//!
//! Every increasing fill opens a lot; decreasing fills consume lots from the
//! back (LIFO) or the front (FIFO) of the symbol's queue. Lots carry signed
//! quantities, so a short position is a queue of negative lots.

use super::order::CloseMethod;
use super::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("cannot close {requested} shares of {symbol}: only {open} open")]
    InsufficientLots {
        symbol: String,
        requested: u64,
        open: u64,
    },

    #[error("cannot open a zero-quantity lot for {0}")]
    EmptyLot(String),

    #[error("lot of {quantity} for {symbol} would mix long and short lots")]
    MixedSides { symbol: String, quantity: i64 },
}

/// One opened tranche of a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub quantity: i64,
    pub entry_price: f64,
    pub opened_at: Timestamp,
}

/// A lot (or part of one) consumed by a decreasing trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedLot {
    pub symbol: String,
    /// Signed quantity of the consumed lot portion.
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub opened_at: Timestamp,
    pub closed_at: Timestamp,
}

impl ClosedLot {
    /// Gross realized P&L, signed for the side of the lot.
    pub fn realized_pnl(&self) -> f64 {
        self.quantity as f64 * (self.exit_price - self.entry_price)
    }
}

/// Open lots per symbol plus the history of closed lots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    open: BTreeMap<String, VecDeque<Lot>>,
    closed: Vec<ClosedLot>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a lot. `quantity` is signed: positive for BUY, negative for SHORT.
    pub fn open_lot(
        &mut self,
        symbol: &str,
        quantity: i64,
        price: f64,
        timestamp: Timestamp,
    ) -> Result<(), PositionError> {
        if quantity == 0 {
            return Err(PositionError::EmptyLot(symbol.to_string()));
        }
        let net = self.net_quantity(symbol);
        if net != 0 && net.signum() != quantity.signum() {
            return Err(PositionError::MixedSides {
                symbol: symbol.to_string(),
                quantity,
            });
        }
        self.open.entry(symbol.to_string()).or_default().push_back(Lot {
            quantity,
            entry_price: price,
            opened_at: timestamp,
        });
        Ok(())
    }

    /// Close `shares` shares of `symbol`, consuming lots in `method` order.
    ///
    /// Partially consumed lots keep their remainder in place. Nothing is
    /// mutated when the open lots don't cover `shares`.
    pub fn close_lots(
        &mut self,
        symbol: &str,
        shares: u64,
        method: CloseMethod,
        exit_price: f64,
        timestamp: Timestamp,
    ) -> Result<Vec<ClosedLot>, PositionError> {
        let open = self.net_quantity(symbol).unsigned_abs();
        if shares > open {
            return Err(PositionError::InsufficientLots {
                symbol: symbol.to_string(),
                requested: shares,
                open,
            });
        }
        let Some(lots) = self.open.get_mut(symbol) else {
            return Ok(Vec::new());
        };

        let mut remaining = shares;
        let mut consumed = Vec::new();
        while remaining > 0 {
            let lot = match method {
                CloseMethod::Lifo => lots.back_mut(),
                CloseMethod::Fifo => lots.front_mut(),
            };
            let Some(lot) = lot else { break };

            let size = lot.quantity.unsigned_abs();
            let take = remaining.min(size);
            let signed_take = lot.quantity.signum() * take as i64;
            consumed.push(ClosedLot {
                symbol: symbol.to_string(),
                quantity: signed_take,
                entry_price: lot.entry_price,
                exit_price,
                opened_at: lot.opened_at,
                closed_at: timestamp,
            });
            remaining -= take;

            if take == size {
                match method {
                    CloseMethod::Lifo => lots.pop_back(),
                    CloseMethod::Fifo => lots.pop_front(),
                };
            } else {
                lot.quantity -= signed_take;
            }
        }

        if lots.is_empty() {
            self.open.remove(symbol);
        }
        self.closed.extend(consumed.iter().cloned());
        Ok(consumed)
    }

    /// Sum of open lot quantities for `symbol`.
    pub fn net_quantity(&self, symbol: &str) -> i64 {
        self.open
            .get(symbol)
            .map(|lots| lots.iter().map(|l| l.quantity).sum())
            .unwrap_or(0)
    }

    pub fn lots(&self, symbol: &str) -> impl Iterator<Item = &Lot> {
        self.open.get(symbol).into_iter().flatten()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.open.keys().map(String::as_str)
    }

    pub fn closed(&self) -> &[ClosedLot] {
        &self.closed
    }

    pub fn realized_pnl(&self) -> f64 {
        self.closed.iter().map(ClosedLot::realized_pnl).sum()
    }

    pub fn is_flat(&self) -> bool {
        self.open.is_empty()
    }
}
