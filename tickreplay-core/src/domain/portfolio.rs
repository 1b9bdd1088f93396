//! Portfolio ledger: cash plus a signed share count per symbol.

use super::fill::Fill;
use super::Timestamp;
use crate::data::{MarketData, PriceField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cash and net share counts.
///
/// A symbol is either long/flat (count >= 0) or short (count < 0). The
/// execution engine refuses fills that would hold both at once, and checks
/// costs against `cash` before committing anything here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    cash: f64,
    initial_cash: f64,
    shares: BTreeMap<String, i64>,
    total_commission: f64,
    total_impact: f64,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            shares: BTreeMap::new(),
            total_commission: 0.0,
            total_impact: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    /// Impact cost reported by fills. Never deducted from cash.
    pub fn total_impact(&self) -> f64 {
        self.total_impact
    }

    /// Net signed share count (0 when never traded).
    pub fn shares(&self, symbol: &str) -> i64 {
        self.shares.get(symbol).copied().unwrap_or(0)
    }

    /// All non-flat holdings.
    pub fn holdings(&self) -> impl Iterator<Item = (&str, i64)> {
        self.shares
            .iter()
            .filter(|(_, &n)| n != 0)
            .map(|(s, &n)| (s.as_str(), n))
    }

    pub fn is_short(&self, symbol: &str) -> bool {
        self.shares(symbol) < 0
    }

    /// Whether the ledger covers `signed_amount` shares.
    ///
    /// Positive amounts ask for at least that many shares long; negative
    /// amounts ask for a short at least that deep.
    pub fn has_sufficient_shares(&self, symbol: &str, signed_amount: i64) -> bool {
        let held = self.shares(symbol);
        match signed_amount.signum() {
            1 => held >= signed_amount,
            -1 => held <= signed_amount,
            _ => true,
        }
    }

    /// Apply an increasing fill (BUY or SHORT).
    pub fn apply_buy(&mut self, symbol: &str, fill: &Fill) {
        debug_assert!(
            {
                let held = self.shares(symbol);
                held == 0 || held.signum() == fill.quantity.signum()
            },
            "increasing fill on {symbol} would mix long and short exposure"
        );
        self.apply(symbol, fill);
    }

    /// Apply a decreasing fill (SELL or COVER).
    pub fn apply_sell(&mut self, symbol: &str, fill: &Fill) {
        debug_assert!(
            {
                let held = self.shares(symbol);
                let after = held + fill.quantity;
                held != 0 && (after == 0 || after.signum() == held.signum())
            },
            "decreasing fill on {symbol} would cross through flat"
        );
        self.apply(symbol, fill);
    }

    fn apply(&mut self, symbol: &str, fill: &Fill) {
        self.cash += fill.net_cash();
        self.total_commission += fill.commission;
        self.total_impact += fill.impact_cost;
        let entry = self.shares.entry(symbol.to_string()).or_insert(0);
        *entry += fill.quantity;
    }

    /// Mark-to-market value at `timestamp`: cash plus every holding at its
    /// adjusted close. Symbols without a close at that timestamp contribute
    /// nothing and are returned in the second slot.
    pub fn mtm_value(&self, data: &dyn MarketData, timestamp: Timestamp) -> (f64, Vec<String>) {
        let mut value = self.cash;
        let mut unpriced = Vec::new();
        for (symbol, shares) in self.holdings() {
            match data.price(timestamp, symbol, PriceField::AdjClose) {
                Some(close) => value += shares as f64 * close,
                None => unpriced.push(symbol.to_string()),
            }
        }
        (value, unpriced)
    }
}
