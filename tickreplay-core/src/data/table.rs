//! In-memory price table keyed by (timestamp, symbol).

use super::provider::{MarketData, PriceField, Quote};
use crate::domain::Timestamp;
use std::collections::{BTreeSet, HashMap};

/// Daily quotes for any number of symbols.
///
/// Lookups are exact-match on timestamp; there is no forward fill. The
/// timestamp index is kept sorted and deduplicated on every insert.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    quotes: HashMap<(Timestamp, String), Quote>,
    timestamps: Vec<Timestamp>,
    symbols: BTreeSet<String>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the quote for `symbol` at `timestamp`.
    pub fn insert(&mut self, timestamp: Timestamp, symbol: &str, quote: Quote) {
        if let Err(pos) = self.timestamps.binary_search(&timestamp) {
            self.timestamps.insert(pos, timestamp);
        }
        self.symbols.insert(symbol.to_string());
        self.quotes.insert((timestamp, symbol.to_string()), quote);
    }

    pub fn quote(&self, timestamp: Timestamp, symbol: &str) -> Option<&Quote> {
        self.quotes.get(&(timestamp, symbol.to_string()))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl MarketData for PriceTable {
    fn price(&self, timestamp: Timestamp, symbol: &str, field: PriceField) -> Option<f64> {
        self.quote(timestamp, symbol).and_then(|q| q.field(field))
    }

    fn volume(&self, symbol: &str, timestamp: Timestamp) -> Option<u64> {
        self.quote(timestamp, symbol).and_then(|q| q.volume)
    }

    fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }
}
