//! Market data trait and the daily quote record.
//!
//! The MarketData trait abstracts over where prices live (CSV import,
//! synthetic generation, an in-memory fixture) so the engine can be driven
//! by any of them and mocked in tests.

use crate::domain::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Adjusted price fields available per symbol and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    AdjOpen,
    AdjHigh,
    AdjLow,
    AdjClose,
}

impl PriceField {
    pub const ALL: [PriceField; 4] = [
        PriceField::AdjOpen,
        PriceField::AdjHigh,
        PriceField::AdjLow,
        PriceField::AdjClose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriceField::AdjOpen => "adj_open",
            PriceField::AdjHigh => "adj_high",
            PriceField::AdjLow => "adj_low",
            PriceField::AdjClose => "adj_close",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One symbol's adjusted prices and volume at one timestamp.
///
/// Any field may be missing; NaN is treated the same as missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub adj_open: Option<f64>,
    pub adj_high: Option<f64>,
    pub adj_low: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<u64>,
}

impl Quote {
    pub fn ohlcv(open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            adj_open: Some(open),
            adj_high: Some(high),
            adj_low: Some(low),
            adj_close: Some(close),
            volume: Some(volume),
        }
    }

    pub fn field(&self, field: PriceField) -> Option<f64> {
        let value = match field {
            PriceField::AdjOpen => self.adj_open,
            PriceField::AdjHigh => self.adj_high,
            PriceField::AdjLow => self.adj_low,
            PriceField::AdjClose => self.adj_close,
        };
        value.filter(|v| v.is_finite())
    }
}

/// Read-only market data consumed by the simulator.
pub trait MarketData {
    /// Adjusted price for `symbol` at exactly `timestamp`.
    fn price(&self, timestamp: Timestamp, symbol: &str, field: PriceField) -> Option<f64>;

    /// Traded volume for `symbol` on the day stamped `timestamp`.
    fn volume(&self, symbol: &str, timestamp: Timestamp) -> Option<u64>;

    /// Every known data timestamp, sorted ascending without duplicates.
    fn timestamps(&self) -> &[Timestamp];
}

/// Where a price table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    CsvImport,
    Synthetic,
    InMemory,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::CsvImport => f.write_str("csv"),
            DataSource::Synthetic => f.write_str("synthetic"),
            DataSource::InMemory => f.write_str("in-memory"),
        }
    }
}
