//! Market data access

pub mod provider;
pub mod table;

pub use provider::{DataSource, MarketData, PriceField, Quote};
pub use table::PriceTable;
