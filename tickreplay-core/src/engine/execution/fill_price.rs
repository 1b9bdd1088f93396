//! Reference price by order kind.

use crate::data::{MarketData, PriceField};
use crate::domain::{OrderKind, Timestamp};

/// Why no reference price could be established.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceUnavailable {
    /// A price field needed by the kind is missing.
    Missing(PriceField),
    /// The limit price lies outside the day's [low, high] band.
    LimitOutOfRange { limit: f64, low: f64, high: f64 },
}

/// Price an order of `kind` for `symbol` at `timestamp`.
///
/// - market-open: adjusted open
/// - market-close: adjusted close
/// - limit: the limit itself, if within [adjusted low, adjusted high]
/// - vwap: mean of adjusted open, close, high and low
pub fn reference_price(
    data: &dyn MarketData,
    timestamp: Timestamp,
    symbol: &str,
    kind: &OrderKind,
) -> Result<f64, PriceUnavailable> {
    let field = |f: PriceField| {
        data.price(timestamp, symbol, f)
            .ok_or(PriceUnavailable::Missing(f))
    };

    match *kind {
        OrderKind::MarketOpen => field(PriceField::AdjOpen),
        OrderKind::MarketClose => field(PriceField::AdjClose),
        OrderKind::Limit { limit_price } => {
            let low = field(PriceField::AdjLow)?;
            let high = field(PriceField::AdjHigh)?;
            if limit_price < low || limit_price > high {
                return Err(PriceUnavailable::LimitOutOfRange {
                    limit: limit_price,
                    low,
                    high,
                });
            }
            Ok(limit_price)
        }
        OrderKind::Vwap => {
            let mut sum = 0.0;
            for f in PriceField::ALL {
                sum += field(f)?;
            }
            Ok(sum / 4.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PriceTable, Quote};

    fn table() -> PriceTable {
        let mut t = PriceTable::new();
        t.insert(10, "SPY", Quote::ohlcv(100.0, 110.0, 90.0, 104.0, 1_000));
        t
    }

    #[test]
    fn market_kinds_read_open_and_close() {
        let t = table();
        assert_eq!(reference_price(&t, 10, "SPY", &OrderKind::MarketOpen), Ok(100.0));
        assert_eq!(reference_price(&t, 10, "SPY", &OrderKind::MarketClose), Ok(104.0));
    }

    #[test]
    fn vwap_is_mean_of_four_fields() {
        let t = table();
        assert_eq!(reference_price(&t, 10, "SPY", &OrderKind::Vwap), Ok(101.0));
    }

    #[test]
    fn limit_inside_band_fills_at_limit() {
        let t = table();
        let kind = OrderKind::Limit { limit_price: 95.0 };
        assert_eq!(reference_price(&t, 10, "SPY", &kind), Ok(95.0));
        // Band edges are inclusive.
        let kind = OrderKind::Limit { limit_price: 110.0 };
        assert_eq!(reference_price(&t, 10, "SPY", &kind), Ok(110.0));
    }

    #[test]
    fn limit_outside_band_is_rejected() {
        let t = table();
        let kind = OrderKind::Limit { limit_price: 111.0 };
        assert!(matches!(
            reference_price(&t, 10, "SPY", &kind),
            Err(PriceUnavailable::LimitOutOfRange { .. })
        ));
    }

    #[test]
    fn missing_data_is_reported() {
        let mut t = table();
        t.insert(20, "SPY", Quote { adj_open: Some(1.0), ..Quote::default() });
        assert_eq!(
            reference_price(&t, 20, "SPY", &OrderKind::Vwap),
            Err(PriceUnavailable::Missing(PriceField::AdjHigh))
        );
        assert_eq!(
            reference_price(&t, 20, "IBM", &OrderKind::MarketOpen),
            Err(PriceUnavailable::Missing(PriceField::AdjOpen))
        );
    }
}
