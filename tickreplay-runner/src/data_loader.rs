//! Market data loading for the runner.
//!
//! Loads a price table from CSV when the config names a file, otherwise
//! generates a deterministic synthetic random walk per symbol. Synthetic data
//! is tagged as such in the run result.

use chrono::{DateTime, Datelike, Weekday};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tickreplay_core::data::{DataSource, MarketData, PriceTable, Quote};
use tickreplay_core::domain::Timestamp;

use crate::config::DataConfig;

const SECONDS_PER_DAY: i64 = 86_400;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open price file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("bad row in {path}: {source}")]
    Row {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("price file {0} contains no rows")]
    Empty(PathBuf),

    #[error("no symbols to synthesize")]
    NoSymbols,

    #[error("start timestamp {0} is out of range for synthetic data")]
    BadStart(Timestamp),
}

/// A loaded price table plus where it came from.
#[derive(Debug)]
pub struct LoadedData {
    pub table: PriceTable,
    pub source: DataSource,
    /// BLAKE3 over every quote, for fingerprinting results.
    pub dataset_hash: String,
}

impl LoadedData {
    /// Wrap a table built in code, for callers that bypass file loading.
    pub fn in_memory(table: PriceTable) -> Self {
        let dataset_hash = compute_dataset_hash(&table);
        Self {
            table,
            source: DataSource::InMemory,
            dataset_hash,
        }
    }
}

/// One row of the price CSV. Empty cells deserialize to `None`.
#[derive(Debug, Deserialize)]
struct PriceRow {
    timestamp: Timestamp,
    symbol: String,
    adj_open: Option<f64>,
    adj_high: Option<f64>,
    adj_low: Option<f64>,
    adj_close: Option<f64>,
    volume: Option<u64>,
}

/// Resolve the configured data source into a price table.
pub fn load_data(config: &DataConfig, start_time: Timestamp) -> Result<LoadedData, LoadError> {
    let (table, source) = match &config.path {
        Some(path) => (load_csv(path)?, DataSource::CsvImport),
        None => {
            tracing::warn!(
                symbols = ?config.synthetic_symbols,
                seed = config.synthetic_seed,
                "no price file configured, using synthetic data"
            );
            let table = generate_synthetic(
                &config.synthetic_symbols,
                config.synthetic_seed,
                start_time,
                config.synthetic_days,
            )?;
            (table, DataSource::Synthetic)
        }
    };
    let dataset_hash = compute_dataset_hash(&table);
    tracing::info!(
        source = ?source,
        rows = table.len(),
        timestamps = table.timestamps().len(),
        hash = %dataset_hash,
        "market data loaded"
    );
    Ok(LoadedData {
        table,
        source,
        dataset_hash,
    })
}

/// Read a price table from CSV with header
/// `timestamp,symbol,adj_open,adj_high,adj_low,adj_close,volume`.
pub fn load_csv(path: &Path) -> Result<PriceTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let table = read_rows(&mut reader, path)?;
    if table.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    Ok(table)
}

fn read_rows<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    path: &Path,
) -> Result<PriceTable, LoadError> {
    let mut table = PriceTable::new();
    for row in reader.deserialize::<PriceRow>() {
        let row = row.map_err(|source| LoadError::Row {
            path: path.to_path_buf(),
            source,
        })?;
        table.insert(
            row.timestamp,
            &row.symbol,
            Quote {
                adj_open: row.adj_open,
                adj_high: row.adj_high,
                adj_low: row.adj_low,
                adj_close: row.adj_close,
                volume: row.volume,
            },
        );
    }
    Ok(table)
}

/// Generate `days` weekday bars per symbol, starting at the first midnight
/// at or after `start_time`.
///
/// Each symbol's walk is seeded from BLAKE3 of its name and `seed`, so the
/// same inputs always produce the same table.
pub fn generate_synthetic(
    symbols: &[String],
    seed: u64,
    start_time: Timestamp,
    days: usize,
) -> Result<PriceTable, LoadError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    if symbols.is_empty() {
        return Err(LoadError::NoSymbols);
    }
    let first_day = start_time.max(0).div_euclid(SECONDS_PER_DAY)
        + i64::from(start_time.max(0).rem_euclid(SECONDS_PER_DAY) != 0);
    let mut table = PriceTable::new();

    for symbol in symbols {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(&seed.to_le_bytes());
        let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

        let mut price = 100.0_f64;
        let mut day = first_day;
        let mut generated = 0;
        while generated < days {
            let ts = day
                .checked_mul(SECONDS_PER_DAY)
                .ok_or(LoadError::BadStart(start_time))?;
            day += 1;
            let date = DateTime::from_timestamp(ts, 0).ok_or(LoadError::BadStart(start_time))?;
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64);
            table.insert(ts, symbol, Quote::ohlcv(open, high, low, close, volume));

            price = close;
            generated += 1;
        }
    }
    Ok(table)
}

/// BLAKE3 over every quote in timestamp then symbol order.
pub fn compute_dataset_hash(table: &PriceTable) -> String {
    let mut hasher = blake3::Hasher::new();
    let symbols: Vec<&str> = table.symbols().collect();

    for &ts in table.timestamps() {
        for symbol in &symbols {
            let Some(quote) = table.quote(ts, symbol) else {
                continue;
            };
            hasher.update(&ts.to_le_bytes());
            hasher.update(symbol.as_bytes());
            for value in [quote.adj_open, quote.adj_high, quote.adj_low, quote.adj_close] {
                hasher.update(&value.unwrap_or(f64::NAN).to_le_bytes());
            }
            hasher.update(&quote.volume.unwrap_or(u64::MAX).to_le_bytes());
        }
    }

    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickreplay_core::data::PriceField;

    const HEADER: &str = "timestamp,symbol,adj_open,adj_high,adj_low,adj_close,volume\n";

    fn write_csv(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        std::fs::write(&path, format!("{HEADER}{body}")).unwrap();
        (dir, path)
    }

    #[test]
    fn csv_rows_become_quotes() {
        let (_dir, path) = write_csv(
            "200,SPY,50,55,45,52,1000\n\
             100,SPY,49,51,48,50,900\n\
             100,QQQ,10,11,9,10.5,50\n",
        );
        let table = load_csv(&path).unwrap();
        assert_eq!(table.timestamps(), &[100, 200]);
        assert_eq!(table.price(200, "SPY", PriceField::AdjHigh), Some(55.0));
        assert_eq!(table.volume("QQQ", 100), Some(50));
        assert_eq!(table.symbols().collect::<Vec<_>>(), vec!["QQQ", "SPY"]);
    }

    #[test]
    fn empty_cells_are_missing() {
        let (_dir, path) = write_csv("100,SPY,50,,45,52,\n");
        let table = load_csv(&path).unwrap();
        assert_eq!(table.price(100, "SPY", PriceField::AdjOpen), Some(50.0));
        assert_eq!(table.price(100, "SPY", PriceField::AdjHigh), None);
        assert_eq!(table.volume("SPY", 100), None);
    }

    #[test]
    fn malformed_rows_are_errors() {
        let (_dir, path) = write_csv("yesterday,SPY,50,55,45,52,1000\n");
        assert!(matches!(load_csv(&path), Err(LoadError::Row { .. })));

        let (_dir, path) = write_csv("");
        assert!(matches!(load_csv(&path), Err(LoadError::Empty(_))));

        assert!(matches!(
            load_csv(Path::new("/nonexistent/prices.csv")),
            Err(LoadError::Open { .. })
        ));
    }

    #[test]
    fn synthetic_is_deterministic() {
        let symbols = vec!["SPY".to_string(), "QQQ".to_string()];
        let a = generate_synthetic(&symbols, 7, 0, 20).unwrap();
        let b = generate_synthetic(&symbols, 7, 0, 20).unwrap();
        let c = generate_synthetic(&symbols, 8, 0, 20).unwrap();
        assert_eq!(compute_dataset_hash(&a), compute_dataset_hash(&b));
        assert_ne!(compute_dataset_hash(&a), compute_dataset_hash(&c));
        assert_eq!(a.len(), 40);
        assert_eq!(a.timestamps().len(), 20);
    }

    #[test]
    fn synthetic_bars_are_consistent_weekdays() {
        let table = generate_synthetic(&["SPY".to_string()], 1, 1, 10).unwrap();
        for &ts in table.timestamps() {
            assert!(ts >= SECONDS_PER_DAY);
            assert_eq!(ts % SECONDS_PER_DAY, 0);
            let weekday = DateTime::from_timestamp(ts, 0).unwrap().weekday();
            assert!(!matches!(weekday, Weekday::Sat | Weekday::Sun));

            let q = table.quote(ts, "SPY").unwrap();
            let (o, h, l, c) = (
                q.adj_open.unwrap(),
                q.adj_high.unwrap(),
                q.adj_low.unwrap(),
                q.adj_close.unwrap(),
            );
            assert!(h >= o.max(c) && l <= o.min(c));
            assert!(q.volume.unwrap() >= 500_000);
        }
    }

    #[test]
    fn load_data_tags_source() {
        let config = DataConfig {
            path: None,
            synthetic_symbols: vec!["SPY".into()],
            synthetic_seed: 42,
            synthetic_days: 5,
        };
        let loaded = load_data(&config, 0).unwrap();
        assert_eq!(loaded.source, DataSource::Synthetic);
        assert_eq!(loaded.dataset_hash.len(), 64);

        let (_dir, path) = write_csv("100,SPY,50,55,45,52,1000\n");
        let config = DataConfig {
            path: Some(path),
            ..config
        };
        assert_eq!(load_data(&config, 0).unwrap().source, DataSource::CsvImport);
    }
}
