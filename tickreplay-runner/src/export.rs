//! Result export: JSON and CSV artifacts.
//!
//! - **JSON**: the full `RunResult`, schema-versioned. Unknown versions are
//!   rejected on load.
//! - **CSV**: the order log and the equity curve for external tools.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tickreplay_core::domain::Order;
use tickreplay_core::engine::EquityPoint;

use crate::runner::{RunResult, SCHEMA_VERSION};

pub const RESULT_FILE: &str = "result.json";
pub const ORDERS_FILE: &str = "orders.csv";
pub const EQUITY_FILE: &str = "equity.csv";

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult`, rejecting schema versions newer than ours.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per order, fill columns empty when unfilled.
///
/// Columns: id, symbol, direction, kind, limit_price, shares,
/// original_shares, close_method, submitted_at, duration, fill_timestamp,
/// fill_quantity, fill_price, cash_delta, commission, impact_cost
pub fn export_orders_csv(orders: &[Order]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "id",
        "symbol",
        "direction",
        "kind",
        "limit_price",
        "shares",
        "original_shares",
        "close_method",
        "submitted_at",
        "duration",
        "fill_timestamp",
        "fill_quantity",
        "fill_price",
        "cash_delta",
        "commission",
        "impact_cost",
    ])?;

    for o in orders {
        let fill = o.fill.as_ref();
        wtr.write_record([
            o.id.to_string(),
            o.symbol.clone(),
            o.direction.to_string(),
            o.kind.short_name().to_string(),
            o.kind
                .limit_price()
                .map(|p| format!("{p:.6}"))
                .unwrap_or_default(),
            o.shares.to_string(),
            o.original_shares.to_string(),
            o.close_method.to_string(),
            o.submitted_at.to_string(),
            o.duration.to_string(),
            fill.map(|f| f.timestamp.to_string()).unwrap_or_default(),
            fill.map(|f| f.quantity.to_string()).unwrap_or_default(),
            fill.map(|f| format!("{:.6}", f.price)).unwrap_or_default(),
            fill.map(|f| format!("{:.2}", f.cash_delta)).unwrap_or_default(),
            fill.map(|f| format!("{:.2}", f.commission)).unwrap_or_default(),
            fill.map(|f| format!("{:.2}", f.impact_cost)).unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "value"])?;
    for point in equity_curve {
        wtr.write_record([point.timestamp.to_string(), format!("{:.2}", point.value)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `result.json`, `orders.csv` and `equity.csv` into
/// `{output_dir}/{run_id prefix}_{local time}/` and return that directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        &result.run_id[..12.min(result.run_id.len())],
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write_file(&run_dir.join(RESULT_FILE), &export_json(result)?)?;
    write_file(&run_dir.join(ORDERS_FILE), &export_orders_csv(&result.orders)?)?;
    write_file(&run_dir.join(EQUITY_FILE), &export_equity_csv(&result.equity_curve)?)?;

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a `RunResult` from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<RunResult> {
    let path = dir.join(RESULT_FILE);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickreplay_core::domain::{Fill, OrderId, OrderKind, TradeCommand};

    fn orders() -> Vec<Order> {
        let mut filled = TradeCommand::buy("SPY", 10)
            .into_order(OrderId(1), 100)
            .unwrap();
        filled.shares = 5;
        filled.fill = Some(Fill {
            timestamp: 200,
            quantity: 5,
            price: 50.0,
            cash_delta: -250.0,
            commission: 1.0,
            impact_cost: 0.0,
        });
        let pending = TradeCommand::sell("QQQ", 3)
            .with_kind(OrderKind::Limit { limit_price: 12.5 })
            .into_order(OrderId(2), 100)
            .unwrap();
        vec![filled, pending]
    }

    #[test]
    fn orders_csv_has_fill_columns() {
        let csv = export_orders_csv(&orders()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,symbol,direction,kind"));
        let filled: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(filled[1], "SPY");
        assert_eq!(filled[2], "BUY");
        assert_eq!(&filled[5..7], &["5", "10"]);
        assert_eq!(filled[10], "200");
        let pending: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(pending[3], "limit");
        assert_eq!(pending[4], "12.500000");
        assert!(pending[10..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn equity_csv_rows() {
        let curve = vec![
            EquityPoint {
                timestamp: 1,
                value: 100.0,
            },
            EquityPoint {
                timestamp: 2,
                value: 101.256,
            },
        ];
        let csv = export_equity_csv(&curve).unwrap();
        assert_eq!(csv, "timestamp,value\n1,100.00\n2,101.26\n");
    }
}
