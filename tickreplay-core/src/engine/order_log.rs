//! Order log: append-only registry of every order placed during a run.
//!
//! Orders are never removed. The only in-place mutations are the volume-cap
//! rewrite of requested shares and the one-time attachment of a fill. An
//! optional JSONL journal mirrors placements and fills to disk and is flushed
//! when the log is closed or dropped.

use crate::domain::{Fill, IdGen, Order, OrderId, Timestamp};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("journal serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum OrderLogError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} is already filled")]
    AlreadyFilled(OrderId),

    #[error("order {0} was appended out of submission order")]
    OutOfOrder(OrderId),

    #[error("volume cap for order {id} would grow it from {current} to {requested} shares")]
    CapIncrease {
        id: OrderId,
        current: u64,
        requested: u64,
    },

    #[error(transparent)]
    Journal(#[from] JournalError),
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JournalEntry<'a> {
    Placed { order: &'a Order },
    Capped { id: OrderId, shares: u64 },
    Filled { id: OrderId, fill: &'a Fill },
}

/// JSONL writer for order events.
pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Journal {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| JournalError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, entry: &JournalEntry<'_>) -> Result<(), JournalError> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer
            .write_all(b"\n")
            .map_err(|source| JournalError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn flush(&mut self) -> Result<(), JournalError> {
        self.writer.flush().map_err(|source| JournalError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "failed to flush order journal");
        }
    }
}

/// Orders in submission order, plus the set still worth scanning.
#[derive(Default)]
pub struct OrderLog {
    orders: Vec<Order>,
    index: HashMap<OrderId, usize>,
    /// Positions in `orders` that are neither filled nor known expired.
    open: Vec<usize>,
    ids: IdGen,
    journal: Option<Journal>,
}

impl OrderLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Reserve the next order ID.
    pub fn next_id(&mut self) -> OrderId {
        self.ids.next_order_id()
    }

    /// Append an order. Submission timestamps must not decrease.
    pub fn append(&mut self, order: Order) -> Result<OrderId, OrderLogError> {
        let id = order.id;
        if self.index.contains_key(&id) {
            return Err(OrderLogError::OutOfOrder(id));
        }
        if let Some(last) = self.orders.last() {
            if order.submitted_at < last.submitted_at {
                return Err(OrderLogError::OutOfOrder(id));
            }
        }
        if let Some(journal) = self.journal.as_mut() {
            journal.write(&JournalEntry::Placed { order: &order })?;
        }
        let pos = self.orders.len();
        if !order.is_filled() {
            self.open.push(pos);
        }
        self.index.insert(id, pos);
        self.orders.push(order);
        Ok(id)
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.index.get(&id).map(|&i| &self.orders[i])
    }

    /// All orders in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// IDs of orders due at `now`, in submission order.
    pub fn due_ids(&self, now: Timestamp) -> Vec<OrderId> {
        self.open
            .iter()
            .map(|&i| &self.orders[i])
            .filter(|o| o.is_due(now))
            .map(|o| o.id)
            .collect()
    }

    /// Drop filled and expired orders from the scan set.
    ///
    /// Returns how many orders expired unfilled since the last prune.
    pub fn prune(&mut self, now: Timestamp) -> usize {
        let orders = &self.orders;
        let mut expired = 0;
        self.open.retain(|&i| {
            let o = &orders[i];
            if o.is_filled() {
                false
            } else if o.is_expired(now) {
                expired += 1;
                false
            } else {
                true
            }
        });
        expired
    }

    /// Pending orders still in the scan set.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Shrink an order's requested shares to the volume cap.
    pub fn cap_shares(&mut self, id: OrderId, shares: u64) -> Result<(), OrderLogError> {
        let order = self.order_mut(id)?;
        if order.is_filled() {
            return Err(OrderLogError::AlreadyFilled(id));
        }
        if shares > order.shares {
            return Err(OrderLogError::CapIncrease {
                id,
                current: order.shares,
                requested: shares,
            });
        }
        order.shares = shares;
        if let Some(journal) = self.journal.as_mut() {
            journal.write(&JournalEntry::Capped { id, shares })?;
        }
        Ok(())
    }

    /// Attach a fill. An order is filled at most once.
    pub fn record_fill(&mut self, id: OrderId, fill: Fill) -> Result<(), OrderLogError> {
        let i = self.position(id)?;
        if self.orders[i].is_filled() {
            return Err(OrderLogError::AlreadyFilled(id));
        }
        if let Some(journal) = self.journal.as_mut() {
            journal.write(&JournalEntry::Filled { id, fill: &fill })?;
        }
        self.orders[i].fill = Some(fill);
        Ok(())
    }

    /// Flush and release the journal. Called on every exit path of a run;
    /// dropping the log has the same effect minus error reporting.
    pub fn close(&mut self) -> Result<(), OrderLogError> {
        if let Some(mut journal) = self.journal.take() {
            journal.flush()?;
        }
        Ok(())
    }

    /// Consume the log, returning every order in submission order.
    pub fn into_orders(mut self) -> Result<Vec<Order>, OrderLogError> {
        self.close()?;
        Ok(self.orders)
    }

    fn position(&self, id: OrderId) -> Result<usize, OrderLogError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(OrderLogError::OrderNotFound(id))
    }

    fn order_mut(&mut self, id: OrderId) -> Result<&mut Order, OrderLogError> {
        let i = self.position(id)?;
        Ok(&mut self.orders[i])
    }
}

impl std::fmt::Debug for OrderLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLog")
            .field("orders", &self.orders.len())
            .field("open", &self.open.len())
            .field("journal", &self.journal.as_ref().map(Journal::path))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TradeCommand;

    fn place(log: &mut OrderLog, submitted_at: Timestamp, duration: i64) -> OrderId {
        let id = log.next_id();
        let order = TradeCommand::buy("SPY", 10)
            .with_duration(duration)
            .into_order(id, submitted_at)
            .unwrap();
        log.append(order).unwrap()
    }

    fn fill(ts: Timestamp) -> Fill {
        Fill {
            timestamp: ts,
            quantity: 10,
            price: 1.0,
            cash_delta: -10.0,
            commission: 0.0,
            impact_cost: 0.0,
        }
    }

    #[test]
    fn iterates_in_submission_order() {
        let mut log = OrderLog::new();
        let a = place(&mut log, 100, 10);
        let b = place(&mut log, 100, 10);
        let c = place(&mut log, 200, 10);
        let ids: Vec<_> = log.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn rejects_out_of_order_append() {
        let mut log = OrderLog::new();
        place(&mut log, 200, 10);
        let id = log.next_id();
        let late = TradeCommand::buy("SPY", 1).into_order(id, 100).unwrap();
        assert!(matches!(log.append(late), Err(OrderLogError::OutOfOrder(_))));
    }

    #[test]
    fn fill_recorded_once() {
        let mut log = OrderLog::new();
        let id = place(&mut log, 100, 10);
        log.record_fill(id, fill(101)).unwrap();
        assert!(matches!(
            log.record_fill(id, fill(102)),
            Err(OrderLogError::AlreadyFilled(_))
        ));
        assert_eq!(log.get(id).unwrap().fill.as_ref().unwrap().timestamp, 101);
    }

    #[test]
    fn due_and_prune() {
        let mut log = OrderLog::new();
        let a = place(&mut log, 100, 10);
        let b = place(&mut log, 100, 100);
        assert!(log.due_ids(100).is_empty());
        assert_eq!(log.due_ids(105), vec![a, b]);

        log.record_fill(b, fill(105)).unwrap();
        assert_eq!(log.prune(120), 1); // a expired unfilled
        assert_eq!(log.open_count(), 0);
        assert!(log.due_ids(120).is_empty());
    }

    #[test]
    fn cap_only_shrinks() {
        let mut log = OrderLog::new();
        let id = place(&mut log, 100, 10);
        log.cap_shares(id, 4).unwrap();
        assert_eq!(log.get(id).unwrap().shares, 4);
        assert_eq!(log.get(id).unwrap().original_shares, 10);
        assert!(matches!(
            log.cap_shares(id, 8),
            Err(OrderLogError::CapIncrease { .. })
        ));
    }

    #[test]
    fn journal_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.jsonl");
        {
            let mut log = OrderLog::with_journal(Journal::open(&path).unwrap());
            let id = place(&mut log, 100, 10);
            log.record_fill(id, fill(101)).unwrap();
            log.close().unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "placed");
        assert_eq!(lines[1]["event"], "filled");
        assert_eq!(lines[1]["fill"]["timestamp"], 101);
    }

    #[test]
    fn journal_flushed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.jsonl");
        {
            let mut log = OrderLog::with_journal(Journal::open(&path).unwrap());
            place(&mut log, 100, 10);
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
