use super::Timestamp;
use serde::{Deserialize, Serialize};

/// Fill record, embedded in its order once populated.
///
/// `quantity` is the signed share delta for the ledger (BUY and COVER
/// positive, SELL and SHORT negative). `cash_delta` is computed from the base
/// reference price; market impact is reported in `impact_cost` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub timestamp: Timestamp,
    pub quantity: i64,
    pub price: f64,
    pub cash_delta: f64,
    pub commission: f64,
    pub impact_cost: f64,
}

impl Fill {
    /// Unsigned number of shares that changed hands.
    pub fn shares(&self) -> u64 {
        self.quantity.unsigned_abs()
    }

    /// Cash change after commission.
    pub fn net_cash(&self) -> f64 {
        self.cash_delta - self.commission
    }
}
