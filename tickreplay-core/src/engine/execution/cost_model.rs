//! Cost model: commission schedule and market impact.
//!
//! Commission is a per-share rate with a floor. Impact is a fractional price
//! distortion proportional to the share of the day's volume a fill consumes,
//! scaled by a ceiling. Impact gates affordability but is never settled in
//! cash.

use crate::engine::state::SimConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    /// Commission per share traded.
    pub per_share: f64,
    /// Floor applied to every filled order's commission.
    pub minimum: f64,
    /// Impact fraction charged when a fill consumes the entire day's volume.
    pub max_market_effect: f64,
}

impl CostModel {
    pub fn new(per_share: f64, minimum: f64, max_market_effect: f64) -> Self {
        Self {
            per_share,
            minimum,
            max_market_effect,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(
            config.commission.per_share,
            config.commission.minimum,
            config.max_market_effect,
        )
    }

    /// `max(minimum, shares * per_share)`
    pub fn commission(&self, shares: u64) -> f64 {
        (shares as f64 * self.per_share).max(self.minimum)
    }

    /// Impact fraction: `(shares / volume) * max_market_effect`.
    ///
    /// Zero volume never reaches this point (the engine skips the attempt),
    /// but it returns the full ceiling rather than dividing by zero.
    pub fn impact(&self, shares: u64, volume: u64) -> f64 {
        if volume == 0 {
            return self.max_market_effect;
        }
        shares as f64 / volume as f64 * self.max_market_effect
    }

    /// Dollar impact for `shares` at `price`.
    pub fn impact_cost(&self, shares: u64, price: f64, volume: u64) -> f64 {
        shares as f64 * price * self.impact(shares, volume)
    }

    /// Cash required before a purchase may proceed:
    /// `shares*price + shares*price*impact + commission`.
    pub fn affordability_cost(&self, shares: u64, price: f64, volume: u64) -> f64 {
        shares as f64 * price + self.impact_cost(shares, price, volume) + self.commission(shares)
    }
}
