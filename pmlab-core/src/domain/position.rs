//! Position — per-market YES/NO leg holdings.

use serde::{Deserialize, Serialize};

/// An open position in a single market. Both legs are signed quantities;
/// shorts are allowed only when the engine is configured to permit them.
/// Invariant: `quantity * avg_cost` is bounded by cumulative cash outflow
/// for that leg (enforced by [`super::portfolio::Portfolio::apply_fill`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub market_id: String,
    pub yes_qty: f64,
    pub yes_avg_cost: f64,
    pub no_qty: f64,
    pub no_avg_cost: f64,
}

impl Position {
    pub fn new(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            yes_qty: 0.0,
            yes_avg_cost: 0.0,
            no_qty: 0.0,
            no_avg_cost: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.yes_qty == 0.0 && self.no_qty == 0.0
    }

    /// Mark-to-market value using the last-seen YES price; the NO leg is
    /// valued as `1 - yes_price`.
    pub fn market_value(&self, yes_price: f64) -> f64 {
        self.yes_qty * yes_price + self.no_qty * (1.0 - yes_price)
    }

    /// Unrealized P&L relative to each leg's average cost.
    pub fn unrealized_pnl(&self, yes_price: f64) -> f64 {
        let no_price = 1.0 - yes_price;
        self.yes_qty * (yes_price - self.yes_avg_cost) + self.no_qty * (no_price - self.no_avg_cost)
    }
}
