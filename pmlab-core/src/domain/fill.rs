//! Fill — a completed (possibly partial) order execution.

use super::ids::{FillId, OrderId};
use super::order::OrderSide;
use serde::{Deserialize, Serialize};

/// Record of a resting order being matched against an incoming trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub id: FillId,
    pub order_id: OrderId,
    pub market_id: String,
    pub side: OrderSide,
    pub quantity: f64,
    /// Executed price after slippage adjustment.
    pub price: f64,
    /// Equal to the triggering trade's timestamp.
    pub timestamp: i64,
}
