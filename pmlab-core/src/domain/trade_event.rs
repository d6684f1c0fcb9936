//! The `TradeEvent` value type: one print from the historical tape.

use serde::{Deserialize, Serialize};

/// Which side of the spread the aggressor crossed.
///
/// `TakerBoughtYes` means a YES-buyer lifted an ask; `TakerBoughtNo` means a
/// NO-buyer (equivalently YES-seller) hit a bid. Flattening this into an
/// unsigned trade is incorrect by contract — the broker's matching rule
/// depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TakerSide {
    TakerBoughtYes,
    TakerBoughtNo,
}

/// A single observed trade print for a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub market_id: String,
    /// Monotone integer timestamp (consistent resolution across a run).
    pub timestamp: i64,
    /// Trade price in (0,1) for the YES leg.
    pub price: f64,
    /// Trade size, always positive.
    pub size: f64,
    pub taker_side: TakerSide,
}

impl TradeEvent {
    pub fn new(
        market_id: impl Into<String>,
        timestamp: i64,
        price: f64,
        size: f64,
        taker_side: TakerSide,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            timestamp,
            price,
            size,
            taker_side,
        }
    }

    /// The ladder side eligible to match against this trade: the opposite
    /// of the taker side.
    pub fn matching_side_is_bid(&self) -> bool {
        matches!(self.taker_side, TakerSide::TakerBoughtNo)
    }
}
