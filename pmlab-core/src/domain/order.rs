//! Order types: the four-leg side enum and the standing-order record.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};

/// Which leg and direction an order trades. `BuyYes` at `p` is economically
/// equivalent to `SellNo` at `1 - p`; the broker tracks them as distinct
/// ladder entries but applies the same taker-side rule to both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    BuyYes,
    SellYes,
    BuyNo,
    SellNo,
}

impl OrderSide {
    /// Whether this side rests on the bid ladder (BuyYes, SellNo) as opposed
    /// to the ask ladder (SellYes, BuyNo).
    pub fn is_bid(self) -> bool {
        matches!(self, OrderSide::BuyYes | OrderSide::SellNo)
    }
}

/// Order lifecycle states. An order is in the resting book iff
/// `status == Open && remaining_quantity() > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Canceled,
}

/// A standing limit order, good-till-canceled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub market_id: String,
    pub side: OrderSide,
    pub limit_price: f64,
    pub quantity: f64,
    pub filled_quantity: f64,
    pub placed_at: i64,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(
        id: OrderId,
        market_id: impl Into<String>,
        side: OrderSide,
        limit_price: f64,
        quantity: f64,
        placed_at: i64,
    ) -> Self {
        Self {
            id,
            market_id: market_id.into(),
            side,
            limit_price,
            quantity,
            filled_quantity: 0.0,
            placed_at,
            status: OrderStatus::Open,
        }
    }

    pub fn remaining_quantity(&self) -> f64 {
        self.quantity - self.filled_quantity
    }

    pub fn is_resting(&self) -> bool {
        self.status == OrderStatus::Open && self.remaining_quantity() > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Order {
        Order::new(OrderId(1), "M1", OrderSide::BuyYes, 0.20, 10.0, 1)
    }

    #[test]
    fn order_remaining_quantity() {
        let mut order = sample();
        order.filled_quantity = 3.0;
        assert_eq!(order.remaining_quantity(), 7.0);
    }

    #[test]
    fn order_resting_iff_open_and_remaining() {
        let mut order = sample();
        assert!(order.is_resting());

        order.filled_quantity = 10.0;
        assert!(!order.is_resting());

        order.filled_quantity = 0.0;
        order.status = OrderStatus::Canceled;
        assert!(!order.is_resting());
    }

    #[test]
    fn bid_ask_classification() {
        assert!(OrderSide::BuyYes.is_bid());
        assert!(OrderSide::SellNo.is_bid());
        assert!(!OrderSide::SellYes.is_bid());
        assert!(!OrderSide::BuyNo.is_bid());
    }

    #[test]
    fn order_serialization_roundtrip() {
        let order = sample();
        let json = serde_json::to_string(&order).unwrap();
        let deser: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order.id, deser.id);
        assert_eq!(order.market_id, deser.market_id);
        assert_eq!(order.quantity, deser.quantity);
    }
}
