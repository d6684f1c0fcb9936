//! Broker: resting-order ladders per market, taker-side matching, fill
//! emission. Grounded in the order-book state-machine shape of the
//! teacher's `orders::order_book::OrderBook` (HashMap-keyed store,
//! monotone id assignment, `thiserror` error enum), generalized to
//! price-ordered ladders since matching here needs price-time priority
//! rather than single-order-at-a-time transitions.

use std::collections::HashMap;

use crate::domain::ids::IdGen;
use crate::domain::market::{is_on_tick_grid, Market};
use crate::domain::order::{Order, OrderSide, OrderStatus};
use crate::domain::{Fill, OrderId, TradeEvent};
use crate::error::BrokerError;
use crate::slippage::SlippageModel;

struct MarketEntry {
    tradable: bool,
    tick_size: f64,
}

/// Two price-ordered ladders per market: bids (BuyYes, SellNo) and asks
/// (SellYes, BuyNo). Within a price level, FIFO by acceptance id.
#[derive(Default)]
pub struct Broker {
    id_gen: IdGen,
    orders: HashMap<OrderId, Order>,
    bids: HashMap<String, Vec<OrderId>>,
    asks: HashMap<String, Vec<OrderId>>,
    markets: HashMap<String, MarketEntry>,
}

/// Economic YES-equivalent price of an order's limit: the raw limit for
/// YES-leg orders, `1 - limit` for NO-leg orders. `BuyYes` at `p` is
/// economically equivalent to `SellNo` at `1 - p`; this is what lets both
/// rest in the same ladder under a single price-priority ordering.
fn economic_price(side: OrderSide, limit: f64) -> f64 {
    match side {
        OrderSide::BuyYes | OrderSide::SellYes => limit,
        OrderSide::BuyNo | OrderSide::SellNo => 1.0 - limit,
    }
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a market as tradable. Per §3's lifecycle rules every
    /// market starts `Unresolved` and transitions only via the engine's
    /// `close_market`/`resolve_market` calls as lifecycle events fire — the
    /// `resolution` field on the metadata passed in here may already carry
    /// the feed's known final outcome (historical data knows the future),
    /// but that's schedule information for the resolve event, not current
    /// state, so it's deliberately ignored here.
    pub fn register_market(&mut self, market: &Market) {
        self.markets.insert(
            market.id.clone(),
            MarketEntry {
                tradable: true,
                tick_size: market.tick_size,
            },
        );
    }

    /// Auto-cancels every open order in the market and marks it
    /// not-tradable. Returns the canceled order ids.
    pub fn close_market(&mut self, market_id: &str) -> Vec<OrderId> {
        if let Some(entry) = self.markets.get_mut(market_id) {
            entry.tradable = false;
        }
        self.cancel_all(Some(market_id))
    }

    pub fn resolve_market(&mut self, market_id: &str) {
        if let Some(entry) = self.markets.get_mut(market_id) {
            entry.tradable = false;
        }
    }

    pub fn place(
        &mut self,
        market_id: &str,
        side: OrderSide,
        limit_price: f64,
        quantity: f64,
        placed_at: i64,
    ) -> Result<OrderId, BrokerError> {
        let entry = self
            .markets
            .get(market_id)
            .ok_or_else(|| BrokerError::UnknownMarket {
                market_id: market_id.to_string(),
            })?;
        if !entry.tradable {
            return Err(BrokerError::MarketNotTradable {
                market_id: market_id.to_string(),
            });
        }
        if !(limit_price > 0.0 && limit_price < 1.0 && is_on_tick_grid(limit_price, entry.tick_size))
        {
            return Err(BrokerError::InvalidPrice {
                market_id: market_id.to_string(),
                price: limit_price,
            });
        }
        if !(quantity > 0.0 && quantity.is_finite()) {
            return Err(BrokerError::InvalidQuantity { quantity });
        }

        let id = self.id_gen.next_order_id();
        let order = Order::new(id, market_id, side, limit_price, quantity, placed_at);
        self.insert_into_ladder(&order);
        self.orders.insert(id, order);
        Ok(id)
    }

    pub fn cancel(&mut self, order_id: OrderId) -> Result<(), BrokerError> {
        let order = self
            .orders
            .get_mut(&order_id)
            .filter(|o| o.status == OrderStatus::Open)
            .ok_or(BrokerError::OrderNotActive { order_id })?;
        order.status = OrderStatus::Canceled;
        let market_id = order.market_id.clone();
        let side = order.side;
        self.remove_from_ladder(&market_id, side, order_id);
        Ok(())
    }

    /// Cancels every resting order, optionally restricted to one market.
    /// O(open orders).
    pub fn cancel_all(&mut self, market_id: Option<&str>) -> Vec<OrderId> {
        let targets: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.is_resting())
            .filter(|o| market_id.map_or(true, |m| o.market_id == m))
            .map(|o| o.id)
            .collect();
        for id in &targets {
            let _ = self.cancel(*id);
        }
        targets
    }

    /// Attempts to fill resting orders against an incoming trade, per the
    /// taker-side rule: the matching ladder is the opposite of the trade's
    /// taker side.
    pub fn match_trade(
        &mut self,
        trade: &TradeEvent,
        slippage: &dyn SlippageModel,
        ema_size: f64,
    ) -> Vec<Fill> {
        let tick_size = self
            .markets
            .get(&trade.market_id)
            .map(|e| e.tick_size)
            .unwrap_or(0.0);
        let side_is_bid = trade.matching_side_is_bid();
        let ladder_ids = if side_is_bid {
            self.bids.get(&trade.market_id).cloned().unwrap_or_default()
        } else {
            self.asks.get(&trade.market_id).cloned().unwrap_or_default()
        };

        let mut fills = Vec::new();
        let mut remaining = trade.size;
        let mut filled_order_ids = Vec::new();

        for order_id in ladder_ids {
            if remaining <= 0.0 {
                break;
            }
            let Some(order) = self.orders.get_mut(&order_id) else {
                continue;
            };
            if !order.is_resting() {
                continue;
            }
            let key = economic_price(order.side, order.limit_price);
            let eligible = if side_is_bid {
                trade.price <= key
            } else {
                trade.price >= key
            };
            if !eligible {
                break;
            }

            let fill_qty = remaining.min(order.remaining_quantity());
            let raw_price = slippage.adjust(order.limit_price, order.side, fill_qty, ema_size);
            let clipped = raw_price.clamp(tick_size, 1.0 - tick_size);

            order.filled_quantity += fill_qty;
            remaining -= fill_qty;
            let now_full = !order.is_resting();
            if now_full {
                order.status = OrderStatus::Filled;
                filled_order_ids.push(order_id);
            }

            fills.push(Fill {
                id: self.id_gen.next_fill_id(),
                order_id,
                market_id: trade.market_id.clone(),
                side: order.side,
                quantity: fill_qty,
                price: clipped,
                timestamp: trade.timestamp,
            });
        }

        for id in filled_order_ids {
            if let Some(order) = self.orders.get(&id) {
                let market_id = order.market_id.clone();
                let side = order.side;
                self.remove_from_ladder(&market_id, side, id);
            }
        }

        fills
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn open_orders(&self, market_id: Option<&str>) -> Vec<&Order> {
        self.orders
            .values()
            .filter(|o| o.is_resting())
            .filter(|o| market_id.map_or(true, |m| o.market_id == m))
            .collect()
    }

    fn insert_into_ladder(&mut self, order: &Order) {
        let ladder = if order.side.is_bid() {
            self.bids.entry(order.market_id.clone()).or_default()
        } else {
            self.asks.entry(order.market_id.clone()).or_default()
        };
        ladder.push(order.id);
        self.resort_ladder(&order.market_id, order.side.is_bid());
    }

    /// Re-sorts a ladder by economic price (descending for bids, ascending
    /// for asks), preserving acceptance-id order among equal prices. Orders
    /// are assigned monotonically increasing ids, so a stable sort on
    /// economic price alone preserves FIFO for ties.
    fn resort_ladder(&mut self, market_id: &str, is_bid: bool) {
        let orders = &self.orders;
        let ladder = if is_bid {
            self.bids.get_mut(market_id)
        } else {
            self.asks.get_mut(market_id)
        };
        let Some(ladder) = ladder else { return };
        ladder.sort_by(|a, b| {
            let pa = orders
                .get(a)
                .map(|o| economic_price(o.side, o.limit_price))
                .unwrap_or(f64::NAN);
            let pb = orders
                .get(b)
                .map(|o| economic_price(o.side, o.limit_price))
                .unwrap_or(f64::NAN);
            if is_bid {
                pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal)
            }
        });
    }

    fn remove_from_ladder(&mut self, market_id: &str, side: OrderSide, order_id: OrderId) {
        let ladder = if side.is_bid() {
            self.bids.get_mut(market_id)
        } else {
            self.asks.get_mut(market_id)
        };
        if let Some(ladder) = ladder {
            ladder.retain(|&id| id != order_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Platform;
    use crate::domain::trade_event::TakerSide;
    use crate::slippage::ZeroSlippageModel;

    fn broker_with_market() -> Broker {
        let mut b = Broker::new();
        let m = Market::new("M1", Platform::Kalshi, 0, 1000);
        b.register_market(&m);
        b
    }

    #[test]
    fn place_rejects_unknown_market() {
        let mut b = Broker::new();
        let err = b.place("NOPE", OrderSide::BuyYes, 0.2, 10.0, 0);
        assert!(matches!(err, Err(BrokerError::UnknownMarket { .. })));
    }

    #[test]
    fn place_rejects_price_off_tick_grid() {
        let mut b = broker_with_market();
        let err = b.place("M1", OrderSide::BuyYes, 0.203, 10.0, 0);
        assert!(matches!(err, Err(BrokerError::InvalidPrice { .. })));
    }

    #[test]
    fn place_rejects_nonpositive_quantity() {
        let mut b = broker_with_market();
        let err = b.place("M1", OrderSide::BuyYes, 0.2, 0.0, 0);
        assert!(matches!(err, Err(BrokerError::InvalidQuantity { .. })));
    }

    #[test]
    fn cancel_is_idempotent_and_second_call_errors() {
        let mut b = broker_with_market();
        let id = b.place("M1", OrderSide::BuyYes, 0.2, 10.0, 0).unwrap();
        b.cancel(id).unwrap();
        let err = b.cancel(id);
        assert!(matches!(err, Err(BrokerError::OrderNotActive { .. })));
    }

    #[test]
    fn taker_same_side_does_not_fill() {
        let mut b = broker_with_market();
        b.place("M1", OrderSide::BuyYes, 0.20, 10.0, 1).unwrap();
        let trade = TradeEvent::new("M1", 2, 0.18, 5.0, TakerSide::TakerBoughtYes);
        let fills = b.match_trade(&trade, &ZeroSlippageModel, 5.0);
        assert!(fills.is_empty());
    }

    #[test]
    fn taker_opposite_side_fills() {
        let mut b = broker_with_market();
        let id = b.place("M1", OrderSide::BuyYes, 0.20, 10.0, 1).unwrap();
        let trade = TradeEvent::new("M1", 3, 0.18, 5.0, TakerSide::TakerBoughtNo);
        let fills = b.match_trade(&trade, &ZeroSlippageModel, 5.0);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order_id, id);
        assert_eq!(fills[0].quantity, 5.0);
        assert_eq!(b.get_order(id).unwrap().remaining_quantity(), 5.0);
    }

    #[test]
    fn price_time_priority_fifo_at_same_price() {
        let mut b = broker_with_market();
        let first = b.place("M1", OrderSide::BuyYes, 0.20, 5.0, 1).unwrap();
        let _second = b.place("M1", OrderSide::BuyYes, 0.20, 5.0, 2).unwrap();
        let trade = TradeEvent::new("M1", 3, 0.18, 5.0, TakerSide::TakerBoughtNo);
        let fills = b.match_trade(&trade, &ZeroSlippageModel, 5.0);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order_id, first);
    }

    #[test]
    fn close_market_auto_cancels_open_orders() {
        let mut b = broker_with_market();
        let id = b.place("M1", OrderSide::BuyYes, 0.20, 5.0, 1).unwrap();
        let canceled = b.close_market("M1");
        assert_eq!(canceled, vec![id]);
        assert_eq!(b.get_order(id).unwrap().status, OrderStatus::Canceled);
    }

    #[test]
    fn place_after_close_is_not_tradable() {
        let mut b = broker_with_market();
        b.close_market("M1");
        let err = b.place("M1", OrderSide::BuyYes, 0.20, 5.0, 1);
        assert!(matches!(err, Err(BrokerError::MarketNotTradable { .. })));
    }
}
