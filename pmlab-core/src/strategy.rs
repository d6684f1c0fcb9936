//! Strategy interface: the callback surface a backtest plugs into the
//! engine, plus the context handle through which it places orders and
//! reads portfolio/broker state.
//!
//! Collapses the teacher's four-component composition model
//! (`SignalGenerator`/`SignalFilter`/`ExecutionModel`/`PositionManager`) into
//! the single trait below — multi-strategy coexistence and pluggable
//! component swapping are out of scope here, so one native trait with the
//! full lifecycle is the right shape, in the same `Send + Sync`, `&self`
//! (here `&mut self`, since strategies carry mutable state) style as the
//! teacher's `PositionManager`.

use std::collections::HashMap;

use crate::broker::Broker;
use crate::domain::{Fill, Market, Order, OrderId, Portfolio, Resolution, TradeEvent};
use crate::error::BrokerError;

/// Handle passed to every [`Strategy`] hook: order placement plus
/// read-only views. The strategy MUST NOT mutate any returned view.
pub struct StrategyContext<'a> {
    broker: &'a mut Broker,
    portfolio: &'a Portfolio,
    markets: &'a HashMap<String, Market>,
    now: i64,
}

impl<'a> StrategyContext<'a> {
    pub fn new(
        broker: &'a mut Broker,
        portfolio: &'a Portfolio,
        markets: &'a HashMap<String, Market>,
        now: i64,
    ) -> Self {
        Self {
            broker,
            portfolio,
            markets,
            now,
        }
    }

    pub fn buy_yes(&mut self, market_id: &str, price: f64, quantity: f64) -> Result<OrderId, BrokerError> {
        self.place(market_id, crate::domain::OrderSide::BuyYes, price, quantity)
    }

    pub fn sell_yes(&mut self, market_id: &str, price: f64, quantity: f64) -> Result<OrderId, BrokerError> {
        self.place(market_id, crate::domain::OrderSide::SellYes, price, quantity)
    }

    pub fn buy_no(&mut self, market_id: &str, price: f64, quantity: f64) -> Result<OrderId, BrokerError> {
        self.place(market_id, crate::domain::OrderSide::BuyNo, price, quantity)
    }

    pub fn sell_no(&mut self, market_id: &str, price: f64, quantity: f64) -> Result<OrderId, BrokerError> {
        self.place(market_id, crate::domain::OrderSide::SellNo, price, quantity)
    }

    fn place(
        &mut self,
        market_id: &str,
        side: crate::domain::OrderSide,
        price: f64,
        quantity: f64,
    ) -> Result<OrderId, BrokerError> {
        self.reject_if_would_cross_zero(market_id, side, quantity)?;
        self.broker.place(market_id, side, price, quantity, self.now)
    }

    /// Placement-time guard for the crossing-zero rule (§4.2). Two distinct
    /// things are gated here, and only one of them is conditional on
    /// `allow_short`: opening a fresh short from a flat position is allowed
    /// only when `allow_short` is set, but capping an order against the
    /// current position plus already-resting same-side orders so a single
    /// fill can never flip a leg's sign applies unconditionally — the
    /// broker has no view of portfolio state, so this is enforced here
    /// rather than reactively once a fill lands.
    fn reject_if_would_cross_zero(
        &self,
        market_id: &str,
        side: crate::domain::OrderSide,
        quantity: f64,
    ) -> Result<(), BrokerError> {
        use crate::domain::OrderSide::{BuyNo, BuyYes, SellYes};
        let is_yes = matches!(side, BuyYes | SellYes);
        let is_buy = matches!(side, BuyYes | BuyNo);
        let qty = self
            .portfolio
            .positions
            .get(market_id)
            .map(|p| if is_yes { p.yes_qty } else { p.no_qty })
            .unwrap_or(0.0);

        let reduces = (is_buy && qty < 0.0) || (!is_buy && qty > 0.0);
        if !reduces {
            if qty == 0.0 && !is_buy && !self.portfolio.allow_short {
                return Err(BrokerError::ShortDisallowed {
                    market_id: market_id.to_string(),
                    side,
                });
            }
            return Ok(());
        }

        let resting_same_side: f64 = self
            .broker
            .open_orders(Some(market_id))
            .iter()
            .filter(|o| o.side == side)
            .map(|o| o.remaining_quantity())
            .sum();
        if quantity + resting_same_side > qty.abs() + 1e-9 {
            return Err(BrokerError::ShortDisallowed {
                market_id: market_id.to_string(),
                side,
            });
        }
        Ok(())
    }

    pub fn cancel_order(&mut self, order_id: OrderId) -> Result<(), BrokerError> {
        self.broker.cancel(order_id)
    }

    pub fn cancel_all(&mut self, market_id: Option<&str>) -> Vec<OrderId> {
        self.broker.cancel_all(market_id)
    }

    pub fn portfolio(&self) -> &Portfolio {
        self.portfolio
    }

    pub fn open_orders(&self, market_id: Option<&str>) -> Vec<&Order> {
        self.broker.open_orders(market_id)
    }

    pub fn market(&self, market_id: &str) -> Option<&Market> {
        self.markets.get(market_id)
    }
}

/// Lifecycle hooks, in the exact firing order within one event: `on_fill`
/// fires immediately after each fill is applied, before `on_trade` for that
/// same trade event. Placed/canceled orders during a callback take effect
/// immediately in broker state but cannot fill against the *current* event
/// — they were not resting when it arrived — only subsequent ones.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str {
        "strategy"
    }

    fn initialize(&mut self, _ctx: &mut StrategyContext) {}

    fn on_market_open(&mut self, _ctx: &mut StrategyContext, _market: &Market) {}

    fn on_fill(&mut self, _ctx: &mut StrategyContext, _fill: &Fill) {}

    fn on_trade(&mut self, _ctx: &mut StrategyContext, _trade: &TradeEvent) {}

    fn on_market_close(&mut self, _ctx: &mut StrategyContext, _market: &Market) {}

    fn on_market_resolve(&mut self, _ctx: &mut StrategyContext, _market: &Market, _outcome: Resolution) {}

    fn finalize(&mut self, _ctx: &mut StrategyContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::Platform;
    use crate::domain::Market;

    fn ctx_parts() -> (Broker, Portfolio, HashMap<String, Market>) {
        let mut broker = Broker::new();
        let market = Market::new("M1", Platform::Kalshi, 0, 1000);
        broker.register_market(&market);
        let mut markets = HashMap::new();
        markets.insert("M1".to_string(), market);
        (broker, Portfolio::new(1000.0, false), markets)
    }

    #[test]
    fn sell_yes_from_flat_is_rejected_without_allow_short() {
        let (mut broker, portfolio, markets) = ctx_parts();
        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, 0);
        let err = ctx.sell_yes("M1", 0.20, 5.0);
        assert!(matches!(err, Err(BrokerError::ShortDisallowed { .. })));
    }

    #[test]
    fn buy_yes_from_flat_is_allowed() {
        let (mut broker, portfolio, markets) = ctx_parts();
        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, 0);
        assert!(ctx.buy_yes("M1", 0.20, 5.0).is_ok());
    }

    #[test]
    fn resting_same_side_orders_count_toward_the_cross_zero_limit() {
        let (mut broker, mut portfolio, markets) = ctx_parts();
        portfolio.positions.insert(
            "M1".to_string(),
            crate::domain::Position {
                market_id: "M1".to_string(),
                yes_qty: 10.0,
                yes_avg_cost: 0.2,
                no_qty: 0.0,
                no_avg_cost: 0.0,
            },
        );
        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, 0);
        assert!(ctx.sell_yes("M1", 0.25, 6.0).is_ok());
        let err = ctx.sell_yes("M1", 0.25, 6.0);
        assert!(matches!(err, Err(BrokerError::ShortDisallowed { .. })));
    }

    #[test]
    fn sell_exceeding_long_position_is_capped_even_when_shorting_is_allowed() {
        let (mut broker, mut portfolio, markets) = ctx_parts();
        portfolio.allow_short = true;
        portfolio.positions.insert(
            "M1".to_string(),
            crate::domain::Position {
                market_id: "M1".to_string(),
                yes_qty: 5.0,
                yes_avg_cost: 0.2,
                no_qty: 0.0,
                no_avg_cost: 0.0,
            },
        );
        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, 0);
        let err = ctx.sell_yes("M1", 0.20, 10.0);
        assert!(matches!(err, Err(BrokerError::ShortDisallowed { .. })));
    }

    #[test]
    fn opening_a_fresh_short_from_flat_is_allowed_when_shorting_is_enabled() {
        let (mut broker, mut portfolio, markets) = ctx_parts();
        portfolio.allow_short = true;
        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, 0);
        assert!(ctx.sell_yes("M1", 0.20, 10.0).is_ok());
    }
}
