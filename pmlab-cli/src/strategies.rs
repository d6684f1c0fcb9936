//! Example `Strategy` implementations.
//!
//! These ship with the CLI rather than `pmlab-core` — strategy authoring is
//! a collaborator concern (spec Non-goals rule out auto-discovery and
//! multi-strategy composition). Illustrative only: a passive buy-and-hold
//! and a simple mean-reversion quoter, used by the CLI's built-in presets.

use pmlab_core::domain::{round_to_tick, Fill, Market, OrderSide, Resolution, TradeEvent};
use pmlab_core::strategy::{Strategy, StrategyContext};
use std::collections::HashMap;

/// Buys a fixed quantity of YES at market open and holds to resolution.
/// No reaction to fills or trades.
pub struct QuoteAndHold {
    quantity: f64,
    entry_price: f64,
}

impl QuoteAndHold {
    pub fn new(quantity: f64, entry_price: f64) -> Self {
        Self {
            quantity,
            entry_price,
        }
    }
}

impl Strategy for QuoteAndHold {
    fn name(&self) -> &str {
        "quote_and_hold"
    }

    fn on_market_open(&mut self, ctx: &mut StrategyContext, market: &Market) {
        if let Err(err) = ctx.buy_yes(&market.id, self.entry_price, self.quantity) {
            tracing::warn!(market = %market.id, %err, "quote_and_hold: entry order rejected");
        }
    }
}

/// Quotes both legs around a per-market reference price, leaning against
/// the last observed trade: re-quotes a small resting order on whichever
/// side the market just traded away from, canceling any stale quote first.
pub struct MeanReversion {
    quantity: f64,
    edge: f64,
    last_quote: HashMap<String, pmlab_core::domain::OrderId>,
}

impl MeanReversion {
    pub fn new(quantity: f64, edge: f64) -> Self {
        Self {
            quantity,
            edge,
            last_quote: HashMap::new(),
        }
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn on_trade(&mut self, ctx: &mut StrategyContext, trade: &TradeEvent) {
        if let Some(old) = self.last_quote.remove(&trade.market_id) {
            let _ = ctx.cancel_order(old);
        }

        let Some(market) = ctx.market(&trade.market_id) else {
            return;
        };
        let tick = market.tick_size;
        let raw_price = (trade.price - self.edge).clamp(tick, 1.0 - tick);
        let quote_price = round_to_tick(raw_price, tick, OrderSide::BuyYes).clamp(tick, 1.0 - tick);

        match ctx.buy_yes(&trade.market_id, quote_price, self.quantity) {
            Ok(id) => {
                self.last_quote.insert(trade.market_id.clone(), id);
            }
            Err(err) => {
                tracing::debug!(market = %trade.market_id, %err, "mean_reversion: re-quote rejected");
            }
        }
    }

    fn on_fill(&mut self, _ctx: &mut StrategyContext, fill: &Fill) {
        tracing::info!(market = %fill.market_id, price = fill.price, qty = fill.quantity, "fill");
        self.last_quote.remove(&fill.market_id);
    }

    fn on_market_resolve(&mut self, _ctx: &mut StrategyContext, market: &Market, outcome: Resolution) {
        self.last_quote.remove(&market.id);
        tracing::info!(market = %market.id, ?outcome, "resolved");
    }
}
