//! Portfolio — cash, open positions, resolution payouts, mark-to-market.

use super::fill::Fill;
use super::market::Resolution;
use super::order::OrderSide;
use super::position::Position;
use super::snapshot::Snapshot;
use crate::error::{BrokerError, EngineError};
use std::collections::HashMap;

/// Aggregate portfolio state. The accounting identity
/// `cash + Σ mark-to-market + Σ pending resolution payouts == initial_cash +
/// realized_pnl + unrealized_pnl` must hold at every snapshot; pending
/// resolution payouts is always zero in this design since resolution
/// payouts are applied immediately.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub positions: HashMap<String, Position>,
    pub realized_pnl: f64,
    pub allow_short: bool,
    pub fills: Vec<Fill>,
}

impl Portfolio {
    pub fn new(initial_cash: f64, allow_short: bool) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            positions: HashMap::new(),
            realized_pnl: 0.0,
            allow_short,
            fills: Vec::new(),
        }
    }

    /// Apply a fill: mutate cash and the relevant position's average cost,
    /// record the fill, and add any realized P&L delta to the running total.
    pub fn apply_fill(&mut self, fill: Fill) -> Result<(), BrokerError> {
        let pos = self
            .positions
            .entry(fill.market_id.clone())
            .or_insert_with(|| Position::new(fill.market_id.clone()));

        let is_yes = matches!(fill.side, OrderSide::BuyYes | OrderSide::SellYes);
        let is_buy = matches!(fill.side, OrderSide::BuyYes | OrderSide::BuyNo);
        let trade_qty = if is_buy { fill.quantity } else { -fill.quantity };

        let (qty, avg_cost) = if is_yes {
            (pos.yes_qty, pos.yes_avg_cost)
        } else {
            (pos.no_qty, pos.no_avg_cost)
        };

        let (new_qty, new_avg, realized, cash_delta) = apply_to_leg(
            qty,
            avg_cost,
            trade_qty,
            fill.price,
            self.allow_short,
            &fill.market_id,
            fill.side,
        )?;

        if is_yes {
            pos.yes_qty = new_qty;
            pos.yes_avg_cost = new_avg;
        } else {
            pos.no_qty = new_qty;
            pos.no_avg_cost = new_avg;
        }

        self.cash += cash_delta;
        self.realized_pnl += realized;
        self.fills.push(fill);
        Ok(())
    }

    /// Settle every nonzero leg in `market_id` against its resolved outcome:
    /// YES pays 1.0/contract if `ResolvedYes`, NO symmetric. The position is
    /// cleared afterward.
    pub fn resolve_market(&mut self, market_id: &str, resolution: Resolution) {
        let Some(pos) = self.positions.get_mut(market_id) else {
            return;
        };
        let yes_payout = if resolution == Resolution::ResolvedYes {
            1.0
        } else {
            0.0
        };
        let no_payout = if resolution == Resolution::ResolvedNo {
            1.0
        } else {
            0.0
        };

        self.cash += pos.yes_qty * yes_payout + pos.no_qty * no_payout;
        self.realized_pnl += pos.yes_qty * (yes_payout - pos.yes_avg_cost)
            + pos.no_qty * (no_payout - pos.no_avg_cost);

        pos.yes_qty = 0.0;
        pos.yes_avg_cost = 0.0;
        pos.no_qty = 0.0;
        pos.no_avg_cost = 0.0;
    }

    /// Read-only equity computation using last-seen YES prices.
    pub fn mark_to_market(&self, yes_prices: &HashMap<String, f64>) -> f64 {
        let mtm: f64 = self
            .positions
            .values()
            .map(|pos| {
                let price = yes_prices.get(&pos.market_id).copied().unwrap_or(0.5);
                pos.market_value(price)
            })
            .sum();
        self.cash + mtm
    }

    fn unrealized_pnl(&self, yes_prices: &HashMap<String, f64>) -> f64 {
        self.positions
            .values()
            .map(|pos| {
                let price = yes_prices.get(&pos.market_id).copied().unwrap_or(0.5);
                pos.unrealized_pnl(price)
            })
            .sum()
    }

    /// Produce a [`Snapshot`] and, per the accounting-identity invariant,
    /// verify it within 1e-6. `debug_assert!`s in debug builds; always
    /// returns [`EngineError::AccountingViolation`] on genuine breach.
    pub fn snapshot(
        &self,
        timestamp: i64,
        yes_prices: &HashMap<String, f64>,
    ) -> Result<Snapshot, EngineError> {
        let equity = self.mark_to_market(yes_prices);
        let rhs = self.initial_cash + self.realized_pnl + self.unrealized_pnl(yes_prices);
        let diff = (equity - rhs).abs();
        debug_assert!(diff < 1e-6, "accounting identity violated: diff={diff}");
        if diff >= 1e-6 {
            return Err(EngineError::AccountingViolation {
                detail: format!("equity={equity} rhs={rhs} diff={diff}"),
            });
        }
        Ok(Snapshot {
            timestamp,
            cash: self.cash,
            equity,
            positions: self.positions.clone(),
        })
    }
}

/// Average-cost update for a single signed leg. `trade_qty` is positive for
/// a buy, negative for a sell. Crossing zero in one fill (long -> short or
/// short -> long) is disallowed here; the broker is responsible for
/// splitting such a fill before it reaches the portfolio.
#[allow(clippy::too_many_arguments)]
fn apply_to_leg(
    qty: f64,
    avg_cost: f64,
    trade_qty: f64,
    price: f64,
    allow_short: bool,
    market_id: &str,
    side: OrderSide,
) -> Result<(f64, f64, f64, f64), BrokerError> {
    let short_err = || BrokerError::ShortDisallowed {
        market_id: market_id.to_string(),
        side,
    };

    if trade_qty > 0.0 {
        if qty >= 0.0 {
            let new_qty = qty + trade_qty;
            let new_avg = (qty * avg_cost + trade_qty * price) / new_qty;
            Ok((new_qty, new_avg, 0.0, -trade_qty * price))
        } else {
            if trade_qty > -qty + 1e-9 {
                return Err(short_err());
            }
            let realized = trade_qty * (avg_cost - price);
            let new_qty = qty + trade_qty;
            let new_avg = if new_qty.abs() > 1e-9 { avg_cost } else { 0.0 };
            Ok((new_qty, new_avg, realized, -trade_qty * price))
        }
    } else {
        let sell_qty = -trade_qty;
        if qty > 0.0 {
            if sell_qty > qty + 1e-9 {
                return Err(short_err());
            }
            let realized = sell_qty * (price - avg_cost);
            let new_qty = qty - sell_qty;
            let new_avg = if new_qty.abs() > 1e-9 { avg_cost } else { 0.0 };
            Ok((new_qty, new_avg, realized, sell_qty * price))
        } else {
            if qty == 0.0 && !allow_short {
                return Err(short_err());
            }
            let new_qty = qty - sell_qty;
            let new_avg = (qty.abs() * avg_cost + sell_qty * price) / new_qty.abs();
            Ok((new_qty, new_avg, 0.0, sell_qty * price))
        }
    }
}
