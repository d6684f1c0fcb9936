//! Slippage: spread-vs-price curve, square-root market-impact term, and the
//! per-market EMA of trade size that drives the impact term.

use crate::domain::OrderSide;

/// EMA floor used by the impact term so a just-observed market (ema == 0)
/// doesn't divide by zero.
pub const EMA_EPSILON: f64 = 1e-6;

/// Per-market exponential moving average of trade size.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlippageState {
    ema_size: Option<f64>,
}

impl SlippageState {
    /// `ema <- (1-alpha)*ema + alpha*trade_size`, first observation sets
    /// `ema = trade_size`. Must be called before the matching attempt for
    /// the trade that triggered it, so the trade influences its own
    /// slippage.
    pub fn update(&mut self, trade_size: f64, alpha: f64) {
        self.ema_size = Some(match self.ema_size {
            None => trade_size,
            Some(prev) => (1.0 - alpha) * prev + alpha * trade_size,
        });
    }

    pub fn size(&self) -> f64 {
        self.ema_size.unwrap_or(0.0)
    }
}

/// Computes the adjusted execution price for a resting order's fill, given
/// the order's own limit as the quoted-price anchor (not the trade print).
pub trait SlippageModel: Send + Sync {
    /// Returns the adjusted price: `quoted_price` with slippage applied
    /// against the trader (buys pay more, sells receive less).
    fn adjust(&self, quoted_price: f64, side: OrderSide, quantity: f64, ema_size: f64) -> f64;

    fn name(&self) -> &str;
}

/// Production slippage model: spread multiplier anchored at 1.0 at p=0.5,
/// ~2 at the 0.15/0.85 ticks, ~5 at 0.05/0.95, clipped at 6; impact term
/// scales with sqrt(size / ema).
#[derive(Debug, Clone, Copy)]
pub struct CurveSlippageModel {
    pub base_slippage: f64,
    pub ema_alpha: f64,
}

impl Default for CurveSlippageModel {
    fn default() -> Self {
        Self {
            base_slippage: 0.005,
            ema_alpha: 0.05,
        }
    }
}

impl CurveSlippageModel {
    pub fn new(base_slippage: f64, ema_alpha: f64) -> Self {
        Self {
            base_slippage,
            ema_alpha,
        }
    }

    /// Monotone in `|p - 0.5|`: 1.0 at the midpoint, ~2 at the 0.15/0.85
    /// anchors, ~5 at 0.05/0.95, clipped at 6. The `d^8` term is what gives
    /// the curve its late steepening near the edges without disturbing
    /// monotonicity in the middle of the range.
    fn spread_multiplier(price: f64) -> f64 {
        let d = price - 0.5;
        let d2 = d * d;
        let d8 = d2 * d2 * d2 * d2;
        let m = 1.0 + 5.0 * d2 + 1800.0 * d8;
        m.min(6.0)
    }

    fn impact_multiplier(quantity: f64, ema_size: f64) -> f64 {
        (quantity / ema_size.max(EMA_EPSILON)).sqrt()
    }

    fn delta(&self, quoted_price: f64, quantity: f64, ema_size: f64) -> f64 {
        self.base_slippage * Self::spread_multiplier(quoted_price) * Self::impact_multiplier(quantity, ema_size)
    }
}

impl SlippageModel for CurveSlippageModel {
    fn adjust(&self, quoted_price: f64, side: OrderSide, quantity: f64, ema_size: f64) -> f64 {
        let delta = self.delta(quoted_price, quantity, ema_size);
        match side {
            OrderSide::BuyYes | OrderSide::BuyNo => quoted_price + delta,
            OrderSide::SellYes | OrderSide::SellNo => quoted_price - delta,
        }
    }

    fn name(&self) -> &str {
        "CurveSlippageModel"
    }
}

/// No-op slippage, for isolating matching-engine correctness from the
/// slippage formula in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroSlippageModel;

impl SlippageModel for ZeroSlippageModel {
    fn adjust(&self, quoted_price: f64, _side: OrderSide, _quantity: f64, _ema_size: f64) -> f64 {
        quoted_price
    }

    fn name(&self) -> &str {
        "ZeroSlippageModel"
    }
}
