//! Market metadata, platform tick policy, and side-aware tick rounding.

use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// Prediction-market venue a [`Market`] trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Kalshi,
    Polymarket,
}

impl Platform {
    /// Tick size inferred from the platform: 1 cent for Kalshi, a
    /// configurable fractional tick for Polymarket (default 0.001).
    pub fn default_tick_size(self) -> f64 {
        match self {
            Platform::Kalshi => 0.01,
            Platform::Polymarket => 0.001,
        }
    }
}

/// Terminal outcome of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Unresolved,
    ResolvedYes,
    ResolvedNo,
}

impl Resolution {
    pub fn is_resolved(self) -> bool {
        !matches!(self, Resolution::Unresolved)
    }
}

/// A single binary prediction market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub platform: Platform,
    pub open_ts: i64,
    pub close_ts: i64,
    pub resolution: Resolution,
    /// Timestamp the terminal resolution event fires, if the market resolves
    /// within the feed's horizon. Distinct from `close_ts`: a market closes
    /// to new orders before its outcome is known, and the two may coincide.
    #[serde(default)]
    pub resolve_ts: Option<i64>,
    /// Tick size for this market; defaults to the platform's but may be
    /// overridden per-market by the feed.
    pub tick_size: f64,
}

impl Market {
    pub fn new(id: impl Into<String>, platform: Platform, open_ts: i64, close_ts: i64) -> Self {
        let tick_size = platform.default_tick_size();
        Self {
            id: id.into(),
            platform,
            open_ts,
            close_ts,
            resolution: Resolution::Unresolved,
            resolve_ts: None,
            tick_size,
        }
    }

    /// Builder helper: attach a terminal resolution at the given timestamp.
    pub fn with_resolution(mut self, resolution: Resolution, resolve_ts: i64) -> Self {
        self.resolution = resolution;
        self.resolve_ts = Some(resolve_ts);
        self
    }

    pub fn is_tradable(&self) -> bool {
        self.resolution == Resolution::Unresolved
    }
}

/// Side-aware tick rounding: buys round up to the next tick (pay more,
/// ensures fill), sells round down (receive less, ensures fill).
pub fn round_to_tick(price: f64, tick_size: f64, side: OrderSide) -> f64 {
    if tick_size <= 0.0 || price.is_nan() {
        return price;
    }
    match side {
        OrderSide::BuyYes | OrderSide::BuyNo => (price / tick_size).ceil() * tick_size,
        OrderSide::SellYes | OrderSide::SellNo => (price / tick_size).floor() * tick_size,
    }
}

/// Whether `price` lies exactly on `tick_size`'s grid (within float epsilon).
pub fn is_on_tick_grid(price: f64, tick_size: f64) -> bool {
    if tick_size <= 0.0 {
        return true;
    }
    let ticks = price / tick_size;
    (ticks - ticks.round()).abs() < 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kalshi_tick_is_one_cent() {
        assert_eq!(Platform::Kalshi.default_tick_size(), 0.01);
    }

    #[test]
    fn polymarket_tick_is_fractional() {
        assert_eq!(Platform::Polymarket.default_tick_size(), 0.001);
    }

    #[test]
    fn buy_rounds_up() {
        assert_eq!(round_to_tick(0.203, 0.01, OrderSide::BuyYes), 0.21);
    }

    #[test]
    fn sell_rounds_down() {
        assert_eq!(round_to_tick(0.207, 0.01, OrderSide::SellYes), 0.20);
    }

    #[test]
    fn nan_price_passes_through() {
        assert!(round_to_tick(f64::NAN, 0.01, OrderSide::BuyYes).is_nan());
    }

    #[test]
    fn on_tick_grid_detection() {
        assert!(is_on_tick_grid(0.20, 0.01));
        assert!(!is_on_tick_grid(0.203, 0.01));
    }

    #[test]
    fn market_starts_unresolved_and_tradable() {
        let m = Market::new("M1", Platform::Kalshi, 0, 1000);
        assert_eq!(m.resolution, Resolution::Unresolved);
        assert!(m.is_tradable());
        assert_eq!(m.tick_size, 0.01);
    }

    #[test]
    fn market_serialization_roundtrip() {
        let m = Market::new("M1", Platform::Polymarket, 0, 1000);
        let json = serde_json::to_string(&m).unwrap();
        let deser: Market = serde_json::from_str(&json).unwrap();
        assert_eq!(m.id, deser.id);
        assert_eq!(m.tick_size, deser.tick_size);
    }
}
