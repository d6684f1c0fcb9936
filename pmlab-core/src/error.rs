//! Error kinds, one `thiserror` enum per propagation policy rather than a
//! single crate-wide error type — strategy-triggered errors are returned to
//! the caller and do not abort a run; feed and accounting errors are fatal
//! and terminate [`crate::engine::Engine::run`].

use crate::domain::ids::OrderId;
use crate::domain::order::OrderSide;
use thiserror::Error;

/// Non-fatal errors returned from [`crate::broker::Broker::place`] and
/// [`crate::broker::Broker::cancel`]. The strategy may ignore or react;
/// the run continues.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrokerError {
    #[error("market {market_id}: price {price} is outside (0,1) or off the tick grid")]
    InvalidPrice { market_id: String, price: f64 },

    #[error("quantity {quantity} is non-positive or non-finite")]
    InvalidQuantity { quantity: f64 },

    #[error("market {market_id} is not registered")]
    UnknownMarket { market_id: String },

    #[error("market {market_id} is closed or resolved")]
    MarketNotTradable { market_id: String },

    #[error("order {order_id} is not active (already filled, canceled, or unknown)")]
    OrderNotActive { order_id: OrderId },

    #[error("fill on market {market_id} side {side:?} would cross zero with shorting disallowed")]
    ShortDisallowed { market_id: String, side: OrderSide },
}

/// Fatal errors that terminate a run. Carried alongside the offending event
/// and the last-known portfolio state by the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("event timestamp {got_ts} precedes last processed timestamp {last_ts}")]
    FeedOrderViolation { last_ts: i64, got_ts: i64 },

    #[error("portfolio accounting identity violated: {detail}")]
    AccountingViolation { detail: String },

    #[error("feed error: {0}")]
    Feed(String),

    #[error("event log write failed: {0}")]
    EventLogWrite(String),
}
