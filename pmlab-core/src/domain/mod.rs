//! Data-model layer: plain value containers with construction-time
//! validation, shared by the broker, portfolio, and engine.

pub mod fill;
pub mod ids;
pub mod market;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod snapshot;
pub mod trade_event;

pub use fill::Fill;
pub use ids::{FillId, IdGen, OrderId};
pub use market::{is_on_tick_grid, round_to_tick, Market, Platform, Resolution};
pub use order::{Order, OrderSide, OrderStatus};
pub use portfolio::Portfolio;
pub use position::Position;
pub use snapshot::Snapshot;
pub use trade_event::{TakerSide, TradeEvent};
