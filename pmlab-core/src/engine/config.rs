//! Engine configuration.

use crate::feed::Feed;
use crate::slippage::SlippageModel;
use crate::strategy::Strategy;

use super::accounting::SnapshotInterval;

/// Engine input: everything needed to run one backtest.
pub struct EngineConfig {
    pub initial_cash: f64,
    pub base_slippage: f64,
    pub ema_alpha: f64,
    pub snapshot_interval: Option<SnapshotInterval>,
    pub allow_short: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            base_slippage: 0.005,
            ema_alpha: 0.05,
            snapshot_interval: None,
            allow_short: false,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            ..Default::default()
        }
    }
}

/// Everything the engine needs beyond scalar config: the polymorphic
/// collaborators named in the feed/strategy contract.
pub struct RunInputs<'a> {
    pub feed: &'a mut dyn Feed,
    pub strategy: &'a mut dyn Strategy,
    pub slippage_model: &'a dyn SlippageModel,
}
