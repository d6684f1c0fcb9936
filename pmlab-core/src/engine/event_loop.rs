//! The hot loop: merges lifecycle events (open/close/resolve) derived from
//! market metadata with the feed's trade stream in strict time order and
//! dispatches each to the broker, portfolio, and strategy.
//!
//! Grounded in the teacher's `event_loop`'s pull-next-event/dispatch/repeat
//! shape, rebuilt around a two-source merge rather than a single bar stream
//! since lifecycle events are engine-derived while trades are feed-pulled.

use std::collections::HashMap;
use std::io::Write;

use serde_json::json;

use crate::broker::Broker;
use crate::domain::market::Resolution;
use crate::domain::{Fill, Market, Portfolio};
use crate::error::EngineError;
use crate::slippage::SlippageState;
use crate::strategy::StrategyContext;

use super::accounting::SnapshotSampler;
use super::config::{EngineConfig, RunInputs};
use super::event_log::EventLog;
use super::state::RunResult;

#[derive(Debug, Clone, Copy)]
enum LifecycleKind {
    Open,
    Close,
    Resolve(Resolution),
}

impl LifecycleKind {
    fn rank(self) -> u8 {
        match self {
            LifecycleKind::Open => 0,
            LifecycleKind::Close => 2,
            LifecycleKind::Resolve(_) => 3,
        }
    }
}

struct LifecycleEvent {
    timestamp: i64,
    market_id: String,
    kind: LifecycleKind,
}

/// Owns all mutable run state: markets, broker, portfolio, per-market
/// slippage EMAs, and the snapshot sampler. Constructed once per run.
pub struct Engine {
    config: EngineConfig,
    markets: HashMap<String, Market>,
    broker: Broker,
    portfolio: Portfolio,
    slippage_states: HashMap<String, SlippageState>,
    sampler: SnapshotSampler,
    last_yes_prices: HashMap<String, f64>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let portfolio = Portfolio::new(config.initial_cash, config.allow_short);
        let sampler = SnapshotSampler::new(config.snapshot_interval);
        Self {
            config,
            markets: HashMap::new(),
            broker: Broker::new(),
            portfolio,
            slippage_states: HashMap::new(),
            sampler,
            last_yes_prices: HashMap::new(),
        }
    }

    /// Runs to feed exhaustion or until `should_stop` returns true.
    /// `event_log`, if present, receives one append-only record per
    /// dispatched event; see [`EventLog`].
    pub fn run(
        &mut self,
        inputs: RunInputs,
        mut event_log: Option<EventLog<&mut dyn Write>>,
        should_stop: &mut dyn FnMut() -> bool,
    ) -> Result<RunResult, EngineError> {
        let RunInputs {
            feed,
            strategy,
            slippage_model,
        } = inputs;

        let markets = feed.markets().map_err(|e| EngineError::Feed(e.to_string()))?;
        for market in &markets {
            self.broker.register_market(market);
            self.markets.insert(market.id.clone(), market.clone());
        }

        let mut events = Vec::new();
        for market in &markets {
            events.push(LifecycleEvent {
                timestamp: market.open_ts,
                market_id: market.id.clone(),
                kind: LifecycleKind::Open,
            });
            events.push(LifecycleEvent {
                timestamp: market.close_ts,
                market_id: market.id.clone(),
                kind: LifecycleKind::Close,
            });
            if market.resolution.is_resolved() {
                if let Some(resolve_ts) = market.resolve_ts {
                    events.push(LifecycleEvent {
                        timestamp: resolve_ts,
                        market_id: market.id.clone(),
                        kind: LifecycleKind::Resolve(market.resolution),
                    });
                }
            }
        }
        events.sort_by_key(|e| (e.timestamp, e.kind.rank()));

        let mut trades = feed
            .trades()
            .map_err(|e| EngineError::Feed(e.to_string()))?
            .peekable();

        let mut fills: Vec<Fill> = Vec::new();
        let mut snapshots = Vec::new();
        let mut stopped_early = false;
        let mut last_ts: Option<i64> = None;
        let mut idx = 0usize;

        {
            let mut ctx = StrategyContext::new(&mut self.broker, &self.portfolio, &self.markets, i64::MIN);
            strategy.initialize(&mut ctx);
        }

        loop {
            if should_stop() {
                stopped_early = true;
                break;
            }

            if let Some(Err(_)) = trades.peek() {
                let err = trades.next().unwrap().unwrap_err();
                return Err(EngineError::Feed(err.to_string()));
            }

            let next_trade_ts = trades.peek().map(|r| r.as_ref().unwrap().timestamp);
            let next_lifecycle_key = events.get(idx).map(|e| (e.timestamp, e.kind.rank()));
            const TRADE_RANK: u8 = 1;
            let next_trade_key = next_trade_ts.map(|ts| (ts, TRADE_RANK));

            let dispatch_trade = match (next_lifecycle_key, next_trade_key) {
                (None, None) => break,
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (Some(lk), Some(tk)) => tk < lk,
            };

            let this_ts = if dispatch_trade {
                next_trade_ts.unwrap()
            } else {
                next_lifecycle_key.unwrap().0
            };
            if let Some(last) = last_ts {
                if this_ts < last {
                    return Err(EngineError::FeedOrderViolation {
                        last_ts: last,
                        got_ts: this_ts,
                    });
                }
            }
            last_ts = Some(this_ts);

            if dispatch_trade {
                let trade = trades.next().unwrap().expect("peeked Ok");

                if let Some(log) = event_log.as_mut() {
                    log.write_event(trade.timestamp, "trade", &trade)
                        .map_err(|e| EngineError::EventLogWrite(e.to_string()))?;
                }

                let ema_alpha = self.config.ema_alpha;
                let ema_size = {
                    let state = self.slippage_states.entry(trade.market_id.clone()).or_default();
                    state.update(trade.size, ema_alpha);
                    state.size()
                };

                let trade_fills = self.broker.match_trade(&trade, slippage_model, ema_size);
                for fill in trade_fills {
                    if let Err(err) = self.portfolio.apply_fill(fill.clone()) {
                        // BrokerError is strategy-facing and non-fatal by design: the
                        // placement-time guard in `StrategyContext` should already
                        // keep this unreachable, but per the error-propagation
                        // policy this must not abort the run if it ever fires.
                        tracing::warn!(
                            market = %fill.market_id,
                            %err,
                            "fill rejected by portfolio accounting; dropping fill and continuing"
                        );
                        continue;
                    }

                    if let Some(log) = event_log.as_mut() {
                        log.write_event(fill.timestamp, "fill", &fill)
                            .map_err(|e| EngineError::EventLogWrite(e.to_string()))?;
                    }

                    let mut ctx = StrategyContext::new(
                        &mut self.broker,
                        &self.portfolio,
                        &self.markets,
                        trade.timestamp,
                    );
                    strategy.on_fill(&mut ctx, &fill);
                    fills.push(fill);
                }

                self.last_yes_prices.insert(trade.market_id.clone(), trade.price);

                if self.sampler.should_snapshot(trade.timestamp) {
                    let snap = self.portfolio.snapshot(trade.timestamp, &self.last_yes_prices)?;
                    if let Some(log) = event_log.as_mut() {
                        log.write_event(snap.timestamp, "snapshot", &snap)
                            .map_err(|e| EngineError::EventLogWrite(e.to_string()))?;
                    }
                    snapshots.push(snap);
                }

                let mut ctx =
                    StrategyContext::new(&mut self.broker, &self.portfolio, &self.markets, trade.timestamp);
                strategy.on_trade(&mut ctx, &trade);
            } else {
                let event = &events[idx];
                idx += 1;
                let market_id = event.market_id.clone();
                let timestamp = event.timestamp;

                match event.kind {
                    LifecycleKind::Open => {
                        let market = self.markets[&market_id].clone();
                        if let Some(log) = event_log.as_mut() {
                            log.write_event(timestamp, "open", &market)
                                .map_err(|e| EngineError::EventLogWrite(e.to_string()))?;
                        }
                        let mut ctx =
                            StrategyContext::new(&mut self.broker, &self.portfolio, &self.markets, timestamp);
                        strategy.on_market_open(&mut ctx, &market);
                    }
                    LifecycleKind::Close => {
                        let canceled = self.broker.close_market(&market_id);
                        let market = self.markets[&market_id].clone();
                        if let Some(log) = event_log.as_mut() {
                            log.write_event(
                                timestamp,
                                "close",
                                &json!({ "market_id": market_id, "canceled_orders": canceled }),
                            )
                            .map_err(|e| EngineError::EventLogWrite(e.to_string()))?;
                        }
                        let mut ctx =
                            StrategyContext::new(&mut self.broker, &self.portfolio, &self.markets, timestamp);
                        strategy.on_market_close(&mut ctx, &market);
                    }
                    LifecycleKind::Resolve(resolution) => {
                        self.broker.resolve_market(&market_id);
                        self.portfolio.resolve_market(&market_id, resolution);
                        if let Some(m) = self.markets.get_mut(&market_id) {
                            m.resolution = resolution;
                        }
                        let market = self.markets[&market_id].clone();
                        if let Some(log) = event_log.as_mut() {
                            log.write_event(
                                timestamp,
                                "resolve",
                                &json!({ "market_id": market_id, "resolution": resolution }),
                            )
                            .map_err(|e| EngineError::EventLogWrite(e.to_string()))?;
                        }
                        let mut ctx =
                            StrategyContext::new(&mut self.broker, &self.portfolio, &self.markets, timestamp);
                        strategy.on_market_resolve(&mut ctx, &market, resolution);
                    }
                }
            }
        }

        {
            let mut ctx = StrategyContext::new(
                &mut self.broker,
                &self.portfolio,
                &self.markets,
                last_ts.unwrap_or(i64::MIN),
            );
            strategy.finalize(&mut ctx);
        }

        Ok(RunResult {
            portfolio: self.portfolio.clone(),
            fills,
            snapshots,
            stopped_early,
        })
    }
}
