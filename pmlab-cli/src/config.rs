//! Serializable run configuration, loaded from a TOML file.
//!
//! Mirrors the teacher's `trendlab-runner::config::RunConfig`: engine
//! parameters, a feed source path, an output directory, and a named
//! strategy preset (this core has no strategy auto-discovery, so the CLI
//! ships a small built-in set of example strategies selectable by name).

use std::path::PathBuf;

use pmlab_core::engine::{EngineConfig, SnapshotInterval};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Path to a newline-delimited JSON trade/market tape.
    pub feed_path: PathBuf,

    /// Directory event log / fills / snapshots are written to.
    pub output_dir: PathBuf,

    /// Built-in strategy preset to run.
    pub strategy: StrategyPreset,

    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,

    #[serde(default = "default_base_slippage")]
    pub base_slippage: f64,

    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,

    #[serde(default)]
    pub allow_short: bool,

    #[serde(default)]
    pub snapshot_interval: Option<SnapshotIntervalConfig>,
}

fn default_initial_cash() -> f64 {
    10_000.0
}

fn default_base_slippage() -> f64 {
    0.005
}

fn default_ema_alpha() -> f64 {
    0.05
}

/// Serializable form of [`SnapshotInterval`] (the core type isn't `serde`
/// since it's a run parameter, not a wire record).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotIntervalConfig {
    Events { count: usize },
    Duration { units: i64 },
}

impl From<SnapshotIntervalConfig> for SnapshotInterval {
    fn from(value: SnapshotIntervalConfig) -> Self {
        match value {
            SnapshotIntervalConfig::Events { count } => SnapshotInterval::Events(count),
            SnapshotIntervalConfig::Duration { units } => SnapshotInterval::Duration(units),
        }
    }
}

/// Named built-in strategy preset. Custom strategies are a collaborator
/// concern (§1, Non-goals rule out strategy auto-discovery) — these two
/// are illustrative examples, not a plugin system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreset {
    /// Buys a fixed quantity of YES at market open and holds to resolution.
    QuoteAndHold,
    /// Quotes both legs around a fixed fair value, leaning against recent
    /// trade prints.
    MeanReversion,
}

impl RunConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        let config: RunConfig = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_cash: self.initial_cash,
            base_slippage: self.base_slippage,
            ema_alpha: self.ema_alpha,
            snapshot_interval: self.snapshot_interval.map(Into::into),
            allow_short: self.allow_short,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let toml = r#"
            feed_path = "tape.jsonl"
            output_dir = "out"
            strategy = "quote_and_hold"
        "#;
        let config: RunConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.initial_cash, 10_000.0);
        assert_eq!(config.base_slippage, 0.005);
        assert_eq!(config.strategy, StrategyPreset::QuoteAndHold);
        assert!(!config.allow_short);
    }

    #[test]
    fn parses_full_config() {
        let toml = r#"
            feed_path = "tape.jsonl"
            output_dir = "out"
            strategy = "mean_reversion"
            initial_cash = 5000.0
            base_slippage = 0.01
            ema_alpha = 0.1
            allow_short = true

            [snapshot_interval]
            kind = "events"
            count = 50
        "#;
        let config: RunConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.strategy, StrategyPreset::MeanReversion);
        assert_eq!(config.initial_cash, 5000.0);
        assert!(config.allow_short);
        assert_eq!(
            config.snapshot_interval,
            Some(SnapshotIntervalConfig::Events { count: 50 })
        );
    }
}
