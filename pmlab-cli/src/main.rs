//! pmlab CLI — run a backtest from a TOML config against a JSONL trade tape.
//!
//! Commands:
//! - `run` — execute a backtest and write the event log / fills / snapshots
//!   to the configured output directory, printing a summary to stdout.

mod config;
mod metrics;
mod strategies;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pmlab_core::engine::{Engine, EventLog, RunInputs};
use pmlab_core::feed::JsonlFeed;
use pmlab_core::slippage::CurveSlippageModel;
use pmlab_core::strategy::Strategy;

use config::{RunConfig, StrategyPreset};
use strategies::{MeanReversion, QuoteAndHold};

#[derive(Parser)]
#[command(name = "pmlab", about = "Event-driven binary prediction-market backtester")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a backtest from a TOML config file.
    Run {
        /// Path to the run config (TOML).
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { config } => run(&config),
    }
}

fn build_strategy(preset: StrategyPreset) -> Box<dyn Strategy> {
    match preset {
        StrategyPreset::QuoteAndHold => Box::new(QuoteAndHold::new(10.0, 0.3)),
        StrategyPreset::MeanReversion => Box::new(MeanReversion::new(5.0, 0.02)),
    }
}

fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = RunConfig::load(config_path)?;
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output dir {}", config.output_dir.display()))?;

    let stop = Arc::new(AtomicBool::new(false));
    let ctrlc_stop = stop.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        tracing::warn!("received interrupt, stopping at the next event boundary");
        ctrlc_stop.store(true, Ordering::Release);
    }) {
        tracing::warn!(%err, "failed to install Ctrl-C handler; run to completion only");
    }

    tracing::info!(feed = %config.feed_path.display(), strategy = ?config.strategy, "starting run");

    let mut feed = JsonlFeed::open(&config.feed_path);
    let mut strategy = build_strategy(config.strategy);
    let slippage = CurveSlippageModel::new(config.base_slippage, config.ema_alpha);

    let log_path = config.output_dir.join("events.ndjson");
    let log_file = BufWriter::new(
        File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?,
    );
    let mut writer = log_file;
    let event_log = EventLog::new(&mut writer as &mut dyn std::io::Write);

    let mut engine = Engine::new(config.engine_config());
    let result = engine
        .run(
            RunInputs {
                feed: &mut feed,
                strategy: strategy.as_mut(),
                slippage_model: &slippage,
            },
            Some(event_log),
            &mut || stop.load(Ordering::Acquire),
        )
        .map_err(|e| anyhow::anyhow!("backtest run failed: {e}"))?;

    let summary = metrics::Summary::from_result(&result);
    let summary_path = config.output_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    tracing::info!(
        fills = result.fills.len(),
        snapshots = result.snapshots.len(),
        stopped_early = result.stopped_early,
        "run complete"
    );
    println!("{}", summary.render());

    Ok(())
}
