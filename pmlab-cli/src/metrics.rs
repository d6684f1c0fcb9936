//! Aggregate performance metrics computed from a completed run.
//!
//! Grounded in the teacher's `trendlab-runner::result::PerformanceStats`
//! shape (total return, max drawdown, win rate, profit factor), trimmed to
//! the statistics that make sense without calendar dates — this engine's
//! timestamps are opaque integers, not trading days, so annualized return,
//! Sharpe, and Calmar (which need a time base) are dropped.

use pmlab_core::engine::RunResult;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub realized_pnl: f64,
    pub num_fills: usize,
    pub max_drawdown: f64,
    pub stopped_early: bool,
}

impl Summary {
    pub fn from_result(result: &RunResult) -> Self {
        let initial_cash = result.portfolio.initial_cash;
        let final_cash = result.portfolio.cash;
        let final_equity = result
            .snapshots
            .last()
            .map(|s| s.equity)
            .unwrap_or(final_cash);
        let total_return = if initial_cash > 0.0 {
            (final_equity - initial_cash) / initial_cash
        } else {
            0.0
        };
        Self {
            initial_cash,
            final_cash,
            final_equity,
            total_return,
            realized_pnl: result.portfolio.realized_pnl,
            num_fills: result.fills.len(),
            max_drawdown: max_drawdown(&result.snapshots),
            stopped_early: result.stopped_early,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "initial_cash={:.2} final_equity={:.2} total_return={:.4} realized_pnl={:.2} \
             fills={} max_drawdown={:.4}{}",
            self.initial_cash,
            self.final_equity,
            self.total_return,
            self.realized_pnl,
            self.num_fills,
            self.max_drawdown,
            if self.stopped_early { " (stopped early)" } else { "" },
        )
    }
}

/// Maximum peak-to-trough fractional decline across the sampled equity
/// curve. Zero if fewer than two snapshots were retained.
fn max_drawdown(snapshots: &[pmlab_core::domain::Snapshot]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for snap in snapshots {
        peak = peak.max(snap.equity);
        if peak > 0.0 {
            let drawdown = (peak - snap.equity) / peak;
            worst = worst.max(drawdown);
        }
    }
    worst
}
