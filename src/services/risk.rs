//! Risk Analytics
//!
//! Derives return, volatility, and risk-adjusted-return statistics from a
//! portfolio's ordered snapshot series. Fewer than [`MIN_DATA_POINTS`]
//! snapshots is not an error: the result is a zeroed metrics object carrying
//! an explanatory message.

use crate::services::ledger::LedgerError;
use crate::services::SqliteStore;
use crate::types::{RiskMetrics, Snapshot};
use std::sync::Arc;
use tracing::debug;

/// Minimum snapshots required for meaningful statistics.
pub const MIN_DATA_POINTS: usize = 7;

/// Fixed annualized risk-free rate used for excess returns.
pub const RISK_FREE_RATE_ANNUAL: f64 = 0.02;

const MS_PER_DAY: i64 = 86_400_000;

/// Snapshot-series risk calculator.
#[derive(Clone)]
pub struct RiskService {
    store: Arc<SqliteStore>,
}

impl RiskService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Compute risk metrics for a portfolio's full snapshot history.
    pub fn calculate_risk_metrics(&self, portfolio_id: &str) -> Result<RiskMetrics, LedgerError> {
        if self.store.get_portfolio(portfolio_id).is_none() {
            return Err(LedgerError::PortfolioNotFound(portfolio_id.to_string()));
        }

        let snapshots = self.store.get_snapshots(portfolio_id);
        debug!(
            "Computing risk metrics for {} over {} snapshots",
            portfolio_id,
            snapshots.len()
        );
        Ok(compute_risk_metrics(&snapshots))
    }
}

/// Compute risk metrics over a snapshot series ordered by timestamp ascending.
pub fn compute_risk_metrics(snapshots: &[Snapshot]) -> RiskMetrics {
    if snapshots.len() < MIN_DATA_POINTS {
        return RiskMetrics::degenerate(
            snapshots.len(),
            RISK_FREE_RATE_ANNUAL,
            format!(
                "Not enough history for risk analysis: {} snapshots, need {}",
                snapshots.len(),
                MIN_DATA_POINTS
            ),
        );
    }

    // Period returns; entries with a non-positive previous value are skipped
    // rather than zero-filled.
    let mut returns = Vec::with_capacity(snapshots.len() - 1);
    for pair in snapshots.windows(2) {
        let (prev, curr) = (pair[0].value, pair[1].value);
        if prev > 0.0 {
            returns.push((curr - prev) / prev);
        }
    }

    let average_return = mean(&returns);
    let volatility = population_std_dev(&returns, average_return);

    let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_volatility = if negative.is_empty() {
        0.0
    } else {
        let downside_mean = mean(&negative);
        population_std_dev(&negative, downside_mean)
    };

    let risk_free_daily = RISK_FREE_RATE_ANNUAL / 365.0;
    let excess_return = average_return - risk_free_daily;

    let sharpe_ratio = if volatility > 0.0 {
        excess_return / volatility
    } else {
        0.0
    };

    // With no negative returns to penalize, the Sortino ratio degenerates to
    // a signed infinity on the sign of the excess return.
    let sortino_ratio = if downside_volatility > 0.0 {
        excess_return / downside_volatility
    } else if excess_return >= 0.0 {
        f64::INFINITY
    } else {
        f64::NEG_INFINITY
    };

    let initial = snapshots[0].value;
    let final_value = snapshots[snapshots.len() - 1].value;
    let total_return = if initial > 0.0 {
        (final_value - initial) / initial
    } else {
        0.0
    };

    let max_drawdown = max_drawdown(snapshots);

    let period_days =
        (snapshots[snapshots.len() - 1].timestamp - snapshots[0].timestamp) / MS_PER_DAY;

    RiskMetrics {
        sharpe_ratio: round4(sharpe_ratio),
        sortino_ratio: round4(sortino_ratio),
        average_return: round6(average_return),
        volatility: round6(volatility),
        downside_volatility: round6(downside_volatility),
        total_return: round4(total_return),
        max_drawdown: round4(max_drawdown),
        data_points: snapshots.len(),
        period_days,
        risk_free_rate: RISK_FREE_RATE_ANNUAL,
        message: None,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by N, not N-1).
fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Largest peak-to-trough decline across the series.
fn max_drawdown(snapshots: &[Snapshot]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;

    for snapshot in snapshots {
        peak = peak.max(snapshot.value);
        if peak > 0.0 {
            let drawdown = (peak - snapshot.value) / peak;
            worst = worst.max(drawdown);
        }
    }

    worst
}

fn round4(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    (value * 10_000.0).round() / 10_000.0
}

fn round6(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    (value * 1_000_000.0).round() / 1_000_000.0
}
