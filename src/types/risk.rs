//! Risk Metrics Types

use serde::{Deserialize, Serialize};

/// Derived risk statistics over a portfolio's snapshot series.
///
/// Ratios are rounded to 4 decimals and return/volatility figures to 6 for
/// presentation stability. `sortino_ratio` may legitimately be infinite when
/// the series has no negative returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub average_return: f64,
    pub volatility: f64,
    pub downside_volatility: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Number of snapshots the metrics were computed from.
    pub data_points: usize,
    /// Whole days between first and last snapshot.
    pub period_days: i64,
    /// Annualized risk-free rate used for excess returns.
    pub risk_free_rate: f64,
    /// Set when the series is too short for meaningful statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RiskMetrics {
    /// All-zero metrics for a series too short to analyze. This is a defined
    /// degenerate result, not an error.
    pub fn degenerate(data_points: usize, risk_free_rate: f64, message: String) -> Self {
        Self {
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            average_return: 0.0,
            volatility: 0.0,
            downside_volatility: 0.0,
            total_return: 0.0,
            max_drawdown: 0.0,
            data_points,
            period_days: 0,
            risk_free_rate,
            message: Some(message),
        }
    }
}
