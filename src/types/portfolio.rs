//! Portfolio Types
//!
//! A portfolio owns a cash balance and a set of holdings. All mutation goes
//! through the ledger service; these types are plain data carriers.

use serde::{Deserialize, Serialize};

/// A simulated investment portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    /// Unique portfolio ID (UUID v4).
    pub id: String,
    /// Owning user ID.
    pub user_id: String,
    /// Display name, unique per user.
    pub name: String,
    /// Available cash balance. Never negative after a committed trade.
    pub cash: f64,
    /// Cumulative amount spent on buys (informational).
    pub invested: f64,
    /// Creation timestamp (ms).
    pub created_at: i64,
    /// Last mutation timestamp (ms).
    pub updated_at: i64,
}

impl Portfolio {
    /// Create a new portfolio with the given starting cash.
    pub fn new(user_id: String, name: String, starting_cash: f64) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            name,
            cash: starting_cash,
            invested: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A quantity of one asset held by a portfolio.
///
/// Unique on (portfolio_id, symbol). Created on first buy; left in place at
/// zero quantity after a full liquidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub portfolio_id: String,
    /// Product identifier, e.g. "BTC-USD".
    pub symbol: String,
    /// Units held. Never negative.
    pub quantity: f64,
}

/// A portfolio together with its current holdings, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioWithHoldings {
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub holdings: Vec<Holding>,
}

/// Immutable point-in-time valuation of a portfolio.
///
/// One snapshot is appended per committed trade; the per-portfolio sequence
/// is ordered by timestamp and feeds risk analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub portfolio_id: String,
    /// Valuation timestamp (ms).
    pub timestamp: i64,
    /// Cash plus holdings valued at the live cached prices.
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portfolio_creation() {
        let portfolio = Portfolio::new("user-1".to_string(), "Main".to_string(), 1000.0);

        assert!(!portfolio.id.is_empty());
        assert_eq!(portfolio.user_id, "user-1");
        assert_eq!(portfolio.cash, 1000.0);
        assert_eq!(portfolio.invested, 0.0);
        assert_eq!(portfolio.created_at, portfolio.updated_at);
    }

    #[test]
    fn test_portfolio_with_holdings_flattens() {
        let portfolio = Portfolio::new("user-1".to_string(), "Main".to_string(), 500.0);
        let view = PortfolioWithHoldings {
            portfolio: portfolio.clone(),
            holdings: vec![Holding {
                portfolio_id: portfolio.id.clone(),
                symbol: "BTC-USD".to_string(),
                quantity: 0.5,
            }],
        };

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"cash\":500.0"));
        assert!(json.contains("\"holdings\""));
        assert!(json.contains("BTC-USD"));
    }
}
