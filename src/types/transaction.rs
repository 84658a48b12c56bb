//! Transaction Types

use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "BUY"),
            TransactionType::Sell => write!(f, "SELL"),
        }
    }
}

/// An executed trade, append-only; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUID v4).
    pub id: String,
    pub portfolio_id: String,
    /// Product identifier, e.g. "BTC-USD".
    pub symbol: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Units traded.
    pub amount: f64,
    /// Unit price the trade settled at.
    pub price: f64,
    /// Execution timestamp (ms).
    pub timestamp: i64,
}

impl Transaction {
    pub fn new(
        portfolio_id: String,
        symbol: String,
        tx_type: TransactionType,
        amount: f64,
        price: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id,
            symbol,
            tx_type,
            amount,
            price,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Request body for executing a trade.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionRequest {
    pub portfolio_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: f64,
    pub price: f64,
}
