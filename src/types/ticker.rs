//! Ticker Types
//!
//! Latest known market quote for one trading symbol. Overwritten in place on
//! every tick; no history is retained.

use serde::{Deserialize, Serialize};

/// A market quote as cached from the exchange feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// Product identifier, e.g. "BTC-USD".
    pub product_id: String,
    /// Last trade price.
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_bid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_ask: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_percent_chg_24h: Option<f64>,
    /// Local receive timestamp (ms).
    pub timestamp: i64,
}

impl Ticker {
    /// Minimal ticker with just a price (used by tests and manual seeding).
    pub fn with_price(product_id: &str, price: f64) -> Self {
        Self {
            product_id: product_id.to_string(),
            price,
            volume_24h: None,
            low_24h: None,
            high_24h: None,
            best_bid: None,
            best_ask: None,
            price_percent_chg_24h: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
