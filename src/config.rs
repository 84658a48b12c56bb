//! Server configuration, loaded from environment variables.

use std::env;

const DEFAULT_PRODUCTS: &[&str] = &[
    "BTC-USD", "ETH-USD", "USDT-USD", "XRP-USD", "SOL-USD", "DOGE-USD", "ADA-USD", "LINK-USD",
    "AVAX-USD", "XLM-USD", "SUI-USD", "BCH-USD", "HBAR-USD", "LTC-USD", "SHIB-USD", "CRO-USD",
    "DOT-USD", "ENA-USD", "TAO-USD", "ETC-USD",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub coinbase_ws_url: String,
    /// Base URL of the advisory service; notifications are skipped when unset.
    pub advisory_url: Option<String>,
    pub product_ids: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "simfolio.db".to_string());
        let coinbase_ws_url = env::var("COINBASE_WS_URL")
            .unwrap_or_else(|_| "wss://advanced-trade-ws.coinbase.com".to_string());
        let advisory_url = env::var("ADVISORY_URL").ok().filter(|u| !u.is_empty());
        let product_ids = env::var("PRODUCT_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| DEFAULT_PRODUCTS.iter().map(|s| s.to_string()).collect());

        Self {
            host,
            port,
            database_path,
            coinbase_ws_url,
            advisory_url,
            product_ids,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_products_are_usd_pairs() {
        assert_eq!(DEFAULT_PRODUCTS.len(), 20);
        for product in DEFAULT_PRODUCTS {
            assert!(product.ends_with("-USD"), "unexpected pair {product}");
        }
    }
}
