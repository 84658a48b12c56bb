use crate::types::Ticker;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Latest-value-wins cache of market quotes.
///
/// A single writer (the exchange feed handler) overwrites entries while any
/// number of readers call [`get_current_price`](Self::get_current_price)
/// concurrently. No ordering or delivery guarantee is made about ticks.
pub struct PriceCache {
    /// Quotes keyed by product id ("BTC-USD").
    tickers: DashMap<String, Ticker>,
    /// Broadcast channel for live tick fan-out.
    tx: broadcast::Sender<Ticker>,
}

impl PriceCache {
    /// Create a new price cache.
    pub fn new() -> (Arc<Self>, broadcast::Receiver<Ticker>) {
        let (tx, rx) = broadcast::channel(1024);
        let cache = Arc::new(Self {
            tickers: DashMap::new(),
            tx,
        });
        (cache, rx)
    }

    /// Subscribe to tick updates.
    pub fn subscribe(&self) -> broadcast::Receiver<Ticker> {
        self.tx.subscribe()
    }

    /// Overwrite the cached quote for a symbol and publish the tick.
    pub fn update(&self, ticker: Ticker) {
        self.tickers.insert(ticker.product_id.clone(), ticker.clone());

        // Ignore send errors when no receivers are attached
        let _ = self.tx.send(ticker);
    }

    /// Current price for a symbol, or 0.0 when no quote has arrived yet.
    ///
    /// Callers must treat 0.0 as "unknown", not "valueless": the cache is
    /// empty right after startup and for unsubscribed symbols.
    pub fn get_current_price(&self, product_id: &str) -> f64 {
        match self.tickers.get(product_id) {
            Some(ticker) => ticker.price,
            None => {
                warn!("No cached price for {}, returning 0", product_id);
                0.0
            }
        }
    }

    /// Full cached quote for a symbol, if any.
    pub fn get(&self, product_id: &str) -> Option<Ticker> {
        self.tickers.get(product_id).map(|t| t.clone())
    }

    /// Snapshot of every cached quote, for the notification payload and the
    /// market API.
    pub fn latest_map(&self) -> HashMap<String, Ticker> {
        self.tickers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of symbols with a cached quote.
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_symbol_returns_zero() {
        let (cache, _rx) = PriceCache::new();
        assert_eq!(cache.get_current_price("UNKNOWN-USD"), 0.0);
        assert!(cache.get("UNKNOWN-USD").is_none());
    }

    #[test]
    fn test_latest_tick_wins() {
        let (cache, _rx) = PriceCache::new();

        cache.update(Ticker::with_price("BTC-USD", 50_000.0));
        cache.update(Ticker::with_price("BTC-USD", 50_250.0));

        assert_eq!(cache.get_current_price("BTC-USD"), 50_250.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_broadcast_delivers_tick() {
        let (cache, mut rx) = PriceCache::new();

        cache.update(Ticker::with_price("ETH-USD", 3000.0));

        let tick = tokio_test::block_on(rx.recv()).unwrap();
        assert_eq!(tick.product_id, "ETH-USD");
        assert_eq!(tick.price, 3000.0);
    }
}
