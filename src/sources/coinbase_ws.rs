//! Coinbase Advanced Trade WebSocket feed.
//!
//! Maintains one persistent connection for the lifetime of the process,
//! subscribed to the configured symbol list on the ticker channel. On close
//! or error it reconnects after a fixed 5 second delay, forever: the cache it
//! feeds is best-effort, so there is no retry limit and no backoff growth.
//! Malformed messages are dropped without disturbing the connection.

use crate::services::PriceCache;
use crate::types::Ticker;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const RECONNECT_DELAY_SECS: u64 = 5;

/// Subscription message for the ticker channel.
#[derive(Debug, Serialize)]
struct SubscribeMessage {
    #[serde(rename = "type")]
    msg_type: String,
    channel: String,
    product_ids: Vec<String>,
}

/// Inbound feed message; quote batches arrive as events of tickers.
#[derive(Debug, Deserialize)]
struct FeedMessage {
    #[serde(default)]
    events: Vec<FeedEvent>,
}

#[derive(Debug, Deserialize)]
struct FeedEvent {
    #[serde(default)]
    tickers: Vec<RawTicker>,
}

/// Raw quote fields as the exchange sends them (all stringly typed).
#[derive(Debug, Deserialize)]
struct RawTicker {
    product_id: String,
    price: Option<String>,
    volume_24_h: Option<String>,
    low_24_h: Option<String>,
    high_24_h: Option<String>,
    best_bid: Option<String>,
    best_ask: Option<String>,
    price_percent_chg_24_h: Option<String>,
}

/// Coinbase WebSocket client feeding the price cache.
#[derive(Clone)]
pub struct CoinbaseWs {
    url: String,
    product_ids: Vec<String>,
    price_cache: Arc<PriceCache>,
}

impl CoinbaseWs {
    pub fn new(url: String, product_ids: Vec<String>, price_cache: Arc<PriceCache>) -> Self {
        Self {
            url,
            product_ids,
            price_cache,
        }
    }

    /// Connect and keep receiving quotes until process shutdown.
    pub async fn connect(&self) {
        loop {
            match self.run_connection().await {
                Ok(_) => {
                    warn!("Coinbase WebSocket disconnected, reconnecting in {}s", RECONNECT_DELAY_SECS);
                }
                Err(e) => {
                    error!("Coinbase WebSocket error: {}, reconnecting in {}s", e, RECONNECT_DELAY_SECS);
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(RECONNECT_DELAY_SECS)).await;
        }
    }

    async fn run_connection(&self) -> anyhow::Result<()> {
        info!("Connecting to Coinbase WebSocket at {}", self.url);
        let (ws_stream, _) = connect_async(&self.url).await?;
        let (mut write, mut read) = ws_stream.split();
        info!("Connected to Coinbase WebSocket");

        let subscribe_msg = SubscribeMessage {
            msg_type: "subscribe".to_string(),
            channel: "ticker".to_string(),
            product_ids: self.product_ids.clone(),
        };
        write
            .send(Message::Text(serde_json::to_string(&subscribe_msg)?))
            .await?;
        info!("Subscribed to tickers for {} products", self.product_ids.len());

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    self.handle_message(&text);
                }
                Ok(Message::Ping(data)) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Ok(Message::Close(_)) => {
                    info!("Coinbase WebSocket closed by server");
                    break;
                }
                Err(e) => {
                    error!("Coinbase WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Parse a quote batch and overwrite the cache entry per symbol.
    /// Unexpected shapes deserialize to empty event lists and fall through.
    fn handle_message(&self, text: &str) {
        let msg: FeedMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                debug!("Dropping unparseable feed message: {}", e);
                return;
            }
        };

        let timestamp = chrono::Utc::now().timestamp_millis();

        for event in msg.events {
            for raw in event.tickers {
                let price: f64 = match raw.price.as_deref().and_then(|p| p.parse().ok()) {
                    Some(p) => p,
                    None => {
                        debug!("Dropping tick for {} without a numeric price", raw.product_id);
                        continue;
                    }
                };

                debug!("Coinbase tick: {} = ${}", raw.product_id, price);

                self.price_cache.update(Ticker {
                    product_id: raw.product_id,
                    price,
                    volume_24h: parse_opt(raw.volume_24_h),
                    low_24h: parse_opt(raw.low_24_h),
                    high_24h: parse_opt(raw.high_24_h),
                    best_bid: parse_opt(raw.best_bid),
                    best_ask: parse_opt(raw.best_ask),
                    price_percent_chg_24h: parse_opt(raw.price_percent_chg_24_h),
                    timestamp,
                });
            }
        }
    }
}

fn parse_opt(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (CoinbaseWs, Arc<PriceCache>) {
        let (cache, _rx) = PriceCache::new();
        let ws = CoinbaseWs::new(
            "wss://example.invalid".to_string(),
            vec!["BTC-USD".to_string()],
            cache.clone(),
        );
        (ws, cache)
    }

    #[test]
    fn test_ticker_batch_updates_cache() {
        let (ws, cache) = client();

        ws.handle_message(
            r#"{"channel":"ticker","events":[{"type":"update","tickers":[
                {"product_id":"BTC-USD","price":"50000.5","volume_24_h":"1234.5",
                 "best_bid":"50000.0","best_ask":"50001.0"},
                {"product_id":"ETH-USD","price":"3000.25"}
            ]}]}"#,
        );

        assert_eq!(cache.get_current_price("BTC-USD"), 50000.5);
        assert_eq!(cache.get_current_price("ETH-USD"), 3000.25);
        let btc = cache.get("BTC-USD").unwrap();
        assert_eq!(btc.best_bid, Some(50000.0));
        assert_eq!(btc.volume_24h, Some(1234.5));
    }

    #[test]
    fn test_malformed_messages_are_dropped() {
        let (ws, cache) = client();

        ws.handle_message("not json at all");
        ws.handle_message(r#"{"type":"subscriptions"}"#);
        ws.handle_message(r#"{"events":[{"tickers":[{"product_id":"BTC-USD","price":"abc"}]}]}"#);
        ws.handle_message(r#"{"events":[{"tickers":[{"product_id":"BTC-USD"}]}]}"#);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_subscribe_message_shape() {
        let msg = SubscribeMessage {
            msg_type: "subscribe".to_string(),
            channel: "ticker".to_string(),
            product_ids: vec!["BTC-USD".to_string()],
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"subscribe\""));
        assert!(json.contains("\"channel\":\"ticker\""));
        assert!(json.contains("\"product_ids\":[\"BTC-USD\"]"));
    }
}
