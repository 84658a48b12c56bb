//! Advisory Notifier
//!
//! Fire-and-forget forwarding of committed trades, with the full market
//! snapshot, to an external advisory service. The ledger enqueues onto a
//! bounded channel and returns immediately; a background worker does the HTTP
//! work. Queue-full and delivery failures are logged and swallowed, never
//! surfaced to the trade's caller.

use crate::types::{PortfolioWithHoldings, Ticker, Transaction};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const QUEUE_CAPACITY: usize = 256;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload POSTed to the advisory service after each committed trade.
#[derive(Debug, Clone, Serialize)]
pub struct TradeNotification {
    // Field name fixed by the advisory service's API
    #[serde(rename = "portafolio")]
    pub portfolio: PortfolioWithHoldings,
    pub transaction: Transaction,
    pub market_data: HashMap<String, Ticker>,
}

/// Bounded-queue notification sink.
pub struct AdvisoryNotifier {
    tx: mpsc::Sender<TradeNotification>,
}

impl AdvisoryNotifier {
    /// Spawn the notifier worker. When `advisory_url` is `None` the worker
    /// drains the queue without sending anything.
    pub fn spawn(advisory_url: Option<String>) -> Arc<Self> {
        let (tx, mut rx) = mpsc::channel::<TradeNotification>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            let client = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default();

            let endpoint = advisory_url.map(|url| format!("{}/analyze-trade", url));
            match &endpoint {
                Some(url) => info!("Advisory notifier forwarding trades to {}", url),
                None => info!("Advisory notifier disabled (no ADVISORY_URL configured)"),
            }

            while let Some(notification) = rx.recv().await {
                let Some(url) = &endpoint else {
                    debug!(
                        "Dropping notification for transaction {} (notifier disabled)",
                        notification.transaction.id
                    );
                    continue;
                };

                match client.post(url).json(&notification).send().await {
                    Ok(response) if response.status().is_success() => {
                        debug!(
                            "Notified advisory service of transaction {}",
                            notification.transaction.id
                        );
                    }
                    Ok(response) => {
                        error!(
                            "Advisory service rejected transaction {}: {}",
                            notification.transaction.id,
                            response.status()
                        );
                    }
                    Err(e) => {
                        error!("Error notifying advisory service: {}", e);
                    }
                }
            }
        });

        Arc::new(Self { tx })
    }

    /// Enqueue a committed trade for delivery. Never blocks; a full queue is
    /// logged and the notification dropped.
    pub fn notify(
        &self,
        portfolio: PortfolioWithHoldings,
        transaction: Transaction,
        market_data: HashMap<String, Ticker>,
    ) {
        let notification = TradeNotification {
            portfolio,
            transaction,
            market_data,
        };

        if let Err(e) = self.tx.try_send(notification) {
            warn!("Advisory notification queue full, dropping trade event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Portfolio, TransactionType};

    #[test]
    fn test_notification_payload_field_names() {
        let portfolio = Portfolio::new("user-1".to_string(), "Main".to_string(), 1000.0);
        let notification = TradeNotification {
            portfolio: PortfolioWithHoldings {
                portfolio,
                holdings: Vec::new(),
            },
            transaction: Transaction::new(
                "p-1".to_string(),
                "BTC-USD".to_string(),
                TransactionType::Buy,
                1.0,
                100.0,
            ),
            market_data: HashMap::from([("BTC-USD".to_string(), Ticker::with_price("BTC-USD", 100.0))]),
        };

        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"portafolio\""));
        assert!(json.contains("\"market_data\""));
        assert!(json.contains("\"transaction\""));
    }

    #[tokio::test]
    async fn test_notify_never_blocks_without_consumer() {
        let notifier = AdvisoryNotifier::spawn(None);
        let portfolio = Portfolio::new("user-1".to_string(), "Main".to_string(), 1000.0);

        for _ in 0..10 {
            notifier.notify(
                PortfolioWithHoldings {
                    portfolio: portfolio.clone(),
                    holdings: Vec::new(),
                },
                Transaction::new(
                    portfolio.id.clone(),
                    "BTC-USD".to_string(),
                    TransactionType::Buy,
                    1.0,
                    100.0,
                ),
                HashMap::new(),
            );
        }
    }
}
