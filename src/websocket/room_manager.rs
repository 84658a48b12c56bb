use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A client's subscription information.
pub struct ClientSubscription {
    /// Subscribed product symbols.
    pub symbols: HashSet<String>,
    /// Channel to send messages to the client.
    pub tx: mpsc::UnboundedSender<String>,
}

/// Manages WebSocket client subscriptions for the live tick feed.
///
/// Every tick is broadcast to all connected clients; per-symbol rooms track
/// the interest groups that also receive targeted broadcasts.
pub struct RoomManager {
    /// Client subscriptions keyed by client ID.
    pub clients: DashMap<Uuid, ClientSubscription>,
    /// Symbol rooms: product id -> set of client IDs.
    rooms: DashMap<String, HashSet<Uuid>>,
}

impl RoomManager {
    /// Create a new room manager.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            clients: DashMap::new(),
            rooms: DashMap::new(),
        })
    }

    /// Register a new client.
    pub fn register(&self, tx: mpsc::UnboundedSender<String>) -> Uuid {
        let client_id = Uuid::new_v4();
        self.clients.insert(
            client_id,
            ClientSubscription {
                symbols: HashSet::new(),
                tx,
            },
        );
        client_id
    }

    /// Unregister a client and remove it from all rooms.
    pub fn unregister(&self, client_id: Uuid) {
        if let Some((_, subscription)) = self.clients.remove(&client_id) {
            for symbol in subscription.symbols {
                if let Some(mut room) = self.rooms.get_mut(&symbol) {
                    room.remove(&client_id);
                }
            }
        }
    }

    /// Subscribe a client to symbols. Returns the newly added ones.
    pub fn subscribe(&self, client_id: Uuid, symbols: &[String]) -> Vec<String> {
        let mut subscribed = Vec::new();

        if let Some(mut client) = self.clients.get_mut(&client_id) {
            for symbol in symbols {
                let symbol_upper = symbol.to_uppercase();
                if client.symbols.insert(symbol_upper.clone()) {
                    subscribed.push(symbol_upper.clone());

                    self.rooms
                        .entry(symbol_upper)
                        .or_insert_with(HashSet::new)
                        .insert(client_id);
                }
            }
        }

        subscribed
    }

    /// Unsubscribe a client from symbols. Returns the ones removed.
    pub fn unsubscribe(&self, client_id: Uuid, symbols: &[String]) -> Vec<String> {
        let mut unsubscribed = Vec::new();

        if let Some(mut client) = self.clients.get_mut(&client_id) {
            for symbol in symbols {
                let symbol_upper = symbol.to_uppercase();
                if client.symbols.remove(&symbol_upper) {
                    unsubscribed.push(symbol_upper.clone());

                    if let Some(mut room) = self.rooms.get_mut(&symbol_upper) {
                        room.remove(&client_id);
                    }
                }
            }
        }

        unsubscribed
    }

    /// Broadcast a message to all clients subscribed to a symbol.
    pub fn broadcast(&self, symbol: &str, message: &str) {
        let symbol_upper = symbol.to_uppercase();

        let client_ids: Vec<Uuid> = self
            .rooms
            .get(&symbol_upper)
            .map(|room| room.iter().copied().collect())
            .unwrap_or_default();

        for id in client_ids {
            if let Some(client) = self.clients.get(&id) {
                let _ = client.tx.send(message.to_string());
            }
        }
    }

    /// Broadcast a message to every connected client.
    pub fn broadcast_all(&self, message: &str) {
        for client in self.clients.iter() {
            let _ = client.tx.send(message.to_string());
        }
    }

    /// Get the number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self {
            clients: DashMap::new(),
            rooms: DashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_broadcast() {
        let manager = RoomManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let client_id = manager.register(tx);
        let subscribed = manager.subscribe(client_id, &["btc-usd".to_string()]);
        assert_eq!(subscribed, vec!["BTC-USD".to_string()]);

        manager.broadcast("BTC-USD", "tick");
        assert_eq!(rx.try_recv().unwrap(), "tick");

        // Not subscribed to this one; only broadcast_all reaches it
        manager.broadcast("ETH-USD", "other");
        assert!(rx.try_recv().is_err());

        manager.broadcast_all("global");
        assert_eq!(rx.try_recv().unwrap(), "global");
    }

    #[test]
    fn test_unregister_cleans_rooms() {
        let manager = RoomManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let client_id = manager.register(tx);
        manager.subscribe(client_id, &["BTC-USD".to_string()]);
        manager.unregister(client_id);

        assert_eq!(manager.client_count(), 0);
        manager.broadcast("BTC-USD", "tick");
        assert!(rx.try_recv().is_err());
    }
}
