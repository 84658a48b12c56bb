//! WebSocket message types for the live price fan-out.

use super::Ticker;
use serde::{Deserialize, Serialize};

/// Incoming WebSocket message from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { symbols: Vec<String> },
    Unsubscribe { symbols: Vec<String> },
}

/// Outgoing WebSocket message to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A fresh market quote.
    Ticker { data: Ticker },
    Subscribed { symbols: Vec<String> },
    Unsubscribed { symbols: Vec<String> },
    Error { error: String },
}
