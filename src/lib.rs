//! Simfolio - simulated cryptocurrency portfolio server
//!
//! An atomic trade ledger backed by SQLite, a live price cache fed from the
//! Coinbase Advanced Trade WebSocket feed, risk analytics over valuation
//! snapshots, and a WebSocket fan-out for connected clients.

pub mod api;
pub mod config;
pub mod services;
pub mod sources;
pub mod types;
pub mod websocket;

use std::sync::Arc;

use config::Config;
use services::{LedgerService, PriceCache, RiskService, SqliteStore};
use websocket::RoomManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SqliteStore>,
    pub price_cache: Arc<PriceCache>,
    pub ledger: LedgerService,
    pub risk: RiskService,
    pub room_manager: Arc<RoomManager>,
}
