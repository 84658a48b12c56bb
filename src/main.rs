use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use simfolio::config::Config;
use simfolio::services::{AdvisoryNotifier, LedgerService, PriceCache, RiskService, SqliteStore};
use simfolio::sources::CoinbaseWs;
use simfolio::types::ServerMessage;
use simfolio::websocket::RoomManager;
use simfolio::{api, websocket, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simfolio=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Simfolio server on {}:{}", config.host, config.port);

    // Open the ledger store
    let store = Arc::new(SqliteStore::new(&config.database_path)?);

    // Live price cache fed by the Coinbase feed
    let (price_cache, mut price_rx) = PriceCache::new();

    // Advisory notifier (no-op worker when ADVISORY_URL is unset)
    let notifier = AdvisoryNotifier::spawn(config.advisory_url.clone());

    let ledger = LedgerService::new(store.clone(), price_cache.clone(), notifier);
    let risk = RiskService::new(store.clone());

    // Start the Coinbase ticker feed
    {
        let feed = CoinbaseWs::new(
            config.coinbase_ws_url.clone(),
            config.product_ids.clone(),
            price_cache.clone(),
        );
        tokio::spawn(async move {
            feed.connect().await;
        });
    }

    // Create room manager for WebSocket subscriptions
    let room_manager = RoomManager::new();

    // Fan ticker updates out to connected WebSocket clients
    {
        let room_manager = room_manager.clone();
        tokio::spawn(async move {
            loop {
                match price_rx.recv().await {
                    Ok(ticker) => {
                        let product_id = ticker.product_id.clone();
                        let msg = ServerMessage::Ticker { data: ticker };
                        match serde_json::to_string(&msg) {
                            Ok(json) => {
                                room_manager.broadcast(&product_id, &json);
                                room_manager.broadcast_all(&json);
                            }
                            Err(e) => error!("Failed to serialize ticker update: {}", e),
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Ticker fan-out lagged, skipped {} updates", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // Create application state
    let state = AppState {
        config: config.clone(),
        store,
        price_cache,
        ledger,
        risk,
        room_manager,
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .route("/ws", get(websocket::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Simfolio server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
