//! Integration tests for the live price cache

use simfolio::services::PriceCache;
use simfolio::types::Ticker;

#[test]
fn test_update_overwrites_cached_entry() {
    let (cache, _rx) = PriceCache::new();

    cache.update(Ticker::with_price("BTC-USD", 50_000.0));
    cache.update(Ticker::with_price("BTC-USD", 51_250.5));

    assert_eq!(cache.get_current_price("BTC-USD"), 51_250.5);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_unknown_symbol_reads_as_zero() {
    let (cache, _rx) = PriceCache::new();

    // Deliberate sentinel: callers value unknown symbols at zero
    assert_eq!(cache.get_current_price("XYZ-USD"), 0.0);
    assert!(cache.get("XYZ-USD").is_none());
}

#[test]
fn test_latest_map_reflects_all_symbols() {
    let (cache, _rx) = PriceCache::new();

    cache.update(Ticker::with_price("BTC-USD", 50_000.0));
    cache.update(Ticker::with_price("ETH-USD", 3_000.0));

    let map = cache.latest_map();
    assert_eq!(map.len(), 2);
    assert_eq!(map["BTC-USD"].price, 50_000.0);
    assert_eq!(map["ETH-USD"].price, 3_000.0);
}

#[tokio::test]
async fn test_updates_are_broadcast_to_subscribers() {
    let (cache, mut rx) = PriceCache::new();
    let mut late_rx = cache.subscribe();

    cache.update(Ticker::with_price("BTC-USD", 42_000.0));

    let tick = rx.recv().await.unwrap();
    assert_eq!(tick.product_id, "BTC-USD");
    assert_eq!(tick.price, 42_000.0);

    let tick = late_rx.recv().await.unwrap();
    assert_eq!(tick.product_id, "BTC-USD");
}

#[test]
fn test_update_without_subscribers_does_not_fail() {
    let (cache, rx) = PriceCache::new();
    drop(rx);

    cache.update(Ticker::with_price("BTC-USD", 42_000.0));
    assert_eq!(cache.get_current_price("BTC-USD"), 42_000.0);
}
