//! Integration tests for the atomic trade ledger
//!
//! Tests cover:
//! - Buy and sell balance arithmetic
//! - Rejection paths (funds, holdings, validation) leaving no trace
//! - Snapshot append behavior
//! - Zero-quantity holding retention

use std::sync::Arc;

use simfolio::services::{
    AdvisoryNotifier, LedgerError, LedgerService, PriceCache, SqliteStore,
};
use simfolio::types::*;

fn trade(
    portfolio_id: &str,
    symbol: &str,
    tx_type: TransactionType,
    amount: f64,
    price: f64,
) -> CreateTransactionRequest {
    CreateTransactionRequest {
        portfolio_id: portfolio_id.to_string(),
        symbol: symbol.to_string(),
        tx_type,
        amount,
        price,
    }
}

/// Fresh in-memory ledger with one funded portfolio and a live BTC-USD quote.
fn setup(starting_cash: f64) -> (LedgerService, Arc<SqliteStore>, Arc<PriceCache>, Portfolio) {
    let store = Arc::new(SqliteStore::new_in_memory().unwrap());
    let (price_cache, _rx) = PriceCache::new();
    price_cache.update(Ticker::with_price("BTC-USD", 50_000.0));

    let notifier = AdvisoryNotifier::spawn(None);
    let ledger = LedgerService::new(store.clone(), price_cache.clone(), notifier);

    let portfolio = Portfolio::new("user-1".to_string(), "Main".to_string(), starting_cash);
    store.create_portfolio(&portfolio).unwrap();

    (ledger, store, price_cache, portfolio)
}

// =============================================================================
// Buy Path
// =============================================================================

#[tokio::test]
async fn test_buy_updates_balances_and_holdings() {
    let (ledger, store, price_cache, portfolio) = setup(1000.0);

    let result = ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 2.0, 100.0))
        .unwrap();

    assert_eq!(result.portfolio.cash, 800.0);
    assert_eq!(result.portfolio.invested, 200.0);
    assert_eq!(result.holdings.len(), 1);
    assert_eq!(result.holdings[0].symbol, "BTC-USD");
    assert_eq!(result.holdings[0].quantity, 2.0);

    // Snapshot is valued at the live cached price, not the trade price
    let snapshots = store.get_snapshots(&portfolio.id);
    assert_eq!(snapshots.len(), 1);
    let expected = 800.0 + 2.0 * price_cache.get_current_price("BTC-USD");
    assert_eq!(snapshots[0].value, expected);
}

#[tokio::test]
async fn test_repeat_buys_accumulate_one_holding_row() {
    let (ledger, store, _cache, portfolio) = setup(1000.0);

    ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 1.0, 100.0))
        .unwrap();
    let result = ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 3.0, 50.0))
        .unwrap();

    assert_eq!(result.holdings.len(), 1);
    assert_eq!(result.holdings[0].quantity, 4.0);
    assert_eq!(result.portfolio.cash, 750.0);
    assert_eq!(result.portfolio.invested, 250.0);
    assert_eq!(store.transaction_count(&portfolio.id), 2);
}

#[tokio::test]
async fn test_buy_with_insufficient_funds_leaves_no_trace() {
    let (ledger, store, _cache, portfolio) = setup(100.0);

    let err = ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 5.0, 100.0))
        .unwrap_err();

    match err {
        LedgerError::InsufficientFunds { needed, available } => {
            assert_eq!(needed, 500.0);
            assert_eq!(available, 100.0);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    // Nothing persisted: balances, holdings, transactions, snapshots all untouched
    let view = store.get_portfolio_with_holdings(&portfolio.id).unwrap();
    assert_eq!(view.portfolio.cash, 100.0);
    assert_eq!(view.portfolio.invested, 0.0);
    assert!(view.holdings.is_empty());
    assert_eq!(store.transaction_count(&portfolio.id), 0);
    assert!(store.get_snapshots(&portfolio.id).is_empty());
}

// =============================================================================
// Sell Path
// =============================================================================

#[tokio::test]
async fn test_sell_credits_cash_and_reduces_quantity() {
    let (ledger, _store, _cache, portfolio) = setup(1000.0);

    ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 2.0, 100.0))
        .unwrap();
    let result = ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Sell, 1.0, 120.0))
        .unwrap();

    assert_eq!(result.portfolio.cash, 920.0);
    assert_eq!(result.holdings[0].quantity, 1.0);
}

#[tokio::test]
async fn test_sell_more_than_held_is_rejected() {
    let (ledger, store, _cache, portfolio) = setup(1000.0);

    ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 2.0, 100.0))
        .unwrap();
    let err = ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Sell, 5.0, 120.0))
        .unwrap_err();

    match err {
        LedgerError::InsufficientHoldings { needed, available } => {
            assert_eq!(needed, 5.0);
            assert_eq!(available, 2.0);
        }
        other => panic!("expected InsufficientHoldings, got {other:?}"),
    }

    let view = store.get_portfolio_with_holdings(&portfolio.id).unwrap();
    assert_eq!(view.portfolio.cash, 800.0);
    assert_eq!(view.holdings[0].quantity, 2.0);
    assert_eq!(store.transaction_count(&portfolio.id), 1);
}

#[tokio::test]
async fn test_sell_without_any_holding_is_rejected() {
    let (ledger, _store, _cache, portfolio) = setup(1000.0);

    let err = ledger
        .execute(trade(&portfolio.id, "ETH-USD", TransactionType::Sell, 1.0, 50.0))
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientHoldings { .. }));
}

#[tokio::test]
async fn test_selling_out_keeps_zero_quantity_row() {
    let (ledger, store, _cache, portfolio) = setup(1000.0);

    ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 2.0, 100.0))
        .unwrap();
    let result = ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Sell, 2.0, 100.0))
        .unwrap();

    // The row stays at zero quantity rather than being deleted
    assert_eq!(result.holdings.len(), 1);
    assert_eq!(result.holdings[0].quantity, 0.0);
    assert_eq!(result.portfolio.cash, 1000.0);

    let holdings = store.get_holdings(&portfolio.id);
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].quantity, 0.0);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_unknown_portfolio_is_rejected() {
    let (ledger, _store, _cache, _portfolio) = setup(1000.0);

    let err = ledger
        .execute(trade("no-such-id", "BTC-USD", TransactionType::Buy, 1.0, 100.0))
        .unwrap_err();

    assert!(matches!(err, LedgerError::PortfolioNotFound(_)));
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected() {
    let (ledger, store, _cache, portfolio) = setup(1000.0);

    for amount in [0.0, -1.0, f64::NAN] {
        let err = ledger
            .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, amount, 100.0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTrade(_)));
    }

    assert_eq!(store.transaction_count(&portfolio.id), 0);
}

#[tokio::test]
async fn test_negative_price_is_rejected() {
    let (ledger, _store, _cache, portfolio) = setup(1000.0);

    let err = ledger
        .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 1.0, -5.0))
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidTrade(_)));
}

// =============================================================================
// Snapshots
// =============================================================================

#[tokio::test]
async fn test_each_trade_appends_exactly_one_snapshot() {
    let (ledger, store, _cache, portfolio) = setup(1000.0);

    for i in 1..=3 {
        ledger
            .execute(trade(&portfolio.id, "BTC-USD", TransactionType::Buy, 1.0, 100.0))
            .unwrap();
        assert_eq!(store.snapshot_count(&portfolio.id), i);
    }

    let snapshots = store.get_snapshots(&portfolio.id);
    for pair in snapshots.windows(2) {
        assert!(pair[1].timestamp >= pair[0].timestamp);
    }
}

#[tokio::test]
async fn test_snapshot_values_unknown_symbols_at_zero() {
    let (ledger, store, _cache, portfolio) = setup(1000.0);

    // No cached quote for ETH-USD; the holding contributes nothing
    ledger
        .execute(trade(&portfolio.id, "ETH-USD", TransactionType::Buy, 4.0, 50.0))
        .unwrap();

    let snapshots = store.get_snapshots(&portfolio.id);
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].value, 800.0);
}
