//! Ledger Engine
//!
//! Executes buy/sell operations against a portfolio's cash and holdings as a
//! single atomic unit of work: balance mutation, holding upsert, transaction
//! record, and valuation snapshot either all commit or none do. Business-rule
//! failures (insufficient funds or holdings) abort before any write.
//!
//! After a successful commit the trade is handed to the advisory notifier,
//! which can neither delay the caller nor roll the commit back.

use crate::services::sqlite_store::{
    add_to_holding, fetch_holding, fetch_holdings, fetch_portfolio, insert_snapshot,
    insert_transaction, set_holding_quantity, update_portfolio_balances,
};
use crate::services::{AdvisoryNotifier, PriceCache, SqliteStore};
use crate::types::{
    CreateTransactionRequest, PortfolioWithHoldings, Snapshot, Transaction, TransactionType,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Portfolio not found: {0}")]
    PortfolioNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Insufficient holdings: need {needed}, have {available}")]
    InsufficientHoldings { needed: f64, available: f64 },

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("Portfolio name already in use: {0}")]
    DuplicatePortfolio(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Database(e.to_string())
    }
}

/// Outcome of a committed trade.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub portfolio: PortfolioWithHoldings,
    pub transaction: Transaction,
    pub snapshot: Snapshot,
}

/// Atomic trade executor.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<SqliteStore>,
    price_cache: Arc<PriceCache>,
    notifier: Arc<AdvisoryNotifier>,
}

impl LedgerService {
    pub fn new(
        store: Arc<SqliteStore>,
        price_cache: Arc<PriceCache>,
        notifier: Arc<AdvisoryNotifier>,
    ) -> Self {
        Self {
            store,
            price_cache,
            notifier,
        }
    }

    /// Execute a buy or sell against a portfolio.
    ///
    /// On success returns the updated portfolio with holdings; exactly one
    /// transaction and one snapshot have been appended. On failure no state
    /// has changed, and repeating the call reproduces the same failure.
    pub fn execute(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<PortfolioWithHoldings, LedgerError> {
        if request.amount <= 0.0 || !request.amount.is_finite() {
            return Err(LedgerError::InvalidTrade(
                "amount must be a positive number".to_string(),
            ));
        }
        if request.price < 0.0 || !request.price.is_finite() {
            return Err(LedgerError::InvalidTrade(
                "price must be non-negative".to_string(),
            ));
        }

        let outcome = self.store.with_transaction(|tx| {
            let portfolio = fetch_portfolio(tx, &request.portfolio_id)?
                .ok_or_else(|| LedgerError::PortfolioNotFound(request.portfolio_id.clone()))?;

            match request.tx_type {
                TransactionType::Buy => {
                    let cost = request.amount * request.price;
                    if portfolio.cash < cost {
                        return Err(LedgerError::InsufficientFunds {
                            needed: cost,
                            available: portfolio.cash,
                        });
                    }

                    update_portfolio_balances(
                        tx,
                        &portfolio.id,
                        portfolio.cash - cost,
                        portfolio.invested + cost,
                    )?;
                    add_to_holding(tx, &portfolio.id, &request.symbol, request.amount)?;
                }
                TransactionType::Sell => {
                    let held = fetch_holding(tx, &portfolio.id, &request.symbol)?
                        .map(|h| h.quantity)
                        .unwrap_or(0.0);
                    if held < request.amount {
                        return Err(LedgerError::InsufficientHoldings {
                            needed: request.amount,
                            available: held,
                        });
                    }

                    let gain = request.amount * request.price;
                    update_portfolio_balances(
                        tx,
                        &portfolio.id,
                        portfolio.cash + gain,
                        portfolio.invested,
                    )?;
                    // Left at zero on full liquidation; the row is not deleted
                    set_holding_quantity(tx, &portfolio.id, &request.symbol, held - request.amount)?;
                }
            }

            let record = Transaction::new(
                portfolio.id.clone(),
                request.symbol.clone(),
                request.tx_type,
                request.amount,
                request.price,
            );
            insert_transaction(tx, &record)?;

            // Reload post-trade state, then value it at the live cached
            // prices. Symbols without a cached quote value at 0 until the
            // feed converges; no fallback to the trade price.
            let portfolio = fetch_portfolio(tx, &request.portfolio_id)?
                .ok_or_else(|| LedgerError::PortfolioNotFound(request.portfolio_id.clone()))?;
            let holdings = fetch_holdings(tx, &portfolio.id)?;

            let holdings_value: f64 = holdings
                .iter()
                .map(|h| h.quantity * self.price_cache.get_current_price(&h.symbol))
                .sum();

            let snapshot = Snapshot {
                portfolio_id: portfolio.id.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                value: portfolio.cash + holdings_value,
            };
            insert_snapshot(tx, &snapshot)?;

            Ok(TradeOutcome {
                portfolio: PortfolioWithHoldings {
                    portfolio,
                    holdings,
                },
                transaction: record,
                snapshot,
            })
        })?;

        info!(
            "Executed {} {} {} @ {} for portfolio {}",
            outcome.transaction.tx_type,
            outcome.transaction.amount,
            outcome.transaction.symbol,
            outcome.transaction.price,
            outcome.transaction.portfolio_id,
        );

        // Strictly post-commit; the notifier cannot fail the trade
        self.notifier.notify(
            outcome.portfolio.clone(),
            outcome.transaction.clone(),
            self.price_cache.latest_map(),
        );

        Ok(outcome.portfolio)
    }
}
