//! Transaction API
//!
//! - POST /api/transactions     - Execute a trade against a portfolio
//! - GET  /api/transactions     - List transactions (filterable)
//! - GET  /api/transactions/:id - Fetch a single transaction

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::ApiResponse;
use crate::services::LedgerError;
use crate::types::{CreateTransactionRequest, PortfolioWithHoldings, Transaction};
use crate::AppState;

const DEFAULT_LIMIT: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(execute_transaction))
        .route("/:id", get(get_transaction))
}

#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub portfolio_id: Option<String>,
    pub symbol: Option<String>,
    pub limit: Option<usize>,
}

/// POST /api/transactions
///
/// Runs the trade through the ledger. On success the response carries the
/// updated portfolio with its holdings; on failure nothing was persisted.
async fn execute_transaction(
    State(state): State<AppState>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<Json<ApiResponse<PortfolioWithHoldings>>, LedgerError> {
    let portfolio = state.ledger.execute(request)?;
    Ok(Json(ApiResponse { data: portfolio }))
}

/// GET /api/transactions?portfolio_id=&symbol=&limit=
async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Json<ApiResponse<Vec<Transaction>>> {
    let transactions = state.store.get_transactions(
        query.portfolio_id.as_deref(),
        query.symbol.as_deref(),
        query.limit.unwrap_or(DEFAULT_LIMIT),
    );
    Json(ApiResponse { data: transactions })
}

/// GET /api/transactions/:id
async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Transaction>>, LedgerError> {
    let transaction = state
        .store
        .get_transaction(&id)
        .ok_or(LedgerError::TransactionNotFound(id))?;

    Ok(Json(ApiResponse { data: transaction }))
}
