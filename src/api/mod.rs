pub mod health;
pub mod market;
pub mod portfolios;
pub mod transactions;

use crate::services::LedgerError;
use crate::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use serde::Serialize;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/portfolios", portfolios::router())
        .nest("/api/transactions", transactions::router())
        .nest("/api/market", market::router())
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Convert LedgerError to an HTTP response.
impl IntoResponse for LedgerError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            LedgerError::PortfolioNotFound(_) => (StatusCode::NOT_FOUND, "PORTFOLIO_NOT_FOUND"),
            LedgerError::TransactionNotFound(_) => {
                (StatusCode::NOT_FOUND, "TRANSACTION_NOT_FOUND")
            }
            LedgerError::InsufficientFunds { .. } => {
                (StatusCode::BAD_REQUEST, "INSUFFICIENT_FUNDS")
            }
            LedgerError::InsufficientHoldings { .. } => {
                (StatusCode::BAD_REQUEST, "INSUFFICIENT_HOLDINGS")
            }
            LedgerError::InvalidTrade(_) => (StatusCode::BAD_REQUEST, "INVALID_TRADE"),
            LedgerError::DuplicatePortfolio(_) => {
                (StatusCode::BAD_REQUEST, "DUPLICATE_PORTFOLIO")
            }
            LedgerError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
