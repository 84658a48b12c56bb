//! Portfolio API
//!
//! - GET  /api/portfolios?user_id=     - List a user's portfolios
//! - POST /api/portfolios              - Create a portfolio
//! - GET  /api/portfolios/:id          - Get a portfolio with holdings
//! - GET  /api/portfolios/:id/value    - Current total valuation
//! - GET  /api/portfolios/:id/snapshots    - Full valuation history
//! - GET  /api/portfolios/:id/risk-metrics - Derived risk statistics

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::ApiResponse;
use crate::services::LedgerError;
use crate::types::{Portfolio, PortfolioWithHoldings, RiskMetrics, Snapshot};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_portfolios).post(create_portfolio))
        .route("/:id", get(get_portfolio))
        .route("/:id/value", get(get_portfolio_value))
        .route("/:id/snapshots", get(get_snapshots))
        .route("/:id/risk-metrics", get(get_risk_metrics))
}

#[derive(Debug, Deserialize)]
pub struct ListPortfoliosQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePortfolioRequest {
    pub user_id: String,
    pub name: String,
    /// Starting cash balance; defaults to zero.
    #[serde(default)]
    pub cash: f64,
}

#[derive(Debug, Serialize)]
pub struct PortfolioValueResponse {
    pub portfolio_id: String,
    pub total_value: f64,
}

/// GET /api/portfolios?user_id=
async fn list_portfolios(
    State(state): State<AppState>,
    Query(query): Query<ListPortfoliosQuery>,
) -> Json<ApiResponse<Vec<PortfolioWithHoldings>>> {
    let portfolios = state.store.get_user_portfolios(&query.user_id);
    Json(ApiResponse { data: portfolios })
}

/// POST /api/portfolios
async fn create_portfolio(
    State(state): State<AppState>,
    Json(request): Json<CreatePortfolioRequest>,
) -> Result<Json<ApiResponse<Portfolio>>, LedgerError> {
    if request.cash < 0.0 || !request.cash.is_finite() {
        return Err(LedgerError::InvalidTrade(
            "starting cash must be non-negative".to_string(),
        ));
    }
    if state
        .store
        .portfolio_name_exists(&request.user_id, &request.name)
    {
        return Err(LedgerError::DuplicatePortfolio(request.name));
    }

    let portfolio = Portfolio::new(request.user_id, request.name, request.cash);
    state.store.create_portfolio(&portfolio)?;

    Ok(Json(ApiResponse { data: portfolio }))
}

/// GET /api/portfolios/:id
async fn get_portfolio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PortfolioWithHoldings>>, LedgerError> {
    let portfolio = state
        .store
        .get_portfolio_with_holdings(&id)
        .ok_or(LedgerError::PortfolioNotFound(id))?;

    Ok(Json(ApiResponse { data: portfolio }))
}

/// GET /api/portfolios/:id/value
///
/// Cash plus holdings valued at the live cached prices. Symbols without a
/// cached quote contribute zero until the feed converges.
async fn get_portfolio_value(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PortfolioValueResponse>>, LedgerError> {
    let view = state
        .store
        .get_portfolio_with_holdings(&id)
        .ok_or(LedgerError::PortfolioNotFound(id))?;

    let holdings_value: f64 = view
        .holdings
        .iter()
        .map(|h| h.quantity * state.price_cache.get_current_price(&h.symbol))
        .sum();

    Ok(Json(ApiResponse {
        data: PortfolioValueResponse {
            portfolio_id: view.portfolio.id,
            total_value: view.portfolio.cash + holdings_value,
        },
    }))
}

/// GET /api/portfolios/:id/snapshots
async fn get_snapshots(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Snapshot>>>, LedgerError> {
    if state.store.get_portfolio(&id).is_none() {
        return Err(LedgerError::PortfolioNotFound(id));
    }

    Ok(Json(ApiResponse {
        data: state.store.get_snapshots(&id),
    }))
}

/// GET /api/portfolios/:id/risk-metrics
async fn get_risk_metrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RiskMetrics>>, LedgerError> {
    let metrics = state.risk.calculate_risk_metrics(&id)?;
    Ok(Json(ApiResponse { data: metrics }))
}
