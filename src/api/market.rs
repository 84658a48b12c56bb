//! Market data API
//!
//! Read-only views over the in-memory price cache.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;

use crate::api::{ApiResponse, ErrorResponse};
use crate::types::Ticker;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/prices", get(get_all_prices))
        .route("/prices/:product_id", get(get_price))
}

/// GET /api/market/prices
async fn get_all_prices(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, Ticker>>> {
    Json(ApiResponse {
        data: state.price_cache.latest_map(),
    })
}

/// GET /api/market/prices/:product_id
async fn get_price(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<Ticker>>, (StatusCode, Json<ErrorResponse>)> {
    let product_id = product_id.to_uppercase();

    match state.price_cache.get(&product_id) {
        Some(ticker) => Ok(Json(ApiResponse { data: ticker })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No cached price for {product_id}"),
                code: "PRICE_NOT_FOUND".to_string(),
            }),
        )),
    }
}
