use axum::Json;
use axum::extract::{Path, State};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::api::types::{BatchPricesRequest, BatchPricesResponse, PriceResponse};
use crate::error::EngineError;

const MAX_BATCH_MINTS: usize = 20;

pub async fn price(
    State(state): State<AppState>,
    Path(mint): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let now_unix = chrono::Utc::now().timestamp();
    let price = state.oracle.price(&mint, now_unix).await?;
    Ok(Json(PriceResponse { mint, price }))
}

pub async fn batch_prices(
    State(state): State<AppState>,
    Json(req): Json<BatchPricesRequest>,
) -> Result<Json<BatchPricesResponse>, ApiError> {
    if req.mints.len() > MAX_BATCH_MINTS {
        return Err(EngineError::Validation(format!(
            "batch-prices accepts at most {MAX_BATCH_MINTS} mints, got {}",
            req.mints.len()
        ))
        .into());
    }

    let now_unix = chrono::Utc::now().timestamp();
    let prices = state
        .oracle
        .batch_prices(&req.mints, now_unix)
        .await?
        .into_iter()
        .map(|(mint, price)| PriceResponse { mint, price })
        .collect();

    Ok(Json(BatchPricesResponse { prices }))
}
