use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::api::types::PositionsResponse;
use crate::aggregator::PoolFilter;
use crate::model::Pool;

pub async fn list_by_wallet(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<PositionsResponse>, ApiError> {
    let pools = state.pools.list_top(&PoolFilter::default()).await?;
    let pool_map: HashMap<String, Pool> = pools.into_iter().map(|p| (p.address.clone(), p)).collect();
    let lookup = move |addr: &str| pool_map.get(addr).cloned();

    let positions = state.indexer.positions_for(&wallet, &lookup).await?;
    Ok(Json(PositionsResponse { wallet, positions }))
}
