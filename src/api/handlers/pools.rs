use axum::Json;
use axum::extract::{Path, Query, State};

use crate::aggregator::{PoolFilter, SortKey};
use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::api::types::{BestPairQuery, ListPoolsQuery};
use crate::error::EngineError;
use crate::model::{Pool, VenueTag};
use crate::venues;

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListPoolsQuery>,
) -> Result<Json<Vec<Pool>>, ApiError> {
    let sort = match query.sort.as_deref() {
        Some("tvl") => Some(SortKey::Tvl),
        Some("volume") => Some(SortKey::Volume),
        Some("risk_adjusted_yield") => Some(SortKey::RiskAdjustedYield),
        Some("apr") | None => Some(SortKey::Apr),
        Some(other) => return Err(EngineError::Validation(format!("unknown sort key: {other}")).into()),
    };

    let filter = PoolFilter {
        min_tvl_usd: query.min_tvl_usd,
        max_risk_score: query.max_risk_score,
        venue: query.venue,
        sort,
    };

    let pools = state.pools.list_top(&filter).await?;
    Ok(Json(pools))
}

pub async fn best_pair(
    State(state): State<AppState>,
    Query(query): Query<BestPairQuery>,
) -> Result<Json<Option<Pool>>, ApiError> {
    let pool = state.pools.best_pool_for_pair(&query.a, &query.b).await?;
    Ok(Json(pool))
}

pub async fn details(
    State(state): State<AppState>,
    Path((venue, address)): Path<(VenueTag, String)>,
) -> Result<Json<Pool>, ApiError> {
    let adapter = venues::adapter_for(venue, state.rpc_url.clone());
    let pool = adapter.describe_pool(&address).await?;
    Ok(Json(pool))
}
