//! Worker status/trigger-check. `trigger_check` runs one scheduler
//! tick synchronously, reusing the same `RebalanceExecutor`/`DcaExecutor`
//! ports the background loop drives, backed here by the real
//! pipeline/submission stack rather than stubs.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use solana_sdk::pubkey::Pubkey;

use crate::aggregator::PoolFilter;
use crate::api::error::ApiError;
use crate::api::middleware::AuthOperator;
use crate::api::state::AppState;
use crate::api::types::WorkerStatusResponse;
use crate::error::{EngineError, Result};
use crate::model::{Pool, Schedule, Strategy, TrackedPosition, WorkerState};
use crate::pipeline::PipelineComposer;
use crate::scheduler::{DcaExecutor, RebalanceExecutor, Scheduler, TickSummary};
use crate::store::{get_json, keys};
use crate::submission::{SubmissionDriver, SubmissionMode};
use crate::venues;

struct ApiRebalanceExecutor<'a> {
    state: &'a AppState,
}

#[async_trait]
impl RebalanceExecutor for ApiRebalanceExecutor<'_> {
    async fn execute_rebalance(&self, tracked: &TrackedPosition) -> Result<()> {
        let owner = Pubkey::from_str(&tracked.wallet)
            .map_err(|_| EngineError::Validation(format!("{} is not a valid wallet address", tracked.wallet)))?;

        let adapter = venues::adapter_for(tracked.venue, self.state.rpc_url.clone());
        let pool = adapter.describe_pool(&tracked.pool).await?;

        let pools = self.state.pools.list_top(&PoolFilter::default()).await?;
        let pool_map: HashMap<String, Pool> = pools.into_iter().map(|p| (p.address.clone(), p)).collect();
        let lookup = move |addr: &str| pool_map.get(addr).cloned();
        let positions = self.state.indexer.positions_for(&tracked.wallet, &lookup).await?;
        let position = positions
            .into_iter()
            .find(|p| p.id == tracked.position_id)
            .ok_or_else(|| EngineError::NotFound(format!("position {}", tracked.position_id)))?;

        let composer = PipelineComposer::new(
            &self.state.sealer,
            &self.state.oracle,
            &self.state.budget,
            self.state.swap_router.as_ref(),
            self.state.treasury.clone(),
        );
        let intent = composer
            .compose_atomic_rebalance(&position, &pool, adapter.as_ref(), &owner, crate::model::TipUrgency::Fast)
            .await?;

        let driver = SubmissionDriver::new(
            self.state.custody.as_ref(),
            self.state.relay.as_ref(),
            self.state.rpc.as_ref(),
            &self.state.swap_breaker,
        );
        let unsigned = intent
            .transactions
            .into_iter()
            .map(|ft| bincode::serialize(&ft.transaction).map_err(|e| EngineError::Internal(e.to_string())))
            .collect::<Result<Vec<_>>>()?;
        driver.submit(&owner, unsigned, SubmissionMode::Bundle).await?;

        self.state.indexer.invalidate(&tracked.wallet).await;
        Ok(())
    }
}

struct ApiDcaExecutor<'a> {
    state: &'a AppState,
}

#[async_trait]
impl DcaExecutor for ApiDcaExecutor<'_> {
    async fn execute_dca(&self, schedule: &Schedule) -> Result<()> {
        let owner = Pubkey::from_str(&schedule.wallet)
            .map_err(|_| EngineError::Validation(format!("{} is not a valid wallet address", schedule.wallet)))?;

        let pools = self.state.pools.list_top(&PoolFilter::default()).await?;
        let pool = pools
            .into_iter()
            .find(|p| p.address == schedule.pool)
            .ok_or_else(|| EngineError::NotFound(format!("pool {}", schedule.pool)))?;
        let adapter = venues::adapter_for(pool.venue, self.state.rpc_url.clone());

        let strategy = Strategy {
            venue: pool.venue,
            pool: schedule.pool.clone(),
            collateral_mint: pool.token_a.mint.clone(),
            collateral_amount: schedule.amount_per_tick,
            range_shape: schedule.range_shape,
            distribution_shape: None,
            slippage_bps: 300,
            tip_urgency: crate::model::TipUrgency::Fast,
            custom_lower: None,
            custom_upper: None,
        };

        let composer = PipelineComposer::new(
            &self.state.sealer,
            &self.state.oracle,
            &self.state.budget,
            self.state.swap_router.as_ref(),
            self.state.treasury.clone(),
        );
        let now_unix = chrono::Utc::now().timestamp();
        let intent = composer
            .compose_atomic_lp(&strategy, &pool, adapter.as_ref(), &owner, strategy.slippage_bps, now_unix)
            .await?;

        let driver = SubmissionDriver::new(
            self.state.custody.as_ref(),
            self.state.relay.as_ref(),
            self.state.rpc.as_ref(),
            &self.state.swap_breaker,
        );
        let unsigned = intent
            .transactions
            .into_iter()
            .map(|ft| bincode::serialize(&ft.transaction).map_err(|e| EngineError::Internal(e.to_string())))
            .collect::<Result<Vec<_>>>()?;
        driver.submit(&owner, unsigned, SubmissionMode::Bundle).await?;

        self.state.indexer.invalidate(&schedule.wallet).await;
        Ok(())
    }
}

pub async fn status(State(state): State<AppState>) -> Result<Json<WorkerStatusResponse>, ApiError> {
    let worker: WorkerState = get_json(state.store.as_ref(), &keys::worker_state()).await?.unwrap_or_default();
    let recent_logs = state.store.list_range(&keys::worker_logs()).await?;

    Ok(Json(WorkerStatusResponse {
        running: worker.running,
        started_at_unix: worker.started_at_unix,
        last_check_unix: worker.last_check_unix,
        checks_completed: worker.checks_completed,
        errors: worker.errors,
        recent_logs,
    }))
}

/// Runs one scheduler tick against the real pipeline/submission stack.
/// Shared by the HTTP trigger endpoint and the `monitor` CLI loop so both
/// drive the exact same `RebalanceExecutor`/`DcaExecutor` wiring.
pub async fn run_tick(state: &AppState) -> Result<TickSummary> {
    let rebalance = ApiRebalanceExecutor { state };
    let dca = ApiDcaExecutor { state };
    let scheduler = Scheduler::new(&state.notifier, &rebalance, &dca);

    let pools = state.pools.list_top(&PoolFilter::default()).await?;
    let pool_map: HashMap<String, Pool> = pools.into_iter().map(|p| (p.address.clone(), p)).collect();
    let lookup = move |addr: &str| pool_map.get(addr).cloned();

    let now_unix = chrono::Utc::now().timestamp();
    scheduler.tick(state.store.as_ref(), &lookup, now_unix).await
}

pub async fn trigger_check(
    _operator: AuthOperator,
    State(state): State<AppState>,
) -> Result<Json<TickSummaryResponse>, ApiError> {
    let summary = run_tick(&state).await?;
    Ok(Json(TickSummaryResponse::from(summary)))
}

#[derive(serde::Serialize)]
pub struct TickSummaryResponse {
    pub positions_checked: usize,
    pub transitions_in_to_out: usize,
    pub transitions_out_to_in: usize,
    pub rebalances_triggered: usize,
    pub schedules_ticked: usize,
    pub schedules_completed: usize,
    pub schedules_failed: usize,
}

impl From<TickSummary> for TickSummaryResponse {
    fn from(s: TickSummary) -> Self {
        Self {
            positions_checked: s.positions_checked,
            transitions_in_to_out: s.transitions_in_to_out,
            transitions_out_to_in: s.transitions_out_to_in,
            rebalances_triggered: s.rebalances_triggered,
            schedules_ticked: s.schedules_ticked,
            schedules_completed: s.schedules_completed,
            schedules_failed: s.schedules_failed,
        }
    }
}

