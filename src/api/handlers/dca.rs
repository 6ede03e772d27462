//! DCA schedule CRUD. Ticking a due schedule — calling the pipeline composer/the submission driver and
//! appending to its history list — is the scheduler's `DcaExecutor` port,
//! not this handler set; these endpoints only create and manage the
//! `Schedule` record itself.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::middleware::AuthOperator;
use crate::api::state::AppState;
use crate::api::types::{CreateScheduleRequest, ScheduleResponse};
use crate::error::EngineError;
use crate::model::{Schedule, ScheduleStatus};
use crate::store::{get_json, keys, set_json};

async fn load(state: &AppState, id: &str) -> Result<Schedule, ApiError> {
    get_json(state.store.as_ref(), &keys::dca_schedule(id))
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("schedule {id}")).into())
}

pub async fn create(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let id = Uuid::new_v4().to_string();
    let now_unix = chrono::Utc::now().timestamp();

    let schedule = Schedule {
        id: id.clone(),
        wallet: req.wallet.clone(),
        pool: req.pool,
        amount_per_tick: req.amount_per_tick,
        total_budget: req.total_budget,
        spent: 0,
        tick_interval_secs: req.tick_interval_secs,
        next_tick_unix: now_unix,
        executions: 0,
        max_executions: req.max_executions,
        range_shape: req.range_shape,
        status: ScheduleStatus::Active,
        last_error: None,
    };

    set_json(state.store.as_ref(), &keys::dca_schedule(&id), &schedule).await?;
    state.store.sadd(&keys::dca_schedules(), &id).await?;
    state.store.sadd(&keys::dca_active(), &id).await?;
    state.store.sadd(&keys::dca_wallet_schedules(&req.wallet), &id).await?;

    Ok(Json(ScheduleResponse { id }))
}

pub async fn list_by_wallet(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    let ids = state.store.smembers(&keys::dca_wallet_schedules(&wallet)).await?;
    let mut schedules = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(schedule) = get_json(state.store.as_ref(), &keys::dca_schedule(&id)).await? {
            schedules.push(schedule);
        }
    }
    Ok(Json(schedules))
}

pub async fn pause(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    let mut schedule = load(&state, &id).await?;
    if schedule.status != ScheduleStatus::Active {
        return Err(EngineError::Validation(format!("schedule {id} is not active")).into());
    }
    schedule.status = ScheduleStatus::Paused;
    set_json(state.store.as_ref(), &keys::dca_schedule(&id), &schedule).await?;
    state.store.srem(&keys::dca_active(), &id).await?;
    Ok(Json(schedule))
}

pub async fn resume(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    let mut schedule = load(&state, &id).await?;
    if schedule.status != ScheduleStatus::Paused {
        return Err(EngineError::Validation(format!("schedule {id} is not paused")).into());
    }
    schedule.status = ScheduleStatus::Active;
    schedule.next_tick_unix = chrono::Utc::now().timestamp();
    set_json(state.store.as_ref(), &keys::dca_schedule(&id), &schedule).await?;
    state.store.sadd(&keys::dca_active(), &id).await?;
    Ok(Json(schedule))
}

pub async fn cancel(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    let mut schedule = load(&state, &id).await?;
    if matches!(schedule.status, ScheduleStatus::Complete | ScheduleStatus::Cancelled) {
        return Err(EngineError::Validation(format!("schedule {id} is already terminal")).into());
    }
    schedule.status = ScheduleStatus::Cancelled;
    set_json(state.store.as_ref(), &keys::dca_schedule(&id), &schedule).await?;
    state.store.srem(&keys::dca_active(), &id).await?;
    Ok(Json(schedule))
}

pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let entries = state.store.list_range(&keys::dca_history(&id)).await?;
    Ok(Json(entries))
}
