//! LP intent endpoints: atomic open, execute open, atomic withdraw,
//! rebalance, collect fees. Each acquires the per-wallet advisory lock,
//! composes the transaction list through the pipeline composer, escalates slippage through
//! the pipeline composer's `Escalator` on `SLIPPAGE_EXCEEDED`, submits through the submission driver, and
//! invalidates the position indexer's position cache for the wallet on success.

use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;

use crate::api::error::ApiError;
use crate::api::middleware::AuthOperator;
use crate::api::state::AppState;
use crate::api::types::{
    AtomicOpenRequest, AtomicWithdrawRequest, CollectFeesRequest, ExecuteOpenRequest, IntentResponse,
    RebalanceRequest,
};
use crate::error::EngineError;
use crate::model::{Position, Strategy};
use crate::pipeline::{ComposedIntent, Escalator, PipelineComposer};
use crate::submission::{SubmissionDriver, SubmissionMode};
use crate::venues::{self, InputAmounts};

fn submission_mode(sequential: bool) -> SubmissionMode {
    if sequential { SubmissionMode::Sequential } else { SubmissionMode::Bundle }
}

fn parse_wallet(wallet: &str) -> Result<Pubkey, ApiError> {
    Pubkey::from_str(wallet)
        .map_err(|_| EngineError::Validation(format!("{wallet} is not a valid wallet address")).into())
}

/// Serialize the composer's finalized transactions to unsigned wire
/// bytes, co-signing any auxiliary account (a fresh position account,
/// say) locally before handing off to the custody oracle.
fn to_unsigned_wire(intent: &ComposedIntent) -> Result<Vec<Vec<u8>>, ApiError> {
    let mut out = Vec::with_capacity(intent.transactions.len());
    for ft in &intent.transactions {
        let mut tx = ft.transaction.clone();
        if !ft.auxiliary_signers.is_empty() {
            let refs: Vec<&Keypair> = ft.auxiliary_signers.iter().collect();
            tx.partial_sign(&refs, tx.message.recent_blockhash);
        }
        let bytes = bincode::serialize(&tx)
            .map_err(|e| EngineError::Internal(format!("serializing transaction: {e}")))?;
        out.push(bytes);
    }
    Ok(out)
}

async fn submit_and_respond(
    state: &AppState,
    owner: &Pubkey,
    intent: ComposedIntent,
    sequential: bool,
    escalated_to_bps: u32,
) -> Result<Json<IntentResponse>, ApiError> {
    let unsigned = to_unsigned_wire(&intent)?;
    let driver = SubmissionDriver::new(
        state.custody.as_ref(),
        state.relay.as_ref(),
        state.rpc.as_ref(),
        &state.swap_breaker,
    );
    let submission = driver.submit(owner, unsigned, submission_mode(sequential)).await?;

    Ok(Json(IntentResponse {
        submission,
        sealed_strategy_ciphertext_b64: intent.sealed_strategy.ciphertext_b64,
        escalated_to_bps,
        converted: intent.converted,
        reason: intent.conversion_failure_reason,
    }))
}

pub async fn atomic_open(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Json(req): Json<AtomicOpenRequest>,
) -> Result<Json<IntentResponse>, ApiError> {
    let owner = parse_wallet(&req.wallet)?;
    let _guard = state.wallet_locks.try_acquire(&req.wallet).await?;

    let adapter = venues::adapter_for(req.venue, state.rpc_url.clone());
    let pool = adapter.describe_pool(&req.pool).await?;

    let strategy = Strategy {
        venue: req.venue,
        pool: req.pool.clone(),
        collateral_mint: req.collateral_mint,
        collateral_amount: req.collateral_amount,
        range_shape: req.range_shape,
        distribution_shape: req.distribution_shape,
        slippage_bps: req.slippage_bps,
        tip_urgency: req.tip_urgency,
        custom_lower: req.custom_lower,
        custom_upper: req.custom_upper,
    };

    let composer = PipelineComposer::new(&state.sealer, &state.oracle, &state.budget, state.swap_router.as_ref(), state.treasury.clone());

    let mut escalator = Escalator::new(req.slippage_bps);
    let now_unix = chrono::Utc::now().timestamp();
    let intent = loop {
        match composer.compose_atomic_lp(&strategy, &pool, adapter.as_ref(), &owner, escalator.current_bps(), now_unix).await {
            Ok(intent) => {
                escalator.mark_landed();
                break intent;
            }
            Err(EngineError::SlippageExceeded { .. }) => {
                escalator.mark_slippage_exceeded();
                if escalator.is_exhausted() {
                    return Err(EngineError::SlippageExhausted { last_bps: escalator.current_bps() }.into());
                }
            }
            Err(err) => return Err(err.into()),
        }
    };

    let escalated_to_bps = escalator.current_bps();
    state.indexer.invalidate(&req.wallet).await;
    submit_and_respond(&state, &owner, intent, req.sequential, escalated_to_bps).await
}

pub async fn execute_open(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Json(req): Json<ExecuteOpenRequest>,
) -> Result<Json<IntentResponse>, ApiError> {
    let owner = parse_wallet(&req.wallet)?;
    let _guard = state.wallet_locks.try_acquire(&req.wallet).await?;

    let adapter = venues::adapter_for(req.venue, state.rpc_url.clone());
    let pool = adapter.describe_pool(&req.pool).await?;

    let strategy = Strategy {
        venue: req.venue,
        pool: req.pool.clone(),
        collateral_mint: req.collateral_mint,
        collateral_amount: req.amount_a + req.amount_b,
        range_shape: req.range_shape,
        distribution_shape: req.distribution_shape,
        slippage_bps: req.slippage_bps,
        tip_urgency: req.tip_urgency,
        custom_lower: req.custom_lower,
        custom_upper: req.custom_upper,
    };

    let composer = PipelineComposer::new(&state.sealer, &state.oracle, &state.budget, state.swap_router.as_ref(), state.treasury.clone());
    let inputs = InputAmounts { amount_a: req.amount_a, amount_b: req.amount_b };
    let intent = composer.compose_execute_open(&strategy, &pool, adapter.as_ref(), &owner, inputs).await?;

    state.indexer.invalidate(&req.wallet).await;
    submit_and_respond(&state, &owner, intent, req.sequential, req.slippage_bps).await
}

async fn find_position(state: &AppState, wallet: &str, position_id: &str) -> Result<Position, ApiError> {
    let pools = state.pools.list_top(&Default::default()).await?;
    let pool_map: std::collections::HashMap<String, crate::model::Pool> =
        pools.into_iter().map(|p| (p.address.clone(), p)).collect();
    let lookup = move |addr: &str| pool_map.get(addr).cloned();

    let positions = state.indexer.positions_for(wallet, &lookup).await?;
    positions
        .into_iter()
        .find(|p| p.id == position_id)
        .ok_or_else(|| EngineError::NotFound(format!("position {position_id}")).into())
}

pub async fn atomic_withdraw(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Json(req): Json<AtomicWithdrawRequest>,
) -> Result<Json<IntentResponse>, ApiError> {
    let owner = parse_wallet(&req.wallet)?;
    let _guard = state.wallet_locks.try_acquire(&req.wallet).await?;

    let position = find_position(&state, &req.wallet, &req.position).await?;
    let adapter = venues::adapter_for(req.venue, state.rpc_url.clone());
    let pool = adapter.describe_pool(&req.pool).await?;

    let target_mint = req.convert_to_mint.unwrap_or_else(|| pool.token_a.mint.clone());

    let composer = PipelineComposer::new(&state.sealer, &state.oracle, &state.budget, state.swap_router.as_ref(), state.treasury.clone());
    let intent = composer
        .compose_withdraw_and_convert(&position, &pool, adapter.as_ref(), &owner, &target_mint, req.tip_urgency)
        .await?;

    state.indexer.invalidate(&req.wallet).await;
    submit_and_respond(&state, &owner, intent, req.sequential, 0).await
}

pub async fn rebalance(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Json(req): Json<RebalanceRequest>,
) -> Result<Json<IntentResponse>, ApiError> {
    let owner = parse_wallet(&req.wallet)?;
    let _guard = state.wallet_locks.try_acquire(&req.wallet).await?;

    let position = find_position(&state, &req.wallet, &req.position).await?;
    let adapter = venues::adapter_for(req.venue, state.rpc_url.clone());
    let pool = adapter.describe_pool(&req.pool).await?;

    let composer = PipelineComposer::new(&state.sealer, &state.oracle, &state.budget, state.swap_router.as_ref(), state.treasury.clone());
    let intent = composer
        .compose_atomic_rebalance(&position, &pool, adapter.as_ref(), &owner, req.tip_urgency)
        .await?;

    state.indexer.invalidate(&req.wallet).await;
    submit_and_respond(&state, &owner, intent, req.sequential, 0).await
}

pub async fn collect_fees(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Json(req): Json<CollectFeesRequest>,
) -> Result<Json<IntentResponse>, ApiError> {
    let owner = parse_wallet(&req.wallet)?;
    let _guard = state.wallet_locks.try_acquire(&req.wallet).await?;

    let position = find_position(&state, &req.wallet, &req.position).await?;
    let adapter = venues::adapter_for(req.venue, state.rpc_url.clone());

    let composer = PipelineComposer::new(&state.sealer, &state.oracle, &state.budget, state.swap_router.as_ref(), state.treasury.clone());
    let intent = composer.compose_collect_fees(&position, adapter.as_ref(), &owner, req.tip_urgency).await?;

    state.indexer.invalidate(&req.wallet).await;
    submit_and_respond(&state, &owner, intent, false, 0).await
}

