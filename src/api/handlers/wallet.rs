use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use solana_sdk::pubkey::Pubkey;

use crate::api::error::ApiError;
use crate::api::middleware::AuthOperator;
use crate::api::state::AppState;
use crate::api::types::{BalanceResponse, CreateWalletRequest, WalletResponse};
use crate::error::EngineError;
use crate::model::UserProfile;
use crate::store::{get_json, keys, set_json};

pub async fn create(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    let address = state.custody.create_wallet(req.label.as_deref().unwrap_or("lp-wallet")).await?;

    let profile = UserProfile {
        wallet: address.clone(),
        address: address.clone(),
        label: req.label.clone(),
        created_at_unix: chrono::Utc::now().timestamp(),
    };
    set_json(state.store.as_ref(), &keys::user(&address), &profile).await?;

    Ok(Json(WalletResponse { wallet: profile.wallet, address: profile.address, label: profile.label }))
}

pub async fn load(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let profile: UserProfile = get_json(state.store.as_ref(), &keys::user(&wallet))
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("wallet {wallet}")))?;

    Ok(Json(WalletResponse { wallet: profile.wallet, address: profile.address, label: profile.label }))
}

pub async fn balance(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let pubkey = Pubkey::from_str(&wallet)
        .map_err(|_| EngineError::Validation(format!("{wallet} is not a valid wallet address")))?;

    let lamports = state.rpc.get_balance_lamports(&pubkey).await?;
    Ok(Json(BalanceResponse { wallet, lamports }))
}
