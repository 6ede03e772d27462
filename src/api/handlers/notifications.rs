use axum::Json;
use axum::extract::{Path, State};

use crate::api::error::ApiError;
use crate::api::middleware::AuthOperator;
use crate::api::state::AppState;
use crate::api::types::{RegisterRecipientRequest, UpdatePreferencesRequest};
use crate::error::EngineError;
use crate::model::recipient::{ChatTransport, RecipientPreferences, WebhookTransport};
use crate::model::Recipient;
use crate::store::{get_json, keys, set_json};

pub async fn register_recipient(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Json(req): Json<RegisterRecipientRequest>,
) -> Result<Json<Recipient>, ApiError> {
    let chat = req.chat_channel_id.map(|channel_id| ChatTransport { channel_id });
    let webhook = match (req.webhook_url, req.webhook_secret) {
        (Some(url), Some(secret)) => Some(WebhookTransport { url, secret }),
        (Some(_), None) => return Err(EngineError::Validation("webhook_url requires webhook_secret".into()).into()),
        _ => None,
    };

    let recipient = Recipient { wallet: req.wallet.clone(), chat, webhook, preferences: RecipientPreferences::default() };
    recipient.validate()?;

    set_json(state.store.as_ref(), &keys::recipient(&req.wallet), &recipient).await?;
    Ok(Json(recipient))
}

pub async fn update_preferences(
    _operator: AuthOperator,
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Result<Json<Recipient>, ApiError> {
    let mut recipient: Recipient = get_json(state.store.as_ref(), &keys::recipient(&wallet))
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("recipient {wallet}")))?;

    recipient.preferences = RecipientPreferences {
        alert_on_out_of_range: req.alert_on_out_of_range,
        alert_on_back_in_range: req.alert_on_back_in_range,
        daily_summary: req.daily_summary,
        auto_rebalance: req.auto_rebalance,
        rebalance_drift_threshold: req.rebalance_drift_threshold,
    };

    set_json(state.store.as_ref(), &keys::recipient(&wallet), &recipient).await?;
    Ok(Json(recipient))
}
